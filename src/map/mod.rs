//! Map page view models.
//!
//! Markers and their popups are described as plain data for the client to
//! render. [`MapView`] holds the sidebar state and derives the preview marker
//! shown while a new report is being placed.

use serde::Serialize;

use crate::models::{Report, ReportStatus};

/// Popup title for reports whose street could not be resolved.
pub const NO_STREET_TITLE: &str = "Ubicación sin calle";

/// Shown in place of an empty comment list.
pub const NO_COMMENTS_TEXT: &str = "Sin comentarios";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerColor {
    Red,
    Orange,
    Green,
    /// Preview marker only
    Blue,
}

pub fn status_color(status: ReportStatus) -> MarkerColor {
    match status {
        ReportStatus::Permanente => MarkerColor::Red,
        ReportStatus::Temporal => MarkerColor::Orange,
        ReportStatus::Solucionado => MarkerColor::Green,
    }
}

pub fn status_emoji(status: ReportStatus) -> &'static str {
    match status {
        ReportStatus::Permanente => "🔴",
        ReportStatus::Temporal => "🟡",
        ReportStatus::Solucionado => "🟢",
    }
}

/// Emoji for the kind of incident, guessed from the description.
/// First matching group wins; no match gives an empty string.
pub fn incident_emoji(description: &str) -> &'static str {
    const GROUPS: [(&[&str], &str); 8] = [
        (&["escalera", "escalón", "escalon"], "🪜"),
        (&["rampa"], "♿"),
        (&["bache", "agujero", "socavón", "socavon"], "🕳️"),
        (&["acera", "vereda"], "🧱"),
        (&["calle", "pavimento"], "🛣️"),
        (&["obstáculo", "obstaculo", "barrera"], "🚧"),
        (&["paso de peatones", "cruce"], "🚸"),
        (&["señal", "señalización", "señalizacion"], "🚦"),
    ];

    let description = description.to_lowercase();
    GROUPS
        .iter()
        .find(|(words, _)| words.iter().any(|w| description.contains(w)))
        .map(|(_, emoji)| *emoji)
        .unwrap_or("")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PopupAction {
    Comment,
    Edit,
    Delete,
}

/// Content of a marker's popup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Popup {
    pub title: String,
    pub description: String,
    pub status_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub comments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments_placeholder: Option<&'static str>,
    pub actions: Vec<PopupAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub color: MarkerColor,
    pub status_emoji: &'static str,
    pub incident_emoji: &'static str,
    pub popup: Popup,
}

impl Marker {
    /// `None` when the report has no usable coordinates.
    pub fn from_report(report: &Report) -> Option<Self> {
        let (lat, lng) = report.position()?;
        let status = report.status.unwrap_or_default();

        let popup = Popup {
            title: if report.street.trim().is_empty() {
                NO_STREET_TITLE.to_string()
            } else {
                report.street.clone()
            },
            description: report.description.clone(),
            status_label: status.as_str().to_uppercase(),
            extra_info: report.extra_info.clone().filter(|s| !s.trim().is_empty()),
            image_url: report.image_url.clone().filter(|s| !s.trim().is_empty()),
            comments: report.comments.clone(),
            comments_placeholder: report.comments.is_empty().then_some(NO_COMMENTS_TEXT),
            actions: vec![PopupAction::Comment, PopupAction::Edit, PopupAction::Delete],
        };

        Some(Self {
            id: report.id.clone(),
            lat,
            lng,
            color: status_color(status),
            status_emoji: status_emoji(status),
            incident_emoji: incident_emoji(&report.description),
            popup,
        })
    }
}

/// Markers for every report that can be placed. The rest are skipped.
pub fn build_markers(reports: &[Report]) -> Vec<Marker> {
    reports
        .iter()
        .filter_map(|report| {
            let marker = Marker::from_report(report);
            if marker.is_none() {
                tracing::warn!(report_id = %report.id, "Report has no valid coordinates, skipping marker");
            }
            marker
        })
        .collect()
}

/// Transient marker where a new report will be placed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PreviewMarker {
    pub lat: f64,
    pub lng: f64,
    pub color: MarkerColor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "report", rename_all = "lowercase")]
pub enum SidebarMode {
    New,
    Edit(Box<Report>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Sidebar {
    #[default]
    Closed,
    Open {
        lat: Option<f64>,
        lng: Option<f64>,
        street: String,
        mode: SidebarMode,
    },
}

/// State of the map page: the loaded reports and the sidebar.
#[derive(Debug, Clone, Default)]
pub struct MapView {
    reports: Vec<Report>,
    sidebar: Sidebar,
}

impl MapView {
    pub fn new(reports: Vec<Report>) -> Self {
        Self {
            reports,
            sidebar: Sidebar::Closed,
        }
    }

    pub fn sidebar(&self) -> &Sidebar {
        &self.sidebar
    }

    pub fn markers(&self) -> Vec<Marker> {
        build_markers(&self.reports)
    }

    /// The map was clicked: start a new report there.
    pub fn click(&mut self, lat: f64, lng: f64, street: String) {
        self.sidebar = Sidebar::Open {
            lat: Some(lat),
            lng: Some(lng),
            street,
            mode: SidebarMode::New,
        };
    }

    /// Open the sidebar on an existing report.
    pub fn edit(&mut self, report: &Report) {
        self.sidebar = Sidebar::Open {
            lat: report.latitude,
            lng: report.longitude,
            street: report.street.clone(),
            mode: SidebarMode::Edit(Box::new(report.clone())),
        };
    }

    pub fn close(&mut self) {
        self.sidebar = Sidebar::Closed;
    }

    /// Present exactly when the sidebar is open on a new report with both coordinates.
    pub fn preview(&self) -> Option<PreviewMarker> {
        match &self.sidebar {
            Sidebar::Open {
                lat: Some(lat),
                lng: Some(lng),
                mode: SidebarMode::New,
                ..
            } => Some(PreviewMarker {
                lat: *lat,
                lng: *lng,
                color: MarkerColor::Blue,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(id: &str, lat: Option<f64>, lng: Option<f64>) -> Report {
        Report {
            id: id.to_string(),
            street: "Carrer Major".to_string(),
            description: "Escalón sin rampa".to_string(),
            extra_info: None,
            image_url: None,
            latitude: lat,
            longitude: lng,
            created_at: "2025-07-24T10:00:00.000Z".to_string(),
            updated_at: "2025-07-24T10:00:00.000Z".to_string(),
            barrier_type: None,
            severity: None,
            status: None,
            comments: Vec::new(),
            submitter_id: None,
            submitter_email: None,
        }
    }

    #[test]
    fn test_status_colors() {
        assert_eq!(status_color(ReportStatus::Permanente), MarkerColor::Red);
        assert_eq!(status_color(ReportStatus::Temporal), MarkerColor::Orange);
        assert_eq!(status_color(ReportStatus::Solucionado), MarkerColor::Green);
        assert_eq!(status_emoji(ReportStatus::Solucionado), "🟢");
    }

    #[test]
    fn test_incident_emoji() {
        assert_eq!(incident_emoji("Escalón sin rampa"), "🪜");
        assert_eq!(incident_emoji("Falta RAMPA"), "♿");
        assert_eq!(incident_emoji("Socavón enorme"), "🕳️");
        assert_eq!(incident_emoji("paso de peatones borrado"), "🚸");
        assert_eq!(incident_emoji("Señalización caída"), "🚦");
        assert_eq!(incident_emoji("farola apagada"), "");
    }

    #[test]
    fn test_marker_defaults() {
        let mut r = report("1", Some(41.1), Some(1.2));
        r.street = String::new();
        let marker = Marker::from_report(&r).unwrap();

        assert_eq!(marker.color, MarkerColor::Orange);
        assert_eq!(marker.popup.title, NO_STREET_TITLE);
        assert_eq!(marker.popup.status_label, "TEMPORAL");
        assert_eq!(marker.popup.comments_placeholder, Some(NO_COMMENTS_TEXT));

        r.comments = vec!["ya está arreglado".to_string()];
        r.status = Some(ReportStatus::Solucionado);
        let marker = Marker::from_report(&r).unwrap();
        assert_eq!(marker.popup.comments_placeholder, None);
        assert_eq!(marker.popup.status_label, "SOLUCIONADO");
    }

    #[test]
    fn test_reports_without_coordinates_skipped() {
        let reports = vec![
            report("1", Some(41.1), Some(1.2)),
            report("2", None, Some(1.2)),
            report("3", Some(f64::NAN), Some(1.2)),
        ];
        let markers = build_markers(&reports);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].id, "1");
    }

    #[test]
    fn test_close_removes_preview() {
        let mut view = MapView::default();
        assert!(view.preview().is_none());

        view.click(41.1, 1.2, "Carrer Major".to_string());
        let preview = view.preview().unwrap();
        assert_eq!((preview.lat, preview.lng), (41.1, 1.2));
        assert_eq!(preview.color, MarkerColor::Blue);

        // clicking elsewhere moves the single preview
        view.click(41.2, 1.3, String::new());
        assert_eq!(view.preview().unwrap().lat, 41.2);

        view.close();
        assert_eq!(view.sidebar(), &Sidebar::Closed);
        assert!(view.preview().is_none());
    }

    #[test]
    fn test_edit_never_shows_preview() {
        let existing = report("1", Some(41.1), Some(1.2));
        let mut view = MapView::new(vec![existing.clone()]);

        view.click(41.0, 1.0, String::new());
        view.edit(&existing);
        assert!(view.preview().is_none());
        match view.sidebar() {
            Sidebar::Open {
                mode: SidebarMode::Edit(report),
                lat,
                ..
            } => {
                assert_eq!(report.id, "1");
                assert_eq!(*lat, Some(41.1));
            }
            other => panic!("unexpected sidebar {:?}", other),
        }
        assert_eq!(view.markers().len(), 1);
    }
}

//! Report model: an accessibility barrier placed on the map.

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::AppError;

/// Kind of barrier being reported.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BarrierType {
    #[serde(alias = "escalón", alias = "escalon")]
    Escalera,
    Rampa,
    Bache,
    Acera,
    Calle,
    #[serde(alias = "obstáculo")]
    Obstaculo,
    Cruce,
    #[serde(rename = "señal", alias = "senal")]
    Senal,
}

impl BarrierType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BarrierType::Escalera => "escalera",
            BarrierType::Rampa => "rampa",
            BarrierType::Bache => "bache",
            BarrierType::Acera => "acera",
            BarrierType::Calle => "calle",
            BarrierType::Obstaculo => "obstaculo",
            BarrierType::Cruce => "cruce",
            BarrierType::Senal => "señal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "escalera" | "escalón" | "escalon" => Some(BarrierType::Escalera),
            "rampa" => Some(BarrierType::Rampa),
            "bache" => Some(BarrierType::Bache),
            "acera" => Some(BarrierType::Acera),
            "calle" => Some(BarrierType::Calle),
            "obstaculo" | "obstáculo" => Some(BarrierType::Obstaculo),
            "cruce" => Some(BarrierType::Cruce),
            "señal" | "senal" => Some(BarrierType::Senal),
            _ => None,
        }
    }
}

/// How hard the barrier makes it to get through.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Baja,
    Media,
    Alta,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Baja => "baja",
            Severity::Media => "media",
            Severity::Alta => "alta",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "baja" => Some(Severity::Baja),
            "media" => Some(Severity::Media),
            "alta" => Some(Severity::Alta),
            _ => None,
        }
    }
}

/// Whether the barrier is still there.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Permanente,
    #[default]
    Temporal,
    Solucionado,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Permanente => "permanente",
            ReportStatus::Temporal => "temporal",
            ReportStatus::Solucionado => "solucionado",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "permanente" => Some(ReportStatus::Permanente),
            "temporal" => Some(ReportStatus::Temporal),
            "solucionado" => Some(ReportStatus::Solucionado),
            _ => None,
        }
    }
}

/// Value found in the `severity`/`dificultad` slot of an incoming payload.
///
/// Older clients wrote the barrier status (permanente/temporal/solucionado)
/// into the same field as the severity (baja/media/alta). Both are accepted
/// and sorted into their own field by [`split_severity`].
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SeverityTag {
    Severity(Severity),
    Status(ReportStatus),
}

/// Resolve the severity slot and the explicit status into the two fields.
/// An explicit status wins over one carried in the severity slot.
pub fn split_severity(
    tag: Option<SeverityTag>,
    status: Option<ReportStatus>,
) -> (Option<Severity>, Option<ReportStatus>) {
    match tag {
        Some(SeverityTag::Severity(severity)) => (Some(severity), status),
        Some(SeverityTag::Status(legacy)) => (None, status.or(Some(legacy))),
        None => (None, status),
    }
}

/// A barrier report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub street: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barrier_type: Option<BarrierType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReportStatus>,
    #[serde(default)]
    pub comments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitter_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitter_email: Option<String>,
}

impl Report {
    /// Coordinates, when both are present and usable for a marker.
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some((lat, lng)),
            _ => None,
        }
    }
}

/// Request body for creating a new report.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub extra_info: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub barrier_type: Option<BarrierType>,
    #[serde(default, alias = "dificultad")]
    pub severity: Option<SeverityTag>,
    #[serde(default)]
    pub status: Option<ReportStatus>,
    #[serde(default)]
    pub comments: Vec<String>,
    #[serde(default)]
    pub submitter_email: Option<String>,
}

/// Request body for updating an existing report. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReportRequest {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub extra_info: Option<String>,
    /// `null` removes the image, a string replaces it.
    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub barrier_type: Option<BarrierType>,
    #[serde(default, alias = "dificultad")]
    pub severity: Option<SeverityTag>,
    #[serde(default)]
    pub status: Option<ReportStatus>,
}

/// Request body for appending a comment.
#[derive(Debug, Clone, Deserialize)]
pub struct AddCommentRequest {
    pub text: String,
}

/// Distinguish a field explicitly set to `null` from an absent one.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Description used when the submitter leaves it blank.
pub fn default_description(barrier_type: Option<BarrierType>) -> String {
    let kind = barrier_type.unwrap_or(BarrierType::Escalera);
    format!("Incidencia de tipo {}", kind.as_str())
}

/// Check that a report can be placed on the map.
pub fn validate_coordinates(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<(f64, f64), AppError> {
    let (Some(lat), Some(lng)) = (latitude, longitude) else {
        return Err(AppError::Validation(
            "The report location could not be determined".to_string(),
        ));
    };

    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(AppError::Validation(format!("Invalid latitude: {}", lat)));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(AppError::Validation(format!("Invalid longitude: {}", lng)));
    }

    Ok((lat, lng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_status_in_severity_slot() {
        let request: CreateReportRequest = serde_json::from_value(json!({
            "dificultad": "permanente",
            "latitude": 41.1,
            "longitude": 1.2
        }))
        .unwrap();

        let (severity, status) = split_severity(request.severity, request.status);
        assert_eq!(severity, None);
        assert_eq!(status, Some(ReportStatus::Permanente));
    }

    #[test]
    fn test_explicit_status_wins() {
        let (severity, status) = split_severity(
            Some(SeverityTag::Status(ReportStatus::Temporal)),
            Some(ReportStatus::Solucionado),
        );
        assert_eq!(severity, None);
        assert_eq!(status, Some(ReportStatus::Solucionado));

        let (severity, status) = split_severity(Some(SeverityTag::Severity(Severity::Alta)), None);
        assert_eq!(severity, Some(Severity::Alta));
        assert_eq!(status, None);
    }

    #[test]
    fn test_unknown_severity_rejected() {
        let result: Result<CreateReportRequest, _> =
            serde_json::from_value(json!({ "severity": "extrema" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_barrier_type_accepts_spelling_variants() {
        let t: BarrierType = serde_json::from_value(json!("senal")).unwrap();
        assert_eq!(t, BarrierType::Senal);
        assert_eq!(serde_json::to_value(t).unwrap(), json!("señal"));
        assert_eq!(BarrierType::parse("obstáculo"), Some(BarrierType::Obstaculo));
    }

    #[test]
    fn test_image_url_null_vs_absent() {
        let absent: UpdateReportRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(absent.image_url, None);

        let cleared: UpdateReportRequest =
            serde_json::from_value(json!({ "imageUrl": null })).unwrap();
        assert_eq!(cleared.image_url, Some(None));

        let replaced: UpdateReportRequest =
            serde_json::from_value(json!({ "imageUrl": "/uploads/a.png" })).unwrap();
        assert_eq!(replaced.image_url, Some(Some("/uploads/a.png".to_string())));
    }

    #[test]
    fn test_coordinates_required() {
        assert!(validate_coordinates(None, Some(1.0)).is_err());
        assert!(validate_coordinates(Some(f64::NAN), Some(1.0)).is_err());
        assert!(validate_coordinates(Some(91.0), Some(1.0)).is_err());
        assert_eq!(
            validate_coordinates(Some(41.1189), Some(1.2459)).unwrap(),
            (41.1189, 1.2459)
        );
    }

    #[test]
    fn test_default_description() {
        assert_eq!(
            default_description(Some(BarrierType::Rampa)),
            "Incidencia de tipo rampa"
        );
        assert_eq!(default_description(None), "Incidencia de tipo escalera");
    }
}

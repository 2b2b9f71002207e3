//! Map page endpoints. Each sidebar transition answers with the resulting
//! sidebar and preview marker.

use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use super::{success, ApiResult, AppJson};
use crate::errors::AppError;
use crate::map::{MapView, Marker, PreviewMarker, Sidebar};
use crate::models::validate_coordinates;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct MapClickRequest {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SidebarResponse {
    pub sidebar: Sidebar,
    pub preview: Option<PreviewMarker>,
}

impl From<&MapView> for SidebarResponse {
    fn from(view: &MapView) -> Self {
        Self {
            sidebar: view.sidebar().clone(),
            preview: view.preview(),
        }
    }
}

/// GET /api/map/markers - Markers for every placeable report.
pub async fn list_markers(State(state): State<AppState>) -> ApiResult<Vec<Marker>> {
    let view = MapView::new(state.repo.list_reports().await?);
    success(view.markers())
}

/// POST /api/map/click - Open the new-report sidebar at a point.
pub async fn map_click(
    State(state): State<AppState>,
    AppJson(request): AppJson<MapClickRequest>,
) -> ApiResult<SidebarResponse> {
    let (lat, lng) = validate_coordinates(request.lat, request.lng)?;
    let street = state.geocoder.reverse(lat, lng).await;

    let mut view = MapView::default();
    view.click(lat, lng, street);

    success(SidebarResponse::from(&view))
}

/// GET /api/map/reports/:id/edit - Open the sidebar on an existing report.
pub async fn edit_sidebar(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<SidebarResponse> {
    let report = state
        .repo
        .get_report(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))?;

    let mut view = MapView::new(vec![report.clone()]);
    view.edit(&report);

    success(SidebarResponse::from(&view))
}

/// POST /api/map/close - Close the sidebar, dropping any preview marker.
pub async fn close_sidebar() -> ApiResult<SidebarResponse> {
    let mut view = MapView::default();
    view.close();
    success(SidebarResponse::from(&view))
}

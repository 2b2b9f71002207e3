//! Geocoding proxy endpoints.

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use super::{success, ApiResult};
use crate::geocode::GeoPoint;
use crate::models::validate_coordinates;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReverseQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ReverseResponse {
    pub street: String,
}

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /api/geocode/reverse - Street name at a point, empty when unknown.
pub async fn reverse_geocode(
    State(state): State<AppState>,
    Query(query): Query<ReverseQuery>,
) -> ApiResult<ReverseResponse> {
    let (lat, lng) = validate_coordinates(query.lat, query.lng)?;
    success(ReverseResponse {
        street: state.geocoder.reverse(lat, lng).await,
    })
}

/// GET /api/geocode/search - First location matching free text, or null.
pub async fn search_location(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> ApiResult<Option<GeoPoint>> {
    success(state.geocoder.search(&query.q).await)
}

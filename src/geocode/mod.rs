//! Geocoding against a Nominatim-compatible HTTP API.
//!
//! Lookups are best effort: any transport or decoding failure is logged and
//! collapses to an empty result.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;

const USER_AGENT: &str = concat!("komuni-backend/", env!("CARGO_PKG_VERSION"));

/// Address components tried in order when naming a street.
const STREET_FIELDS: [&str; 7] = [
    "road",
    "pedestrian",
    "footway",
    "path",
    "cycleway",
    "neighbourhood",
    "suburb",
];

/// A place found by forward search.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

#[derive(Clone)]
pub struct Geocoder {
    client: Client,
    base_url: String,
}

impl Geocoder {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Street name at a point, or an empty string.
    pub async fn reverse(&self, lat: f64, lng: f64) -> String {
        match self.fetch_reverse(lat, lng).await {
            Ok(body) => street_from_reverse(&body),
            Err(e) => {
                tracing::warn!(lat, lng, "Reverse geocoding failed: {}", e);
                String::new()
            }
        }
    }

    async fn fetch_reverse(&self, lat: f64, lng: f64) -> Result<Value, reqwest::Error> {
        self.client
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lng.to_string()),
                ("format", "json".to_string()),
                ("accept-language", "es".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// First match for a free-text location, if any.
    pub async fn search(&self, query: &str) -> Option<GeoPoint> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("format", "json"), ("q", query), ("limit", "1")])
            .send()
            .await
            .and_then(|r| r.error_for_status());

        let hits: Vec<SearchHit> = match response {
            Ok(r) => match r.json().await {
                Ok(hits) => hits,
                Err(e) => {
                    tracing::warn!(query, "Unreadable geocoder response: {}", e);
                    return None;
                }
            },
            Err(e) => {
                tracing::warn!(query, "Location search failed: {}", e);
                return None;
            }
        };

        hits.into_iter().find_map(point_from_hit)
    }
}

/// Pick the street name out of a reverse lookup body.
fn street_from_reverse(body: &Value) -> String {
    let Some(address) = body.get("address") else {
        return String::new();
    };

    STREET_FIELDS
        .iter()
        .filter_map(|field| address.get(*field).and_then(Value::as_str))
        .find(|name| !name.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn point_from_hit(hit: SearchHit) -> Option<GeoPoint> {
    let lat: f64 = hit.lat.trim().parse().ok()?;
    let lng: f64 = hit.lon.trim().parse().ok()?;
    if !lat.is_finite() || !lng.is_finite() {
        return None;
    }

    Some(GeoPoint {
        lat,
        lng,
        display_name: hit.display_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_street_field_priority() {
        let body = json!({
            "address": { "suburb": "Eixample", "footway": "Passatge X", "road": "" }
        });
        assert_eq!(street_from_reverse(&body), "Passatge X");

        let body = json!({ "address": { "road": "Carrer Major", "suburb": "Centre" } });
        assert_eq!(street_from_reverse(&body), "Carrer Major");

        assert_eq!(street_from_reverse(&json!({ "error": "Unable to geocode" })), "");
        assert_eq!(street_from_reverse(&json!({ "address": { "city": "Reus" } })), "");
    }

    #[test]
    fn test_search_hit_parsing() {
        let hit = SearchHit {
            lat: "41.1189".to_string(),
            lon: "1.2459".to_string(),
            display_name: "Tarragona".to_string(),
        };
        let point = point_from_hit(hit).unwrap();
        assert_eq!(point.lat, 41.1189);
        assert_eq!(point.lng, 1.2459);

        let bad = SearchHit {
            lat: "north".to_string(),
            lon: "1.0".to_string(),
            display_name: String::new(),
        };
        assert!(point_from_hit(bad).is_none());
    }

    #[tokio::test]
    async fn test_unreachable_geocoder_is_empty() {
        let geocoder = Geocoder::new("http://127.0.0.1:9", 1).unwrap();
        assert_eq!(geocoder.reverse(41.1, 1.2).await, "");
        assert_eq!(geocoder.search("Tarragona").await, None);
        assert_eq!(geocoder.search("   ").await, None);
    }
}

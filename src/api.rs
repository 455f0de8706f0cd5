//! Transport-agnostic request handler for the nearby endpoint.
//!
//! `POST` runs a search from a JSON body, `GET` answers a health check, and
//! every other method is rejected. The handler never fails: every outcome is
//! an [`ApiResponse`] with a status code and a JSON body.

use crate::error::NearbyError;
use crate::filter::AttributeFilter;
use crate::search::{NearbyQuery, ProximitySearch, SearchResponse, SearchStats};
use crate::store::RangeStore;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};

pub const HEALTH_MESSAGE: &str = "Nearby API is running";

/// Status code and JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: 400,
            body: json!({ "error": message.into() }),
        }
    }

    pub fn method_not_allowed() -> Self {
        Self {
            status: 405,
            body: json!({ "error": "Method not allowed" }),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            status: 500,
            body: json!({ "error": "Internal error", "message": message.into() }),
        }
    }

    fn from_error(error: &NearbyError) -> Self {
        if error.is_client_error() {
            Self::bad_request(error.to_string())
        } else {
            Self::internal_error(error.to_string())
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Search request body.
///
/// Coordinates and radius are kept raw so that a wrongly typed value can be
/// told apart from an absent one:
///
/// - `lat` and `lng` must be JSON numbers.
/// - `radiusKm` falls back to the configured default only when the field is
///   absent. An explicit `null` is rejected, and a numeric string such as
///   `"5"` is read as a number.
/// - `hasDelivery`, `isOpen` and `category` with the wrong type are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyRequest {
    #[serde(default)]
    pub lat: Option<Value>,
    #[serde(default)]
    pub lng: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub radius_km: Option<Value>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub has_delivery: Option<bool>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_open: Option<bool>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
}

impl NearbyRequest {
    /// Build a query, or a client error message.
    pub fn into_query(self, default_radius_km: f64) -> Result<NearbyQuery, String> {
        let (Some(lat), Some(lng)) = (
            self.lat.as_ref().and_then(Value::as_f64),
            self.lng.as_ref().and_then(Value::as_f64),
        ) else {
            return Err("lat and lng must be numbers".to_string());
        };

        let radius_km = match self.radius_km {
            None => default_radius_km,
            Some(value) => {
                numeric(&value).ok_or_else(|| "radiusKm must be a number".to_string())?
            }
        };

        let mut filter = AttributeFilter::new();
        filter.has_delivery = self.has_delivery;
        filter.is_open = self.is_open;
        filter.category = self.category;

        Ok(NearbyQuery::new(lat, lng, radius_km).with_filter(filter))
    }
}

/// A JSON number, or a string holding one.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Keeps an explicit `null` as `Some(Value::Null)`; only an absent field is `None`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(Value::deserialize(deserializer)?.as_bool())
}

fn lenient_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Handle one request.
pub async fn handle<S: RangeStore>(
    search: &ProximitySearch<S>,
    method: &str,
    body: &Value,
) -> ApiResponse {
    if method.eq_ignore_ascii_case("POST") {
        nearby(search, body).await
    } else if method.eq_ignore_ascii_case("GET") {
        ApiResponse::ok(json!({ "ok": true, "message": HEALTH_MESSAGE }))
    } else {
        ApiResponse::method_not_allowed()
    }
}

async fn nearby<S: RangeStore>(search: &ProximitySearch<S>, body: &Value) -> ApiResponse {
    let request = match NearbyRequest::deserialize(body) {
        Ok(request) => request,
        Err(e) => return ApiResponse::bad_request(format!("Malformed request body: {}", e)),
    };
    let query = match request.into_query(search.config().default_radius_km) {
        Ok(query) => query,
        Err(message) => return ApiResponse::bad_request(message),
    };

    match search.search(&query).await {
        Ok(response) => match render(&response, search.config().include_timing) {
            Ok(body) => ApiResponse::ok(body),
            Err(e) => {
                log::error!("failed to encode nearby response: {}", e);
                ApiResponse::from_error(&e)
            }
        },
        Err(e) => {
            if !e.is_client_error() {
                log::error!("nearby search failed: {}", e);
            }
            ApiResponse::from_error(&e)
        }
    }
}

fn render(response: &SearchResponse, include_timing: bool) -> Result<Value, NearbyError> {
    let businesses = serde_json::to_value(&response.businesses)?;
    if include_timing {
        Ok(json!({ "businesses": businesses, "meta": meta(&response.stats) }))
    } else {
        Ok(json!({ "businesses": businesses }))
    }
}

fn meta(stats: &SearchStats) -> Value {
    let passes: Vec<Value> = stats
        .passes
        .iter()
        .map(|pass| {
            json!({
                "radiusMeters": pass.radius_meters,
                "bounds": pass.bounds,
                "rowsFetched": pass.rows_fetched,
                "rowsSkipped": pass.rows_skipped,
                "candidatesKept": pass.candidates_kept,
            })
        })
        .collect();
    json!({
        "strategy": stats.strategy,
        "elapsedMs": stats.elapsed.as_secs_f64() * 1000.0,
        "passes": passes,
        "candidatesExamined": stats.candidates_examined,
        "resultsReturned": stats.results_returned,
    })
}

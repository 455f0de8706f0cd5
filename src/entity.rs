//! Typed view of a stored business record.

use crate::error::SkipReason;
use crate::store::Document;
use crate::validation::is_valid_coordinate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A geocoded business as returned by proximity search.
///
/// Decoded leniently from a [`Document`]: absent display fields fall back to
/// empty values, while coordinates and the geohash are required for the record
/// to take part in a search at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Business {
    pub id: String,
    /// Same as `id`, kept for clients that read either.
    pub business_id: String,
    pub owner_id: String,
    pub name: String,
    pub description: String,
    pub direction: String,
    pub phone: String,
    pub state: bool,
    pub date: Option<Value>,
    pub logo_url: Option<String>,
    pub is_open: bool,
    pub has_delivery: bool,
    pub delivery_price: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geohash: Option<String>,
    /// Category tags, either `{ "name": ... }` objects or plain strings.
    pub categories: Vec<Value>,
    pub schedule: Vec<Value>,
    pub address_notes: Option<String>,
    pub bank: String,
    pub phone_payment: String,
    pub id_card_payment: String,
}

impl Default for Business {
    fn default() -> Self {
        Self {
            id: String::new(),
            business_id: String::new(),
            owner_id: String::new(),
            name: String::new(),
            description: String::new(),
            direction: String::new(),
            phone: String::new(),
            state: true,
            date: None,
            logo_url: None,
            is_open: false,
            has_delivery: false,
            delivery_price: 0.0,
            latitude: None,
            longitude: None,
            geohash: None,
            categories: Vec::new(),
            schedule: Vec::new(),
            address_notes: None,
            bank: String::new(),
            phone_payment: String::new(),
            id_card_payment: String::new(),
        }
    }
}

impl Business {
    /// Decode a stored document, rejecting records that cannot be located.
    pub fn from_document(doc: &Document, geohash_field: &str) -> Result<Self, SkipReason> {
        let data = &doc.data;

        let (latitude, longitude) = match (data.get("latitude"), data.get("longitude")) {
            (None | Some(Value::Null), _) | (_, None | Some(Value::Null)) => {
                return Err(SkipReason::MissingCoordinates);
            }
            (Some(lat), Some(lng)) => match (lat.as_f64(), lng.as_f64()) {
                (Some(lat), Some(lng)) if is_valid_coordinate(lat, lng) => (lat, lng),
                _ => return Err(SkipReason::InvalidCoordinates),
            },
        };

        let geohash = match data.get(geohash_field) {
            Some(Value::String(hash)) if !hash.is_empty() => hash.clone(),
            Some(Value::Null) | None => return Err(SkipReason::MissingGeohash),
            Some(Value::String(_)) => return Err(SkipReason::MissingGeohash),
            Some(_) => return Err(SkipReason::MalformedDocument),
        };

        Ok(Self {
            id: doc.id.clone(),
            business_id: doc.id.clone(),
            owner_id: string_field(data, "ownerId"),
            name: string_field(data, "name"),
            description: string_field(data, "description"),
            direction: string_field(data, "direction"),
            phone: string_field(data, "phone"),
            state: match data.get("state") {
                None | Some(Value::Null) => true,
                Some(value) => truthy(value),
            },
            date: data.get("date").filter(|v| truthy(v)).cloned(),
            logo_url: optional_string_field(data, "logoUrl"),
            is_open: data.get("isOpen").is_some_and(truthy),
            has_delivery: data.get("hasDelivery").is_some_and(truthy),
            delivery_price: data.get("deliveryPrice").map_or(0.0, number_or_numeric_string),
            latitude: Some(latitude),
            longitude: Some(longitude),
            geohash: Some(geohash),
            categories: array_field(data, "categories"),
            schedule: array_field(data, "schedule"),
            address_notes: optional_string_field(data, "addressNotes"),
            bank: string_field(data, "bank"),
            phone_payment: string_field(data, "phonePayment"),
            id_card_payment: string_field(data, "idCardPayment"),
        })
    }

    /// Names of the category tags, in stored order.
    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().filter_map(|category| match category {
            Value::String(name) => Some(name.as_str()),
            Value::Object(fields) => fields.get("name").and_then(Value::as_str),
            _ => None,
        })
    }
}

/// A business annotated with its rounded distance from the search center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyBusiness {
    #[serde(flatten)]
    pub business: Business,
    pub distance_meters: i64,
}

/// Truthiness of a loosely typed field: `false`, `0`, `""` and `null` are false.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn string_field(data: &Map<String, Value>, key: &str) -> String {
    optional_string_field(data, key).unwrap_or_default()
}

fn optional_string_field(data: &Map<String, Value>, key: &str) -> Option<String> {
    match data.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn array_field(data: &Map<String, Value>, key: &str) -> Vec<Value> {
    match data.get(key) {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

fn number_or_numeric_string(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite()).unwrap_or(0.0)
}

//! Geohash proximity search over stores that only support one-dimensional
//! range queries.
//!
//! ```rust
//! use nearby::{AttributeFilter, MemoryStore, NearbyQuery, ProximitySearch, SearchConfig};
//! use nearby::store::Document;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build()?.block_on(async {
//! let store = MemoryStore::new();
//! let geohash = nearby::GeoKeyCodec::default().encode(10.01, -66.0)?;
//! store.insert("businesses", Document::from_value("p1", json!({
//!     "name": "Pizzeria",
//!     "latitude": 10.01,
//!     "longitude": -66.0,
//!     "geohash": geohash,
//!     "state": true,
//!     "categories": [{ "name": "pizza" }],
//! }))?);
//!
//! let search = ProximitySearch::new(Arc::new(store), SearchConfig::default())?;
//! let query = NearbyQuery::new(10.0, -66.0, 5.0)
//!     .with_filter(AttributeFilter::new().with_category("pizza"));
//! let response = search.search(&query).await?;
//! assert_eq!(response.businesses[0].distance_meters, 1112);
//! # Ok::<(), nearby::NearbyError>(())
//! # })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod api;
pub mod config;
pub mod distance;
pub mod entity;
pub mod error;
pub mod executor;
pub mod filter;
pub mod geokey;
pub mod merge;
pub mod rank;
pub mod search;
pub mod store;
pub mod validation;

pub use error::{ErrorKind, NearbyError, Result, SkipReason};

pub use geo::Point;

pub use config::{PassStrategy, SearchConfig};

pub use geokey::{Bound, Bounds, GeoKeyCodec};

pub use distance::{EARTH_RADIUS_METERS, distance_between, haversine_meters};

pub use entity::{Business, NearbyBusiness};

pub use filter::AttributeFilter;

pub use merge::{Candidate, MergeSet};

pub use search::{NearbyQuery, PassStats, ProximitySearch, SearchResponse, SearchStats};

pub use store::{Document, MemoryStore, RangeQuery, RangeStore, StoreStats};

pub use api::{ApiResponse, NearbyRequest};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{NearbyError, ProximitySearch, Result, SearchConfig};

    pub use geo::Point;

    pub use crate::{AttributeFilter, Business, NearbyBusiness, NearbyQuery};

    pub use crate::{MemoryStore, RangeStore};

    pub use std::sync::Arc;
}

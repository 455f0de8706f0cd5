//! Search configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How many passes a search runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassStrategy {
    /// One pass at the requested radius.
    SinglePass,
    /// A pass at an inflated radius followed by a pass at a reduced radius,
    /// merged by minimum distance.
    WideNarrow,
}

/// Configuration for a [`ProximitySearch`](crate::search::ProximitySearch).
///
/// # Examples
///
/// ```rust
/// use nearby::SearchConfig;
///
/// let config = SearchConfig::default();
/// assert_eq!(config.max_radius_km, 100.0);
///
/// let json = r#"{
///     "collection": "places",
///     "max_radius_km": 50.0,
///     "two_pass_threshold_km": null
/// }"#;
/// let config = SearchConfig::from_json(json).unwrap();
/// assert_eq!(config.collection, "places");
/// assert!(config.two_pass_threshold_km.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Collection holding the indexed entities
    #[serde(default = "SearchConfig::default_collection")]
    pub collection: String,

    /// Field the store orders by for range queries
    #[serde(default = "SearchConfig::default_geohash_field")]
    pub geohash_field: String,

    /// Length of the stored geohash keys (1-12, default: 10)
    #[serde(default = "SearchConfig::default_geohash_precision")]
    pub geohash_precision: usize,

    /// Largest accepted radius in kilometers
    #[serde(default = "SearchConfig::default_max_radius_km")]
    pub max_radius_km: f64,

    /// Radius used by the endpoint adapter when the request omits one
    #[serde(default = "SearchConfig::default_radius_km")]
    pub default_radius_km: f64,

    /// Radii strictly above this run the wide/narrow strategy (None disables it)
    #[serde(default = "SearchConfig::default_two_pass_threshold_km")]
    pub two_pass_threshold_km: Option<f64>,

    /// Fraction the wide pass grows and the narrow pass shrinks the radius by
    #[serde(default = "SearchConfig::default_coverage_margin")]
    pub coverage_margin: f64,

    /// Deadline for a whole search, in seconds
    #[serde(default = "SearchConfig::default_query_timeout_seconds")]
    pub query_timeout_seconds: f64,

    /// Only return entities whose `state` flag is true
    #[serde(default = "SearchConfig::default_require_active")]
    pub require_active: bool,

    /// Attach timing metadata to endpoint responses
    #[serde(default)]
    pub include_timing: bool,
}

impl SearchConfig {
    fn default_collection() -> String {
        "businesses".to_string()
    }

    fn default_geohash_field() -> String {
        "geohash".to_string()
    }

    const fn default_geohash_precision() -> usize {
        10
    }

    const fn default_max_radius_km() -> f64 {
        100.0
    }

    const fn default_radius_km() -> f64 {
        10.0
    }

    const fn default_two_pass_threshold_km() -> Option<f64> {
        Some(5.0)
    }

    const fn default_coverage_margin() -> f64 {
        0.2
    }

    const fn default_query_timeout_seconds() -> f64 {
        10.0
    }

    const fn default_require_active() -> bool {
        true
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_geohash_precision(mut self, precision: usize) -> Self {
        assert!(
            (1..=12).contains(&precision),
            "Geohash precision must be between 1 and 12"
        );
        self.geohash_precision = precision;
        self
    }

    pub fn with_max_radius_km(mut self, max_radius_km: f64) -> Self {
        self.max_radius_km = max_radius_km;
        self
    }

    pub fn with_two_pass_threshold_km(mut self, threshold_km: Option<f64>) -> Self {
        self.two_pass_threshold_km = threshold_km;
        self
    }

    pub fn with_coverage_margin(mut self, margin: f64) -> Self {
        self.coverage_margin = margin;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout_seconds = timeout.as_secs_f64();
        self
    }

    pub fn with_require_active(mut self, require_active: bool) -> Self {
        self.require_active = require_active;
        self
    }

    pub fn with_timing(mut self, include_timing: bool) -> Self {
        self.include_timing = include_timing;
        self
    }

    /// Deadline for one search.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.query_timeout_seconds)
    }

    /// Strategy used for a radius.
    pub fn strategy_for(&self, radius_km: f64) -> PassStrategy {
        match self.two_pass_threshold_km {
            Some(threshold) if radius_km > threshold => PassStrategy::WideNarrow,
            _ => PassStrategy::SinglePass,
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.collection.trim().is_empty() {
            return Err("Collection name must not be empty".to_string());
        }

        if self.geohash_field.trim().is_empty() {
            return Err("Geohash field name must not be empty".to_string());
        }

        if !(1..=12).contains(&self.geohash_precision) {
            return Err("Geohash precision must be between 1 and 12".to_string());
        }

        if !self.max_radius_km.is_finite() || self.max_radius_km <= 0.0 {
            return Err("Maximum radius must be a positive finite number".to_string());
        }

        if !self.default_radius_km.is_finite()
            || self.default_radius_km <= 0.0
            || self.default_radius_km > self.max_radius_km
        {
            return Err(format!(
                "Default radius must be in (0, {}]",
                self.max_radius_km
            ));
        }

        if let Some(threshold) = self.two_pass_threshold_km
            && (!threshold.is_finite() || threshold < 0.0)
        {
            return Err("Two-pass threshold must be a non-negative finite number".to_string());
        }

        if !self.coverage_margin.is_finite() || !(0.0..1.0).contains(&self.coverage_margin) {
            return Err("Coverage margin must be in [0, 1)".to_string());
        }

        if !self.query_timeout_seconds.is_finite() || self.query_timeout_seconds <= 0.0 {
            return Err("Query timeout must be positive".to_string());
        }
        if Duration::try_from_secs_f64(self.query_timeout_seconds).is_err() {
            return Err("Query timeout is too large".to_string());
        }

        Ok(())
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        use serde::de::Error;
        let config: SearchConfig = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load configuration from TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        use serde::de::Error;
        let config: SearchConfig = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            collection: Self::default_collection(),
            geohash_field: Self::default_geohash_field(),
            geohash_precision: Self::default_geohash_precision(),
            max_radius_km: Self::default_max_radius_km(),
            default_radius_km: Self::default_radius_km(),
            two_pass_threshold_km: Self::default_two_pass_threshold_km(),
            coverage_margin: Self::default_coverage_margin(),
            query_timeout_seconds: Self::default_query_timeout_seconds(),
            require_active: Self::default_require_active(),
            include_timing: false,
        }
    }
}

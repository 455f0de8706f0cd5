//! Geohash keys and the key intervals that cover a search disc.
//!
//! Entities are stored under an order-preserving geohash key. A disc around a
//! center point is turned into a handful of contiguous key intervals
//! ([`Bound`]s) that a store can answer with plain range scans:
//!
//! ```text
//! 1. Pick a bit depth whose cells are at least as large as the radius
//! 2. Sample the center and the eight edge/corner points of the radius box
//! 3. Each sample's cell at that depth becomes a [prefix, next prefix] interval
//! 4. Sort, deduplicate and coalesce adjacent intervals
//! ```
//!
//! The union of the intervals always contains every point within the radius.
//! It usually contains more (cells are rectangles, the query is a disc), so
//! results must be refined by exact distance afterwards.

use crate::error::{NearbyError, Result};
use geo::Point;
use smallvec::SmallVec;
use std::f64::consts::PI;

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";
const BITS_PER_CHAR: usize = 5;
const MAX_BITS: usize = 22 * BITS_PER_CHAR;

const METERS_PER_DEGREE_LATITUDE: f64 = 110_574.0;
const EARTH_EQUATORIAL_RADIUS: f64 = 6_378_137.0;
const EARTH_ECCENTRICITY_SQUARED: f64 = 0.006_694_478_197_99;
const EPSILON: f64 = 1e-12;

/// Radius inflation applied before computing bounds. The degree conversions
/// here are ellipsoidal while refinement is spherical; at the equator one
/// degree of longitude differs by about 0.1% between the two.
const BOUND_SLACK: f64 = 1.01;

/// Sorts after every geohash character.
pub const KEY_SENTINEL: char = '~';

/// An inclusive interval `[low, high]` of geohash keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bound {
    pub low: String,
    pub high: String,
}

impl Bound {
    pub fn new(low: impl Into<String>, high: impl Into<String>) -> Self {
        Self {
            low: low.into(),
            high: high.into(),
        }
    }

    /// The interval holding every valid geohash key.
    pub fn full() -> Self {
        Self::new("0", KEY_SENTINEL.to_string())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.low.as_str() <= key && key <= self.high.as_str()
    }
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.low, self.high)
    }
}

/// Bounds for one disc. Never more than nine.
pub type Bounds = SmallVec<[Bound; 9]>;

/// Encodes coordinates into fixed-length geohash keys and computes key
/// intervals for radius searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoKeyCodec {
    precision: usize,
}

impl GeoKeyCodec {
    /// Create a codec producing keys of `precision` characters (1-12).
    pub fn new(precision: usize) -> Result<Self> {
        if !(1..=12).contains(&precision) {
            return Err(NearbyError::InvalidConfig(format!(
                "Geohash precision must be between 1 and 12, got: {}",
                precision
            )));
        }
        Ok(Self { precision })
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    /// Encode a latitude/longitude pair.
    ///
    /// ```rust
    /// use nearby::GeoKeyCodec;
    ///
    /// let codec = GeoKeyCodec::new(11).unwrap();
    /// assert_eq!(codec.encode(57.64911, 10.40744).unwrap(), "u4pruydqqvj");
    /// ```
    pub fn encode(&self, lat: f64, lng: f64) -> Result<String> {
        geohash::encode(geohash::Coord { x: lng, y: lat }, self.precision).map_err(|e| {
            NearbyError::InvalidInput(format!("Cannot encode ({}, {}): {}", lat, lng, e))
        })
    }

    /// Center of the cell a key names, as a point (x = longitude).
    pub fn decode(&self, key: &str) -> Result<Point> {
        let (coord, _, _) = geohash::decode(key)
            .map_err(|e| NearbyError::InvalidInput(format!("Invalid geohash {:?}: {}", key, e)))?;
        Ok(Point::new(coord.x, coord.y))
    }

    /// Key intervals whose union contains every point within `radius_meters`
    /// of `center`.
    ///
    /// Always returns at least one bound. Discs that reach a pole, or that span
    /// every longitude, get the whole key space.
    ///
    /// ```rust
    /// use nearby::GeoKeyCodec;
    /// use geo::Point;
    ///
    /// let codec = GeoKeyCodec::new(10).unwrap();
    /// let center = Point::new(-66.0, 10.0);
    /// let bounds = codec.bounds_for(&center, 5_000.0);
    /// assert!(!bounds.is_empty() && bounds.len() <= 9);
    ///
    /// let key = codec.encode(10.01, -66.0).unwrap();
    /// assert!(bounds.iter().any(|b| b.contains(&key)));
    /// ```
    pub fn bounds_for(&self, center: &Point, radius_meters: f64) -> Bounds {
        let radius = radius_meters.max(0.0) * BOUND_SLACK;
        let (lat, lng) = (center.y(), center.x());

        let lat_delta = radius / METERS_PER_DEGREE_LATITUDE;
        let north = lat + lat_delta;
        let south = lat - lat_delta;
        if north >= 90.0 || south <= -90.0 {
            return full_bounds();
        }

        let lng_delta_north = meters_to_longitude_degrees(radius, north);
        let lng_delta_south = meters_to_longitude_degrees(radius, south);
        let lng_delta = lng_delta_north.max(lng_delta_south);
        if lng_delta >= 180.0 {
            return full_bounds();
        }

        let bits =
            bounding_box_bits(lat_delta, lng_delta).clamp(1, self.precision * BITS_PER_CHAR);
        let key_len = bits.div_ceil(BITS_PER_CHAR);

        let mut bounds: Vec<Bound> = Vec::with_capacity(9);
        for sample_lat in [lat, north, south] {
            for sample_lng in [
                lng,
                wrap_longitude(lng - lng_delta),
                wrap_longitude(lng + lng_delta),
            ] {
                let sample = geohash::Coord {
                    x: sample_lng,
                    y: sample_lat,
                };
                match geohash::encode(sample, key_len) {
                    Ok(hash) => bounds.push(prefix_bound(&hash, bits)),
                    Err(e) => {
                        log::warn!(
                            "geohash sample ({}, {}) failed, widening to full key space: {}",
                            sample_lat,
                            sample_lng,
                            e
                        );
                        return full_bounds();
                    }
                }
            }
        }

        let bounds = coalesce(bounds);
        log::trace!(
            "{} bound(s) at {} bits for radius {:.1} m around ({}, {})",
            bounds.len(),
            bits,
            radius_meters,
            lat,
            lng
        );
        bounds
    }
}

impl Default for GeoKeyCodec {
    fn default() -> Self {
        Self { precision: 10 }
    }
}

fn full_bounds() -> Bounds {
    let mut bounds = Bounds::new();
    bounds.push(Bound::full());
    bounds
}

/// Degrees of longitude spanned by `distance` meters at `latitude`.
fn meters_to_longitude_degrees(distance: f64, latitude: f64) -> f64 {
    let radians = latitude.to_radians();
    let num = radians.cos() * EARTH_EQUATORIAL_RADIUS * PI / 180.0;
    let denom = 1.0 / (1.0 - EARTH_ECCENTRICITY_SQUARED * radians.sin().powi(2)).sqrt();
    let delta_deg = num * denom;
    if delta_deg < EPSILON {
        if distance > 0.0 { 360.0 } else { 0.0 }
    } else {
        (distance / delta_deg).min(360.0)
    }
}

/// Number of interleaved bits (longitude first) whose cells are at least
/// `lat_delta` degrees tall and `lng_delta` degrees wide.
fn bounding_box_bits(lat_delta: f64, lng_delta: f64) -> usize {
    let lat_bits = cell_bits(180.0, lat_delta) * 2;
    let lng_bits = (cell_bits(360.0, lng_delta) * 2).saturating_sub(1).max(1);
    lat_bits.min(lng_bits).min(MAX_BITS)
}

/// Largest `k` with `span / 2^k >= delta`.
fn cell_bits(span: f64, delta: f64) -> usize {
    if delta <= 0.0 {
        return MAX_BITS;
    }
    let bits = (span / delta).log2().floor();
    if bits <= 0.0 {
        0
    } else {
        (bits as usize).min(MAX_BITS)
    }
}

fn wrap_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) {
        return longitude;
    }
    let adjusted = longitude + 180.0;
    if adjusted > 0.0 {
        (adjusted % 360.0) - 180.0
    } else {
        180.0 - (-adjusted % 360.0)
    }
}

/// The interval of keys sharing the first `bits` bits of `hash`.
fn prefix_bound(hash: &str, bits: usize) -> Bound {
    let key_len = bits.div_ceil(BITS_PER_CHAR);
    if hash.len() < key_len {
        return Bound::new(hash, format!("{}{}", hash, KEY_SENTINEL));
    }

    let (base, last) = hash[..key_len].split_at(key_len - 1);
    let Some(last_value) = last
        .bytes()
        .next()
        .and_then(|c| BASE32.iter().position(|b| *b == c))
    else {
        return Bound::new(base, format!("{}{}", base, KEY_SENTINEL));
    };

    let significant_bits = bits - base.len() * BITS_PER_CHAR;
    let unused_bits = BITS_PER_CHAR - significant_bits;
    let start = (last_value >> unused_bits) << unused_bits;
    let end = start + (1 << unused_bits);

    let low = format!("{}{}", base, BASE32[start] as char);
    let high = if end > 31 {
        format!("{}{}", base, KEY_SENTINEL)
    } else {
        format!("{}{}", base, BASE32[end] as char)
    };
    Bound { low, high }
}

/// Sort, drop duplicates and join intervals that touch.
fn coalesce(mut bounds: Vec<Bound>) -> Bounds {
    bounds.sort();
    bounds.dedup();

    let mut merged = Bounds::new();
    for bound in bounds {
        match merged.last_mut() {
            Some(last) if bound.low <= last.high => {
                if bound.high > last.high {
                    last.high = bound.high;
                }
            }
            _ => merged.push(bound),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::haversine_meters;

    /// Point at `distance` meters from (lat, lng) along `bearing` degrees, on
    /// the same sphere the refiner uses.
    fn destination(lat: f64, lng: f64, distance: f64, bearing: f64) -> (f64, f64) {
        let delta = distance / crate::distance::EARTH_RADIUS_METERS;
        let theta = bearing.to_radians();
        let phi1 = lat.to_radians();
        let lambda1 = lng.to_radians();
        let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
        let lambda2 = lambda1
            + (theta.sin() * delta.sin() * phi1.cos())
                .atan2(delta.cos() - phi1.sin() * phi2.sin());
        (phi2.to_degrees(), wrap_longitude(lambda2.to_degrees()))
    }

    fn assert_covered(codec: &GeoKeyCodec, lat: f64, lng: f64, radius: f64) {
        let center = Point::new(lng, lat);
        let bounds = codec.bounds_for(&center, radius);
        assert!(!bounds.is_empty());

        for step in 0..72 {
            let bearing = step as f64 * 5.0;
            for fraction in [0.0, 0.25, 0.5, 0.75, 0.9, 0.999] {
                let (plat, plng) = destination(lat, lng, radius * fraction, bearing);
                assert!(haversine_meters(lat, lng, plat, plng) <= radius + 1e-6);
                let key = codec.encode(plat, plng).unwrap();
                assert!(
                    bounds.iter().any(|b| b.contains(&key)),
                    "({}, {}) at {:.1} m from ({}, {}) not covered by {:?}",
                    plat,
                    plng,
                    radius * fraction,
                    lat,
                    lng,
                    bounds
                );
            }
        }
    }

    #[test]
    fn test_encode_known_value() {
        let codec = GeoKeyCodec::new(11).unwrap();
        assert_eq!(codec.encode(57.64911, 10.40744).unwrap(), "u4pruydqqvj");
    }

    #[test]
    fn test_encode_invalid() {
        let codec = GeoKeyCodec::default();
        assert!(codec.encode(91.0, 0.0).is_err());
        assert!(codec.encode(0.0, 181.0).is_err());
    }

    #[test]
    fn test_invalid_precision() {
        assert!(GeoKeyCodec::new(0).is_err());
        assert!(GeoKeyCodec::new(13).is_err());
    }

    #[test]
    fn test_decode_near_original() {
        let codec = GeoKeyCodec::default();
        let key = codec.encode(10.4806, -66.9036).unwrap();
        let point = codec.decode(&key).unwrap();
        assert!((point.y() - 10.4806).abs() < 1e-4);
        assert!((point.x() + 66.9036).abs() < 1e-4);
        assert!(codec.decode("not a hash!").is_err());
    }

    #[test]
    fn test_prefix_bound() {
        // 10 bits = two full characters
        assert_eq!(prefix_bound("d6n0abc", 10), Bound::new("d6", "d7"));
        // 12 bits: third character keeps its top 2 bits
        assert_eq!(prefix_bound("d6nk", 12), Bound::new("d6h", "d6s"));
        // last cell of a prefix runs to the sentinel
        assert_eq!(prefix_bound("d6z", 15), Bound::new("d6z", "d6~"));
    }

    #[test]
    fn test_wrap_longitude() {
        assert_eq!(wrap_longitude(10.0), 10.0);
        assert!((wrap_longitude(181.0) + 179.0).abs() < 1e-9);
        assert!((wrap_longitude(-181.0) - 179.0).abs() < 1e-9);
    }

    #[test]
    fn test_coalesce_adjacent() {
        let merged = coalesce(vec![
            Bound::new("d7", "d8"),
            Bound::new("d6", "d7"),
            Bound::new("d6", "d7"),
            Bound::new("e0", "e1"),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], Bound::new("d6", "d8"));
        assert_eq!(merged[1], Bound::new("e0", "e1"));
    }

    #[test]
    fn test_tiny_radius_has_one_bound() {
        let codec = GeoKeyCodec::default();
        let center = Point::new(-66.0, 10.0);
        for radius in [0.0, 1e-6, 0.01, 1.0] {
            let bounds = codec.bounds_for(&center, radius);
            assert!(!bounds.is_empty());
            // never asks for a prefix longer than the stored keys
            assert!(bounds.iter().all(|b| b.low.len() <= codec.precision()));
            let key = codec.encode(10.0, -66.0).unwrap();
            assert!(bounds.iter().any(|b| b.contains(&key)));
        }
    }

    #[test]
    fn test_bounds_are_ordered_and_disjoint() {
        let codec = GeoKeyCodec::default();
        let bounds = codec.bounds_for(&Point::new(-66.0, 10.0), 5_000.0);
        assert!(bounds.len() <= 9);
        for pair in bounds.windows(2) {
            assert!(pair[0].high < pair[1].low);
        }
        for bound in &bounds {
            assert!(bound.low <= bound.high);
        }
    }

    #[test]
    fn test_coverage_mid_latitudes() {
        let codec = GeoKeyCodec::default();
        for radius in [50.0, 1_000.0, 5_000.0, 25_000.0, 100_000.0, 121_200.0] {
            assert_covered(&codec, 10.0, -66.0, radius);
            assert_covered(&codec, 40.7128, -74.0060, radius);
            assert_covered(&codec, -33.8688, 151.2093, radius);
            assert_covered(&codec, 0.0, 0.0, radius);
        }
    }

    #[test]
    fn test_coverage_across_antimeridian() {
        let codec = GeoKeyCodec::default();
        for radius in [500.0, 10_000.0, 100_000.0] {
            assert_covered(&codec, 0.0, 179.999, radius);
            assert_covered(&codec, -17.7, -179.99, radius);
            assert_covered(&codec, 52.0, 180.0, radius);
        }
    }

    #[test]
    fn test_coverage_near_poles() {
        let codec = GeoKeyCodec::default();
        for radius in [1_000.0, 5_000.0, 100_000.0] {
            assert_covered(&codec, 89.99, 10.0, radius);
            assert_covered(&codec, -89.5, -120.0, radius);
            assert_covered(&codec, 78.2, 15.6, radius);
        }
    }

    #[test]
    fn test_pole_gets_full_key_space() {
        let codec = GeoKeyCodec::default();
        let bounds = codec.bounds_for(&Point::new(10.0, 89.99), 5_000.0);
        assert_eq!(bounds.as_slice(), &[Bound::full()]);

        // every longitude at the pole is distance zero from the center
        let at_pole = codec.bounds_for(&Point::new(0.0, 90.0), 0.0);
        assert_eq!(at_pole.as_slice(), &[Bound::full()]);
    }

    #[test]
    fn test_coverage_with_coarse_keys() {
        let codec = GeoKeyCodec::new(4).unwrap();
        assert_covered(&codec, 10.0, -66.0, 2_000.0);
        assert_covered(&codec, 10.0, -66.0, 100.0);
    }
}

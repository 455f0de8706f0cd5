//! Exact great-circle distance used to filter and rank candidates.
//!
//! This is the only distance that is ever compared against a search radius.
//! Geohash cells are only used to decide which rows to read.

use crate::entity::Business;
use crate::validation::is_valid_coordinate;
use geo::Point;

/// Mean Earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Haversine distance in meters between two latitude/longitude pairs.
///
/// ```rust
/// use nearby::distance::haversine_meters;
///
/// let d = haversine_meters(10.0, -66.0, 10.01, -66.0);
/// assert_eq!(d.round(), 1112.0);
/// ```
pub fn haversine_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lng2 - lng1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Distance between two points (x = longitude, y = latitude).
pub fn distance_between(a: &Point, b: &Point) -> f64 {
    haversine_meters(a.y(), a.x(), b.y(), b.x())
}

/// Exact distance from `center` to a business, or `None` when the business
/// has no usable coordinates.
pub fn refine(center: &Point, business: &Business) -> Option<f64> {
    let (lat, lng) = (business.latitude?, business.longitude?);
    if !is_valid_coordinate(lat, lng) {
        return None;
    }
    Some(haversine_meters(center.y(), center.x(), lat, lng))
}

/// Exact distance, kept only when it is within `cutoff_meters`.
pub fn refine_within(center: &Point, business: &Business, cutoff_meters: f64) -> Option<f64> {
    refine(center, business).filter(|distance| *distance <= cutoff_meters)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn business_at(lat: Option<f64>, lng: Option<f64>) -> Business {
        Business {
            id: "b1".into(),
            latitude: lat,
            longitude: lng,
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_distance() {
        assert_eq!(haversine_meters(10.0, -66.0, 10.0, -66.0), 0.0);
    }

    #[test]
    fn test_known_distances() {
        // 0.01 degrees of latitude
        let d = haversine_meters(10.0, -66.0, 10.01, -66.0);
        assert!((d - 1111.95).abs() < 0.1);

        // NYC to LA, ~3,936 km on a 6,371 km sphere
        let d = distance_between(&Point::new(-74.0060, 40.7128), &Point::new(-118.2437, 34.0522));
        assert!(d > 3_900_000.0 && d < 4_000_000.0);
    }

    #[test]
    fn test_symmetric_across_antimeridian() {
        let east = haversine_meters(0.0, 179.99, 0.0, -179.99);
        let west = haversine_meters(0.0, -179.99, 0.0, 179.99);
        assert!((east - west).abs() < 1e-9);
        assert!(east < 2_300.0);
    }

    #[test]
    fn test_refine_drops_unusable_coordinates() {
        let center = Point::new(-66.0, 10.0);
        assert!(refine(&center, &business_at(None, Some(-66.0))).is_none());
        assert!(refine(&center, &business_at(Some(10.0), None)).is_none());
        assert!(refine(&center, &business_at(Some(f64::NAN), Some(-66.0))).is_none());
        assert!(refine(&center, &business_at(Some(95.0), Some(-66.0))).is_none());

        let d = refine(&center, &business_at(Some(10.01), Some(-66.0))).unwrap();
        assert_eq!(d.round(), 1112.0);
    }

    #[test]
    fn test_refine_within_cutoff() {
        let center = Point::new(-66.0, 10.0);
        let business = business_at(Some(10.01), Some(-66.0));
        assert!(refine_within(&center, &business, 5_000.0).is_some());
        assert!(refine_within(&center, &business, 1_000.0).is_none());
    }
}

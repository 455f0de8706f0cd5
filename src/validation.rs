//! Validation for search input.

use crate::error::{NearbyError, Result};
use geo::Point;

/// Checks that a search center is a usable position (x = longitude,
/// y = latitude). A rejected center never reaches the store.
///
/// ```
/// use nearby::validation::validate_center;
/// use geo::Point;
///
/// assert!(validate_center(&Point::new(-66.0, 10.0)).is_ok());
///
/// // lat/lng swapped by the caller
/// let err = validate_center(&Point::new(10.0, -166.0)).unwrap_err();
/// assert!(err.to_string().contains("latitude -166"));
/// ```
pub fn validate_center(center: &Point) -> Result<()> {
    check_axis("latitude", center.y(), 90.0)?;
    check_axis("longitude", center.x(), 180.0)
}

fn check_axis(axis: &str, value: f64, limit: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(NearbyError::InvalidInput(format!(
            "search center {} is not a number: {}",
            axis, value
        )));
    }
    if value.abs() > limit {
        return Err(NearbyError::InvalidInput(format!(
            "search center {} {} is outside [-{}, {}]",
            axis, value, limit, limit
        )));
    }
    Ok(())
}

/// Validates a search radius against the configured ceiling.
///
/// The radius must be strictly positive and no larger than `max_radius_km`.
///
/// ```
/// use nearby::validation::validate_radius_km;
///
/// assert!(validate_radius_km(100.0, 100.0).is_ok());
/// assert!(validate_radius_km(0.0, 100.0).is_err());
/// assert!(validate_radius_km(100.5, 100.0).is_err());
/// ```
pub fn validate_radius_km(radius_km: f64, max_radius_km: f64) -> Result<()> {
    if !radius_km.is_finite() {
        return Err(NearbyError::InvalidInput(format!(
            "Radius must be finite, got: {}",
            radius_km
        )));
    }

    if radius_km <= 0.0 || radius_km > max_radius_km {
        return Err(NearbyError::InvalidInput(format!(
            "Radius must be in (0, {}] km, got: {}",
            max_radius_km, radius_km
        )));
    }

    Ok(())
}

/// Whether a stored coordinate pair can take part in distance refinement.
pub(crate) fn is_valid_coordinate(lat: f64, lng: f64) -> bool {
    lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng)
}

//! Validation utilities for user input reaching the gateways

use crate::geometry::normalize_ring;
use crate::types::Coordinate;

/// Shortest free-text address worth sending to the geocoder
pub const MIN_ADDRESS_QUERY_LENGTH: usize = 3;

// ============================================================================
// Location Validations
// ============================================================================

/// Validate a free-text address and return it trimmed
pub fn validate_address_query(query: &str, min_length: usize) -> Result<&str, &'static str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err("Address must not be empty");
    }
    if trimmed.chars().count() < min_length {
        return Err("Address is too short");
    }
    Ok(trimmed)
}

/// Validate WGS84 coordinate ranges
pub fn validate_coordinate(coordinate: &Coordinate) -> Result<(), &'static str> {
    if !coordinate.lat.is_finite() || !coordinate.lon.is_finite() {
        return Err("Coordinates must be finite numbers");
    }
    if !(-90.0..=90.0).contains(&coordinate.lat) {
        return Err("Latitude must be between -90 and 90");
    }
    if !(-180.0..=180.0).contains(&coordinate.lon) {
        return Err("Longitude must be between -180 and 180");
    }
    Ok(())
}

// ============================================================================
// Area Validations
// ============================================================================

/// Validate that a ring can form a polygon
pub fn validate_polygon_ring(vertices: &[Coordinate]) -> Result<(), &'static str> {
    normalize_ring(vertices)
        .map(|_| ())
        .map_err(|_| "A polygon needs at least 3 distinct valid vertices")
}

/// Validate an area in square metres
pub fn validate_area_m2(area_m2: f64) -> Result<(), &'static str> {
    if !area_m2.is_finite() || area_m2 < 0.0 {
        return Err("Area must be a non-negative number");
    }
    Ok(())
}

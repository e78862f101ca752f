//! Spherical geometry on the WGS84 sphere
//!
//! Areas are computed with the spherical excess of the ring, the same model the
//! mapping SDK's geometry library uses, so quotes match what the user sees.

use thiserror::Error;

use crate::types::Coordinate;

/// Equatorial radius used by the mapping SDK for area computations
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeometryError {
    #[error("A polygon needs at least 3 distinct vertices, got {0}")]
    TooFewVertices(usize),

    #[error("Invalid coordinate: {lat}, {lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },
}

/// Unsigned area of a closed ring in square metres.
///
/// The ring is implicitly closed; a repeated first vertex at the end is harmless.
pub fn spherical_polygon_area(ring: &[Coordinate]) -> f64 {
    spherical_signed_area(ring, EARTH_RADIUS_M).abs()
}

/// Signed area, positive for counter-clockwise rings
pub fn spherical_signed_area(ring: &[Coordinate], radius: f64) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }

    let mut total = 0.0;
    let prev = ring[ring.len() - 1];
    let mut prev_tan_lat = ((std::f64::consts::FRAC_PI_2 - prev.lat.to_radians()) / 2.0).tan();
    let mut prev_lon = prev.lon.to_radians();

    for point in ring {
        let tan_lat = ((std::f64::consts::FRAC_PI_2 - point.lat.to_radians()) / 2.0).tan();
        let lon = point.lon.to_radians();
        total += polar_triangle_area(tan_lat, lon, prev_tan_lat, prev_lon);
        prev_tan_lat = tan_lat;
        prev_lon = lon;
    }

    total * radius * radius
}

/// Signed area of the triangle (north pole, p1, p2) on the unit sphere
fn polar_triangle_area(tan1: f64, lon1: f64, tan2: f64, lon2: f64) -> f64 {
    let delta_lon = lon1 - lon2;
    let t = tan1 * tan2;
    2.0 * (t * delta_lon.sin()).atan2(1.0 + t * delta_lon.cos())
}

/// Validate a ring and return it without a duplicated closing vertex
pub fn normalize_ring(vertices: &[Coordinate]) -> Result<Vec<Coordinate>, GeometryError> {
    if let Some(bad) = vertices.iter().find(|c| !c.is_valid()) {
        return Err(GeometryError::InvalidCoordinate {
            lat: bad.lat,
            lon: bad.lon,
        });
    }

    let mut ring = vertices.to_vec();
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }

    let mut distinct: Vec<Coordinate> = Vec::with_capacity(ring.len());
    for c in &ring {
        if !distinct.contains(c) {
            distinct.push(*c);
        }
    }
    if distinct.len() < 3 {
        return Err(GeometryError::TooFewVertices(distinct.len()));
    }

    Ok(ring)
}

//! Service area models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{normalize_ring, spherical_polygon_area, GeometryError};
use crate::types::Coordinate;

/// Lifecycle of a drawn polygon
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolygonState {
    Drawing,
    Closed,
    Editing,
    Removed,
}

/// A user-drawn polygon. `area_m2` is always derived from `vertices`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Polygon {
    pub id: Uuid,
    vertices: Vec<Coordinate>,
    area_m2: f64,
    pub state: PolygonState,
}

impl Polygon {
    /// Build a closed polygon from a ring of at least 3 distinct vertices
    pub fn new(vertices: &[Coordinate]) -> Result<Self, GeometryError> {
        Self::with_id(Uuid::new_v4(), vertices)
    }

    /// Close a ring under an id that was handed out while it was being drawn
    pub fn with_id(id: Uuid, vertices: &[Coordinate]) -> Result<Self, GeometryError> {
        let ring = normalize_ring(vertices)?;
        let area_m2 = spherical_polygon_area(&ring);
        Ok(Self {
            id,
            vertices: ring,
            area_m2,
            state: PolygonState::Closed,
        })
    }

    /// Replace the ring and recompute the area
    pub fn set_vertices(&mut self, vertices: &[Coordinate]) -> Result<(), GeometryError> {
        let ring = normalize_ring(vertices)?;
        self.area_m2 = spherical_polygon_area(&ring);
        self.vertices = ring;
        Ok(())
    }

    pub fn vertices(&self) -> &[Coordinate] {
        &self.vertices
    }

    pub fn area_m2(&self) -> f64 {
        self.area_m2
    }

    /// Vertices in a canonical order, independent of where the ring starts
    fn vertex_set(&self) -> Vec<Coordinate> {
        let mut set = self.vertices.clone();
        set.sort_by(|a, b| a.lat.total_cmp(&b.lat).then(a.lon.total_cmp(&b.lon)));
        set
    }
}

/// Relative tolerance for comparing totals computed in a different vertex order
const AREA_EPSILON: f64 = 1e-9;

/// Aggregate of all polygons in a capture session.
///
/// Overlapping polygons are counted twice; the total is a plain sum.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServiceArea {
    pub polygons: Vec<Polygon>,
    pub total_area_m2: f64,
    pub all_vertices: Vec<Coordinate>,
}

impl ServiceArea {
    pub fn from_polygons(polygons: Vec<Polygon>) -> Self {
        let total_area_m2 = polygons.iter().map(Polygon::area_m2).sum();
        let all_vertices = polygons
            .iter()
            .flat_map(|p| p.vertices().iter().copied())
            .collect();
        Self {
            polygons,
            total_area_m2,
            all_vertices,
        }
    }

    /// True when the (total area, vertex set) pair differs. Rotating where a
    /// ring starts changes neither.
    pub fn shape_differs(&self, other: &ServiceArea) -> bool {
        let tolerance = AREA_EPSILON * self.total_area_m2.abs().max(1.0);
        if (self.total_area_m2 - other.total_area_m2).abs() > tolerance
            || self.polygons.len() != other.polygons.len()
        {
            return true;
        }
        self.polygons
            .iter()
            .zip(&other.polygons)
            .any(|(a, b)| a.id != b.id || a.vertex_set() != b.vertex_set())
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(offset: f64) -> Vec<Coordinate> {
        vec![
            Coordinate::new(52.0 + offset, 13.0),
            Coordinate::new(52.0 + offset, 13.001),
            Coordinate::new(52.001 + offset, 13.0),
        ]
    }

    #[test]
    fn test_polygon_area_is_derived() {
        let mut polygon = Polygon::new(&triangle(0.0)).unwrap();
        let original = polygon.area_m2();
        assert!(original > 0.0);

        let mut bigger = triangle(0.0);
        bigger[1] = Coordinate::new(52.0, 13.002);
        polygon.set_vertices(&bigger).unwrap();
        assert!(polygon.area_m2() > original);
    }

    #[test]
    fn test_failed_update_keeps_previous_ring() {
        let mut polygon = Polygon::new(&triangle(0.0)).unwrap();
        let before = polygon.clone();
        assert!(polygon.set_vertices(&triangle(0.0)[..2]).is_err());
        assert_eq!(polygon, before);
    }

    #[test]
    fn test_service_area_sums_polygons() {
        let a = Polygon::new(&triangle(0.0)).unwrap();
        let b = Polygon::new(&triangle(0.01)).unwrap();
        let expected = a.area_m2() + b.area_m2();
        let area = ServiceArea::from_polygons(vec![a, b]);
        assert!((area.total_area_m2 - expected).abs() < 1e-9);
        assert_eq!(area.all_vertices.len(), 6);
    }

    #[test]
    fn test_shape_differs() {
        let a = ServiceArea::from_polygons(vec![Polygon::new(&triangle(0.0)).unwrap()]);
        let same = ServiceArea::from_polygons(a.polygons.clone());
        assert!(!a.shape_differs(&same));
        assert!(a.shape_differs(&ServiceArea::default()));
    }

    #[test]
    fn test_rotated_ring_is_same_shape() {
        let polygon = Polygon::new(&triangle(0.0)).unwrap();
        let before = ServiceArea::from_polygons(vec![polygon.clone()]);

        let mut rotated = polygon;
        let mut ring = triangle(0.0);
        ring.rotate_left(1);
        rotated.set_vertices(&ring).unwrap();
        let after = ServiceArea::from_polygons(vec![rotated]);

        assert_ne!(before.all_vertices, after.all_vertices);
        assert!(!before.shape_differs(&after));
    }

    #[test]
    fn test_moved_vertex_is_new_shape() {
        let polygon = Polygon::new(&triangle(0.0)).unwrap();
        let before = ServiceArea::from_polygons(vec![polygon.clone()]);

        let mut moved = polygon;
        let mut ring = triangle(0.0);
        ring[2] = Coordinate::new(52.002, 13.0);
        moved.set_vertices(&ring).unwrap();

        assert!(before.shape_differs(&ServiceArea::from_polygons(vec![moved])));
    }

    #[test]
    fn test_with_id_keeps_id() {
        let id = Uuid::new_v4();
        let polygon = Polygon::with_id(id, &triangle(0.0)).unwrap();
        assert_eq!(polygon.id, id);
        assert_eq!(polygon.state, PolygonState::Closed);
    }
}

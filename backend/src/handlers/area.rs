//! HTTP handler for measuring drawn service areas

use axum::Json;
use serde::Deserialize;
use shared::{validate_polygon_ring, Coordinate, Polygon, ServiceArea};

use crate::error::{AppError, AppResult};

/// Rings drawn in the browser
#[derive(Debug, Deserialize)]
pub struct MeasureAreaInput {
    pub polygons: Vec<Vec<Coordinate>>,
}

/// Measure a set of polygons on the sphere
pub async fn measure_area(Json(input): Json<MeasureAreaInput>) -> AppResult<Json<ServiceArea>> {
    let polygons = input
        .polygons
        .iter()
        .enumerate()
        .map(|(index, ring)| {
            let invalid = |message: String| AppError::Validation {
                field: format!("polygons[{}]", index),
                message,
                message_de: "Eine Fläche braucht mindestens 3 verschiedene gültige Punkte"
                    .to_string(),
            };
            validate_polygon_ring(ring).map_err(|e| invalid(e.to_string()))?;
            Polygon::new(ring).map_err(|e| invalid(e.to_string()))
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(ServiceArea::from_polygons(polygons)))
}

//! HTTP handlers for address and device location

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::services::{ReportedPosition, ResolvedPlace};
use crate::AppState;

/// Query parameters for address search
#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    #[serde(default)]
    pub q: String,
}

/// Resolve a free-text address
pub async fn geocode_address(
    State(state): State<AppState>,
    Query(query): Query<GeocodeQuery>,
) -> AppResult<Json<ResolvedPlace>> {
    let place = state.geocoding.resolve_address(&query.q).await?;
    Ok(Json(place))
}

/// Resolve the position reported by the browser
pub async fn resolve_device_location(
    State(state): State<AppState>,
    Json(position): Json<ReportedPosition>,
) -> AppResult<Json<ResolvedPlace>> {
    let place = state.geocoding.resolve_device(&position).await?;
    Ok(Json(place))
}

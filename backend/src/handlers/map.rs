//! HTTP handler for the mapping SDK session

use axum::{extract::State, Json};

use crate::services::MapSession;
use crate::AppState;

/// Load the mapping SDK once and report whether the map can be shown
pub async fn get_map_session(State(state): State<AppState>) -> Json<MapSession> {
    Json(state.maps.acquire().await)
}

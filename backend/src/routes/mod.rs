//! Route definitions for the winter service widget

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{handlers, AppState};

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // The widget is embedded on third-party pages
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/geocode", get(handlers::geocode_address))
        .route("/location/device", post(handlers::resolve_device_location))
        .route("/weather", get(handlers::get_weather))
        .route("/materials", post(handlers::estimate_materials))
        .route("/area/measure", post(handlers::measure_area))
        .route("/map/session", get(handlers::get_map_session))
}

/// Root endpoint
async fn root() -> &'static str {
    "Winter Service Decision API v1"
}

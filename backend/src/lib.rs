//! Winter service decision widget - backend library
//!
//! Gateways to the geocoding, weather and mapping services, the area capture
//! engine, and the HTTP adapter used by the embedded widget.

use shared::RiskEngine;
use std::sync::Arc;

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod routes;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};

use services::{
    GeocodingGateway, JsonFileStatusStore, MapSessionProvider, ProviderStatusStore,
    WeatherSourceGateway,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub weather: Arc<WeatherSourceGateway>,
    pub geocoding: GeocodingGateway,
    pub maps: Arc<MapSessionProvider>,
    pub risk: RiskEngine,
}

impl AppState {
    /// Wire the production gateways from configuration
    pub fn from_config(config: Config) -> Self {
        let store: Arc<dyn ProviderStatusStore> = Arc::new(match &config.weather.status_file {
            Some(path) => JsonFileStatusStore::load_from(path.clone()),
            None => JsonFileStatusStore::load(),
        });

        Self {
            weather: Arc::new(WeatherSourceGateway::from_config(&config.weather, store)),
            geocoding: GeocodingGateway::from_config(&config.geocoding),
            maps: Arc::new(MapSessionProvider::from_config(&config.map)),
            risk: RiskEngine::new(config.risk.clone()),
            config: Arc::new(config),
        }
    }
}

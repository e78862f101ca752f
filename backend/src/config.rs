//! Configuration management for the winter service backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with WINTER_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::RiskPolicy;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Weather provider configuration
    pub weather: WeatherConfig,

    /// Geocoding configuration
    pub geocoding: GeocodingConfig,

    /// Mapping SDK configuration
    pub map: MapConfig,

    /// Area capture configuration
    #[serde(default)]
    pub area: AreaConfig,

    /// Risk engine calibration
    #[serde(default)]
    pub risk: RiskPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    /// Provider ids in order of preference
    #[serde(default = "default_provider_order")]
    pub provider_order: Vec<String>,

    pub openweathermap: OpenWeatherMapConfig,

    pub open_meteo: OpenMeteoConfig,

    /// Base cool-down after a failure, doubled per consecutive failure
    pub cooldown_secs: u64,

    /// Upper bound for the cool-down
    pub max_cooldown_secs: u64,

    /// How long a provider that rescued a request stays first choice
    pub preference_window_secs: u64,

    /// Provider status file; defaults to ~/.winter-service/provider-status.json
    #[serde(default)]
    pub status_file: Option<PathBuf>,

    /// Timeout for a single provider request
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenWeatherMapConfig {
    /// API endpoint
    pub endpoint: String,

    /// API key; the provider is skipped when empty
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenMeteoConfig {
    /// API endpoint
    pub endpoint: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeocodingConfig {
    /// Nominatim-compatible endpoint
    pub endpoint: String,

    /// User agent sent with every request (required by Nominatim)
    pub user_agent: String,

    /// Shortest accepted address query
    pub min_query_length: usize,

    /// Label used when a device position has no reverse match
    pub fallback_label: String,

    /// Timeout for a single geocoding request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapConfig {
    /// Identity of the SDK, used to coalesce loads
    pub sdk_id: String,

    /// Script URL of the mapping SDK
    pub script_url: String,

    /// SDK API key
    #[serde(default)]
    pub api_key: String,

    /// SDK libraries to load with the script
    #[serde(default = "default_map_libraries")]
    pub libraries: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AreaConfig {
    /// Quiet period before an edited polygon is re-measured
    pub debounce_ms: u64,
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self { debounce_ms: 100 }
    }
}

fn default_provider_order() -> Vec<String> {
    vec!["openweathermap".to_string(), "open-meteo".to_string()]
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_map_libraries() -> Vec<String> {
    vec!["drawing".to_string(), "geometry".to_string()]
}

impl WeatherConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn max_cooldown(&self) -> Duration {
        Duration::from_secs(self.max_cooldown_secs)
    }

    pub fn preference_window(&self) -> Duration {
        Duration::from_secs(self.preference_window_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl GeocodingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AreaConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("WINTER_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default(
                "weather.openweathermap.endpoint",
                "https://api.openweathermap.org/data/2.5",
            )?
            .set_default("weather.open_meteo.endpoint", "https://api.open-meteo.com/v1")?
            .set_default("weather.cooldown_secs", 300)?
            .set_default("weather.max_cooldown_secs", 3600)?
            .set_default("weather.preference_window_secs", 1800)?
            .set_default("weather.request_timeout_secs", 10)?
            .set_default("geocoding.endpoint", "https://nominatim.openstreetmap.org")?
            .set_default("geocoding.user_agent", "WinterServiceWidget/0.1 (winter-service)")?
            .set_default(
                "geocoding.min_query_length",
                shared::MIN_ADDRESS_QUERY_LENGTH as i64,
            )?
            .set_default("geocoding.fallback_label", "Aktueller Standort")?
            .set_default("map.sdk_id", "google-maps")?
            .set_default("map.script_url", "https://maps.googleapis.com/maps/api/js")?
            .set_default("area.debounce_ms", 100)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (WINTER_ prefix)
            .add_source(
                Environment::with_prefix("WINTER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config
            .risk
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        Ok(config)
    }
}

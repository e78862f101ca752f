//! External API integrations

pub mod geocoding;
pub mod map_sdk;
pub mod open_meteo;
pub mod weather;

pub use geocoding::NominatimClient;
pub use map_sdk::ScriptSdkLoader;
pub use open_meteo::OpenMeteoClient;
pub use weather::OpenWeatherMapClient;

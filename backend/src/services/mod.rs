//! Gateways and engines of the winter service widget

pub mod area_capture;
pub mod geocoding;
pub mod map_session;
pub mod provider_status;
pub mod weather_feed;
pub mod weather_gateway;

pub use area_capture::AreaCaptureEngine;
pub use geocoding::{
    DeviceLocator, GeocodeCandidate, GeocodingGateway, GeocodingProvider, PlaceSource,
    ReportedPosition, ResolvedPlace,
};
pub use map_session::{MapSession, MapSessionProvider, SdkLoader};
pub use provider_status::{InMemoryStatusStore, JsonFileStatusStore, ProviderStatusStore};
pub use weather_feed::{FeedState, RefreshOutcome, WeatherFeed, WeatherSnapshot};
pub use weather_gateway::{GatewayPolicy, WeatherProvider, WeatherSourceGateway};

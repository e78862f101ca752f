//! OpenWeatherMap client
//!
//! Primary weather provider. Current conditions come from `/weather`, the
//! forecast from the 3-hourly `/forecast` endpoint. Responses are converted to
//! canonical [`WeatherObservation`]s (°C, %, km/h, mm, probability 0-100).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use shared::{Coordinate, WeatherCondition, WeatherObservation};
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::services::weather_gateway::WeatherProvider;

/// OpenWeatherMap API client
#[derive(Clone)]
pub struct OpenWeatherMapClient {
    client: Client,
    api_key: String,
    base_url: String,
}

/// OpenWeatherMap API response for current weather
#[derive(Debug, Deserialize)]
struct OWMCurrentResponse {
    dt: i64,
    #[serde(default)]
    weather: Vec<OWMWeather>,
    main: OWMMain,
    #[serde(default)]
    wind: Option<OWMWind>,
    #[serde(default)]
    clouds: Option<OWMClouds>,
    #[serde(default)]
    rain: Option<OWMVolume>,
    #[serde(default)]
    snow: Option<OWMVolume>,
}

#[derive(Debug, Deserialize)]
struct OWMWeather {
    id: u32,
}

#[derive(Debug, Deserialize)]
struct OWMMain {
    temp: Option<f64>,
    #[serde(default)]
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OWMWind {
    /// Metres per second with `units=metric`
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OWMClouds {
    #[serde(default)]
    all: f64,
}

/// Rain or snow volume in mm, liquid equivalent
#[derive(Debug, Deserialize)]
struct OWMVolume {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
    #[serde(rename = "3h")]
    three_hour: Option<f64>,
}

impl OWMVolume {
    fn amount(volume: &Option<OWMVolume>) -> f64 {
        volume
            .as_ref()
            .and_then(|v| v.one_hour.or(v.three_hour))
            .unwrap_or(0.0)
    }
}

/// OpenWeatherMap API response for forecast
#[derive(Debug, Deserialize)]
struct OWMForecastResponse {
    list: Vec<OWMForecastItem>,
}

#[derive(Debug, Deserialize)]
struct OWMForecastItem {
    dt: i64,
    main: OWMMain,
    #[serde(default)]
    weather: Vec<OWMWeather>,
    #[serde(default)]
    clouds: Option<OWMClouds>,
    #[serde(default)]
    wind: Option<OWMWind>,
    /// Probability of precipitation (0-1)
    #[serde(default)]
    pop: f64,
    #[serde(default)]
    rain: Option<OWMVolume>,
    #[serde(default)]
    snow: Option<OWMVolume>,
}

/// Map an OpenWeatherMap condition id to the canonical condition
pub fn condition_from_owm_id(id: u32) -> WeatherCondition {
    match id {
        200..=299 => WeatherCondition::Thunderstorm,
        300..=399 => WeatherCondition::Drizzle,
        511 => WeatherCondition::Sleet,
        500..=599 => WeatherCondition::Rain,
        611..=616 => WeatherCondition::Sleet,
        600..=699 => WeatherCondition::Snow,
        700..=799 => WeatherCondition::Fog,
        800 => WeatherCondition::Clear,
        801 | 802 => WeatherCondition::PartlyCloudy,
        803 | 804 => WeatherCondition::Cloudy,
        _ => WeatherCondition::Unknown,
    }
}

fn timestamp(dt: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(dt, 0).unwrap_or_else(Utc::now)
}

impl OpenWeatherMapClient {
    pub const ID: &'static str = "openweathermap";

    /// Create a new client against `base_url` (e.g. `https://api.openweathermap.org/data/2.5`)
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        coordinate: Coordinate,
    ) -> AppResult<T> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", coordinate.lat.to_string()),
                ("lon", coordinate.lon.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::provider(Self::ID, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::provider(
                Self::ID,
                format!("API error: {} - {}", status, body),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::provider(Self::ID, format!("failed to parse response: {}", e)))
    }

    fn convert_current(data: OWMCurrentResponse) -> WeatherObservation {
        let condition = data
            .weather
            .first()
            .map(|w| condition_from_owm_id(w.id))
            .unwrap_or_default();

        WeatherObservation {
            timestamp: timestamp(data.dt),
            temperature_c: data.main.temp,
            humidity_pct: data.main.humidity,
            cloud_cover_pct: data.clouds.map(|c| c.all).unwrap_or(0.0),
            wind_speed_kmh: data.wind.map(|w| w.speed * 3.6).unwrap_or(0.0),
            precipitation_mm: OWMVolume::amount(&data.rain) + OWMVolume::amount(&data.snow),
            precipitation_probability_pct: 0.0,
            soil_temperature_c: None,
            condition_code: condition,
            icon_id: condition.icon_id().to_string(),
        }
    }

    fn convert_forecast(data: OWMForecastResponse) -> Vec<WeatherObservation> {
        data.list
            .into_iter()
            .map(|item| {
                let condition = item
                    .weather
                    .first()
                    .map(|w| condition_from_owm_id(w.id))
                    .unwrap_or_default();

                WeatherObservation {
                    timestamp: timestamp(item.dt),
                    temperature_c: item.main.temp,
                    humidity_pct: item.main.humidity,
                    cloud_cover_pct: item.clouds.map(|c| c.all).unwrap_or(0.0),
                    wind_speed_kmh: item.wind.map(|w| w.speed * 3.6).unwrap_or(0.0),
                    precipitation_mm: OWMVolume::amount(&item.rain)
                        + OWMVolume::amount(&item.snow),
                    precipitation_probability_pct: (item.pop * 100.0).clamp(0.0, 100.0),
                    soil_temperature_c: None,
                    condition_code: condition,
                    icon_id: condition.icon_id().to_string(),
                }
            })
            .collect()
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMapClient {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn current(&self, coordinate: Coordinate) -> AppResult<WeatherObservation> {
        let data: OWMCurrentResponse = self.get("weather", coordinate).await?;
        Ok(Self::convert_current(data))
    }

    async fn forecast(&self, coordinate: Coordinate) -> AppResult<Vec<WeatherObservation>> {
        let data: OWMForecastResponse = self.get("forecast", coordinate).await?;
        Ok(Self::convert_forecast(data))
    }
}

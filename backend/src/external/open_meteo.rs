//! Open-Meteo client
//!
//! Keyless fallback provider. One `/forecast` call returns both the current
//! block and an hourly series; values may be `null` and are kept optional.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use shared::{Coordinate, WeatherCondition, WeatherObservation};
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::services::weather_gateway::WeatherProvider;

const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,cloud_cover,wind_speed_10m,precipitation,weather_code,soil_temperature_0cm";
const HOURLY_FIELDS: &str = "temperature_2m,relative_humidity_2m,cloud_cover,wind_speed_10m,precipitation,precipitation_probability,weather_code,soil_temperature_0cm";
const FORECAST_DAYS: u8 = 2;

/// Open-Meteo API client
#[derive(Clone)]
pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: CurrentBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    time: i64,
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    cloud_cover: Option<f64>,
    wind_speed_10m: Option<f64>,
    precipitation: Option<f64>,
    weather_code: Option<u8>,
    soil_temperature_0cm: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct HourlyResponse {
    hourly: HourlyBlock,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HourlyBlock {
    time: Vec<i64>,
    temperature_2m: Vec<Option<f64>>,
    relative_humidity_2m: Vec<Option<f64>>,
    cloud_cover: Vec<Option<f64>>,
    wind_speed_10m: Vec<Option<f64>>,
    precipitation: Vec<Option<f64>>,
    precipitation_probability: Vec<Option<f64>>,
    weather_code: Vec<Option<u8>>,
    soil_temperature_0cm: Vec<Option<f64>>,
}

fn at<T: Copy>(values: &[Option<T>], index: usize) -> Option<T> {
    values.get(index).copied().flatten()
}

/// Map a WMO weather interpretation code to the canonical condition
pub fn condition_from_wmo_code(code: u8) -> WeatherCondition {
    match code {
        0 => WeatherCondition::Clear,
        1 | 2 => WeatherCondition::PartlyCloudy,
        3 => WeatherCondition::Cloudy,
        45 | 48 => WeatherCondition::Fog,
        56 | 57 | 66 | 67 => WeatherCondition::Sleet,
        51..=55 => WeatherCondition::Drizzle,
        61..=65 | 80..=82 => WeatherCondition::Rain,
        71..=77 | 85 | 86 => WeatherCondition::Snow,
        95..=99 => WeatherCondition::Thunderstorm,
        _ => WeatherCondition::Unknown,
    }
}

fn timestamp(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap_or_else(Utc::now)
}

#[allow(clippy::too_many_arguments)]
fn observation(
    time: i64,
    temperature_c: Option<f64>,
    humidity: Option<f64>,
    clouds: Option<f64>,
    wind_kmh: Option<f64>,
    precipitation: Option<f64>,
    probability: Option<f64>,
    code: Option<u8>,
    soil_temperature_c: Option<f64>,
) -> WeatherObservation {
    let condition = code.map(condition_from_wmo_code).unwrap_or_default();
    WeatherObservation {
        timestamp: timestamp(time),
        temperature_c,
        humidity_pct: humidity.unwrap_or(0.0),
        cloud_cover_pct: clouds.unwrap_or(0.0),
        wind_speed_kmh: wind_kmh.unwrap_or(0.0),
        precipitation_mm: precipitation.unwrap_or(0.0),
        precipitation_probability_pct: probability.unwrap_or(0.0),
        soil_temperature_c,
        condition_code: condition,
        icon_id: condition.icon_id().to_string(),
    }
}

impl OpenMeteoClient {
    pub const ID: &'static str = "open-meteo";

    /// Create a new client against `base_url` (e.g. `https://api.open-meteo.com/v1`)
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        coordinate: Coordinate,
        block: (&str, &str),
    ) -> AppResult<T> {
        let url = format!("{}/forecast", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", coordinate.lat.to_string()),
                ("longitude", coordinate.lon.to_string()),
                (block.0, block.1.to_string()),
                ("forecast_days", FORECAST_DAYS.to_string()),
                ("timeformat", "unixtime".to_string()),
                ("timezone", "UTC".to_string()),
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

    fn convert_current(data: CurrentResponse) -> WeatherObservation {
        let c = data.current;
        observation(
            c.time,
            c.temperature_2m,
            c.relative_humidity_2m,
            c.cloud_cover,
            c.wind_speed_10m,
            c.precipitation,
            None,
            c.weather_code,
            c.soil_temperature_0cm,
        )
    }

    fn convert_hourly(data: HourlyResponse) -> Vec<WeatherObservation> {
        let h = data.hourly;
        h.time
            .iter()
            .enumerate()
            .map(|(i, &time)| {
                observation(
                    time,
                    at(&h.temperature_2m, i),
                    at(&h.relative_humidity_2m, i),
                    at(&h.cloud_cover, i),
                    at(&h.wind_speed_10m, i),
                    at(&h.precipitation, i),
                    at(&h.precipitation_probability, i),
                    at(&h.weather_code, i),
                    at(&h.soil_temperature_0cm, i),
                )
            })
            .collect()
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn current(&self, coordinate: Coordinate) -> AppResult<WeatherObservation> {
        let data: CurrentResponse = self.get(coordinate, ("current", CURRENT_FIELDS)).await?;
        Ok(Self::convert_current(data))
    }

    async fn forecast(&self, coordinate: Coordinate) -> AppResult<Vec<WeatherObservation>> {
        let data: HourlyResponse = self.get(coordinate, ("hourly", HOURLY_FIELDS)).await?;
        Ok(Self::convert_hourly(data))
    }
}

//! Weather data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::WeatherCondition;

/// Cloud cover at or above which a dry "rain" slot is shown as cloudy
pub const OVERCAST_CLOUD_COVER_PCT: f64 = 50.0;

/// A single normalized weather reading, either measured or forecast
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherObservation {
    pub timestamp: DateTime<Utc>,
    /// Absent when the provider did not report a value
    pub temperature_c: Option<f64>,
    pub humidity_pct: f64,
    pub cloud_cover_pct: f64,
    pub wind_speed_kmh: f64,
    pub precipitation_mm: f64,
    pub precipitation_probability_pct: f64,
    #[serde(default)]
    pub soil_temperature_c: Option<f64>,
    pub condition_code: WeatherCondition,
    pub icon_id: String,
}

impl WeatherObservation {
    /// Precipitation with negative provider noise clamped away
    pub fn precipitation(&self) -> f64 {
        if self.precipitation_mm.is_finite() {
            self.precipitation_mm.max(0.0)
        } else {
            0.0
        }
    }

    /// Providers sometimes report a forecast class ("rain") for a slot with no
    /// measured precipitation. Such slots are reclassified by cloud cover.
    pub fn normalize_condition(mut self) -> Self {
        if self.condition_code.is_rain() && self.precipitation() == 0.0 {
            self.condition_code = if self.cloud_cover_pct >= OVERCAST_CLOUD_COVER_PCT {
                WeatherCondition::Cloudy
            } else {
                WeatherCondition::PartlyCloudy
            };
            self.icon_id = self.condition_code.icon_id().to_string();
        }
        self
    }
}

/// Time-ascending forecast snapshot from a single fetch
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ForecastSeries {
    observations: Vec<WeatherObservation>,
}

impl ForecastSeries {
    /// Build a series, sorting entries by timestamp
    pub fn new(mut observations: Vec<WeatherObservation>) -> Self {
        observations.sort_by_key(|o| o.timestamp);
        Self { observations }
    }

    /// Drop entries that lie before `now`
    pub fn starting_at(self, now: DateTime<Utc>) -> Self {
        Self {
            observations: self
                .observations
                .into_iter()
                .filter(|o| o.timestamp >= now)
                .collect(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WeatherObservation> {
        self.observations.iter()
    }

    pub fn as_slice(&self) -> &[WeatherObservation] {
        &self.observations
    }

    pub fn first(&self) -> Option<&WeatherObservation> {
        self.observations.first()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

impl<'a> IntoIterator for &'a ForecastSeries {
    type Item = &'a WeatherObservation;
    type IntoIter = std::slice::Iter<'a, WeatherObservation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}

/// Current conditions plus the forecast fetched with them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionsAndForecast {
    pub provider_id: String,
    pub current: WeatherObservation,
    pub forecast: ForecastSeries,
}

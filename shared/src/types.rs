//! Common types used across the platform

use serde::{Deserialize, Serialize};
use std::fmt;

/// WGS84 coordinate in decimal degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Both components are finite and inside the WGS84 ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lon)
    }
}

/// Canonical weather condition, independent of the provider that reported it
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    Sleet,
    Snow,
    Thunderstorm,
    #[default]
    Unknown,
}

impl WeatherCondition {
    /// Snow or sleet, the conditions that need winter service
    pub fn is_wintry(&self) -> bool {
        matches!(self, WeatherCondition::Snow | WeatherCondition::Sleet)
    }

    /// Conditions that imply measurable liquid precipitation
    pub fn is_rain(&self) -> bool {
        matches!(self, WeatherCondition::Rain | WeatherCondition::Drizzle)
    }

    /// Icon id used by the widget for this condition
    pub fn icon_id(&self) -> &'static str {
        match self {
            WeatherCondition::Clear => "clear",
            WeatherCondition::PartlyCloudy => "partly-cloudy",
            WeatherCondition::Cloudy => "cloudy",
            WeatherCondition::Fog => "fog",
            WeatherCondition::Drizzle => "drizzle",
            WeatherCondition::Rain => "rain",
            WeatherCondition::Sleet => "sleet",
            WeatherCondition::Snow => "snow",
            WeatherCondition::Thunderstorm => "thunderstorm",
            WeatherCondition::Unknown => "unknown",
        }
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.icon_id())
    }
}

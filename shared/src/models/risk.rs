//! Winter service risk models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Coarse classification of whether winter service is needed now
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Green,
    Yellow,
    Red,
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Green => write!(f, "green"),
            AlertLevel::Yellow => write!(f, "yellow"),
            AlertLevel::Red => write!(f, "red"),
        }
    }
}

/// Severity of surface icing, ordered from least to most severe
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum IceRiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for IceRiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IceRiskLevel::Low => write!(f, "low"),
            IceRiskLevel::Medium => write!(f, "medium"),
            IceRiskLevel::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for IceRiskLevel {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(IceRiskLevel::Low),
            "medium" => Ok(IceRiskLevel::Medium),
            "high" => Ok(IceRiskLevel::High),
            _ => Err("Ice risk must be one of: low, medium, high"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IceRisk {
    pub level: IceRiskLevel,
    pub description: String,
    pub description_de: String,
}

/// Contiguous snow/sleet window found in a forecast
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnowfallPrediction {
    pub will_snow: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Precipitation equivalent of the window in centimetres
    pub total_amount_cm: Decimal,
}

impl SnowfallPrediction {
    pub fn none() -> Self {
        Self {
            will_snow: false,
            start_time: None,
            end_time: None,
            total_amount_cm: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialRequirement {
    pub salt_kg: Decimal,
    pub grit_kg: Decimal,
    pub description: String,
    pub description_de: String,
}

/// Derived assessment for one observation/forecast pair.
///
/// Fields that depend on an unreported input are `None` rather than guessed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    pub alert_level: AlertLevel,
    pub ice_risk: Option<IceRisk>,
    pub snow_height_cm: Option<Decimal>,
    pub optimal_cleaning_time: Option<DateTime<Utc>>,
    pub snowfall_prediction: SnowfallPrediction,
    pub material_requirement: Option<MaterialRequirement>,
}

// ============================================================================
// Policies
// ============================================================================

/// Thresholds for ice risk classification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IceRiskPolicy {
    /// At or below this air temperature, wet surfaces freeze
    pub high_max_temperature_c: f64,
    /// Humidity that produces hoar frost at freezing temperatures
    pub high_min_humidity_pct: f64,
    pub medium_max_temperature_c: f64,
    pub medium_min_humidity_pct: f64,
    /// Soil at or below this temperature keeps surfaces frozen
    pub frozen_soil_temperature_c: f64,
}

impl Default for IceRiskPolicy {
    fn default() -> Self {
        Self {
            high_max_temperature_c: 0.0,
            high_min_humidity_pct: 90.0,
            medium_max_temperature_c: 3.0,
            medium_min_humidity_pct: 80.0,
            frozen_soil_temperature_c: 0.0,
        }
    }
}

/// Application rate per ice risk level, in grams per square metre
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialRates {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl MaterialRates {
    pub fn rate_for(&self, level: IceRiskLevel) -> f64 {
        match level {
            IceRiskLevel::Low => self.low,
            IceRiskLevel::Medium => self.medium,
            IceRiskLevel::High => self.high,
        }
    }

    /// Rates are non-negative and never decrease with severity
    pub fn is_monotonic(&self) -> bool {
        self.low >= 0.0 && self.low <= self.medium && self.medium <= self.high
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MaterialPolicy {
    pub salt_g_per_m2: MaterialRates,
    pub grit_g_per_m2: MaterialRates,
}

impl Default for MaterialPolicy {
    fn default() -> Self {
        Self {
            salt_g_per_m2: MaterialRates {
                low: 10.0,
                medium: 20.0,
                high: 30.0,
            },
            grit_g_per_m2: MaterialRates {
                low: 50.0,
                medium: 100.0,
                high: 150.0,
            },
        }
    }
}

/// Regional calibration of the risk engine
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskPolicy {
    pub ice: IceRiskPolicy,
    pub material: MaterialPolicy,
}

impl RiskPolicy {
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.material.salt_g_per_m2.is_monotonic() {
            return Err("Salt rates must be non-negative and increase with ice risk");
        }
        if !self.material.grit_g_per_m2.is_monotonic() {
            return Err("Grit rates must be non-negative and increase with ice risk");
        }
        if self.ice.high_max_temperature_c > self.ice.medium_max_temperature_c {
            return Err("High ice risk temperature must not exceed the medium threshold");
        }
        Ok(())
    }
}

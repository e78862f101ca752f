//! Winter service risk engine
//!
//! Pure derivations from one current observation and its forecast. Nothing in
//! here fails: a missing input only blanks the fields that depend on it.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;

use crate::models::{
    AlertLevel, ForecastSeries, IceRisk, IceRiskLevel, IceRiskPolicy, MaterialPolicy,
    MaterialRequirement, RiskAssessment, RiskPolicy, SnowfallPrediction, WeatherObservation,
};

// ============================================================================
// Thresholds
// ============================================================================

/// Red below this temperature (exclusive)
pub const RED_BELOW_TEMPERATURE_C: f64 = 0.0;
/// Red above this precipitation probability (exclusive)
pub const RED_ABOVE_PRECIPITATION_PCT: f64 = 70.0;
/// Yellow at or below this temperature
pub const YELLOW_MAX_TEMPERATURE_C: f64 = 3.0;
/// Yellow above this precipitation probability (exclusive)
pub const YELLOW_ABOVE_PRECIPITATION_PCT: f64 = 40.0;

/// Precipitation falls as snow at or below this temperature
pub const SNOW_MAX_TEMPERATURE_C: f64 = 2.0;
/// mm of snow per mm of precipitation at or below 0 °C
pub const DRY_SNOW_RATIO: f64 = 10.0;
/// mm of snow per mm of precipitation between 0 °C and 2 °C
pub const WET_SNOW_RATIO: f64 = 7.0;

fn to_decimal(value: f64, dp: u32) -> Decimal {
    Decimal::from_f64_retain(value)
        .unwrap_or_default()
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

// ============================================================================
// Field derivations
// ============================================================================

/// Alert level from temperature and precipitation probability.
///
/// Checks run red-temperature, red-probability, yellow-temperature,
/// yellow-probability; a sub-zero reading is red whatever the probability.
pub fn calculate_alert_level(temperature_c: Option<f64>, precipitation_probability_pct: f64) -> AlertLevel {
    let probability = finite_or_zero(precipitation_probability_pct);
    let temperature = temperature_c.filter(|t| t.is_finite());

    if temperature.map(|t| t < RED_BELOW_TEMPERATURE_C).unwrap_or(false)
        || probability > RED_ABOVE_PRECIPITATION_PCT
    {
        return AlertLevel::Red;
    }
    if temperature.map(|t| t <= YELLOW_MAX_TEMPERATURE_C).unwrap_or(false)
        || probability > YELLOW_ABOVE_PRECIPITATION_PCT
    {
        return AlertLevel::Yellow;
    }
    AlertLevel::Green
}

/// Ice risk from temperature, precipitation and humidity; `None` without a temperature
pub fn classify_ice_risk(observation: &WeatherObservation, policy: &IceRiskPolicy) -> Option<IceRisk> {
    let temperature = observation.temperature_c.filter(|t| t.is_finite())?;
    let wet = observation.precipitation() > 0.0;
    let humidity = finite_or_zero(observation.humidity_pct);
    let frozen_ground = observation
        .soil_temperature_c
        .map(|soil| soil <= policy.frozen_soil_temperature_c)
        .unwrap_or(false);

    let level = if temperature <= policy.high_max_temperature_c
        && (wet || humidity >= policy.high_min_humidity_pct)
    {
        IceRiskLevel::High
    } else if temperature <= policy.medium_max_temperature_c
        && (wet || humidity >= policy.medium_min_humidity_pct || frozen_ground)
    {
        IceRiskLevel::Medium
    } else {
        IceRiskLevel::Low
    };

    let (description, description_de) = match level {
        IceRiskLevel::High => (
            format!("Black ice likely: {:.1} °C with moisture on the surface", temperature),
            format!("Hohe Glättegefahr: {:.1} °C bei Nässe auf der Oberfläche", temperature),
        ),
        IceRiskLevel::Medium => (
            format!("Slippery patches possible near freezing point ({:.1} °C)", temperature),
            format!("Stellenweise Glätte in Gefrierpunktnähe möglich ({:.1} °C)", temperature),
        ),
        IceRiskLevel::Low => (
            "Low ice risk".to_string(),
            "Geringe Glättegefahr".to_string(),
        ),
    };

    Some(IceRisk {
        level,
        description,
        description_de,
    })
}

/// Fresh snow height in cm (one decimal), only near or below freezing with precipitation
pub fn estimate_snow_height_cm(temperature_c: Option<f64>, precipitation_mm: f64) -> Option<Decimal> {
    let temperature = temperature_c.filter(|t| t.is_finite())?;
    let precipitation = finite_or_zero(precipitation_mm);
    if temperature > SNOW_MAX_TEMPERATURE_C || precipitation <= 0.0 {
        return None;
    }

    let ratio = if temperature <= 0.0 {
        DRY_SNOW_RATIO
    } else {
        WET_SNOW_RATIO
    };
    let snow_mm = precipitation * ratio;
    Some(to_decimal(snow_mm / 10.0, 1))
}

/// First contiguous snow/sleet run of the forecast
pub fn predict_snowfall(forecast: &ForecastSeries) -> SnowfallPrediction {
    let slots = forecast.as_slice();
    let Some(start) = slots.iter().position(|o| o.condition_code.is_wintry()) else {
        return SnowfallPrediction::none();
    };

    let window: Vec<&WeatherObservation> = slots[start..]
        .iter()
        .take_while(|o| o.condition_code.is_wintry())
        .collect();

    let total_mm: f64 = window.iter().map(|o| o.precipitation()).sum();

    SnowfallPrediction {
        will_snow: true,
        start_time: window.first().map(|o| o.timestamp),
        end_time: window.last().map(|o| o.timestamp),
        total_amount_cm: to_decimal(total_mm / 10.0, 1),
    }
}

/// Earliest slot to clear: precipitation has stopped and temperature is above
/// freezing or rising. Falls back to the first dry slot after precipitation.
pub fn find_optimal_cleaning_time(
    current: &WeatherObservation,
    forecast: &ForecastSeries,
) -> Option<DateTime<Utc>> {
    let mut had_precipitation = current.precipitation() > 0.0;
    let mut previous_temperature = current.temperature_c;
    let mut first_dry_slot = None;

    for slot in forecast {
        if slot.precipitation() > 0.0 {
            had_precipitation = true;
        } else if had_precipitation {
            let warming = match (slot.temperature_c, previous_temperature) {
                (Some(t), _) if t > 0.0 => true,
                (Some(t), Some(previous)) => t > previous,
                _ => false,
            };
            if warming {
                return Some(slot.timestamp);
            }
            first_dry_slot.get_or_insert(slot.timestamp);
        }

        if slot.temperature_c.is_some() {
            previous_temperature = slot.temperature_c;
        }
    }

    first_dry_slot
}

/// Salt and grit for an area at a given ice risk. Scales linearly with area.
pub fn calculate_material_requirement(
    area_m2: f64,
    level: IceRiskLevel,
    policy: &MaterialPolicy,
) -> MaterialRequirement {
    let area = if area_m2.is_finite() && area_m2 > 0.0 {
        area_m2
    } else {
        0.0
    };

    if area == 0.0 {
        return MaterialRequirement {
            salt_kg: Decimal::ZERO,
            grit_kg: Decimal::ZERO,
            description: "No area captured, no material required".to_string(),
            description_de: "Keine Fläche erfasst, kein Streugut erforderlich".to_string(),
        };
    }

    let salt_kg = to_decimal(area * policy.salt_g_per_m2.rate_for(level) / 1000.0, 2);
    let grit_kg = to_decimal(area * policy.grit_g_per_m2.rate_for(level) / 1000.0, 2);

    let (risk_en, risk_de) = match level {
        IceRiskLevel::Low => ("Low", "Geringe"),
        IceRiskLevel::Medium => ("Medium", "Mittlere"),
        IceRiskLevel::High => ("High", "Hohe"),
    };

    MaterialRequirement {
        description: format!(
            "{} ice risk: {} kg de-icing salt and {} kg grit for {:.0} m²",
            risk_en, salt_kg, grit_kg, area
        ),
        description_de: format!(
            "{} Glättegefahr: {} kg Streusalz und {} kg Splitt für {:.0} m²",
            risk_de, salt_kg, grit_kg, area
        ),
        salt_kg,
        grit_kg,
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Derives a [`RiskAssessment`] from weather data under a regional policy
#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    policy: RiskPolicy,
}

impl RiskEngine {
    pub fn new(policy: RiskPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    pub fn alert_level(&self, observation: &WeatherObservation) -> AlertLevel {
        calculate_alert_level(
            observation.temperature_c,
            observation.precipitation_probability_pct,
        )
    }

    pub fn ice_risk(&self, observation: &WeatherObservation) -> Option<IceRisk> {
        classify_ice_risk(observation, &self.policy.ice)
    }

    pub fn snow_height_cm(&self, observation: &WeatherObservation) -> Option<Decimal> {
        estimate_snow_height_cm(observation.temperature_c, observation.precipitation_mm)
    }

    pub fn material_requirement(&self, area_m2: f64, level: IceRiskLevel) -> MaterialRequirement {
        calculate_material_requirement(area_m2, level, &self.policy.material)
    }

    /// Full assessment for one observation/forecast pair
    pub fn assess(
        &self,
        current: &WeatherObservation,
        forecast: &ForecastSeries,
        area_m2: f64,
    ) -> RiskAssessment {
        let ice_risk = self.ice_risk(current);
        let material_requirement = ice_risk
            .as_ref()
            .map(|risk| self.material_requirement(area_m2, risk.level));

        RiskAssessment {
            alert_level: self.alert_level(current),
            ice_risk,
            snow_height_cm: self.snow_height_cm(current),
            optimal_cleaning_time: find_optimal_cleaning_time(current, forecast),
            snowfall_prediction: predict_snowfall(forecast),
            material_requirement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WeatherCondition;
    use chrono::{Duration, TimeZone};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn obs(hour: i64, temp: Option<f64>, precip: f64, condition: WeatherCondition) -> WeatherObservation {
        WeatherObservation {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap() + Duration::hours(hour),
            temperature_c: temp,
            humidity_pct: 70.0,
            cloud_cover_pct: 80.0,
            wind_speed_kmh: 10.0,
            precipitation_mm: precip,
            precipitation_probability_pct: 20.0,
            soil_temperature_c: None,
            condition_code: condition,
            icon_id: condition.icon_id().to_string(),
        }
    }

    // ========================================================================
    // Alert level
    // ========================================================================

    #[test]
    fn test_alert_level_thresholds() {
        assert_eq!(calculate_alert_level(Some(-1.0), 10.0), AlertLevel::Red);
        assert_eq!(calculate_alert_level(Some(10.0), 71.0), AlertLevel::Red);
        assert_eq!(calculate_alert_level(Some(10.0), 70.0), AlertLevel::Yellow);
        assert_eq!(calculate_alert_level(Some(3.0), 0.0), AlertLevel::Yellow);
        assert_eq!(calculate_alert_level(Some(0.0), 0.0), AlertLevel::Yellow);
        assert_eq!(calculate_alert_level(Some(3.1), 40.0), AlertLevel::Green);
        assert_eq!(calculate_alert_level(Some(3.1), 41.0), AlertLevel::Yellow);
    }

    #[test]
    fn test_alert_level_without_temperature() {
        assert_eq!(calculate_alert_level(None, 80.0), AlertLevel::Red);
        assert_eq!(calculate_alert_level(None, 50.0), AlertLevel::Yellow);
        assert_eq!(calculate_alert_level(None, 10.0), AlertLevel::Green);
    }

    // ========================================================================
    // Snow height
    // ========================================================================

    #[test]
    fn test_snow_height_dry_snow() {
        assert_eq!(estimate_snow_height_cm(Some(-1.0), 2.0), Some(dec("2.0")));
    }

    #[test]
    fn test_snow_height_wet_snow() {
        assert_eq!(estimate_snow_height_cm(Some(1.5), 2.0), Some(dec("1.4")));
    }

    #[test]
    fn test_snow_height_not_applicable() {
        assert_eq!(estimate_snow_height_cm(Some(2.1), 5.0), None);
        assert_eq!(estimate_snow_height_cm(Some(-5.0), 0.0), None);
        assert_eq!(estimate_snow_height_cm(None, 5.0), None);
    }

    // ========================================================================
    // Ice risk
    // ========================================================================

    #[test]
    fn test_ice_risk_levels() {
        let policy = IceRiskPolicy::default();
        let high = classify_ice_risk(&obs(0, Some(-2.0), 0.5, WeatherCondition::Snow), &policy);
        assert_eq!(high.map(|r| r.level), Some(IceRiskLevel::High));

        let medium = classify_ice_risk(&obs(0, Some(2.0), 0.5, WeatherCondition::Rain), &policy);
        assert_eq!(medium.map(|r| r.level), Some(IceRiskLevel::Medium));

        let low = classify_ice_risk(&obs(0, Some(8.0), 3.0, WeatherCondition::Rain), &policy);
        assert_eq!(low.map(|r| r.level), Some(IceRiskLevel::Low));
    }

    #[test]
    fn test_ice_risk_frozen_ground() {
        let mut observation = obs(0, Some(2.5), 0.0, WeatherCondition::Cloudy);
        observation.soil_temperature_c = Some(-1.0);
        let risk = classify_ice_risk(&observation, &IceRiskPolicy::default()).unwrap();
        assert_eq!(risk.level, IceRiskLevel::Medium);
    }

    #[test]
    fn test_ice_risk_thresholds_are_configurable() {
        let observation = obs(0, Some(4.0), 1.0, WeatherCondition::Rain);
        assert_eq!(
            classify_ice_risk(&observation, &IceRiskPolicy::default()).map(|r| r.level),
            Some(IceRiskLevel::Low)
        );

        let policy = IceRiskPolicy {
            medium_max_temperature_c: 5.0,
            ..IceRiskPolicy::default()
        };
        assert_eq!(
            classify_ice_risk(&observation, &policy).map(|r| r.level),
            Some(IceRiskLevel::Medium)
        );
    }

    // ========================================================================
    // Forecast scans
    // ========================================================================

    #[test]
    fn test_snowfall_uses_first_contiguous_window() {
        let forecast = ForecastSeries::new(vec![
            obs(1, Some(1.0), 0.0, WeatherCondition::Cloudy),
            obs(2, Some(-1.0), 2.0, WeatherCondition::Snow),
            obs(3, Some(-1.0), 3.0, WeatherCondition::Sleet),
            obs(4, Some(1.0), 0.0, WeatherCondition::Cloudy),
            obs(5, Some(-1.0), 9.0, WeatherCondition::Snow),
        ]);

        let prediction = predict_snowfall(&forecast);
        assert!(prediction.will_snow);
        assert_eq!(prediction.start_time, Some(forecast.as_slice()[1].timestamp));
        assert_eq!(prediction.end_time, Some(forecast.as_slice()[2].timestamp));
        assert_eq!(prediction.total_amount_cm, dec("0.5"));
    }

    #[test]
    fn test_no_snowfall() {
        let forecast = ForecastSeries::new(vec![obs(1, Some(5.0), 1.0, WeatherCondition::Rain)]);
        assert_eq!(predict_snowfall(&forecast), SnowfallPrediction::none());
        assert_eq!(predict_snowfall(&ForecastSeries::default()), SnowfallPrediction::none());
    }

    #[test]
    fn test_cleaning_time_after_snow_stops_and_warms() {
        let current = obs(0, Some(-2.0), 1.0, WeatherCondition::Snow);
        let forecast = ForecastSeries::new(vec![
            obs(3, Some(-2.0), 1.0, WeatherCondition::Snow),
            obs(6, Some(-3.0), 0.0, WeatherCondition::Cloudy),
            obs(9, Some(-1.0), 0.0, WeatherCondition::Cloudy),
        ]);
        let expected = forecast.as_slice()[2].timestamp;
        assert_eq!(find_optimal_cleaning_time(&current, &forecast), Some(expected));
    }

    #[test]
    fn test_cleaning_time_falls_back_to_first_dry_slot() {
        let current = obs(0, Some(-2.0), 1.0, WeatherCondition::Snow);
        let forecast = ForecastSeries::new(vec![
            obs(3, Some(-3.0), 0.0, WeatherCondition::Cloudy),
            obs(6, Some(-4.0), 0.0, WeatherCondition::Clear),
        ]);
        let expected = forecast.as_slice()[0].timestamp;
        assert_eq!(find_optimal_cleaning_time(&current, &forecast), Some(expected));
    }

    #[test]
    fn test_no_cleaning_time_without_precipitation() {
        let current = obs(0, Some(-2.0), 0.0, WeatherCondition::Clear);
        let forecast = ForecastSeries::new(vec![obs(3, Some(4.0), 0.0, WeatherCondition::Clear)]);
        assert_eq!(find_optimal_cleaning_time(&current, &forecast), None);
    }

    // ========================================================================
    // Materials
    // ========================================================================

    #[test]
    fn test_material_zero_area() {
        let req = calculate_material_requirement(0.0, IceRiskLevel::High, &MaterialPolicy::default());
        assert_eq!(req.salt_kg, Decimal::ZERO);
        assert_eq!(req.grit_kg, Decimal::ZERO);
    }

    #[test]
    fn test_material_scales_with_area_and_risk() {
        let policy = MaterialPolicy::default();
        let low = calculate_material_requirement(100.0, IceRiskLevel::Low, &policy);
        let high = calculate_material_requirement(100.0, IceRiskLevel::High, &policy);
        let double = calculate_material_requirement(200.0, IceRiskLevel::Low, &policy);

        assert_eq!(low.salt_kg, dec("1.00"));
        assert_eq!(low.grit_kg, dec("5.00"));
        assert!(high.salt_kg > low.salt_kg);
        assert!(high.grit_kg > low.grit_kg);
        assert_eq!(double.salt_kg, low.salt_kg * Decimal::from(2));
    }

    #[test]
    fn test_assessment_degrades_without_temperature() {
        let engine = RiskEngine::default();
        let current = WeatherObservation {
            precipitation_probability_pct: 80.0,
            ..obs(0, None, 2.0, WeatherCondition::Snow)
        };
        let forecast = ForecastSeries::new(vec![obs(3, None, 1.0, WeatherCondition::Snow)]);

        let assessment = engine.assess(&current, &forecast, 250.0);
        assert_eq!(assessment.alert_level, AlertLevel::Red);
        assert!(assessment.ice_risk.is_none());
        assert!(assessment.snow_height_cm.is_none());
        assert!(assessment.material_requirement.is_none());
        assert!(assessment.snowfall_prediction.will_snow);
    }
}

//! WebAssembly module for the Winter Service Decision Widget
//!
//! Provides client-side computation for:
//! - Polygon area while the user is still drawing
//! - Alert level and snow height for the weather card
//! - Snowfall prediction and material requirement

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;

use shared::{
    normalize_ring, spherical_polygon_area, validate_address_query, validate_polygon_ring,
    RiskEngine, MIN_ADDRESS_QUERY_LENGTH,
};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str(concat!(
        "winter-service-wasm ",
        env!("CARGO_PKG_VERSION")
    )));
}

fn to_js_error(message: String) -> JsValue {
    JsValue::from_str(&message)
}

fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

// ============================================================================
// Geometry
// ============================================================================

fn polygon_area(ring_json: &str) -> Result<f64, String> {
    let ring: Vec<Coordinate> =
        serde_json::from_str(ring_json).map_err(|e| format!("Invalid ring JSON: {}", e))?;
    validate_polygon_ring(&ring)?;
    let ring = normalize_ring(&ring).map_err(|e| e.to_string())?;
    Ok(spherical_polygon_area(&ring))
}

fn service_area(polygons_json: &str) -> Result<ServiceArea, String> {
    let rings: Vec<Vec<Coordinate>> =
        serde_json::from_str(polygons_json).map_err(|e| format!("Invalid polygons JSON: {}", e))?;
    let polygons = rings
        .iter()
        .enumerate()
        .map(|(i, ring)| Polygon::new(ring).map_err(|e| format!("Polygon {}: {}", i, e)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ServiceArea::from_polygons(polygons))
}

/// Area in m² of one ring given as `[{"lat":..,"lon":..}, ...]`
#[wasm_bindgen(js_name = calculatePolygonArea)]
pub fn calculate_polygon_area(ring_json: &str) -> Result<f64, JsValue> {
    polygon_area(ring_json).map_err(to_js_error)
}

/// Total area in m² of several rings
#[wasm_bindgen(js_name = calculateTotalArea)]
pub fn calculate_total_area(polygons_json: &str) -> Result<f64, JsValue> {
    service_area(polygons_json)
        .map(|area| area.total_area_m2)
        .map_err(to_js_error)
}

// ============================================================================
// Risk
// ============================================================================

/// "green", "yellow" or "red"
#[wasm_bindgen(js_name = calculateAlertLevel)]
pub fn calculate_alert_level(temperature_c: Option<f64>, precipitation_probability_pct: f64) -> String {
    shared::calculate_alert_level(temperature_c, precipitation_probability_pct).to_string()
}

/// Fresh snow in cm, `undefined` when no snow is expected
#[wasm_bindgen(js_name = estimateSnowHeight)]
pub fn estimate_snow_height(temperature_c: Option<f64>, precipitation_mm: f64) -> Option<f64> {
    shared::estimate_snow_height_cm(temperature_c, precipitation_mm).map(decimal_to_f64)
}

fn material_requirement(area_m2: f64, ice_risk: &str) -> Result<String, String> {
    let level: IceRiskLevel = ice_risk.parse().map_err(|e: &str| e.to_string())?;
    let requirement = RiskEngine::default().material_requirement(area_m2, level);
    serde_json::to_string(&requirement).map_err(|e| e.to_string())
}

/// Salt and grit for an area, as JSON
#[wasm_bindgen(js_name = calculateMaterialRequirement)]
pub fn calculate_material_requirement(area_m2: f64, ice_risk: &str) -> Result<String, JsValue> {
    material_requirement(area_m2, ice_risk).map_err(to_js_error)
}

fn snowfall(forecast_json: &str) -> Result<SnowfallPrediction, String> {
    let slots: Vec<WeatherObservation> =
        serde_json::from_str(forecast_json).map_err(|e| format!("Invalid forecast JSON: {}", e))?;
    Ok(shared::predict_snowfall(&ForecastSeries::new(slots)))
}

/// First snowfall window of a forecast, as JSON
#[wasm_bindgen(js_name = predictSnowfall)]
pub fn predict_snowfall(forecast_json: &str) -> Result<String, JsValue> {
    snowfall(forecast_json)
        .and_then(|prediction| serde_json::to_string(&prediction).map_err(|e| e.to_string()))
        .map_err(to_js_error)
}

fn assessment(current_json: &str, forecast_json: &str, area_m2: f64) -> Result<RiskAssessment, String> {
    let current: WeatherObservation =
        serde_json::from_str(current_json).map_err(|e| format!("Invalid observation JSON: {}", e))?;
    let slots: Vec<WeatherObservation> =
        serde_json::from_str(forecast_json).map_err(|e| format!("Invalid forecast JSON: {}", e))?;
    let forecast = ForecastSeries::new(slots).starting_at(current.timestamp);
    Ok(RiskEngine::default().assess(&current, &forecast, area_m2))
}

/// Full assessment for cached weather data, as JSON
#[wasm_bindgen(js_name = assessRisk)]
pub fn assess_risk(current_json: &str, forecast_json: &str, area_m2: f64) -> Result<String, JsValue> {
    assessment(current_json, forecast_json, area_m2)
        .and_then(|a| serde_json::to_string(&a).map_err(|e| e.to_string()))
        .map_err(to_js_error)
}

/// Whether an address is long enough to be searched
#[wasm_bindgen(js_name = isSearchableAddress)]
pub fn is_searchable_address(query: &str) -> bool {
    validate_address_query(query, MIN_ADDRESS_QUERY_LENGTH).is_ok()
}

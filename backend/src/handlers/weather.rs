//! HTTP handlers for weather and risk endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use shared::{
    validate_area_m2, validate_coordinate, Coordinate, ForecastSeries, IceRiskLevel,
    MaterialRequirement, RiskAssessment, WeatherObservation,
};

use crate::error::{AppError, AppResult};
use crate::AppState;

/// Query parameters for the weather endpoint
#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub area_m2: Option<f64>,
}

/// Weather with its assessment
#[derive(Debug, Serialize)]
pub struct WeatherResponse {
    pub provider_id: String,
    pub current: WeatherObservation,
    pub forecast: ForecastSeries,
    pub assessment: RiskAssessment,
}

/// Input for a material estimate
#[derive(Debug, Deserialize)]
pub struct MaterialsInput {
    pub area_m2: f64,
    pub ice_risk: IceRiskLevel,
}

fn check_area(area_m2: f64) -> AppResult<f64> {
    validate_area_m2(area_m2)
        .map(|_| area_m2)
        .map_err(|e| AppError::validation("area_m2", e, "Die Fläche muss eine positive Zahl sein"))
}

/// Current conditions, forecast and risk assessment for a coordinate
pub async fn get_weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> AppResult<Json<WeatherResponse>> {
    let coordinate = Coordinate::new(query.lat, query.lon);
    validate_coordinate(&coordinate)
        .map_err(|e| AppError::validation("lat", e, "Ungültige Koordinaten"))?;
    let area_m2 = check_area(query.area_m2.unwrap_or(0.0))?;

    let data = state.weather.get_conditions_and_forecast(coordinate).await?;
    let assessment = state.risk.assess(&data.current, &data.forecast, area_m2);

    Ok(Json(WeatherResponse {
        provider_id: data.provider_id,
        current: data.current,
        forecast: data.forecast,
        assessment,
    }))
}

/// Salt and grit for an area at a given ice risk
pub async fn estimate_materials(
    State(state): State<AppState>,
    Json(input): Json<MaterialsInput>,
) -> AppResult<Json<MaterialRequirement>> {
    let area_m2 = check_area(input.area_m2)?;
    Ok(Json(state.risk.material_requirement(area_m2, input.ice_risk)))
}

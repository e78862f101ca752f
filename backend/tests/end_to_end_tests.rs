//! End-to-end widget flow
//!
//! Address → weather → drawn area → decision, first through the services and
//! then through the HTTP router.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use rust_decimal::Decimal;
use shared::{AlertLevel, Coordinate, IceRiskLevel, RiskEngine, WeatherCondition};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use common::{observation, snowy_forecast, square_ring, CountingSdkLoader, FakeGeocoder, FakeWeatherProvider};
use winter_service_backend::services::{
    AreaCaptureEngine, GatewayPolicy, GeocodingGateway, InMemoryStatusStore, MapSessionProvider,
    WeatherProvider, WeatherSourceGateway,
};
use winter_service_backend::{routes, AppState, Config};

const ADDRESS: &str = "Musterstraße 1, 12345 Musterstadt";

fn musterstadt() -> Coordinate {
    Coordinate::new(51.3397, 12.3731)
}

fn wintry_provider() -> FakeWeatherProvider {
    FakeWeatherProvider::new(
        "primary",
        observation(0, Some(-2.0), 0.3, 80.0, WeatherCondition::Snow),
        snowy_forecast(),
    )
}

fn weather_gateway(provider: FakeWeatherProvider) -> Arc<WeatherSourceGateway> {
    let providers: Vec<Arc<dyn WeatherProvider>> = vec![Arc::new(provider)];
    Arc::new(WeatherSourceGateway::new(
        providers,
        Arc::new(InMemoryStatusStore::new()),
        GatewayPolicy::default(),
    ))
}

fn geocoding() -> GeocodingGateway {
    GeocodingGateway::new(
        Arc::new(FakeGeocoder::new().with_place(ADDRESS, musterstadt(), ADDRESS)),
        3,
        "Aktueller Standort",
    )
}

fn test_state() -> AppState {
    let config = Config::load().expect("defaults load without files");
    AppState {
        weather: weather_gateway(wintry_provider()),
        geocoding: geocoding(),
        maps: Arc::new(MapSessionProvider::new(Arc::new(CountingSdkLoader::new(
            "maps-js",
            Duration::ZERO,
        )))),
        risk: RiskEngine::default(),
        config: Arc::new(config),
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ============================================================================
// Service flow
// ============================================================================

#[tokio::test]
async fn test_address_to_winter_service_decision() {
    let place = geocoding().resolve_address(ADDRESS).await.unwrap();
    assert_eq!(place.coordinate, musterstadt());

    let weather = weather_gateway(wintry_provider());
    let data = weather
        .get_conditions_and_forecast(place.coordinate)
        .await
        .unwrap();

    let config = Config::load().expect("defaults load without files");
    let mut capture = AreaCaptureEngine::from_config(Some(place.coordinate), &config.area).unwrap();
    assert_eq!(capture.debounce(), config.area.debounce());
    capture.start_drawing();
    capture
        .on_polygon_complete(&square_ring(place.coordinate, 10.0))
        .unwrap();
    let area = capture.finish();
    assert!((area.total_area_m2 - 100.0).abs() < 1.0);

    let assessment = RiskEngine::default().assess(&data.current, &data.forecast, area.total_area_m2);

    assert_eq!(assessment.alert_level, AlertLevel::Red);
    assert!(assessment.snowfall_prediction.will_snow);
    assert_eq!(
        assessment.ice_risk.as_ref().map(|r| r.level),
        Some(IceRiskLevel::High)
    );
    let materials = assessment.material_requirement.unwrap();
    assert!(materials.salt_kg > Decimal::ZERO);
    assert!(materials.grit_kg > Decimal::ZERO);
    assert!(assessment.snow_height_cm.unwrap() > Decimal::ZERO);
}

// ============================================================================
// HTTP
// ============================================================================

#[tokio::test]
async fn test_health_lists_providers() {
    let app = routes::create_app(test_state());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["weather_providers"][0], "primary");
}

#[tokio::test]
async fn test_geocode_endpoint() {
    let app = routes::create_app(test_state());
    let uri = format!(
        "/api/v1/geocode?q={}",
        ADDRESS.replace(' ', "%20").replace(',', "%2C").replace('ß', "%C3%9F")
    );
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["display_name"], ADDRESS);
    assert_eq!(json["source"], "address");
}

#[tokio::test]
async fn test_short_geocode_query_is_bad_request() {
    let app = routes::create_app(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/geocode?q=ab")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"]["field"], "q");
}

#[tokio::test]
async fn test_weather_endpoint_returns_assessment() {
    let app = routes::create_app(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/weather?lat=51.3397&lon=12.3731&area_m2=100")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["provider_id"], "primary");
    assert_eq!(json["assessment"]["alert_level"], "red");
    assert_eq!(json["assessment"]["snowfall_prediction"]["will_snow"], true);
}

#[tokio::test]
async fn test_measure_area_endpoint() {
    let app = routes::create_app(test_state());
    let ring: Vec<_> = square_ring(musterstadt(), 10.0)
        .into_iter()
        .map(|c| serde_json::json!({ "lat": c.lat, "lon": c.lon }))
        .collect();

    let response = app
        .oneshot(post_json(
            "/api/v1/area/measure",
            serde_json::json!({ "polygons": [ring] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let total = json["total_area_m2"].as_f64().unwrap();
    assert!((total - 100.0).abs() < 1.0);
}

#[tokio::test]
async fn test_degenerate_ring_names_offending_polygon() {
    let app = routes::create_app(test_state());
    let response = app
        .oneshot(post_json(
            "/api/v1/area/measure",
            serde_json::json!({ "polygons": [[{ "lat": 51.0, "lon": 12.0 }, { "lat": 51.001, "lon": 12.0 }]] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["field"], "polygons[0]");
}

#[tokio::test]
async fn test_repeated_vertices_do_not_make_a_polygon() {
    let app = routes::create_app(test_state());
    let square: Vec<_> = square_ring(musterstadt(), 10.0)
        .into_iter()
        .map(|c| serde_json::json!({ "lat": c.lat, "lon": c.lon }))
        .collect();
    let point = serde_json::json!({ "lat": 51.0, "lon": 12.0 });
    let repeated = serde_json::json!([point, point, { "lat": 51.001, "lon": 12.0 }]);

    let response = app
        .oneshot(post_json(
            "/api/v1/area/measure",
            serde_json::json!({ "polygons": [square, repeated] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["field"], "polygons[1]");
    assert_eq!(
        json["error"]["message_en"],
        "A polygon needs at least 3 distinct valid vertices"
    );
}

#[tokio::test]
async fn test_materials_endpoint() {
    let app = routes::create_app(test_state());
    let response = app
        .oneshot(post_json(
            "/api/v1/materials",
            serde_json::json!({ "area_m2": 100.0, "ice_risk": "high" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    // Decimals are serialized as strings
    let kg = |field: &str| json[field].as_str().unwrap().parse::<Decimal>().unwrap();
    assert_eq!(kg("salt_kg"), Decimal::from(3));
    assert_eq!(kg("grit_kg"), Decimal::from(15));
}

#[tokio::test]
async fn test_device_location_permission_denied() {
    let app = routes::create_app(test_state());
    let response = app
        .oneshot(post_json(
            "/api/v1/location/device",
            serde_json::json!({ "status": "permission_denied" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_map_session_endpoint() {
    let app = routes::create_app(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/map/session")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ready"], true);
}

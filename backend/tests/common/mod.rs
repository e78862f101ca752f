//! Fakes and fixtures shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use shared::{Coordinate, WeatherCondition, WeatherObservation, EARTH_RADIUS_M};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use winter_service_backend::services::{GeocodeCandidate, GeocodingProvider, SdkLoader, WeatherProvider};
use winter_service_backend::{AppError, AppResult};

// ============================================================================
// Weather fixtures
// ============================================================================

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap()
}

pub fn observation(
    hours: i64,
    temperature_c: Option<f64>,
    precipitation_mm: f64,
    probability_pct: f64,
    condition: WeatherCondition,
) -> WeatherObservation {
    WeatherObservation {
        timestamp: base_time() + ChronoDuration::hours(hours),
        temperature_c,
        humidity_pct: 85.0,
        cloud_cover_pct: 90.0,
        wind_speed_kmh: 14.0,
        precipitation_mm,
        precipitation_probability_pct: probability_pct,
        soil_temperature_c: None,
        condition_code: condition,
        icon_id: condition.icon_id().to_string(),
    }
}

/// Snow from +3h to +6h, then dry and thawing
pub fn snowy_forecast() -> Vec<WeatherObservation> {
    vec![
        observation(3, Some(-1.5), 1.2, 85.0, WeatherCondition::Snow),
        observation(6, Some(-1.0), 0.8, 80.0, WeatherCondition::Snow),
        observation(9, Some(0.5), 0.0, 20.0, WeatherCondition::Cloudy),
        observation(12, Some(2.0), 0.0, 10.0, WeatherCondition::PartlyCloudy),
    ]
}

pub fn dry_forecast() -> Vec<WeatherObservation> {
    vec![
        observation(3, Some(6.0), 0.0, 5.0, WeatherCondition::Clear),
        observation(6, Some(7.0), 0.0, 5.0, WeatherCondition::PartlyCloudy),
    ]
}

// ============================================================================
// Weather provider
// ============================================================================

pub struct FakeWeatherProvider {
    id: String,
    failing: AtomicBool,
    delay: Duration,
    current: WeatherObservation,
    forecast: Vec<WeatherObservation>,
    reports_probability: bool,
    pub current_calls: AtomicUsize,
    pub forecast_calls: AtomicUsize,
}

impl FakeWeatherProvider {
    pub fn new(id: &str, current: WeatherObservation, forecast: Vec<WeatherObservation>) -> Self {
        Self {
            id: id.to_string(),
            failing: AtomicBool::new(false),
            delay: Duration::ZERO,
            current,
            forecast,
            reports_probability: true,
            current_calls: AtomicUsize::new(0),
            forecast_calls: AtomicUsize::new(0),
        }
    }

    /// Mild, dry weather
    pub fn healthy(id: &str) -> Self {
        Self::new(
            id,
            observation(0, Some(5.0), 0.0, 10.0, WeatherCondition::Clear),
            dry_forecast(),
        )
    }

    pub fn failing(id: &str) -> Self {
        let provider = Self::healthy(id);
        provider.set_failing(true);
        provider
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn without_current_probability(mut self) -> Self {
        self.reports_probability = false;
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.current_calls.load(Ordering::SeqCst)
    }

    async fn respond<T>(&self, value: T) -> AppResult<T> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::provider(&self.id, "connection refused"));
        }
        Ok(value)
    }
}

#[async_trait]
impl WeatherProvider for FakeWeatherProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn current(&self, _coordinate: Coordinate) -> AppResult<WeatherObservation> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(self.current.clone()).await
    }

    async fn forecast(&self, _coordinate: Coordinate) -> AppResult<Vec<WeatherObservation>> {
        self.forecast_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(self.forecast.clone()).await
    }

    fn reports_current_probability(&self) -> bool {
        self.reports_probability
    }
}

/// Answers per coordinate, each with its own latency
pub struct LocationWeatherProvider {
    responses: HashMap<String, (Duration, Option<WeatherObservation>)>,
}

impl LocationWeatherProvider {
    fn key(coordinate: Coordinate) -> String {
        format!("{:.3},{:.3}", coordinate.lat, coordinate.lon)
    }

    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
        }
    }

    pub fn at(mut self, coordinate: Coordinate, delay: Duration, current: WeatherObservation) -> Self {
        self.responses
            .insert(Self::key(coordinate), (delay, Some(current)));
        self
    }

    /// Fails for this coordinate after the delay
    pub fn failing_at(mut self, coordinate: Coordinate, delay: Duration) -> Self {
        self.responses.insert(Self::key(coordinate), (delay, None));
        self
    }
}

#[async_trait]
impl WeatherProvider for LocationWeatherProvider {
    fn id(&self) -> &str {
        "by-location"
    }

    async fn current(&self, coordinate: Coordinate) -> AppResult<WeatherObservation> {
        let (delay, current) = self
            .responses
            .get(&Self::key(coordinate))
            .cloned()
            .ok_or_else(|| AppError::provider("by-location", "unknown coordinate"))?;
        tokio::time::sleep(delay).await;
        current.ok_or_else(|| AppError::provider("by-location", "service unavailable"))
    }

    async fn forecast(&self, _coordinate: Coordinate) -> AppResult<Vec<WeatherObservation>> {
        Ok(dry_forecast())
    }

    fn reports_current_probability(&self) -> bool {
        true
    }
}

// ============================================================================
// Geocoding
// ============================================================================

pub struct FakeGeocoder {
    places: HashMap<String, GeocodeCandidate>,
    reverse: Mutex<AppResult<Option<String>>>,
    transport_down: AtomicBool,
    pub search_calls: AtomicUsize,
}

impl FakeGeocoder {
    pub fn new() -> Self {
        Self {
            places: HashMap::new(),
            reverse: Mutex::new(Ok(None)),
            transport_down: AtomicBool::new(false),
            search_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_place(mut self, query: &str, coordinate: Coordinate, display_name: &str) -> Self {
        self.places.insert(
            query.to_string(),
            GeocodeCandidate {
                coordinate,
                display_name: display_name.to_string(),
            },
        );
        self
    }

    pub fn with_reverse(self, reverse: AppResult<Option<String>>) -> Self {
        *self.reverse.lock().unwrap() = reverse;
        self
    }

    pub fn set_transport_down(&self, down: bool) {
        self.transport_down.store(down, Ordering::SeqCst);
    }

    pub fn searches(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeocodingProvider for FakeGeocoder {
    async fn search(&self, query: &str) -> AppResult<Vec<GeocodeCandidate>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.transport_down.load(Ordering::SeqCst) {
            return Err(AppError::provider("fake-geocoder", "timeout"));
        }
        Ok(self.places.get(query).cloned().into_iter().collect())
    }

    async fn reverse(&self, _coordinate: Coordinate) -> AppResult<Option<String>> {
        self.reverse.lock().unwrap().clone()
    }
}

// ============================================================================
// Map SDK
// ============================================================================

pub struct CountingSdkLoader {
    id: String,
    delay: Duration,
    fail: bool,
    present: bool,
    pub loads: AtomicUsize,
}

impl CountingSdkLoader {
    pub fn new(id: &str, delay: Duration) -> Self {
        Self {
            id: id.to_string(),
            delay,
            fail: false,
            present: false,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn already_present(mut self) -> Self {
        self.present = true;
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SdkLoader for CountingSdkLoader {
    fn sdk_id(&self) -> &str {
        &self.id
    }

    fn is_present(&self) -> bool {
        self.present
    }

    async fn load(&self) -> AppResult<()> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(AppError::SdkLoadError("script 404".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Axis-aligned square of roughly `side_m` metres with its south-west corner at `origin`
pub fn square_ring(origin: Coordinate, side_m: f64) -> Vec<Coordinate> {
    let metres_per_degree = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
    let dlat = side_m / metres_per_degree;
    let dlon = side_m / (metres_per_degree * origin.lat.to_radians().cos());
    vec![
        origin,
        Coordinate::new(origin.lat, origin.lon + dlon),
        Coordinate::new(origin.lat + dlat, origin.lon + dlon),
        Coordinate::new(origin.lat + dlat, origin.lon),
    ]
}

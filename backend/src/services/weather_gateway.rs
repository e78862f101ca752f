//! Weather source gateway
//!
//! Fetches current conditions and a forecast from an ordered list of providers,
//! falling back once when the first choice fails. Provider health is kept in an
//! injected [`ProviderStatusStore`] so ordering survives restarts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{ConditionsAndForecast, Coordinate, ForecastSeries, ProviderStatus, WeatherObservation};
use std::sync::Arc;
use std::time::Duration;

use crate::config::WeatherConfig;
use crate::error::{AppError, AppResult};
use crate::external::{OpenMeteoClient, OpenWeatherMapClient};
use crate::services::provider_status::ProviderStatusStore;

/// Providers tried per call: the first choice plus one retry
pub const MAX_ATTEMPTS: usize = 2;

/// A meteorological data source returning canonical observations
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    fn id(&self) -> &str;

    async fn current(&self, coordinate: Coordinate) -> AppResult<WeatherObservation>;

    async fn forecast(&self, coordinate: Coordinate) -> AppResult<Vec<WeatherObservation>>;

    /// Whether `current` carries its own precipitation probability.
    /// When it does not, the first forecast slot supplies it.
    fn reports_current_probability(&self) -> bool {
        false
    }
}

/// Cool-down and preference timing
#[derive(Debug, Clone)]
pub struct GatewayPolicy {
    pub cooldown: Duration,
    pub max_cooldown: Duration,
    pub preference_window: Duration,
}

impl Default for GatewayPolicy {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(300),
            max_cooldown: Duration::from_secs(3600),
            preference_window: Duration::from_secs(1800),
        }
    }
}

impl From<&WeatherConfig> for GatewayPolicy {
    fn from(config: &WeatherConfig) -> Self {
        Self {
            cooldown: config.cooldown(),
            max_cooldown: config.max_cooldown(),
            preference_window: config.preference_window(),
        }
    }
}

impl GatewayPolicy {
    /// Base cool-down doubled per consecutive failure, capped
    pub fn cooldown_for(&self, consecutive_failures: u32) -> Duration {
        let exponent = consecutive_failures.saturating_sub(1).min(31);
        self.cooldown
            .saturating_mul(1u32 << exponent)
            .min(self.max_cooldown)
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero())
}

/// Multi-provider weather gateway
pub struct WeatherSourceGateway {
    providers: Vec<Arc<dyn WeatherProvider>>,
    store: Arc<dyn ProviderStatusStore>,
    policy: GatewayPolicy,
}

impl WeatherSourceGateway {
    pub fn new(
        providers: Vec<Arc<dyn WeatherProvider>>,
        store: Arc<dyn ProviderStatusStore>,
        policy: GatewayPolicy,
    ) -> Self {
        Self {
            providers,
            store,
            policy,
        }
    }

    /// Build the configured provider chain
    pub fn from_config(config: &WeatherConfig, store: Arc<dyn ProviderStatusStore>) -> Self {
        let mut providers: Vec<Arc<dyn WeatherProvider>> = Vec::new();

        for id in &config.provider_order {
            match id.as_str() {
                OpenWeatherMapClient::ID => {
                    if config.openweathermap.api_key.is_empty() {
                        tracing::warn!("OpenWeatherMap API key not configured, provider disabled");
                        continue;
                    }
                    providers.push(Arc::new(OpenWeatherMapClient::new(
                        config.openweathermap.api_key.clone(),
                        config.openweathermap.endpoint.clone(),
                        config.request_timeout(),
                    )));
                }
                OpenMeteoClient::ID => {
                    providers.push(Arc::new(OpenMeteoClient::new(
                        config.open_meteo.endpoint.clone(),
                        config.request_timeout(),
                    )));
                }
                other => tracing::warn!("Unknown weather provider '{}' ignored", other),
            }
        }

        tracing::info!(
            providers = ?providers.iter().map(|p| p.id().to_string()).collect::<Vec<_>>(),
            "Weather gateway configured"
        );

        Self::new(providers, store, GatewayPolicy::from(config))
    }

    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    pub fn policy(&self) -> &GatewayPolicy {
        &self.policy
    }

    /// Status of a provider, or a fresh record when it has no history
    pub fn status(&self, provider_id: &str) -> ProviderStatus {
        self.store
            .get(provider_id)
            .unwrap_or_else(|| ProviderStatus::new(provider_id))
    }

    /// Providers in attempt order at `now`: preferred, then healthy in
    /// configured order, then cooling down with the soonest recovery first.
    pub fn ordered_providers(&self, now: DateTime<Utc>) -> Vec<Arc<dyn WeatherProvider>> {
        let mut preferred = Vec::new();
        let mut healthy = Vec::new();
        let mut cooling = Vec::new();

        for provider in &self.providers {
            let status = self.status(provider.id());
            if status.is_cooling_down(now) {
                cooling.push((status.cooldown_until, Arc::clone(provider)));
            } else if status.is_preferred(now) {
                preferred.push(Arc::clone(provider));
            } else {
                healthy.push(Arc::clone(provider));
            }
        }

        // Stable sort keeps configured order among equal deadlines
        cooling.sort_by_key(|(until, _)| *until);

        preferred
            .into_iter()
            .chain(healthy)
            .chain(cooling.into_iter().map(|(_, provider)| provider))
            .collect()
    }

    /// Current conditions and forecast for a coordinate
    pub async fn get_conditions_and_forecast(
        &self,
        coordinate: Coordinate,
    ) -> AppResult<ConditionsAndForecast> {
        let candidates = self.ordered_providers(Utc::now());
        let mut failed_before = false;

        for provider in candidates.into_iter().take(MAX_ATTEMPTS) {
            tracing::debug!(provider = provider.id(), %coordinate, "Fetching weather");

            match fetch_from(provider.as_ref(), coordinate).await {
                Ok(result) => {
                    self.record_success(provider.id(), failed_before);
                    if failed_before {
                        tracing::info!(provider = provider.id(), "Fallback provider succeeded");
                    }
                    return Ok(result);
                }
                Err(e) => {
                    let status = self.record_failure(provider.id());
                    tracing::warn!(
                        provider = provider.id(),
                        failures = status.consecutive_failures,
                        cooldown_until = ?status.cooldown_until,
                        "Weather provider failed: {}",
                        e
                    );
                    failed_before = true;
                }
            }
        }

        tracing::error!(%coordinate, "All weather providers unavailable");
        Err(AppError::AllProvidersUnavailable)
    }

    fn record_success(&self, provider_id: &str, rescued: bool) {
        let now = Utc::now();
        let mut status = self.status(provider_id);
        status.record_success(now);
        if rescued {
            status.preferred_until = Some(now + to_chrono(self.policy.preference_window));
        }
        self.store.put(status);
    }

    fn record_failure(&self, provider_id: &str) -> ProviderStatus {
        let now = Utc::now();
        let mut status = self.status(provider_id);
        let cooldown = self
            .policy
            .cooldown_for(status.consecutive_failures.saturating_add(1));
        status.record_failure(now, to_chrono(cooldown));
        self.store.put(status.clone());
        status
    }
}

/// Fetch both series from one provider concurrently and normalize them
async fn fetch_from(
    provider: &dyn WeatherProvider,
    coordinate: Coordinate,
) -> AppResult<ConditionsAndForecast> {
    let (current, forecast) =
        tokio::try_join!(provider.current(coordinate), provider.forecast(coordinate))?;

    Ok(normalize(
        provider.id(),
        current,
        forecast,
        provider.reports_current_probability(),
    ))
}

/// Canonicalize a provider response: reclassify dry "rain" slots, order the
/// forecast and drop entries before the current reading.
pub fn normalize(
    provider_id: &str,
    current: WeatherObservation,
    forecast: Vec<WeatherObservation>,
    current_has_probability: bool,
) -> ConditionsAndForecast {
    let mut current = current.normalize_condition();
    let forecast = ForecastSeries::new(
        forecast
            .into_iter()
            .map(WeatherObservation::normalize_condition)
            .collect(),
    )
    .starting_at(current.timestamp);

    if !current_has_probability {
        if let Some(next) = forecast.first() {
            current.precipitation_probability_pct = next.precipitation_probability_pct;
        }
    }

    ConditionsAndForecast {
        provider_id: provider_id.to_string(),
        current,
        forecast,
    }
}

//! Latest-request-wins weather state
//!
//! Every refresh takes a sequence number. A response is only published when
//! its number is still the newest issued, so a slow answer for an old location
//! can never overwrite the answer for a newer one. When the newest request
//! fails, the failure replaces whatever was shown for the previous location.

use serde::Serialize;
use shared::{Coordinate, ForecastSeries, RiskAssessment, RiskEngine, WeatherObservation};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::{AppError, AppResult};
use crate::services::weather_gateway::WeatherSourceGateway;

/// Weather and assessment for one request
#[derive(Debug, Clone, Serialize)]
pub struct WeatherSnapshot {
    pub sequence: u64,
    pub coordinate: Coordinate,
    pub provider_id: String,
    pub current: WeatherObservation,
    pub forecast: ForecastSeries,
    pub assessment: RiskAssessment,
}

#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Applied(WeatherSnapshot),
    /// A newer request was issued while this one was in flight
    Superseded,
}

/// What the weather card shows
#[derive(Debug, Clone, Default)]
pub enum FeedState {
    #[default]
    Empty,
    Ready(WeatherSnapshot),
    /// The newest request failed
    Failed {
        sequence: u64,
        coordinate: Coordinate,
        error: AppError,
    },
}

impl FeedState {
    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        match self {
            FeedState::Ready(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn sequence(&self) -> Option<u64> {
        match self {
            FeedState::Empty => None,
            FeedState::Ready(snapshot) => Some(snapshot.sequence),
            FeedState::Failed { sequence, .. } => Some(*sequence),
        }
    }
}

pub struct WeatherFeed {
    gateway: Arc<WeatherSourceGateway>,
    engine: RiskEngine,
    issued: AtomicU64,
    state: watch::Sender<FeedState>,
}

impl WeatherFeed {
    pub fn new(gateway: Arc<WeatherSourceGateway>, engine: RiskEngine) -> Self {
        let (state, _) = watch::channel(FeedState::Empty);
        Self {
            gateway,
            engine,
            issued: AtomicU64::new(0),
            state,
        }
    }

    /// Fetch and assess weather for a coordinate and service area
    pub async fn refresh(&self, coordinate: Coordinate, area_m2: f64) -> AppResult<RefreshOutcome> {
        let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        let data = match self.gateway.get_conditions_and_forecast(coordinate).await {
            Ok(data) => data,
            Err(e) => {
                let failed = FeedState::Failed {
                    sequence,
                    coordinate,
                    error: e.clone(),
                };
                if self.publish(sequence, failed) {
                    tracing::warn!(sequence, %coordinate, "Weather unavailable: {}", e);
                    return Err(e);
                }
                tracing::debug!(sequence, "Discarding error from superseded request: {}", e);
                return Ok(RefreshOutcome::Superseded);
            }
        };

        let assessment = self.engine.assess(&data.current, &data.forecast, area_m2);
        let snapshot = WeatherSnapshot {
            sequence,
            coordinate,
            provider_id: data.provider_id,
            current: data.current,
            forecast: data.forecast,
            assessment,
        };

        if self.publish(sequence, FeedState::Ready(snapshot.clone())) {
            tracing::debug!(sequence, %coordinate, alert = %snapshot.assessment.alert_level, "Weather applied");
            Ok(RefreshOutcome::Applied(snapshot))
        } else {
            tracing::debug!(sequence, %coordinate, "Discarding superseded weather response");
            Ok(RefreshOutcome::Superseded)
        }
    }

    /// The visible snapshot, `None` while empty or after the newest request failed
    pub fn latest(&self) -> Option<WeatherSnapshot> {
        self.state.borrow().snapshot().cloned()
    }

    pub fn state(&self) -> FeedState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    /// Replace the visible state if `sequence` is still the newest request
    fn publish(&self, sequence: u64, next: FeedState) -> bool {
        self.state.send_if_modified(|state| {
            if self.issued.load(Ordering::SeqCst) != sequence {
                return false;
            }
            *state = next;
            true
        })
    }
}

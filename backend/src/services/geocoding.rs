//! Geocoding gateway
//!
//! Resolves free-text addresses and device positions to a coordinate with a
//! human-readable label.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::{validate_address_query, validate_coordinate, Coordinate};
use std::sync::Arc;

use crate::config::GeocodingConfig;
use crate::error::{AppError, AppResult};
use crate::external::NominatimClient;

/// One forward-geocoding hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeCandidate {
    pub coordinate: Coordinate,
    pub display_name: String,
}

/// Address search and reverse lookup backend
#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    /// Best matches for a query, best first; empty when nothing matched
    async fn search(&self, query: &str) -> AppResult<Vec<GeocodeCandidate>>;

    /// Place name for a coordinate, `None` when the backend knows none
    async fn reverse(&self, coordinate: Coordinate) -> AppResult<Option<String>>;
}

/// Platform geolocation
#[async_trait]
pub trait DeviceLocator: Send + Sync {
    async fn locate(&self) -> AppResult<Coordinate>;
}

/// Outcome of the browser Geolocation API as posted by the widget
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportedPosition {
    Granted {
        lat: f64,
        lon: f64,
        #[serde(default)]
        accuracy_m: Option<f64>,
    },
    PermissionDenied,
    Unavailable {
        #[serde(default)]
        message: Option<String>,
    },
}

#[async_trait]
impl DeviceLocator for ReportedPosition {
    async fn locate(&self) -> AppResult<Coordinate> {
        match self {
            ReportedPosition::Granted { lat, lon, .. } => {
                let coordinate = Coordinate::new(*lat, *lon);
                validate_coordinate(&coordinate)
                    .map_err(|e| AppError::Unavailable(e.to_string()))?;
                Ok(coordinate)
            }
            ReportedPosition::PermissionDenied => Err(AppError::PermissionDenied),
            ReportedPosition::Unavailable { message } => Err(AppError::Unavailable(
                message
                    .clone()
                    .unwrap_or_else(|| "position could not be determined".to_string()),
            )),
        }
    }
}

/// How a place was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceSource {
    Address,
    Device,
}

/// A coordinate with its label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlace {
    pub coordinate: Coordinate,
    pub display_name: String,
    pub source: PlaceSource,
}

/// Gateway over a [`GeocodingProvider`]
#[derive(Clone)]
pub struct GeocodingGateway {
    provider: Arc<dyn GeocodingProvider>,
    min_query_length: usize,
    fallback_label: String,
}

impl GeocodingGateway {
    pub fn new(
        provider: Arc<dyn GeocodingProvider>,
        min_query_length: usize,
        fallback_label: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            min_query_length,
            fallback_label: fallback_label.into(),
        }
    }

    pub fn from_config(config: &GeocodingConfig) -> Self {
        let client = NominatimClient::new(
            config.endpoint.clone(),
            &config.user_agent,
            config.request_timeout(),
        );
        Self::new(
            Arc::new(client),
            config.min_query_length,
            config.fallback_label.clone(),
        )
    }

    /// Resolve a free-text address. Short input is rejected without a request.
    pub async fn resolve_address(&self, text: &str) -> AppResult<ResolvedPlace> {
        let query = validate_address_query(text, self.min_query_length).map_err(|e| {
            AppError::validation(
                "q",
                e,
                &format!(
                    "Bitte mindestens {} Zeichen eingeben",
                    self.min_query_length
                ),
            )
        })?;

        tracing::debug!(query, "Resolving address");

        let candidate = self
            .provider
            .search(query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(query.to_string()))?;

        tracing::info!(coordinate = %candidate.coordinate, "Address resolved");

        Ok(ResolvedPlace {
            coordinate: candidate.coordinate,
            display_name: candidate.display_name,
            source: PlaceSource::Address,
        })
    }

    /// Resolve the device position and label it. A failed reverse lookup
    /// falls back to the generic label and never fails the call.
    pub async fn resolve_device(&self, locator: &dyn DeviceLocator) -> AppResult<ResolvedPlace> {
        let coordinate = locator.locate().await?;

        let display_name = match self.provider.reverse(coordinate).await {
            Ok(Some(name)) => name,
            Ok(None) => self.fallback_label.clone(),
            Err(e) => {
                tracing::warn!(%coordinate, "Reverse lookup failed, using fallback label: {}", e);
                self.fallback_label.clone()
            }
        };

        Ok(ResolvedPlace {
            coordinate,
            display_name,
            source: PlaceSource::Device,
        })
    }
}

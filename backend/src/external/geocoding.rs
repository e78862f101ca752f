//! Nominatim geocoding client
//!
//! Forward search (address to coordinate) and reverse lookup (coordinate to
//! place name). Nominatim rejects requests without a User-Agent.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use shared::Coordinate;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::services::geocoding::{GeocodeCandidate, GeocodingProvider};

/// Nominatim API client
#[derive(Clone)]
pub struct NominatimClient {
    client: Client,
    base_url: String,
}

/// Nominatim search hit. Coordinates arrive as strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct NominatimReverse {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl NominatimPlace {
    fn into_candidate(self) -> Option<GeocodeCandidate> {
        let lat = self.lat.trim().parse::<f64>().ok()?;
        let lon = self.lon.trim().parse::<f64>().ok()?;
        let coordinate = Coordinate::new(lat, lon);
        coordinate.is_valid().then(|| GeocodeCandidate {
            coordinate,
            display_name: self.display_name,
        })
    }
}

impl NominatimClient {
    pub const ID: &'static str = "nominatim";

    pub fn new(base_url: String, user_agent: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::provider(Self::ID, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::provider(
                Self::ID,
                format!("API error: {} - {}", status, body),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::provider(Self::ID, format!("failed to parse response: {}", e)))
    }
}

#[async_trait]
impl GeocodingProvider for NominatimClient {
    async fn search(&self, query: &str) -> AppResult<Vec<GeocodeCandidate>> {
        let places: Vec<NominatimPlace> = self
            .get(
                "search",
                &[
                    ("q", query.to_string()),
                    ("format", "json".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        Ok(places
            .into_iter()
            .filter_map(NominatimPlace::into_candidate)
            .collect())
    }

    async fn reverse(&self, coordinate: Coordinate) -> AppResult<Option<String>> {
        let place: NominatimReverse = self
            .get(
                "reverse",
                &[
                    ("lat", coordinate.lat.to_string()),
                    ("lon", coordinate.lon.to_string()),
                    ("format", "json".to_string()),
                ],
            )
            .await?;

        if let Some(error) = place.error {
            tracing::debug!(%coordinate, "Reverse lookup returned no place: {}", error);
            return Ok(None);
        }

        Ok(place.display_name.filter(|name| !name.trim().is_empty()))
    }
}

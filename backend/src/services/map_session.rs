//! Map session provider
//!
//! Loads the interactive mapping SDK at most once per process. Concurrent
//! callers share the in-flight load, and its outcome (including failure) is
//! final for the lifetime of the provider.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

use crate::config::MapConfig;
use crate::error::{AppError, AppResult};
use crate::external::ScriptSdkLoader;

/// Loader for one mapping SDK
#[async_trait]
pub trait SdkLoader: Send + Sync {
    /// Identity used to coalesce loads
    fn sdk_id(&self) -> &str;

    /// Whether the SDK is already available without loading
    fn is_present(&self) -> bool;

    async fn load(&self) -> AppResult<()>;
}

/// Result of [`MapSessionProvider::acquire`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSession {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

type LoadCell = Arc<OnceCell<AppResult<()>>>;

pub struct MapSessionProvider {
    loader: Arc<dyn SdkLoader>,
    loads: Mutex<HashMap<String, LoadCell>>,
}

impl MapSessionProvider {
    pub fn new(loader: Arc<dyn SdkLoader>) -> Self {
        Self {
            loader,
            loads: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &MapConfig) -> Self {
        Self::new(Arc::new(ScriptSdkLoader::from_config(config)))
    }

    /// Acquire the configured SDK
    pub async fn acquire(&self) -> MapSession {
        let loader = Arc::clone(&self.loader);
        match self.acquire_with(loader).await {
            Ok(()) => MapSession {
                ready: true,
                error: None,
            },
            Err(e) => MapSession {
                ready: false,
                error: Some(e.to_string()),
            },
        }
    }

    /// Acquire any SDK, coalescing with other loads of the same identity
    pub async fn acquire_with(&self, loader: Arc<dyn SdkLoader>) -> AppResult<()> {
        let cell = self.cell_for(loader.sdk_id());

        let outcome = cell
            .get_or_init(|| async move {
                if loader.is_present() {
                    tracing::debug!(sdk = loader.sdk_id(), "Map SDK already present");
                    return Ok(());
                }

                tracing::info!(sdk = loader.sdk_id(), "Loading map SDK");
                match loader.load().await {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        tracing::error!(sdk = loader.sdk_id(), "Map SDK load failed: {}", e);
                        Err(match e {
                            AppError::SdkLoadError(message) => AppError::SdkLoadError(message),
                            other => AppError::SdkLoadError(other.to_string()),
                        })
                    }
                }
            })
            .await;
        outcome.clone()
    }

    fn cell_for(&self, sdk_id: &str) -> LoadCell {
        let mut loads = self.loads.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            loads
                .entry(sdk_id.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        )
    }
}

//! Mapping SDK script loader

use async_trait::async_trait;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::MapConfig;
use crate::error::{AppError, AppResult};
use crate::services::map_session::SdkLoader;

/// Fetches the SDK script (with its drawing and geometry libraries) once
#[derive(Clone)]
pub struct ScriptSdkLoader {
    client: Client,
    sdk_id: String,
    script_url: String,
    api_key: String,
    libraries: Vec<String>,
    loaded: Arc<AtomicBool>,
}

impl ScriptSdkLoader {
    pub fn from_config(config: &MapConfig) -> Self {
        Self {
            client: Client::new(),
            sdk_id: config.sdk_id.clone(),
            script_url: config.script_url.clone(),
            api_key: config.api_key.clone(),
            libraries: config.libraries.clone(),
            loaded: Arc::new(AtomicBool::new(false)),
        }
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if !self.api_key.is_empty() {
            query.push(("key", self.api_key.clone()));
        }
        if !self.libraries.is_empty() {
            query.push(("libraries", self.libraries.join(",")));
        }
        query
    }
}

#[async_trait]
impl SdkLoader for ScriptSdkLoader {
    fn sdk_id(&self) -> &str {
        &self.sdk_id
    }

    fn is_present(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    async fn load(&self) -> AppResult<()> {
        let response = self
            .client
            .get(&self.script_url)
            .query(&self.query())
            .send()
            .await
            .map_err(|e| AppError::SdkLoadError(format!("script request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::SdkLoadError(format!(
                "script returned {}",
                response.status()
            )));
        }

        let script = response
            .text()
            .await
            .map_err(|e| AppError::SdkLoadError(format!("failed to read script: {}", e)))?;

        if script.trim().is_empty() {
            return Err(AppError::SdkLoadError("script is empty".to_string()));
        }

        self.loaded.store(true, Ordering::Release);
        tracing::info!(sdk = %self.sdk_id, bytes = script.len(), "Map SDK script loaded");
        Ok(())
    }
}

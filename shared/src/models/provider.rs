//! Weather provider health records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health of a weather provider, persisted between sessions.
///
/// Older records only carry `provider_id`, `last_success_at` and
/// `consecutive_failures`; the remaining fields default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderStatus {
    pub provider_id: String,
    #[serde(default)]
    pub last_success_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub consecutive_failures: u32,
    /// Provider is tried first until this instant
    #[serde(default)]
    pub preferred_until: Option<DateTime<Utc>>,
    /// Provider is demoted until this instant
    #[serde(default)]
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl ProviderStatus {
    /// Status for a provider with no history
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            last_success_at: None,
            consecutive_failures: 0,
            preferred_until: None,
            cooldown_until: None,
        }
    }

    pub fn is_cooling_down(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.map(|until| until > now).unwrap_or(false)
    }

    pub fn is_preferred(&self, now: DateTime<Utc>) -> bool {
        self.preferred_until.map(|until| until > now).unwrap_or(false)
    }

    /// Record a successful fetch
    pub fn record_success(&mut self, now: DateTime<Utc>) {
        self.last_success_at = Some(now);
        self.consecutive_failures = 0;
        self.cooldown_until = None;
    }

    /// Record a failed fetch and demote for the given cool-down
    pub fn record_failure(&mut self, now: DateTime<Utc>, cooldown: chrono::Duration) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.cooldown_until = Some(now + cooldown);
        self.preferred_until = None;
    }
}

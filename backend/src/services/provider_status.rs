//! Provider status stores
//!
//! Status records steer fallback ordering across sessions. They are advisory:
//! the gateway always revalidates them against live failures.

use shared::ProviderStatus;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Storage for provider health, keyed by provider id
pub trait ProviderStatusStore: Send + Sync {
    fn get(&self, provider_id: &str) -> Option<ProviderStatus>;

    /// Record a status. Must not block the caller on slow storage.
    fn put(&self, status: ProviderStatus);

    fn all(&self) -> Vec<ProviderStatus>;
}

/// Process-local store
#[derive(Default)]
pub struct InMemoryStatusStore {
    entries: Mutex<HashMap<String, ProviderStatus>>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProviderStatusStore for InMemoryStatusStore {
    fn get(&self, provider_id: &str) -> Option<ProviderStatus> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(provider_id).cloned())
    }

    fn put(&self, status: ProviderStatus) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(status.provider_id.clone(), status);
        }
    }

    fn all(&self) -> Vec<ProviderStatus> {
        self.entries
            .lock()
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default()
    }
}

/// JSON file store at ~/.winter-service/provider-status.json.
///
/// Reads happen once at construction. Writes update memory immediately and are
/// flushed to disk on the blocking pool; a failed flush is logged and dropped.
/// Each write carries a version so a late write never replaces a newer file.
pub struct JsonFileStatusStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, ProviderStatus>>,
    version: AtomicU64,
    written: Arc<Mutex<u64>>,
}

impl JsonFileStatusStore {
    /// Load from the default location
    pub fn load() -> Self {
        Self::load_from(Self::default_path())
    }

    /// Load from a specific path. A missing or corrupt file is an empty history.
    pub fn load_from(path: PathBuf) -> Self {
        let entries = Self::read_file(&path).unwrap_or_default();
        tracing::debug!(path = %path.display(), providers = entries.len(), "Loaded provider status");
        Self {
            path,
            entries: Mutex::new(entries),
            version: AtomicU64::new(0),
            written: Arc::new(Mutex::new(0)),
        }
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".winter-service")
            .join("provider-status.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(path: &Path) -> Option<HashMap<String, ProviderStatus>> {
        let data = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&data) {
            Ok(entries) => Some(entries),
            Err(e) => {
                tracing::warn!(path = %path.display(), "Ignoring unreadable provider status file: {}", e);
                None
            }
        }
    }

    fn write_file(path: &Path, entries: &HashMap<String, ProviderStatus>) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(path, json)
    }

    /// Write the current state synchronously
    pub fn flush(&self) -> std::io::Result<()> {
        let mut written = self.written.lock().unwrap_or_else(|e| e.into_inner());
        let (snapshot, version) = match self.entries.lock() {
            Ok(entries) => (entries.clone(), self.version.load(Ordering::SeqCst)),
            Err(_) => return Ok(()),
        };
        Self::write_file(&self.path, &snapshot)?;
        *written = version;
        Ok(())
    }
}

impl ProviderStatusStore for JsonFileStatusStore {
    fn get(&self, provider_id: &str) -> Option<ProviderStatus> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(provider_id).cloned())
    }

    fn put(&self, status: ProviderStatus) {
        let (snapshot, version) = match self.entries.lock() {
            Ok(mut entries) => {
                entries.insert(status.provider_id.clone(), status);
                (entries.clone(), self.version.fetch_add(1, Ordering::SeqCst) + 1)
            }
            Err(_) => return,
        };

        let path = self.path.clone();
        let written = Arc::clone(&self.written);
        let write = move || {
            let mut written = written.lock().unwrap_or_else(|e| e.into_inner());
            if *written >= version {
                return;
            }
            match Self::write_file(&path, &snapshot) {
                Ok(()) => *written = version,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Failed to persist provider status: {}", e)
                }
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(write);
            }
            Err(_) => write(),
        }
    }

    fn all(&self) -> Vec<ProviderStatus> {
        self.entries
            .lock()
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default()
    }
}

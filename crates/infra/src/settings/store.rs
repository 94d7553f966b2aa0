//! JSON-file settings store
//!
//! Default implementation of the core `SettingsStore` port: a single JSON
//! document held in memory behind a `RwLock` and written through to disk on
//! every mutation. Writes go to a sibling temp file first and are renamed
//! into place so a crash mid-write cannot corrupt the store.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use beacon_core::SettingsStore;
use beacon_domain::{BeaconError, Result};
use parking_lot::RwLock;
use tracing::{debug, info};

/// Settings store backed by one JSON file (or pure memory for tests).
#[derive(Debug)]
pub struct JsonSettingsStore {
    path: Option<PathBuf>,
    values: RwLock<HashMap<String, serde_json::Value>>,
}

impl JsonSettingsStore {
    /// Open (or create) a store at the given path.
    ///
    /// # Errors
    /// Returns `BeaconError::Store` if an existing file cannot be read or
    /// parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|e| {
                BeaconError::Store(format!("failed to read {}: {e}", path.display()))
            })?;
            serde_json::from_str(&raw).map_err(|e| {
                BeaconError::Store(format!("corrupt settings file {}: {e}", path.display()))
            })?
        } else {
            HashMap::new()
        };

        info!(path = %path.display(), "settings store opened");
        Ok(Self { path: Some(path), values: RwLock::new(values) })
    }

    /// Purely in-memory store (no persistence). Used by tests and the
    /// suggestion-engine examples.
    #[must_use]
    pub fn in_memory() -> Self {
        Self { path: None, values: RwLock::new(HashMap::new()) }
    }

    fn persist(&self, values: &HashMap<String, serde_json::Value>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let serialized = serde_json::to_string_pretty(values)
            .map_err(|e| BeaconError::Internal(format!("failed to serialize settings: {e}")))?;

        let tmp_path = temp_path(path);
        fs::write(&tmp_path, serialized).map_err(|e| {
            BeaconError::Store(format!("failed to write {}: {e}", tmp_path.display()))
        })?;
        fs::rename(&tmp_path, path).map_err(|e| {
            BeaconError::Store(format!("failed to replace {}: {e}", path.display()))
        })?;

        debug!(path = %path.display(), "settings persisted");
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl SettingsStore for JsonSettingsStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        let mut values = self.values.write();
        values.insert(key.to_string(), value);
        self.persist(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write();
        values.remove(key);
        self.persist(&values)
    }
}

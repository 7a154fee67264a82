//! Durable key-value storage implementations.
//!
//! The interactor persists two things: the confirmed plan selection and
//! the page-impression marker. The contract is localStorage-shaped —
//! string keys, string values, last write wins, no error channel — so the
//! file-backed store logs persistence failures instead of returning them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

use crate::domain::StorageKey;
use crate::error::CheckoutError;
use crate::services::KeyValueStore;

/// In-memory store. Used by tests and by hosts that keep their own
/// persistence and only need the interactor's bookkeeping to work.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: StorageKey) -> Option<String> {
        self.inner.lock().unwrap().get(key.as_str()).cloned()
    }

    fn set(&self, key: StorageKey, value: &str) {
        self.inner
            .lock()
            .unwrap()
            .insert(key.as_str().to_string(), value.to_string());
    }

    fn remove(&self, key: StorageKey) {
        self.inner.lock().unwrap().remove(key.as_str());
    }
}

/// File-backed store: one JSON object per file.
///
/// Writes are atomic (temp file in the same directory, then rename) so a
/// crash mid-write never corrupts an existing store.
pub struct JsonFileStore {
    path: PathBuf,
    inner: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Open a store at `path`, loading existing entries if the file is
    /// present. A missing file starts empty; a malformed one is an error
    /// rather than a silent wipe.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CheckoutError> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                CheckoutError::Internal(format!("corrupt storage file '{}': {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(CheckoutError::Internal(format!(
                    "cannot read storage file '{}': {e}",
                    path.display()
                )))
            }
        };
        Ok(Self {
            path,
            inner: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), CheckoutError> {
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| CheckoutError::Internal(format!("storage serialisation: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| CheckoutError::StorageWriteFailed {
            path: self.path.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| CheckoutError::StorageWriteFailed {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: StorageKey) -> Option<String> {
        self.inner.lock().unwrap().get(key.as_str()).cloned()
    }

    fn set(&self, key: StorageKey, value: &str) {
        let mut entries = self.inner.lock().unwrap();
        entries.insert(key.as_str().to_string(), value.to_string());
        if let Err(e) = self.persist(&entries) {
            warn!(error = %e, key = key.as_str(), "storage write failed");
        }
    }

    fn remove(&self, key: StorageKey) {
        let mut entries = self.inner.lock().unwrap();
        entries.remove(key.as_str());
        if let Err(e) = self.persist(&entries) {
            warn!(error = %e, key = key.as_str(), "storage write failed");
        }
    }
}

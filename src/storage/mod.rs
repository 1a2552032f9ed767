// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistent key/value storage (the browser-storage layer).
//!
//! Values are JSON strings under stable keys. Reads never fail; writes may,
//! and callers decide whether a failed write matters.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Stable key names. Changing these invalidates caches and cooldowns.
pub mod keys {
    pub const RESTAURANTS_CACHE: &str = "restaurants_cache";
    pub const RESTAURANTS_CACHE_TIMESTAMP: &str = "restaurants_cache_timestamp";
    pub const USER_LOCATION: &str = "userLocation";
    /// Last explicit permission decision ("granted" / "denied")
    pub const LOCATION_PERMISSION_STATE: &str = "locationPermissionState";
    pub const LOCATION_PERMISSION_HANDLED: &str = "locationPermissionHandled";
    pub const LOCATION_PROMPT_LAST_SHOWN: &str = "locationPromptLastShown";
}

/// String key/value store that survives reloads.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read the raw value for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and deserialize a JSON value. Corrupt values are treated as absent.
pub fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "Ignoring corrupt stored value");
            None
        }
    }
}

/// Serialize and store a JSON value.
pub fn set_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|e| StorageError::Serialize(e.to_string()))?;
    store.set(key, &raw)
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to serialize value: {0}")]
    Serialize(String),

    #[error("Storage quota exceeded ({limit} bytes)")]
    QuotaExceeded { limit: usize },

    #[error("Storage I/O error: {0}")]
    Io(String),
}

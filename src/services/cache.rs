// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Restaurant collection cache on top of the key/value store.
//!
//! The payload and its timestamp live under two keys. Reads never fail and
//! writes never abort the caller: both log and move on.

use crate::models::{CacheEntry, Restaurant};
use crate::storage::{get_json, keys, set_json, KeyValueStore, StorageError};
use std::sync::Arc;

/// Persistent cache of the last fetched restaurant collection.
#[derive(Clone)]
pub struct RestaurantCache {
    store: Arc<dyn KeyValueStore>,
}

impl RestaurantCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read the cached entry. Missing or corrupt data is `None`.
    pub fn read(&self) -> Option<CacheEntry> {
        let timestamp: i64 = get_json(self.store.as_ref(), keys::RESTAURANTS_CACHE_TIMESTAMP)?;
        let data: Vec<Restaurant> = get_json(self.store.as_ref(), keys::RESTAURANTS_CACHE)?;
        Some(CacheEntry { data, timestamp })
    }

    /// Write an entry. Failures (e.g. quota) are logged and swallowed.
    pub fn write(&self, entry: &CacheEntry) {
        if let Err(e) = self.try_write(entry) {
            tracing::warn!(
                error = %e,
                count = entry.data.len(),
                "Failed to cache restaurants, continuing without cache"
            );
        }
    }

    /// Write an entry, reporting failures.
    ///
    /// The payload is written before the timestamp, so a failed write leaves
    /// either the previous entry or new data under an older timestamp.
    pub fn try_write(&self, entry: &CacheEntry) -> Result<(), StorageError> {
        set_json(self.store.as_ref(), keys::RESTAURANTS_CACHE, &entry.data)?;
        set_json(
            self.store.as_ref(),
            keys::RESTAURANTS_CACHE_TIMESTAMP,
            &entry.timestamp,
        )
    }

    pub fn clear(&self) {
        for key in [keys::RESTAURANTS_CACHE, keys::RESTAURANTS_CACHE_TIMESTAMP] {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(key, error = %e, "Failed to clear cache key");
            }
        }
    }
}

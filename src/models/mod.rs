// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the restaurant pipeline.

pub mod counters;
pub mod filters;
pub mod location;
pub mod restaurant;

pub use counters::{ActionState, CounterAction, CounterSnapshot, InteractionCounters};
pub use filters::{FilterCriteria, FilterKey, FilterValue};
pub use location::{Coordinates, LocationSource, UserLocation};
pub use restaurant::{Restaurant, RestaurantId, FALLBACK_IMAGE_URL};

use serde::{Deserialize, Serialize};

/// Cached restaurant collection with the time it was fetched (epoch millis).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Vec<Restaurant>,
    pub timestamp: i64,
}

impl CacheEntry {
    /// Whether the entry is younger than `max_age_ms` at `now`.
    pub fn is_fresh(&self, now: i64, max_age_ms: i64) -> bool {
        crate::time_utils::millis_since(self.timestamp, now) < max_age_ms
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! View/share/favorite counters for the selected restaurant.

use crate::models::Restaurant;
use serde::{Deserialize, Serialize};

/// Counters as displayed on the detail card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionCounters {
    pub views: u64,
    pub shares: u64,
    pub favorited: bool,
    pub favorite_count: u64,
}

impl InteractionCounters {
    /// Accept each incoming count only if strictly greater than the displayed one.
    ///
    /// `favorited` is local user state and is never taken from a refresh once
    /// initialized.
    pub fn merge_monotonic(&mut self, incoming: &CounterSnapshot) -> bool {
        let mut changed = false;
        for (current, new) in [
            (&mut self.views, incoming.views),
            (&mut self.shares, incoming.shares),
            (&mut self.favorite_count, incoming.favorite_count),
        ] {
            if let Some(new) = new {
                if new > *current {
                    *current = new;
                    changed = true;
                }
            }
        }
        changed
    }
}

/// Counts from a restaurant or summary payload. Missing values are unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub views: Option<u64>,
    pub shares: Option<u64>,
    pub favorite_count: Option<u64>,
    pub favorited: Option<bool>,
}

impl CounterSnapshot {
    pub fn into_counters(self) -> InteractionCounters {
        InteractionCounters {
            views: self.views.unwrap_or(0),
            shares: self.shares.unwrap_or(0),
            favorited: self.favorited.unwrap_or(false),
            favorite_count: self.favorite_count.unwrap_or(0),
        }
    }
}

impl From<&Restaurant> for CounterSnapshot {
    fn from(r: &Restaurant) -> Self {
        Self {
            views: r.view_count,
            shares: r.share_count,
            favorite_count: r.favorite_count,
            favorited: None,
        }
    }
}

/// User-initiated counter actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterAction {
    Share,
    Favorite,
}

/// Per restaurant+action lifecycle of an optimistic update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActionState {
    #[default]
    Idle,
    InFlight,
    /// Rolling back an optimistic change after a failed call
    Reverting,
}

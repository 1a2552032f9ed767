// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! View/share/favorite counters for the selected restaurant.
//!
//! Handles:
//! - One in-flight request per restaurant and action (reentrancy guard)
//! - Optimistic favorite toggles, reverted when the server call fails
//! - Replacing counts with the server's authoritative value
//! - Monotonic merging of counts arriving from summary refreshes

use crate::error::{AppError, Result};
use crate::models::{
    ActionState, CounterAction, CounterSnapshot, InteractionCounters, RestaurantId,
};
use crate::time_utils::format_utc_rfc3339;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

/// Backend counter endpoints. Each returns the authoritative new count.
pub trait CountersApi: Send + Sync + 'static {
    fn share(&self, id: &RestaurantId) -> impl Future<Output = Result<u64>> + Send;
    fn favorite(&self, id: &RestaurantId) -> impl Future<Output = Result<u64>> + Send;
    fn unfavorite(&self, id: &RestaurantId) -> impl Future<Output = Result<u64>> + Send;
}

// ─────────────────────────────────────────────────────────────────────────────
// HttpCountersApi
// ─────────────────────────────────────────────────────────────────────────────

/// Source tag sent with every counter request.
const DEFAULT_SOURCE: &str = "map";

/// HTTP client for `POST {base}/restaurants/{id}/share|favorite|unfavorite`.
#[derive(Clone)]
pub struct HttpCountersApi {
    http: reqwest::Client,
    base_url: String,
    source: String,
}

#[derive(Debug, Deserialize)]
struct CountEnvelope {
    data: CountData,
}

#[derive(Debug, Deserialize)]
struct CountData {
    share_count: Option<u64>,
    favorite_count: Option<u64>,
}

impl HttpCountersApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            source: DEFAULT_SOURCE.to_string(),
        })
    }

    /// Override the source tag (e.g. "list", "detail").
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    async fn post_action(&self, id: &RestaurantId, action: &str) -> Result<CountData> {
        let url = format!("{}/restaurants/{}/{}", self.base_url, id, action);

        let body = serde_json::json!({
            "timestamp": format_utc_rfc3339(chrono::Utc::now()),
            "source": self.source,
        });

        let response = self.http.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            if status == 404 {
                return Err(AppError::NotFound(format!("Restaurant {}", id)));
            }
            return Err(AppError::Api { status, body });
        }

        let envelope: CountEnvelope = response
            .json()
            .await
            .map_err(|e| AppError::Decode(format!("Failed to parse {} response: {}", action, e)))?;
        Ok(envelope.data)
    }
}

impl CountersApi for HttpCountersApi {
    async fn share(&self, id: &RestaurantId) -> Result<u64> {
        self.post_action(id, "share")
            .await?
            .share_count
            .ok_or_else(|| AppError::Decode("share response missing data.share_count".to_string()))
    }

    async fn favorite(&self, id: &RestaurantId) -> Result<u64> {
        self.post_action(id, "favorite")
            .await?
            .favorite_count
            .ok_or_else(|| {
                AppError::Decode("favorite response missing data.favorite_count".to_string())
            })
    }

    async fn unfavorite(&self, id: &RestaurantId) -> Result<u64> {
        self.post_action(id, "unfavorite")
            .await?
            .favorite_count
            .ok_or_else(|| {
                AppError::Decode("unfavorite response missing data.favorite_count".to_string())
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CountersReconciler
// ─────────────────────────────────────────────────────────────────────────────

/// Initialization phase for the selected restaurant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CountersPhase {
    #[default]
    Uninitialized,
    /// Selected; waiting for the first counts
    Initializing,
    /// Further counts are merged monotonically
    Initialized,
}

/// Counter state for the current selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountersSelection {
    pub restaurant_id: Option<RestaurantId>,
    pub phase: CountersPhase,
    pub counters: InteractionCounters,
}

/// Result of a user counter action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// Server confirmed; counters now hold its values
    Applied(InteractionCounters),
    /// Nothing selected, the same action is already in flight, or the
    /// selection moved to another restaurant before the server answered
    Skipped,
    /// Server call failed; optimistic changes were reverted
    Failed { notice: String },
}

const SHARE_FAILED_NOTICE: &str = "Couldn't record the share. Please try again.";
const FAVORITE_FAILED_NOTICE: &str = "Couldn't update favorites. Please try again.";

/// Reconciles optimistic and server-confirmed counters for the selected restaurant.
pub struct CountersReconciler<C> {
    api: C,
    selection: watch::Sender<CountersSelection>,
    /// Absent key means `Idle`.
    actions: DashMap<(RestaurantId, CounterAction), ActionState>,
}

impl<C: CountersApi> CountersReconciler<C> {
    pub fn new(api: C) -> Self {
        let (selection, _) = watch::channel(CountersSelection::default());
        Self {
            api,
            selection,
            actions: DashMap::new(),
        }
    }

    pub fn api(&self) -> &C {
        &self.api
    }

    pub fn snapshot(&self) -> CountersSelection {
        self.selection.borrow().clone()
    }

    pub fn counters(&self) -> InteractionCounters {
        self.selection.borrow().counters
    }

    pub fn phase(&self) -> CountersPhase {
        self.selection.borrow().phase
    }

    pub fn subscribe(&self) -> watch::Receiver<CountersSelection> {
        self.selection.subscribe()
    }

    pub fn action_state(&self, id: &RestaurantId, action: CounterAction) -> ActionState {
        self.actions
            .get(&(id.clone(), action))
            .map(|s| *s)
            .unwrap_or_default()
    }

    /// Select a restaurant. A different id resets the counters.
    pub fn select(&self, id: RestaurantId) {
        self.selection.send_if_modified(|sel| {
            if sel.restaurant_id.as_ref() == Some(&id) {
                return false;
            }
            tracing::debug!(restaurant_id = %id, "Counters selection changed");
            *sel = CountersSelection {
                restaurant_id: Some(id),
                phase: CountersPhase::Initializing,
                counters: InteractionCounters::default(),
            };
            true
        });
    }

    pub fn clear_selection(&self) {
        self.selection
            .send_replace(CountersSelection::default());
    }

    /// Apply counts from a restaurant or summary payload.
    ///
    /// The first snapshot after selection initializes the counters; later
    /// ones only raise values (strictly greater wins). Returns whether the
    /// displayed counters changed.
    pub fn apply_snapshot(&self, id: &RestaurantId, snapshot: CounterSnapshot) -> bool {
        self.select(id.clone());
        self.selection.send_if_modified(|sel| match sel.phase {
            CountersPhase::Initialized => sel.counters.merge_monotonic(&snapshot),
            CountersPhase::Initializing | CountersPhase::Uninitialized => {
                sel.counters = snapshot.into_counters();
                sel.phase = CountersPhase::Initialized;
                true
            }
        })
    }

    /// Record a share of the selected restaurant.
    pub async fn share(&self) -> ActionOutcome {
        let Some(id) = self.selected_id() else {
            return ActionOutcome::Skipped;
        };
        let Some(_guard) = self.try_begin(&id, CounterAction::Share) else {
            tracing::debug!(restaurant_id = %id, "Share already in flight");
            return ActionOutcome::Skipped;
        };

        match self.api.share(&id).await {
            Ok(count) => match self.update_if_selected(&id, |c| c.shares = count) {
                Some(counters) => ActionOutcome::Applied(counters),
                None => ActionOutcome::Skipped,
            },
            Err(e) => {
                tracing::warn!(restaurant_id = %id, error = %e, "Share failed");
                ActionOutcome::Failed {
                    notice: SHARE_FAILED_NOTICE.to_string(),
                }
            }
        }
    }

    /// Toggle favorite for the selected restaurant, optimistically.
    pub async fn toggle_favorite(&self) -> ActionOutcome {
        let Some(id) = self.selected_id() else {
            return ActionOutcome::Skipped;
        };
        let Some(guard) = self.try_begin(&id, CounterAction::Favorite) else {
            tracing::debug!(restaurant_id = %id, "Favorite toggle already in flight");
            return ActionOutcome::Skipped;
        };

        let was_favorited = self.counters().favorited;
        self.update_if_selected(&id, |c| c.favorited = !was_favorited);

        let result = if was_favorited {
            self.api.unfavorite(&id).await
        } else {
            self.api.favorite(&id).await
        };

        match result {
            Ok(count) => match self.update_if_selected(&id, |c| c.favorite_count = count) {
                Some(counters) => ActionOutcome::Applied(counters),
                None => ActionOutcome::Skipped,
            },
            Err(e) => {
                tracing::warn!(restaurant_id = %id, error = %e, "Favorite toggle failed, reverting");
                guard.set(ActionState::Reverting);
                self.update_if_selected(&id, |c| c.favorited = was_favorited);
                ActionOutcome::Failed {
                    notice: FAVORITE_FAILED_NOTICE.to_string(),
                }
            }
        }
    }

    fn selected_id(&self) -> Option<RestaurantId> {
        self.selection.borrow().restaurant_id.clone()
    }

    /// Modify counters only if `id` is still the selection.
    ///
    /// Returns the resulting counters, or `None` if the selection moved on.
    fn update_if_selected(
        &self,
        id: &RestaurantId,
        f: impl FnOnce(&mut InteractionCounters),
    ) -> Option<InteractionCounters> {
        let mut updated = None;
        self.selection.send_if_modified(|sel| {
            if sel.restaurant_id.as_ref() != Some(id) {
                return false;
            }
            let before = sel.counters;
            f(&mut sel.counters);
            updated = Some(sel.counters);
            sel.counters != before
        });
        updated
    }

    /// Mark `action` in flight, or `None` if it already is.
    fn try_begin(&self, id: &RestaurantId, action: CounterAction) -> Option<ActionGuard<'_>> {
        let key = (id.clone(), action);
        match self.actions.entry(key.clone()) {
            Entry::Occupied(mut e) => {
                if *e.get() != ActionState::Idle {
                    return None;
                }
                e.insert(ActionState::InFlight);
            }
            Entry::Vacant(e) => {
                e.insert(ActionState::InFlight);
            }
        }
        Some(ActionGuard {
            actions: &self.actions,
            key,
        })
    }
}

/// Returns the action to `Idle` when dropped.
struct ActionGuard<'a> {
    actions: &'a DashMap<(RestaurantId, CounterAction), ActionState>,
    key: (RestaurantId, CounterAction),
}

impl ActionGuard<'_> {
    fn set(&self, state: ActionState) {
        self.actions.insert(self.key.clone(), state);
    }
}

impl Drop for ActionGuard<'_> {
    fn drop(&mut self) {
        self.actions.remove(&self.key);
    }
}

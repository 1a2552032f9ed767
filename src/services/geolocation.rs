// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geolocation permission tracking and prompt cooldown.
//!
//! Wraps the platform location API. Permission decisions, the last known
//! location and the prompt bookkeeping are persisted so the user is not
//! re-prompted on every reload.

use crate::models::{LocationSource, UserLocation};
use crate::storage::{get_json, keys, set_json, KeyValueStore};
use crate::time_utils::{millis_since, now_millis};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Browser-style permission state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    #[default]
    Prompt,
    Granted,
    Denied,
}

/// Errors from the platform location API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location unavailable: {0}")]
    Unavailable(String),

    #[error("Location request timed out")]
    Timeout,

    #[error("Location services are not supported on this device")]
    Unsupported,
}

/// Platform location capability.
pub trait LocationProvider: Send + Sync + 'static {
    /// Whether the platform exposes a location API at all.
    fn is_supported(&self) -> bool;

    /// Ask the platform for the current position (may show the system dialog).
    fn current_position(
        &self,
    ) -> impl Future<Output = Result<UserLocation, LocationError>> + Send;
}

/// Platform without a location API.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedLocationProvider;

impl LocationProvider for UnsupportedLocationProvider {
    fn is_supported(&self) -> bool {
        false
    }

    async fn current_position(&self) -> Result<UserLocation, LocationError> {
        Err(LocationError::Unsupported)
    }
}

/// Provider with a fixed answer, for command-line use.
#[derive(Debug, Clone)]
pub struct FixedLocationProvider {
    location: Option<UserLocation>,
}

impl FixedLocationProvider {
    /// `None` behaves like a platform without location services.
    pub fn new(location: Option<UserLocation>) -> Self {
        Self { location }
    }
}

impl LocationProvider for FixedLocationProvider {
    fn is_supported(&self) -> bool {
        self.location.is_some()
    }

    async fn current_position(&self) -> Result<UserLocation, LocationError> {
        self.location.clone().ok_or(LocationError::Unsupported)
    }
}

/// Observable geolocation state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeolocationState {
    pub permission: PermissionState,
    pub location: Option<UserLocation>,
    pub location_source: Option<LocationSource>,
    /// Whether the automatic prompt was already shown this session
    pub prompt_shown_this_session: bool,
}

/// Geolocation service with persisted permission bookkeeping.
pub struct GeolocationService<P> {
    provider: P,
    store: Arc<dyn KeyValueStore>,
    cooldown: chrono::Duration,
    state: watch::Sender<GeolocationState>,
}

impl<P: LocationProvider> GeolocationService<P> {
    /// Create the service, restoring any persisted decision and location.
    pub fn new(provider: P, store: Arc<dyn KeyValueStore>, cooldown: chrono::Duration) -> Self {
        let permission = get_json::<PermissionState>(store.as_ref(), keys::LOCATION_PERMISSION_STATE)
            .unwrap_or_default();
        let (state, _) = watch::channel(GeolocationState {
            permission,
            ..Default::default()
        });

        let service = Self {
            provider,
            store,
            cooldown,
            state,
        };
        service.restore();
        service
    }

    pub fn is_supported(&self) -> bool {
        self.provider.is_supported()
    }

    pub fn permission(&self) -> PermissionState {
        self.state.borrow().permission
    }

    /// Last known location, if any.
    pub fn location(&self) -> Option<UserLocation> {
        self.state.borrow().location.clone()
    }

    pub fn snapshot(&self) -> GeolocationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GeolocationState> {
        self.state.subscribe()
    }

    /// Load the persisted location (lower confidence than an explicit grant).
    pub fn restore(&self) -> Option<UserLocation> {
        let stored = self.persisted_location()?;
        self.accept_location(stored.clone(), LocationSource::Persisted)
            .then_some(stored)
    }

    /// Adopt a location unless it would replace a higher-confidence one.
    ///
    /// Returns whether the location was applied.
    pub fn accept_location(&self, location: UserLocation, source: LocationSource) -> bool {
        let mut applied = false;
        self.state.send_if_modified(|state| {
            if state.location_source.is_some_and(|current| current > source) {
                tracing::debug!(?source, "Ignoring lower-confidence location");
                return false;
            }
            if state.location.as_ref() == Some(&location) && state.location_source == Some(source)
            {
                return false;
            }
            state.location = Some(location);
            state.location_source = Some(source);
            applied = true;
            true
        });
        applied
    }

    /// Whether the automatic permission prompt should be shown now.
    pub fn should_show_prompt(&self) -> bool {
        self.should_show_prompt_at(now_millis())
    }

    /// Prompt eligibility at `now` (epoch millis).
    ///
    /// All must hold: platform support, no current or persisted location, no
    /// persisted handled flag, not shown this session, state `Prompt`, and
    /// the cooldown elapsed since the last time it was shown.
    pub fn should_show_prompt_at(&self, now: i64) -> bool {
        if !self.provider.is_supported() {
            return false;
        }

        {
            let state = self.state.borrow();
            if state.location.is_some()
                || state.prompt_shown_this_session
                || state.permission != PermissionState::Prompt
            {
                return false;
            }
        }

        if self.persisted_location().is_some() || self.prompt_handled() {
            return false;
        }

        match get_json::<i64>(self.store.as_ref(), keys::LOCATION_PROMPT_LAST_SHOWN) {
            Some(last_shown) => {
                millis_since(last_shown, now) >= self.cooldown.num_milliseconds()
            }
            None => true,
        }
    }

    /// Record that the prompt was shown (session flag + persisted timestamp).
    pub fn mark_prompt_shown(&self) {
        self.mark_prompt_shown_at(now_millis());
    }

    pub fn mark_prompt_shown_at(&self, now: i64) {
        self.state
            .send_modify(|state| state.prompt_shown_this_session = true);
        self.persist(keys::LOCATION_PROMPT_LAST_SHOWN, &now);
    }

    /// User closed the prompt without deciding.
    pub fn dismiss_prompt(&self) {
        tracing::info!("Location prompt dismissed");
        self.state
            .send_modify(|state| state.prompt_shown_this_session = true);
        self.persist(keys::LOCATION_PERMISSION_HANDLED, &true);
    }

    /// Explicitly request the current location (user action).
    ///
    /// Grant persists the location and the decision; denial is recorded and
    /// never retried automatically. Timeouts leave the state unchanged.
    pub async fn request_location(&self) -> Result<UserLocation, LocationError> {
        if !self.provider.is_supported() {
            tracing::debug!("Geolocation not supported, skipping request");
            return Err(LocationError::Unsupported);
        }

        match self.provider.current_position().await {
            Ok(mut location) => {
                location.timestamp.get_or_insert_with(now_millis);
                self.state.send_modify(|state| {
                    state.permission = PermissionState::Granted;
                    state.location = Some(location.clone());
                    state.location_source = Some(LocationSource::Explicit);
                    state.prompt_shown_this_session = true;
                });
                self.persist(keys::USER_LOCATION, &location);
                self.persist(keys::LOCATION_PERMISSION_STATE, &PermissionState::Granted);
                self.persist(keys::LOCATION_PERMISSION_HANDLED, &true);
                tracing::info!(accuracy = ?location.accuracy, "Location permission granted");
                Ok(location)
            }
            Err(LocationError::PermissionDenied) => {
                self.state.send_modify(|state| {
                    state.permission = PermissionState::Denied;
                    state.prompt_shown_this_session = true;
                });
                self.persist(keys::LOCATION_PERMISSION_STATE, &PermissionState::Denied);
                self.persist(keys::LOCATION_PERMISSION_HANDLED, &true);
                tracing::info!("Location permission denied");
                Err(LocationError::PermissionDenied)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to get current position");
                Err(e)
            }
        }
    }

    fn persisted_location(&self) -> Option<UserLocation> {
        get_json::<UserLocation>(self.store.as_ref(), keys::USER_LOCATION)
            .filter(|loc| loc.coordinates().is_some())
    }

    fn prompt_handled(&self) -> bool {
        get_json::<bool>(self.store.as_ref(), keys::LOCATION_PERMISSION_HANDLED).unwrap_or(false)
    }

    fn persist<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = set_json(self.store.as_ref(), key, value) {
            tracing::warn!(key, error = %e, "Failed to persist geolocation state");
        }
    }
}

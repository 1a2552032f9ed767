// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Search bar input: debounced search-changed notifications and place
//! autocomplete.
//!
//! Autocomplete runs on a longer debounce than search to bound calls to the
//! external places service. Its failures only clear the suggestions.

use crate::error::Result;
use crate::services::throttle::Debouncer;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// One autocomplete prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceSuggestion {
    pub place_id: String,
    pub description: String,
}

/// Restrictions passed to the places service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceOptions {
    pub types: Vec<String>,
    pub country: Option<String>,
}

impl Default for PlaceOptions {
    fn default() -> Self {
        Self {
            types: vec!["establishment".to_string(), "geocode".to_string()],
            country: Some("us".to_string()),
        }
    }
}

/// External place autocomplete collaborator.
pub trait PlacesAutocomplete: Send + Sync + 'static {
    fn get_place_predictions(
        &self,
        query: &str,
        options: &PlaceOptions,
    ) -> impl Future<Output = Result<Vec<PlaceSuggestion>>> + Send;
}

/// Places service that never suggests anything (no API key configured).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPlaces;

impl PlacesAutocomplete for NoPlaces {
    async fn get_place_predictions(
        &self,
        _query: &str,
        _options: &PlaceOptions,
    ) -> Result<Vec<PlaceSuggestion>> {
        Ok(Vec::new())
    }
}

/// Debounced search text plus autocomplete suggestions.
pub struct SearchInput {
    search: Debouncer<String>,
    places: Debouncer<String>,
    suggestions: Arc<watch::Sender<Vec<PlaceSuggestion>>>,
}

impl SearchInput {
    /// `on_search` receives the trimmed query after `search_delay` of quiet;
    /// `places_api` is queried after `places_delay` of quiet.
    pub fn new<P, F>(
        places_api: Arc<P>,
        options: PlaceOptions,
        search_delay: Duration,
        places_delay: Duration,
        mut on_search: F,
    ) -> Self
    where
        P: PlacesAutocomplete,
        F: FnMut(String) + Send + 'static,
    {
        let (tx, _) = watch::channel(Vec::new());
        let suggestions = Arc::new(tx);

        let search = Debouncer::new(search_delay, move |query: String| {
            tracing::debug!(query = %query, "Search changed");
            on_search(query);
        });

        let latest = Arc::new(AtomicU64::new(0));
        let sink = suggestions.clone();
        let places = Debouncer::new(places_delay, move |query: String| {
            let generation = latest.fetch_add(1, Ordering::SeqCst) + 1;
            if query.is_empty() {
                sink.send_replace(Vec::new());
                return;
            }

            let places_api = places_api.clone();
            let options = options.clone();
            let latest = latest.clone();
            let sink = sink.clone();
            tokio::spawn(async move {
                let found = match places_api.get_place_predictions(&query, &options).await {
                    Ok(found) => found,
                    Err(e) => {
                        tracing::warn!(query = %query, error = %e, "Place autocomplete failed");
                        Vec::new()
                    }
                };
                // Only the most recent query may publish suggestions.
                if latest.load(Ordering::SeqCst) == generation {
                    sink.send_replace(found);
                }
            });
        });

        Self {
            search,
            places,
            suggestions,
        }
    }

    /// Feed the current text of the search box.
    pub fn set_query(&self, text: &str) {
        let query = text.trim().to_string();
        self.search.call(query.clone());
        self.places.call(query);
    }

    pub fn suggestions(&self) -> Vec<PlaceSuggestion> {
        self.suggestions.borrow().clone()
    }

    pub fn subscribe_suggestions(&self) -> watch::Receiver<Vec<PlaceSuggestion>> {
        self.suggestions.subscribe()
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Map/list view controller.
//!
//! Handles the core workflow:
//! 1. Load the full collection (cache or network) on mount
//! 2. Post a throttled filter request whenever the dataset, search text,
//!    filters or user location change
//! 3. Replace the displayed subset with each current worker result
//! 4. Build detail cards and drive counter actions for the selection
//!
//! All failures end up in [`ViewState`]; nothing is propagated to callers.

use crate::config::Config;
use crate::error::AppError;
use crate::models::{
    Coordinates, CounterSnapshot, FilterCriteria, FilterKey, FilterValue, InteractionCounters,
    LocationSource, Restaurant, RestaurantId, UserLocation,
};
use crate::services::counters::{ActionOutcome, CountersApi, CountersReconciler};
use crate::services::fetcher::{
    DataSource, FetchOutcome, ListQuery, RestaurantApi, RestaurantFetcher,
};
use crate::services::filter_worker::{FilterInputs, FilterPoster, FilterWorker};
use crate::services::geolocation::{
    GeolocationService, LocationError, LocationProvider, PermissionState,
};
use crate::services::throttle::Throttle;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Everything the map and list views render from.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    /// Full dataset, replaced whole on every load
    pub all_restaurants: Arc<Vec<Restaurant>>,
    /// Filtered/sorted subset from the latest worker result
    pub displayed: Vec<Restaurant>,
    pub loading: bool,
    /// Error banner text; a retry is offered while set
    pub error: Option<String>,
    /// Non-fatal banner, e.g. serving stale cached data
    pub warning: Option<String>,
    /// Transient toast (failed share/favorite, location problems)
    pub notice: Option<String>,
    pub data_source: Option<DataSource>,
    pub search_query: String,
    pub filters: FilterCriteria,
    pub user_location: Option<UserLocation>,
    pub permission: PermissionState,
    pub show_location_prompt: bool,
    pub selected: Option<RestaurantId>,
    /// Request id of the worker result currently displayed
    pub result_id: u64,
}

/// Display values for a restaurant's detail card.
#[derive(Debug, Clone, PartialEq)]
pub struct RestaurantCard {
    pub id: RestaurantId,
    pub name: String,
    pub address: String,
    pub rating: Option<f64>,
    pub price_range: Option<String>,
    pub kosher_category: Option<String>,
    pub certifying_agency: Option<String>,
    pub image_url: String,
    pub distance: Option<String>,
    pub counters: InteractionCounters,
}

/// Data handed to the map library for one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub id: RestaurantId,
    pub name: String,
    pub position: Coordinates,
}

/// How a `load()` call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Loaded { count: usize, source: DataSource },
    /// Superseded by a newer load
    Cancelled,
    /// No data available; the error banner is shown
    Failed,
}

/// Canonical map/list controller over injectable collaborators.
pub struct MapController<A, P, C> {
    config: Config,
    fetcher: Arc<RestaurantFetcher<A>>,
    geolocation: Arc<GeolocationService<P>>,
    counters: Arc<CountersReconciler<C>>,
    state: Arc<watch::Sender<ViewState>>,
    poster: FilterPoster,
    throttle: Throttle<()>,
    load_generation: AtomicU64,
    applier: JoinHandle<()>,
}

impl<A, P, C> MapController<A, P, C>
where
    A: RestaurantApi,
    P: LocationProvider,
    C: CountersApi,
{
    /// Create the controller and start its filter worker.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        config: Config,
        fetcher: Arc<RestaurantFetcher<A>>,
        geolocation: Arc<GeolocationService<P>>,
        counters: Arc<CountersReconciler<C>>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ViewState {
            permission: geolocation.permission(),
            ..Default::default()
        });
        let state = Arc::new(state_tx);

        let (poster, mut results, _worker) = FilterWorker::spawn();

        // Inputs are read when the window closes, so the latest values are sent.
        let throttle = {
            let state = state.clone();
            let poster = poster.clone();
            Throttle::new(config.filter_throttle, move |()| {
                let inputs = {
                    let s = state.borrow();
                    FilterInputs {
                        restaurants: s.all_restaurants.as_ref().clone(),
                        search_query: s.search_query.clone(),
                        active_filters: s.filters.clone(),
                        user_location: s.user_location.clone(),
                    }
                };
                if let Err(e) = poster.post(inputs) {
                    tracing::error!(error = %e, "Failed to post filter request");
                }
            })
        };

        let applier = {
            let state = state.clone();
            tokio::spawn(async move {
                while let Some((request_id, restaurants)) = results.recv().await {
                    tracing::debug!(request_id, count = restaurants.len(), "Applying filter result");
                    state.send_modify(|s| {
                        s.displayed = restaurants;
                        s.result_id = request_id;
                    });
                }
            })
        };

        Self {
            config,
            fetcher,
            geolocation,
            counters,
            state,
            poster,
            throttle,
            load_generation: AtomicU64::new(0),
            applier,
        }
    }

    // ─── Observation ─────────────────────────────────────────────

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn fetcher(&self) -> &RestaurantFetcher<A> {
        &self.fetcher
    }

    pub fn geolocation(&self) -> &GeolocationService<P> {
        &self.geolocation
    }

    pub fn counters(&self) -> &CountersReconciler<C> {
        &self.counters
    }

    /// Number of filter requests posted to the worker so far.
    pub fn filter_requests_posted(&self) -> u64 {
        self.poster.latest_request_id()
    }

    // ─── Loading ─────────────────────────────────────────────────

    /// Restore the user's location, decide on the location prompt, and load.
    pub async fn mount(&self) -> LoadStatus {
        self.geolocation.restore();
        if let Some(location) = self.geolocation.location() {
            tracing::debug!("Using known user location");
            self.state
                .send_modify(|s| s.user_location = Some(location));
        }

        if self.geolocation.should_show_prompt() {
            self.geolocation.mark_prompt_shown();
            self.state.send_modify(|s| s.show_location_prompt = true);
        }

        self.load().await
    }

    /// Load the full collection, superseding any load in progress.
    pub async fn load(&self) -> LoadStatus {
        let generation = self.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        let mut query = ListQuery::new(self.config.restaurant_limit);
        query.near = self
            .state
            .borrow()
            .user_location
            .as_ref()
            .and_then(UserLocation::coordinates);

        let outcome = self.fetcher.fetch(query).await;

        if self.load_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "Ignoring outcome of superseded load");
            return LoadStatus::Cancelled;
        }

        match outcome {
            Ok(FetchOutcome::Loaded(loaded)) => {
                let count = loaded.restaurants.len();
                let source = loaded.source;
                if let Some(warning) = &loaded.warning {
                    tracing::warn!(count, warning = %warning, "Operating on cached data");
                }
                self.state.send_modify(|s| {
                    s.all_restaurants = Arc::new(loaded.restaurants);
                    s.loading = false;
                    s.error = None;
                    s.warning = loaded.warning;
                    s.data_source = Some(source);
                });
                self.schedule_filter();
                LoadStatus::Loaded { count, source }
            }
            Ok(FetchOutcome::Cancelled) => {
                // Explicit cancel: no newer load will clear the flag
                if self.load_generation.load(Ordering::SeqCst) == generation {
                    self.state.send_modify(|s| s.loading = false);
                }
                LoadStatus::Cancelled
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load restaurants");
                self.state.send_modify(|s| {
                    s.all_restaurants = Arc::new(Vec::new());
                    s.displayed.clear();
                    s.loading = false;
                    s.error = Some(e.user_message());
                    s.warning = None;
                    s.data_source = None;
                });
                LoadStatus::Failed
            }
        }
    }

    /// Retry after a failed load.
    pub async fn retry(&self) -> LoadStatus {
        tracing::info!("Retrying restaurant load");
        self.load().await
    }

    /// Cancel any load in progress (e.g. when the view unmounts).
    pub async fn cancel_load(&self) {
        self.fetcher.cancel().await;
    }

    // ─── Filter inputs ───────────────────────────────────────────

    pub fn set_search_query(&self, query: &str) {
        let changed = self.state.send_if_modified(|s| {
            if s.search_query == query {
                return false;
            }
            s.search_query = query.to_string();
            true
        });
        if changed {
            self.schedule_filter();
        }
    }

    pub fn toggle_filter(&self, key: impl Into<FilterKey>) {
        let key = key.into();
        self.state.send_modify(|s| s.filters.toggle(key));
        self.schedule_filter();
    }

    pub fn set_filter(&self, key: impl Into<FilterKey>, value: impl Into<FilterValue>) {
        let (key, value) = (key.into(), value.into());
        self.state.send_modify(|s| s.filters.set(key, value));
        self.schedule_filter();
    }

    pub fn clear_filter(&self, key: &FilterKey) {
        self.state.send_modify(|s| s.filters.clear(key));
        self.schedule_filter();
    }

    pub fn clear_filters(&self) {
        self.state.send_modify(|s| s.filters.clear_all());
        self.schedule_filter();
    }

    /// Use a location from another source (map center, stored value, ...).
    ///
    /// Ignored if it would replace a location the user granted this session.
    pub fn set_user_location(&self, location: UserLocation, source: LocationSource) {
        if self.geolocation.accept_location(location.clone(), source) {
            self.state
                .send_modify(|s| s.user_location = Some(location));
            self.schedule_filter();
        }
    }

    // ─── Geolocation ─────────────────────────────────────────────

    /// Explicit user request for their location.
    pub async fn request_location(&self) -> Option<UserLocation> {
        let result = self.geolocation.request_location().await;
        let permission = self.geolocation.permission();

        match result {
            Ok(location) => {
                self.state.send_modify(|s| {
                    s.user_location = Some(location.clone());
                    s.permission = permission;
                    s.show_location_prompt = false;
                });
                self.schedule_filter();
                Some(location)
            }
            Err(LocationError::Unsupported) => None,
            Err(e) => {
                let notice = AppError::from(e).user_message();
                self.state.send_modify(|s| {
                    s.permission = permission;
                    s.show_location_prompt = false;
                    s.notice = Some(notice);
                });
                None
            }
        }
    }

    pub fn dismiss_location_prompt(&self) {
        self.geolocation.dismiss_prompt();
        self.state.send_modify(|s| s.show_location_prompt = false);
    }

    // ─── Selection and counters ──────────────────────────────────

    /// Select a restaurant for the detail card.
    pub fn select_restaurant(&self, id: &RestaurantId) -> Option<RestaurantCard> {
        let restaurant = self
            .state
            .borrow()
            .all_restaurants
            .iter()
            .find(|r| r.id.as_ref() == Some(id))
            .cloned()?;

        self.counters
            .apply_snapshot(id, CounterSnapshot::from(&restaurant));
        self.state.send_modify(|s| s.selected = Some(id.clone()));
        Some(self.card_for(&restaurant))
    }

    pub fn deselect(&self) {
        self.counters.clear_selection();
        self.state.send_modify(|s| s.selected = None);
    }

    /// Apply counts from a summary refresh; ignored unless `id` is selected.
    pub fn refresh_counters(&self, id: &RestaurantId, snapshot: CounterSnapshot) -> bool {
        if self.state.borrow().selected.as_ref() != Some(id) {
            return false;
        }
        self.counters.apply_snapshot(id, snapshot)
    }

    pub async fn share_selected(&self) -> ActionOutcome {
        let outcome = self.counters.share().await;
        self.surface_notice(&outcome);
        outcome
    }

    pub async fn toggle_favorite_selected(&self) -> ActionOutcome {
        let outcome = self.counters.toggle_favorite().await;
        self.surface_notice(&outcome);
        outcome
    }

    pub fn dismiss_notice(&self) {
        self.state.send_modify(|s| s.notice = None);
    }

    /// Detail-card display values for `restaurant`.
    pub fn card_for(&self, restaurant: &Restaurant) -> RestaurantCard {
        let user_location = self.state.borrow().user_location.clone();
        let counters = match &restaurant.id {
            Some(id) if self.counters.snapshot().restaurant_id.as_ref() == Some(id) => {
                self.counters.counters()
            }
            _ => CounterSnapshot::from(restaurant).into_counters(),
        };

        RestaurantCard {
            id: restaurant.id.clone().unwrap_or(RestaurantId::Int(0)),
            name: restaurant.name.clone(),
            address: restaurant.display_address(),
            rating: restaurant.rating(),
            price_range: restaurant.price_range.clone(),
            kosher_category: restaurant.kosher_category.clone(),
            certifying_agency: restaurant.certifying_agency.clone(),
            image_url: restaurant.image_or_fallback().to_string(),
            distance: restaurant.display_distance(user_location.as_ref(), self.config.distance_unit),
            counters,
        }
    }

    /// Markers for the displayed restaurants that have coordinates.
    pub fn markers(&self) -> Vec<MapMarker> {
        self.state
            .borrow()
            .displayed
            .iter()
            .filter_map(|r| {
                Some(MapMarker {
                    id: r.id.clone()?,
                    name: r.name.clone(),
                    position: r.coordinates()?,
                })
            })
            .collect()
    }

    fn surface_notice(&self, outcome: &ActionOutcome) {
        if let ActionOutcome::Failed { notice } = outcome {
            let notice = notice.clone();
            self.state.send_modify(|s| s.notice = Some(notice));
        }
    }

    fn schedule_filter(&self) {
        self.throttle.call(());
    }
}

impl<A, P, C> Drop for MapController<A, P, C> {
    fn drop(&mut self) {
        self.applier.abort();
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use restaurant_map::config::Config;
use restaurant_map::error::{AppError, Result};
use restaurant_map::models::{Restaurant, RestaurantId, UserLocation};
use restaurant_map::services::{
    CountersApi, CountersReconciler, GeolocationService, LocationError, LocationProvider,
    MapController, PlaceOptions, PlaceSuggestion, PlacesAutocomplete, RestaurantApi,
    RestaurantCache, RestaurantFetcher,
};
use restaurant_map::services::fetcher::ListQuery;
use restaurant_map::storage::{KeyValueStore, MemoryStore};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Build a restaurant with an id, name and position.
#[allow(dead_code)]
pub fn restaurant(id: i64, name: &str, lat: f64, lng: f64) -> Restaurant {
    Restaurant {
        id: Some(RestaurantId::Int(id)),
        name: name.to_string(),
        latitude: Some(lat),
        longitude: Some(lng),
        ..Default::default()
    }
}

/// Fresh in-memory store.
#[allow(dead_code)]
pub fn memory_store() -> Arc<dyn KeyValueStore> {
    Arc::new(MemoryStore::new())
}

// ─── Restaurant API ──────────────────────────────────────────────

/// Scriptable restaurant list API.
#[derive(Default)]
pub struct FakeRestaurantApi {
    response: Mutex<Option<Vec<Restaurant>>>,
    failure: Mutex<Option<String>>,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
    queries: Mutex<Vec<ListQuery>>,
}

#[allow(dead_code)]
impl FakeRestaurantApi {
    pub fn returning(restaurants: Vec<Restaurant>) -> Self {
        let api = Self::default();
        api.set_response(restaurants);
        api
    }

    pub fn failing(message: &str) -> Self {
        let api = Self::default();
        api.set_failure(message);
        api
    }

    pub fn set_response(&self, restaurants: Vec<Restaurant>) {
        *self.response.lock().unwrap() = Some(restaurants);
        *self.failure.lock().unwrap() = None;
    }

    pub fn set_failure(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<ListQuery> {
        self.queries.lock().unwrap().last().cloned()
    }
}

impl RestaurantApi for FakeRestaurantApi {
    async fn fetch_restaurants(&self, query: &ListQuery) -> Result<Vec<Restaurant>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(AppError::Network(message));
        }
        Ok(self.response.lock().unwrap().clone().unwrap_or_default())
    }
}

// ─── Counters API ────────────────────────────────────────────────

/// In-memory counters backend.
#[derive(Default)]
pub struct FakeCountersApi {
    pub shares: AtomicU64,
    pub favorites: AtomicU64,
    fail: AtomicBool,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeCountersApi {
    pub fn with_counts(shares: u64, favorites: u64) -> Self {
        let api = Self::default();
        api.shares.store(shares, Ordering::SeqCst);
        api.favorites.store(favorites, Ordering::SeqCst);
        api
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn begin(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Api {
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(())
    }
}

impl CountersApi for FakeCountersApi {
    async fn share(&self, _id: &RestaurantId) -> Result<u64> {
        self.begin().await?;
        Ok(self.shares.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn favorite(&self, _id: &RestaurantId) -> Result<u64> {
        self.begin().await?;
        Ok(self.favorites.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn unfavorite(&self, _id: &RestaurantId) -> Result<u64> {
        self.begin().await?;
        let previous = self
            .favorites
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap();
        Ok(previous.saturating_sub(1))
    }
}

// ─── Location provider ───────────────────────────────────────────

/// Location provider with a fixed answer and a call counter.
pub struct FakeLocationProvider {
    supported: bool,
    result: Mutex<std::result::Result<UserLocation, LocationError>>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeLocationProvider {
    pub fn granting(location: UserLocation) -> Self {
        Self {
            supported: true,
            result: Mutex::new(Ok(location)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: LocationError) -> Self {
        Self {
            supported: true,
            result: Mutex::new(Err(error)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            result: Mutex::new(Err(LocationError::Unsupported)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LocationProvider for FakeLocationProvider {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn current_position(&self) -> std::result::Result<UserLocation, LocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.lock().unwrap().clone()
    }
}

// ─── Places ──────────────────────────────────────────────────────

/// Places autocomplete that echoes the query as a single suggestion.
#[derive(Default)]
pub struct FakePlaces {
    queries: Mutex<Vec<String>>,
    fail: AtomicBool,
}

#[allow(dead_code)]
impl FakePlaces {
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl PlacesAutocomplete for FakePlaces {
    async fn get_place_predictions(
        &self,
        query: &str,
        _options: &PlaceOptions,
    ) -> Result<Vec<PlaceSuggestion>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Network("places unavailable".to_string()));
        }
        Ok(vec![PlaceSuggestion {
            place_id: format!("place-{}", query),
            description: format!("{}, USA", query),
        }])
    }
}

// ─── Controller harness ──────────────────────────────────────────

pub type TestController = MapController<FakeRestaurantApi, FakeLocationProvider, FakeCountersApi>;

/// Controller over fakes sharing `store`.
#[allow(dead_code)]
pub fn test_controller(
    api: FakeRestaurantApi,
    location: FakeLocationProvider,
    counters: FakeCountersApi,
    store: Arc<dyn KeyValueStore>,
) -> TestController {
    let config = Config::default();
    let fetcher = Arc::new(RestaurantFetcher::new(
        api,
        RestaurantCache::new(store.clone()),
        config.cache_duration,
    ));
    let geolocation = Arc::new(GeolocationService::new(
        location,
        store,
        config.location_prompt_cooldown,
    ));
    let counters = Arc::new(CountersReconciler::new(counters));
    MapController::new(config, fetcher, geolocation, counters)
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - data pipeline and view logic.

pub mod cache;
pub mod controller;
pub mod counters;
pub mod distance;
pub mod fetcher;
pub mod filter_worker;
pub mod geolocation;
pub mod search;
pub mod throttle;

pub use cache::RestaurantCache;
pub use controller::{LoadStatus, MapController, MapMarker, RestaurantCard, ViewState};
pub use counters::{ActionOutcome, CountersApi, CountersReconciler, HttpCountersApi};
pub use distance::{distance_to, format_distance, haversine, DistanceUnit};
pub use fetcher::{
    DataSource, FetchOutcome, FetchStage, HttpRestaurantApi, ListQuery, LoadedRestaurants,
    RestaurantApi, RestaurantFetcher,
};
pub use filter_worker::{filter_restaurants, FilterInputs, FilterWorker};
pub use geolocation::{
    FixedLocationProvider, GeolocationService, LocationError, LocationProvider, PermissionState,
    UnsupportedLocationProvider,
};
pub use search::{NoPlaces, PlaceOptions, PlaceSuggestion, PlacesAutocomplete, SearchInput};
pub use throttle::{Debouncer, Throttle};

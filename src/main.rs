// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Restaurant-Map command-line client
//!
//! Loads the restaurant collection through the same pipeline the map view
//! uses and prints the filtered, sorted list.

use restaurant_map::{
    config::Config,
    models::UserLocation,
    services::{
        CountersReconciler, FixedLocationProvider, GeolocationService, HttpCountersApi,
        HttpRestaurantApi, LoadStatus, MapController, RestaurantCache, RestaurantFetcher,
    },
    storage::{FileStore, KeyValueStore},
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long to wait for the first filter result.
const RESULT_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(api = %config.api_base_url, "Starting Restaurant-Map");

    // Persistent storage for the cache and location bookkeeping
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.storage_path));
    tracing::info!(path = %config.storage_path.display(), "Storage opened");

    let api = HttpRestaurantApi::new(&config.api_base_url, config.request_timeout)?;
    let fetcher = Arc::new(RestaurantFetcher::new(
        api,
        RestaurantCache::new(store.clone()),
        config.cache_duration,
    ));

    let geolocation = Arc::new(GeolocationService::new(
        FixedLocationProvider::new(location_from_env()),
        store,
        config.location_prompt_cooldown,
    ));

    let counters_api = HttpCountersApi::new(&config.api_base_url, config.request_timeout)?
        .with_source("cli");
    let counters = Arc::new(CountersReconciler::new(counters_api));

    let controller = MapController::new(config, fetcher, geolocation, counters);
    let mut view = controller.subscribe();

    // No-op unless USER_LATITUDE/USER_LONGITUDE were given
    controller.request_location().await;

    match controller.mount().await {
        LoadStatus::Loaded { count, source } => {
            tracing::info!(count, ?source, "Restaurants ready");
        }
        LoadStatus::Cancelled => anyhow::bail!("Load was cancelled"),
        LoadStatus::Failed => {
            let message = controller.state().error.unwrap_or_default();
            anyhow::bail!("Failed to load restaurants: {}", message);
        }
    }

    if let Some(query) = std::env::args().nth(1) {
        controller.set_search_query(&query);
    }

    // Wait until the displayed list reflects the latest posted request.
    let state = tokio::time::timeout(
        RESULT_TIMEOUT,
        view.wait_for(|s| s.result_id > 0 && s.result_id == controller.filter_requests_posted()),
    )
    .await??
    .clone();

    if let Some(warning) = &state.warning {
        eprintln!("warning: {}", warning);
    }

    let unit = controller.config().distance_unit;
    for restaurant in &state.displayed {
        let distance = restaurant
            .display_distance(state.user_location.as_ref(), unit)
            .unwrap_or_default();
        println!(
            "{}\t{}\t{}",
            restaurant.name,
            restaurant.display_address(),
            distance
        );
    }
    tracing::info!(shown = state.displayed.len(), "Done");

    Ok(())
}

/// `USER_LATITUDE` / `USER_LONGITUDE`, if both are set and valid.
fn location_from_env() -> Option<UserLocation> {
    let latitude = std::env::var("USER_LATITUDE").ok()?.trim().parse().ok()?;
    let longitude = std::env::var("USER_LONGITUDE").ok()?.trim().parse().ok()?;
    let location = UserLocation::new(latitude, longitude);
    location.coordinates().map(|_| location)
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("restaurant_map=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Restaurant collection fetching with caching and cancellation.
//!
//! Handles:
//! - Serving a fresh cached collection without touching the network
//! - Superseding (cancelling) the previous in-flight request
//! - Dropping records without a usable id
//! - Falling back to an expired cache entry when the network fails
//! - Progress reporting through a watch channel

use crate::error::{AppError, Result};
use crate::models::{CacheEntry, Coordinates, Restaurant};
use crate::services::cache::RestaurantCache;
use crate::time_utils::now_millis;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

/// Parameters for a restaurant list request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub limit: u32,
    pub offset: Option<u32>,
    /// Lets the backend compute distances server-side
    pub near: Option<Coordinates>,
}

impl ListQuery {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            offset: None,
            near: None,
        }
    }
}

/// Source of the full restaurant collection.
pub trait RestaurantApi: Send + Sync + 'static {
    fn fetch_restaurants(
        &self,
        query: &ListQuery,
    ) -> impl Future<Output = Result<Vec<Restaurant>>> + Send;
}

// ─────────────────────────────────────────────────────────────────────────────
// HttpRestaurantApi - backend list endpoint
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP client for `GET {base}/restaurants`.
#[derive(Clone)]
pub struct HttpRestaurantApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRestaurantApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl RestaurantApi for HttpRestaurantApi {
    async fn fetch_restaurants(&self, query: &ListQuery) -> Result<Vec<Restaurant>> {
        let url = format!("{}/restaurants", self.base_url);

        let mut params = vec![("limit", query.limit.to_string())];
        if let Some(offset) = query.offset {
            params.push(("offset", offset.to_string()));
        }
        if let Some(near) = query.near {
            params.push(("lat", near.latitude.to_string()));
            params.push(("lng", near.longitude.to_string()));
        }

        let response = self.http.get(&url).query(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            if status == 429 {
                tracing::warn!("Restaurant API rate limit hit (429)");
            }
            return Err(AppError::Api { status, body });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Decode(format!("JSON parse error: {}", e)))?;

        parse_restaurant_list(body)
    }
}

/// Extract restaurants from either `{ restaurants }` or `{ data: { restaurants } }`.
///
/// Mistyped fields decode as absent, so only non-object records are skipped.
/// Id validation happens in the fetcher.
pub fn parse_restaurant_list(body: Value) -> Result<Vec<Restaurant>> {
    let records = match body {
        Value::Object(mut obj) => match obj.remove("restaurants") {
            Some(Value::Array(items)) => items,
            _ => match obj.remove("data") {
                Some(Value::Object(mut data)) => match data.remove("restaurants") {
                    Some(Value::Array(items)) => items,
                    _ => {
                        return Err(AppError::Decode(
                            "response data has no restaurants array".to_string(),
                        ))
                    }
                },
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(AppError::Decode(
                        "response has no restaurants array".to_string(),
                    ))
                }
            },
        },
        Value::Array(items) => items,
        _ => return Err(AppError::Decode("unexpected response shape".to_string())),
    };

    let total = records.len();
    let restaurants: Vec<Restaurant> = records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(r) => Some(r),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping non-object restaurant record");
                None
            }
        })
        .collect();

    if restaurants.len() < total {
        tracing::warn!(
            skipped = total - restaurants.len(),
            total,
            "Skipped restaurant records that are not objects"
        );
    }

    Ok(restaurants)
}

// ─────────────────────────────────────────────────────────────────────────────
// RestaurantFetcher - cache policy, cancellation and progress
// ─────────────────────────────────────────────────────────────────────────────

/// Progress of the current load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStage {
    #[default]
    Idle,
    CheckingCache,
    FetchingData,
    ProcessingData,
    CachingData,
    Complete,
    Error,
}

/// Where a loaded collection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Cache younger than the freshness window; no request was made
    FreshCache,
    Network,
    /// Expired cache served because the request failed
    StaleCache,
}

/// A successfully loaded collection.
#[derive(Debug, Clone)]
pub struct LoadedRestaurants {
    pub restaurants: Vec<Restaurant>,
    pub source: DataSource,
    /// Set when operating on stale data
    pub warning: Option<String>,
}

/// Result of a fetch that did not fail.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Loaded(LoadedRestaurants),
    /// Superseded or explicitly cancelled; not an error
    Cancelled,
}

/// Fetches the full collection, honoring the cache freshness window.
///
/// At most one request is live: starting a fetch cancels the previous one.
pub struct RestaurantFetcher<A> {
    api: A,
    cache: RestaurantCache,
    cache_duration: Duration,
    /// Token for the live request, tagged with its generation.
    in_flight: Mutex<Option<(u64, CancellationToken)>>,
    generation: AtomicU64,
    stage: watch::Sender<FetchStage>,
}

impl<A: RestaurantApi> RestaurantFetcher<A> {
    pub fn new(api: A, cache: RestaurantCache, cache_duration: Duration) -> Self {
        let (stage, _) = watch::channel(FetchStage::Idle);
        Self {
            api,
            cache,
            cache_duration,
            in_flight: Mutex::new(None),
            generation: AtomicU64::new(0),
            stage,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn cache(&self) -> &RestaurantCache {
        &self.cache
    }

    /// Current progress stage.
    pub fn stage(&self) -> FetchStage {
        *self.stage.borrow()
    }

    /// Subscribe to progress stage changes.
    pub fn subscribe_stage(&self) -> watch::Receiver<FetchStage> {
        self.stage.subscribe()
    }

    /// Cancel the live request, if any. The cancelled fetch returns `Cancelled`.
    pub async fn cancel(&self) {
        if let Some((generation, token)) = self.in_flight.lock().await.take() {
            tracing::debug!(generation, "Cancelling restaurant fetch");
            token.cancel();
        }
    }

    /// Load the restaurant collection.
    ///
    /// 1. Fresh cache → live request cancelled, cache returned, no request
    /// 2. Otherwise supersede any live request and fetch
    /// 3. Success → drop records without an id, cache, return
    /// 4. Failure → expired cache with a warning, or the error
    /// 5. Cancellation → `Cancelled`, no stage change
    pub async fn fetch(&self, query: ListQuery) -> Result<FetchOutcome> {
        self.set_stage(FetchStage::CheckingCache);

        let max_age_ms = i64::try_from(self.cache_duration.as_millis()).unwrap_or(i64::MAX);
        if let Some(entry) = self.cache.read() {
            if entry.is_fresh(now_millis(), max_age_ms) {
                tracing::debug!(count = entry.data.len(), "Serving restaurants from fresh cache");
                self.cancel().await;
                self.set_stage(FetchStage::Complete);
                return Ok(FetchOutcome::Loaded(LoadedRestaurants {
                    restaurants: entry.data,
                    source: DataSource::FreshCache,
                    warning: None,
                }));
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        {
            let mut slot = self.in_flight.lock().await;
            if let Some((previous, prev_token)) = slot.replace((generation, token.clone())) {
                tracing::debug!(previous, generation, "Superseding in-flight restaurant fetch");
                prev_token.cancel();
            }
        }

        if token.is_cancelled() {
            return Ok(FetchOutcome::Cancelled);
        }

        self.set_stage(FetchStage::FetchingData);
        tracing::info!(generation, limit = query.limit, "Fetching restaurants");

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!(generation, "Restaurant fetch cancelled");
                return Ok(FetchOutcome::Cancelled);
            }
            result = self.api.fetch_restaurants(&query) => result,
        };

        if token.is_cancelled() {
            tracing::debug!(generation, "Discarding response of cancelled fetch");
            return Ok(FetchOutcome::Cancelled);
        }
        self.release(generation).await;

        match result {
            Ok(records) => {
                self.set_stage(FetchStage::ProcessingData);
                let total = records.len();
                let restaurants: Vec<Restaurant> =
                    records.into_iter().filter(Restaurant::has_valid_id).collect();
                if restaurants.len() < total {
                    tracing::warn!(
                        dropped = total - restaurants.len(),
                        total,
                        "Dropped restaurants without a valid id"
                    );
                }

                self.set_stage(FetchStage::CachingData);
                self.cache.write(&CacheEntry {
                    data: restaurants.clone(),
                    timestamp: now_millis(),
                });

                self.set_stage(FetchStage::Complete);
                tracing::info!(generation, count = restaurants.len(), "Restaurants loaded");

                Ok(FetchOutcome::Loaded(LoadedRestaurants {
                    restaurants,
                    source: DataSource::Network,
                    warning: None,
                }))
            }
            Err(e) => {
                if let Some(entry) = self.cache.read() {
                    tracing::warn!(
                        error = %e,
                        count = entry.data.len(),
                        cached_at = entry.timestamp,
                        "Restaurant fetch failed, using cached data"
                    );
                    self.set_stage(FetchStage::Complete);
                    return Ok(FetchOutcome::Loaded(LoadedRestaurants {
                        restaurants: entry.data,
                        source: DataSource::StaleCache,
                        warning: Some(AppError::STALE_CACHE_WARNING.to_string()),
                    }));
                }

                tracing::error!(error = %e, "Restaurant fetch failed and no cache is available");
                self.set_stage(FetchStage::Error);
                Err(e)
            }
        }
    }

    /// Clear the live-request slot if it still belongs to `generation`.
    async fn release(&self, generation: u64) {
        let mut slot = self.in_flight.lock().await;
        if slot.as_ref().is_some_and(|(g, _)| *g == generation) {
            *slot = None;
        }
    }

    fn set_stage(&self, stage: FetchStage) {
        self.stage.send_replace(stage);
    }
}

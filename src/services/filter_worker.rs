// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Background filtering over a typed message channel.
//!
//! The controller posts `FILTER_RESTAURANTS` requests and receives
//! `FILTER_RESTAURANTS_RESULT` responses. Payloads are moved by value; the
//! worker shares no state with the poster. Filtering itself is the pure
//! [`filter_restaurants`] function.

use crate::error::{AppError, Result};
use crate::models::{FilterCriteria, FilterKey, FilterValue, Restaurant, UserLocation};
use crate::services::distance::DistanceUnit;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Message posted to the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum WorkerRequest {
    FilterRestaurants {
        restaurants: Vec<Restaurant>,
        search_query: String,
        active_filters: FilterCriteria,
        user_location: Option<UserLocation>,
        /// Monotonic per poster; results behind the latest post are dropped
        #[serde(default)]
        request_id: u64,
    },
}

/// Message sent back by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum WorkerResponse {
    FilterRestaurantsResult {
        restaurants: Vec<Restaurant>,
        #[serde(default)]
        request_id: u64,
    },
}

/// The inputs a filter request is built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterInputs {
    pub restaurants: Vec<Restaurant>,
    pub search_query: String,
    pub active_filters: FilterCriteria,
    pub user_location: Option<UserLocation>,
}

/// Compute the response for a request. Pure; safe to call from any thread.
pub fn handle_request(request: WorkerRequest) -> WorkerResponse {
    match request {
        WorkerRequest::FilterRestaurants {
            restaurants,
            search_query,
            active_filters,
            user_location,
            request_id,
        } => WorkerResponse::FilterRestaurantsResult {
            restaurants: filter_restaurants(
                &restaurants,
                &search_query,
                &active_filters,
                user_location.as_ref(),
            ),
            request_id,
        },
    }
}

/// Filter and sort restaurants for display.
///
/// - Blank query matches everything; otherwise case-insensitive substring
///   over name, address, city, state, kosher category and agency.
/// - Only keys present in `filters` constrain the result.
/// - With a user location, nearest first (unknown distance last);
///   otherwise alphabetical.
pub fn filter_restaurants(
    restaurants: &[Restaurant],
    search_query: &str,
    filters: &FilterCriteria,
    user_location: Option<&UserLocation>,
) -> Vec<Restaurant> {
    let query = search_query.trim().to_lowercase();

    let mut matched: Vec<(Option<f64>, &Restaurant)> = restaurants
        .iter()
        .map(|r| {
            let miles = user_location.and_then(|u| r.distance_from(u, DistanceUnit::Miles));
            (miles, r)
        })
        .filter(|(miles, r)| matches_query(r, &query) && matches_filters(r, filters, *miles))
        .collect();

    if user_location.is_some() {
        matched.sort_by(|(da, a), (db, b)| match (da, db) {
            (Some(x), Some(y)) => x.total_cmp(y).then_with(|| compare_names(a, b)),
            (Some(_), None) => CmpOrdering::Less,
            (None, Some(_)) => CmpOrdering::Greater,
            (None, None) => compare_names(a, b),
        });
    } else {
        matched.sort_by(|(_, a), (_, b)| compare_names(a, b));
    }

    matched.into_iter().map(|(_, r)| r.clone()).collect()
}

fn compare_names(a: &Restaurant, b: &Restaurant) -> CmpOrdering {
    a.name.to_lowercase().cmp(&b.name.to_lowercase())
}

fn matches_query(r: &Restaurant, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    std::iter::once(Some(r.name.as_str()))
        .chain([
            r.address.as_deref(),
            r.city.as_deref(),
            r.state.as_deref(),
            r.kosher_category.as_deref(),
            r.certifying_agency.as_deref(),
        ])
        .flatten()
        .any(|field| field.to_lowercase().contains(query))
}

fn matches_filters(r: &Restaurant, filters: &FilterCriteria, miles: Option<f64>) -> bool {
    filters.iter().all(|(key, value)| match key {
        FilterKey::Agency => matches_tag(r.certifying_agency.as_deref(), value),
        FilterKey::Dietary | FilterKey::KosherCategory => {
            matches_tag(r.kosher_category.as_deref(), value)
        }
        FilterKey::OpenNow => r.is_open == Some(true),
        FilterKey::MaxDistance => match value.as_number() {
            Some(max) => miles.is_some_and(|d| d <= max),
            None => true,
        },
        FilterKey::Other(_) => true,
    })
}

/// Text values must match case-insensitively; other values require presence.
fn matches_tag(field: Option<&str>, value: &FilterValue) -> bool {
    let Some(field) = field.map(str::trim).filter(|f| !f.is_empty()) else {
        return false;
    };
    match value.as_text() {
        Some(wanted) => field.eq_ignore_ascii_case(wanted.trim()),
        None => true,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Worker channel
// ─────────────────────────────────────────────────────────────────────────────

/// Spawns the filter worker and hands out its two channel ends.
pub struct FilterWorker;

impl FilterWorker {
    /// Start the worker task. It stops when every [`FilterPoster`] is dropped.
    pub fn spawn() -> (FilterPoster, FilterResults, JoinHandle<()>) {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<WorkerRequest>();
        let (response_tx, response_rx) = mpsc::unbounded_channel::<WorkerResponse>();

        let handle = tokio::spawn(async move {
            while let Some(request) = request_rx.recv().await {
                let response = match tokio::task::spawn_blocking(move || handle_request(request))
                    .await
                {
                    Ok(response) => response,
                    Err(e) => {
                        tracing::error!(error = %e, "Filter worker computation panicked");
                        continue;
                    }
                };
                if response_tx.send(response).is_err() {
                    tracing::debug!("Filter result receiver dropped, stopping worker");
                    break;
                }
            }
            tracing::debug!("Filter worker stopped");
        });

        let latest_posted = Arc::new(AtomicU64::new(0));
        let poster = FilterPoster {
            requests: request_tx,
            next_id: Arc::new(AtomicU64::new(0)),
            latest_posted: latest_posted.clone(),
        };
        let results = FilterResults {
            responses: response_rx,
            latest_posted,
        };
        (poster, results, handle)
    }
}

/// Sending end: posts `FILTER_RESTAURANTS` requests.
#[derive(Clone)]
pub struct FilterPoster {
    requests: mpsc::UnboundedSender<WorkerRequest>,
    next_id: Arc<AtomicU64>,
    latest_posted: Arc<AtomicU64>,
}

impl FilterPoster {
    /// Post a request; returns its request id.
    pub fn post(&self, inputs: FilterInputs) -> Result<u64> {
        let request_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest_posted.fetch_max(request_id, Ordering::SeqCst);

        tracing::debug!(
            request_id,
            count = inputs.restaurants.len(),
            filters = inputs.active_filters.len(),
            "Posting filter request"
        );

        self.requests
            .send(WorkerRequest::FilterRestaurants {
                restaurants: inputs.restaurants,
                search_query: inputs.search_query,
                active_filters: inputs.active_filters,
                user_location: inputs.user_location,
                request_id,
            })
            .map_err(|_| AppError::WorkerClosed)?;
        Ok(request_id)
    }

    /// Id of the most recent post (0 before any).
    pub fn latest_request_id(&self) -> u64 {
        self.latest_posted.load(Ordering::SeqCst)
    }
}

/// Receiving end: yields results, dropping any behind the latest post.
pub struct FilterResults {
    responses: mpsc::UnboundedReceiver<WorkerResponse>,
    latest_posted: Arc<AtomicU64>,
}

impl FilterResults {
    /// Next current result as `(request_id, restaurants)`; `None` once the worker stops.
    pub async fn recv(&mut self) -> Option<(u64, Vec<Restaurant>)> {
        loop {
            let WorkerResponse::FilterRestaurantsResult {
                restaurants,
                request_id,
            } = self.responses.recv().await?;

            let latest = self.latest_posted.load(Ordering::SeqCst);
            if request_id < latest {
                tracing::debug!(request_id, latest, "Dropping stale filter result");
                continue;
            }
            return Some((request_id, restaurants));
        }
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Integration tests for counter reconciliation and the counters endpoints.

use restaurant_map::error::AppError;
use restaurant_map::models::{ActionState, CounterAction, CounterSnapshot, RestaurantId};
use restaurant_map::services::counters::CountersPhase;
use restaurant_map::services::{ActionOutcome, CountersApi, CountersReconciler, HttpCountersApi};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::FakeCountersApi;

fn snapshot(views: u64, shares: u64, favorites: u64) -> CounterSnapshot {
    CounterSnapshot {
        views: Some(views),
        shares: Some(shares),
        favorite_count: Some(favorites),
        favorited: None,
    }
}

fn selected(api: FakeCountersApi) -> (Arc<CountersReconciler<FakeCountersApi>>, RestaurantId) {
    let reconciler = Arc::new(CountersReconciler::new(api));
    let id = RestaurantId::Int(5);
    reconciler.apply_snapshot(&id, snapshot(10, 3, 5));
    (reconciler, id)
}

#[test]
fn test_first_snapshot_initializes_then_merges_monotonically() {
    let reconciler = CountersReconciler::new(FakeCountersApi::default());
    let id = RestaurantId::Int(5);

    reconciler.select(id.clone());
    assert_eq!(reconciler.phase(), CountersPhase::Initializing);

    assert!(reconciler.apply_snapshot(&id, snapshot(10, 3, 5)));
    assert_eq!(reconciler.phase(), CountersPhase::Initialized);

    // Lower views and equal favorites are ignored; higher shares win
    assert!(reconciler.apply_snapshot(&id, snapshot(8, 4, 5)));
    let counters = reconciler.counters();
    assert_eq!(counters.views, 10);
    assert_eq!(counters.shares, 4);
    assert_eq!(counters.favorite_count, 5);

    assert!(!reconciler.apply_snapshot(&id, snapshot(1, 1, 1)));
}

#[test]
fn test_selecting_another_restaurant_resets() {
    let (reconciler, _) = selected(FakeCountersApi::default());
    let other = RestaurantId::Str("r-9".into());

    reconciler.apply_snapshot(&other, snapshot(2, 0, 1));
    let counters = reconciler.counters();
    assert_eq!(counters.views, 2);
    assert_eq!(counters.favorite_count, 1);
    assert_eq!(reconciler.snapshot().restaurant_id, Some(other));
}

#[tokio::test]
async fn test_actions_without_selection_are_skipped() {
    let reconciler = CountersReconciler::new(FakeCountersApi::default());

    assert_eq!(reconciler.share().await, ActionOutcome::Skipped);
    assert_eq!(reconciler.toggle_favorite().await, ActionOutcome::Skipped);
    assert_eq!(reconciler.api().calls(), 0);
}

#[tokio::test]
async fn test_share_applies_server_count() {
    let (reconciler, _) = selected(FakeCountersApi::with_counts(41, 0));

    let outcome = reconciler.share().await;
    match outcome {
        ActionOutcome::Applied(counters) => assert_eq!(counters.shares, 42),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(reconciler.counters().shares, 42);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_share_makes_one_request() {
    let api = FakeCountersApi::with_counts(3, 0);
    api.set_delay(Duration::from_millis(100));
    let (reconciler, id) = selected(api);

    let (first, second) = tokio::join!(reconciler.share(), reconciler.share());

    let outcomes = [first, second];
    assert_eq!(
        outcomes.iter().filter(|o| matches!(o, ActionOutcome::Applied(_))).count(),
        1
    );
    assert!(outcomes.contains(&ActionOutcome::Skipped));
    assert_eq!(reconciler.api().calls(), 1);
    assert_eq!(reconciler.action_state(&id, CounterAction::Share), ActionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_favorite_is_optimistic_and_confirmed() {
    let api = FakeCountersApi::with_counts(0, 5);
    api.set_delay(Duration::from_millis(100));
    let (reconciler, id) = selected(api);

    let pending = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move { reconciler.toggle_favorite().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Flipped before the server answers
    assert!(reconciler.counters().favorited);
    assert_eq!(
        reconciler.action_state(&id, CounterAction::Favorite),
        ActionState::InFlight
    );

    let outcome = pending.await.unwrap();
    let counters = reconciler.counters();
    assert!(matches!(outcome, ActionOutcome::Applied(_)));
    assert!(counters.favorited);
    assert_eq!(counters.favorite_count, 6);
    assert_eq!(
        reconciler.action_state(&id, CounterAction::Favorite),
        ActionState::Idle
    );

    // Second toggle unfavorites
    reconciler.toggle_favorite().await;
    let counters = reconciler.counters();
    assert!(!counters.favorited);
    assert_eq!(counters.favorite_count, 5);
}

#[tokio::test(start_paused = true)]
async fn test_double_click_favorite_makes_one_request() {
    let api = FakeCountersApi::with_counts(0, 5);
    api.set_delay(Duration::from_millis(100));
    let (reconciler, id) = selected(api);

    let (first, second) = tokio::join!(reconciler.toggle_favorite(), reconciler.toggle_favorite());

    let outcomes = [first, second];
    let applied: Vec<_> = outcomes
        .iter()
        .filter_map(|o| match o {
            ActionOutcome::Applied(counters) => Some(*counters),
            _ => None,
        })
        .collect();
    assert_eq!(applied.len(), 1);
    assert!(applied[0].favorited);
    assert_eq!(applied[0].favorite_count, 6);
    assert!(outcomes.contains(&ActionOutcome::Skipped));
    assert_eq!(reconciler.api().calls(), 1);

    let counters = reconciler.counters();
    assert!(counters.favorited);
    assert_eq!(counters.favorite_count, 6);
    assert_eq!(
        reconciler.action_state(&id, CounterAction::Favorite),
        ActionState::Idle
    );
}

#[tokio::test]
async fn test_failed_favorite_reverts_with_notice() {
    let api = FakeCountersApi::with_counts(0, 5);
    api.set_failing(true);
    let (reconciler, id) = selected(api);

    let outcome = reconciler.toggle_favorite().await;

    assert!(matches!(outcome, ActionOutcome::Failed { ref notice } if !notice.is_empty()));
    let counters = reconciler.counters();
    assert!(!counters.favorited);
    assert_eq!(counters.favorite_count, 5);
    assert_eq!(
        reconciler.action_state(&id, CounterAction::Favorite),
        ActionState::Idle
    );
}

#[tokio::test]
async fn test_failed_share_leaves_counts() {
    let api = FakeCountersApi::with_counts(3, 0);
    api.set_failing(true);
    let (reconciler, _) = selected(api);

    let outcome = reconciler.share().await;
    assert!(matches!(outcome, ActionOutcome::Failed { .. }));
    assert_eq!(reconciler.counters().shares, 3);
}

#[tokio::test(start_paused = true)]
async fn test_response_for_previous_selection_is_not_applied() {
    let api = FakeCountersApi::with_counts(99, 0);
    api.set_delay(Duration::from_millis(100));
    let (reconciler, _) = selected(api);

    let pending = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move { reconciler.share().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let other = RestaurantId::Int(6);
    reconciler.apply_snapshot(&other, snapshot(1, 1, 1));

    assert_eq!(pending.await.unwrap(), ActionOutcome::Skipped);
    assert_eq!(reconciler.counters().shares, 1);
}

#[tokio::test(start_paused = true)]
async fn test_favorite_for_previous_selection_reports_skipped() {
    let api = FakeCountersApi::with_counts(0, 50);
    api.set_delay(Duration::from_millis(100));
    let (reconciler, _) = selected(api);

    let pending = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move { reconciler.toggle_favorite().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let other = RestaurantId::Int(6);
    reconciler.apply_snapshot(&other, snapshot(1, 1, 2));

    assert_eq!(pending.await.unwrap(), ActionOutcome::Skipped);
    let counters = reconciler.counters();
    assert!(!counters.favorited);
    assert_eq!(counters.favorite_count, 2);
}

// ─── HTTP endpoints ──────────────────────────────────────────────

#[tokio::test]
async fn test_http_share_reads_share_count() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/restaurants/5/share"))
        .and(body_partial_json(json!({ "source": "map" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "share_count": 12 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpCountersApi::new(server.uri(), Duration::from_secs(5)).unwrap();
    let count = api.share(&RestaurantId::Int(5)).await.unwrap();
    assert_eq!(count, 12);
}

#[tokio::test]
async fn test_http_favorite_and_unfavorite() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/restaurants/abc/favorite"))
        .and(body_partial_json(json!({ "source": "detail" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "favorite_count": 8 } })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/restaurants/abc/unfavorite"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "favorite_count": 7 } })),
        )
        .mount(&server)
        .await;

    let api = HttpCountersApi::new(server.uri(), Duration::from_secs(5))
        .unwrap()
        .with_source("detail");
    let id = RestaurantId::from("abc");
    assert_eq!(api.favorite(&id).await.unwrap(), 8);
    assert_eq!(api.unfavorite(&id).await.unwrap(), 7);
}

#[tokio::test]
async fn test_http_missing_restaurant_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/restaurants/404/share"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let api = HttpCountersApi::new(server.uri(), Duration::from_secs(5)).unwrap();
    let err = api.share(&RestaurantId::Int(404)).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_http_missing_count_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/restaurants/5/favorite"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .mount(&server)
        .await;

    let api = HttpCountersApi::new(server.uri(), Duration::from_secs(5)).unwrap();
    let err = api.favorite(&RestaurantId::Int(5)).await.unwrap_err();
    assert!(matches!(err, AppError::Decode(_)));
}

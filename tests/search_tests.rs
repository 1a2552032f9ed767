// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Timing tests for the debounced search input and place autocomplete.

use restaurant_map::services::{PlaceOptions, SearchInput};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

mod common;
use common::FakePlaces;

const SEARCH_DELAY: Duration = Duration::from_millis(300);
const PLACES_DELAY: Duration = Duration::from_millis(500);

fn search_input(places: Arc<FakePlaces>) -> (SearchInput, Arc<Mutex<Vec<String>>>) {
    let searches = Arc::new(Mutex::new(Vec::new()));
    let sink = searches.clone();
    let input = SearchInput::new(
        places,
        PlaceOptions::default(),
        SEARCH_DELAY,
        PLACES_DELAY,
        move |q| sink.lock().unwrap().push(q),
    );
    (input, searches)
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_typing_emits_one_search_and_one_places_query() {
    let places = Arc::new(FakePlaces::default());
    let (input, searches) = search_input(places.clone());

    for text in ["k", "ko", "kos", "kosh", "kosher "] {
        input.set_query(text);
        sleep(Duration::from_millis(50)).await;
    }

    sleep(Duration::from_millis(300)).await;
    settle().await;
    assert_eq!(*searches.lock().unwrap(), vec!["kosher".to_string()]);
    assert!(places.queries().is_empty());

    sleep(Duration::from_millis(250)).await;
    settle().await;
    assert_eq!(places.queries(), vec!["kosher".to_string()]);
    let suggestions = input.suggestions();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].description, "kosher, USA");
}

#[tokio::test(start_paused = true)]
async fn test_places_failure_clears_suggestions() {
    let places = Arc::new(FakePlaces::default());
    let (input, _) = search_input(places.clone());

    input.set_query("teaneck");
    sleep(Duration::from_millis(600)).await;
    settle().await;
    assert_eq!(input.suggestions().len(), 1);

    places.set_failing(true);
    input.set_query("teaneck nj");
    sleep(Duration::from_millis(600)).await;
    settle().await;
    assert!(input.suggestions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_empty_query_clears_without_calling_places() {
    let places = Arc::new(FakePlaces::default());
    let (input, searches) = search_input(places.clone());

    input.set_query("bagels");
    sleep(Duration::from_millis(600)).await;
    settle().await;
    assert_eq!(input.suggestions().len(), 1);

    input.set_query("   ");
    sleep(Duration::from_millis(600)).await;
    settle().await;

    assert!(input.suggestions().is_empty());
    assert_eq!(places.queries(), vec!["bagels".to_string()]);
    assert_eq!(
        *searches.lock().unwrap(),
        vec!["bagels".to_string(), String::new()]
    );
}

#[test]
fn test_default_place_options() {
    let options = PlaceOptions::default();
    assert_eq!(options.types, ["establishment", "geocode"]);
    assert_eq!(options.country.as_deref(), Some("us"));
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Restaurant-Map: client-side data pipeline for restaurant discovery
//!
//! This crate loads a restaurant collection (with a cache in front of the
//! network), filters and sorts it off the caller's task, tracks the user's
//! location and reconciles view/share/favorite counters for the selection.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod time_utils;

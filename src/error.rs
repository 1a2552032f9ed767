// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent user-facing messages.

use crate::services::geolocation::LocationError;
use crate::storage::StorageError;

/// Application error type shared by the fetcher, counters and controller.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    #[error("Worker channel closed")]
    WorkerClosed,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Notice shown when the list is served from an expired cache entry.
    pub const STALE_CACHE_WARNING: &'static str =
        "Unable to reach the server. Showing previously cached restaurants.";

    /// Whether a user-triggered retry might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Network(_) => true,
            AppError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Short message suitable for an error banner or toast.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Network(_) => {
                "Unable to load restaurants. Check your connection and try again.".to_string()
            }
            AppError::Api { status, .. } if *status == 429 => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            AppError::Api { .. } | AppError::Decode(_) => {
                "The server returned an unexpected response. Please try again.".to_string()
            }
            AppError::NotFound(what) => format!("{} was not found.", what),
            AppError::Location(e) => e.to_string(),
            AppError::Storage(_) | AppError::WorkerClosed | AppError::Internal(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Decode(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, AppError>;

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for timestamps and date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current time as epoch milliseconds (the persisted timestamp format).
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Milliseconds elapsed since `timestamp`, clamped at zero for future stamps.
pub fn millis_since(timestamp: i64, now: i64) -> i64 {
    now.saturating_sub(timestamp).max(0)
}

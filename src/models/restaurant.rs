// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Restaurant record as received from the backend.

use crate::models::location::{Coordinates, UserLocation};
use crate::services::distance::{self, DistanceUnit};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Image shown when a restaurant has no image (or it fails to load).
pub const FALLBACK_IMAGE_URL: &str = "/images/default-restaurant.webp";

/// Restaurant identifier. The backend sends integers, some integrations strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RestaurantId {
    Int(i64),
    Str(String),
}

impl RestaurantId {
    /// JavaScript-style truthiness: `0` and `""` are not usable ids.
    pub fn is_truthy(&self) -> bool {
        match self {
            RestaurantId::Int(n) => *n != 0,
            RestaurantId::Str(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for RestaurantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestaurantId::Int(n) => write!(f, "{}", n),
            RestaurantId::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RestaurantId {
    fn from(n: i64) -> Self {
        RestaurantId::Int(n)
    }
}

impl From<&str> for RestaurantId {
    fn from(s: &str) -> Self {
        RestaurantId::Str(s.to_string())
    }
}

/// Restaurant record. Every field except `name` may be absent.
///
/// Decoding never rejects a record over a field of the wrong type: a
/// mismatched field decodes as absent (or an empty `name`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<RestaurantId>,
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,

    // ─── Ratings (first present wins, in this order) ─────────────
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub star_rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub google_rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub quality_rating: Option<f64>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub price_range: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub kosher_category: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub certifying_agency: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub image_url: Option<String>,
    /// Pre-computed display distance from the backend (e.g. "1.2 mi")
    #[serde(default, deserialize_with = "lenient_string")]
    pub distance: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_open: Option<bool>,

    // ─── Summary counters ────────────────────────────────────────
    #[serde(default, deserialize_with = "lenient_u64")]
    pub view_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub share_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub favorite_count: Option<u64>,
}

impl Restaurant {
    /// Whether this record carries a usable id.
    pub fn has_valid_id(&self) -> bool {
        self.id.as_ref().is_some_and(RestaurantId::is_truthy)
    }

    /// Merged rating: `rating`, then `star_rating`, `google_rating`, `quality_rating`.
    pub fn rating(&self) -> Option<f64> {
        self.rating
            .or(self.star_rating)
            .or(self.google_rating)
            .or(self.quality_rating)
    }

    /// Address, city and state joined with ", ", skipping empty parts.
    pub fn display_address(&self) -> String {
        [&self.address, &self.city, &self.state]
            .into_iter()
            .filter_map(|part| part.as_deref().map(str::trim))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Image URL, or the fallback asset when absent or blank.
    pub fn image_or_fallback(&self) -> &str {
        self.image_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(FALLBACK_IMAGE_URL)
    }

    /// Map coordinate, if both components are present.
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::new(self.latitude?, self.longitude?)
    }

    /// Distance from the user in `unit`, when both positions are known.
    pub fn distance_from(&self, user: &UserLocation, unit: DistanceUnit) -> Option<f64> {
        let here = user.coordinates()?;
        let there = self.coordinates()?;
        Some(distance::haversine(here, there, unit))
    }

    /// Display distance: the backend's string if present, otherwise computed.
    ///
    /// Returns `None` rather than a zero distance when nothing is known.
    pub fn display_distance(
        &self,
        user: Option<&UserLocation>,
        unit: DistanceUnit,
    ) -> Option<String> {
        if let Some(d) = self.distance.as_deref().map(str::trim) {
            if !d.is_empty() {
                return Some(d.to_string());
            }
        }
        let value = self.distance_from(user?, unit)?;
        Some(distance::format_distance(value, unit))
    }
}

// ─── Lenient field decoding ──────────────────────────────────────

fn raw<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?.filter(|v| !v.is_null()))
}

/// Integers (or integral floats) and strings; anything else is absent.
fn lenient_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<RestaurantId>, D::Error> {
    Ok(match raw(deserializer)? {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            })
            .map(RestaurantId::Int),
        Some(Value::String(s)) => Some(RestaurantId::Str(s)),
        _ => None,
    })
}

fn lenient_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

/// Strings, or numbers rendered as text.
fn lenient_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match raw(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accept numbers or numeric strings; anything else (or non-finite) is absent.
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match raw(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite()))
}

/// Non-negative counts; fractional values are truncated.
fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(match raw(deserializer)? {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    })
}

/// Booleans, `"true"`/`"false"` and `0`/`1`.
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(match raw(deserializer)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        Some(Value::Number(n)) => match n.as_u64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        _ => None,
    })
}

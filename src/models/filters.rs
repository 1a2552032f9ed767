// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Active filter set for the map and list views.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Filter key. Unknown keys are carried through but ignored by filtering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterKey {
    Agency,
    Dietary,
    OpenNow,
    KosherCategory,
    /// Maximum distance in miles
    MaxDistance,
    Other(String),
}

impl FilterKey {
    pub fn as_str(&self) -> &str {
        match self {
            FilterKey::Agency => "agency",
            FilterKey::Dietary => "dietary",
            FilterKey::OpenNow => "openNow",
            FilterKey::KosherCategory => "kosherCategory",
            FilterKey::MaxDistance => "maxDistance",
            FilterKey::Other(s) => s,
        }
    }
}

impl From<String> for FilterKey {
    fn from(s: String) -> Self {
        match s.as_str() {
            "agency" => FilterKey::Agency,
            "dietary" => FilterKey::Dietary,
            "openNow" => FilterKey::OpenNow,
            "kosherCategory" => FilterKey::KosherCategory,
            "maxDistance" => FilterKey::MaxDistance,
            _ => FilterKey::Other(s),
        }
    }
}

impl From<&str> for FilterKey {
    fn from(s: &str) -> Self {
        FilterKey::from(s.to_string())
    }
}

impl From<FilterKey> for String {
    fn from(key: FilterKey) -> Self {
        key.as_str().to_string()
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete filter value. `Flag(true)` is the toggle sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl FilterValue {
    /// JavaScript-style truthiness; falsy values mean "unset".
    pub fn is_truthy(&self) -> bool {
        match self {
            FilterValue::Flag(b) => *b,
            FilterValue::Number(n) => *n != 0.0 && !n.is_nan(),
            FilterValue::Text(s) => !s.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FilterValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value, also accepting numeric text.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FilterValue::Number(n) => Some(*n),
            FilterValue::Text(s) => s.trim().parse().ok(),
            FilterValue::Flag(_) => None,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        FilterValue::Number(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Flag(b)
    }
}

/// Session-scoped filter set. Only truthy values are ever stored, so an
/// unset key is simply absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<FilterKey, FilterValue>", into = "BTreeMap<FilterKey, FilterValue>")]
pub struct FilterCriteria {
    values: BTreeMap<FilterKey, FilterValue>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unset the key if it is currently truthy, otherwise set the flag sentinel.
    pub fn toggle(&mut self, key: impl Into<FilterKey>) {
        let key = key.into();
        if self.values.remove(&key).is_none() {
            self.values.insert(key, FilterValue::Flag(true));
        }
    }

    /// Set a concrete value. Falsy values unset the key.
    pub fn set(&mut self, key: impl Into<FilterKey>, value: impl Into<FilterValue>) {
        let key = key.into();
        let value = value.into();
        if value.is_truthy() {
            self.values.insert(key, value);
        } else {
            self.values.remove(&key);
        }
    }

    pub fn clear(&mut self, key: &FilterKey) {
        self.values.remove(key);
    }

    pub fn clear_all(&mut self) {
        self.values.clear();
    }

    pub fn get(&self, key: &FilterKey) -> Option<&FilterValue> {
        self.values.get(key)
    }

    pub fn is_active(&self, key: &FilterKey) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FilterKey, &FilterValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<BTreeMap<FilterKey, FilterValue>> for FilterCriteria {
    fn from(mut values: BTreeMap<FilterKey, FilterValue>) -> Self {
        values.retain(|_, v| v.is_truthy());
        Self { values }
    }
}

impl From<FilterCriteria> for BTreeMap<FilterKey, FilterValue> {
    fn from(criteria: FilterCriteria) -> Self {
        criteria.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_sets_then_unsets() {
        let mut filters = FilterCriteria::new();
        filters.toggle(FilterKey::OpenNow);
        assert_eq!(
            filters.get(&FilterKey::OpenNow),
            Some(&FilterValue::Flag(true))
        );
        filters.toggle(FilterKey::OpenNow);
        assert!(!filters.is_active(&FilterKey::OpenNow));
        assert!(filters.is_empty());
    }

    #[test]
    fn test_toggle_unsets_concrete_value() {
        let mut filters = FilterCriteria::new();
        filters.set(FilterKey::Agency, "ORB");
        filters.toggle(FilterKey::Agency);
        assert!(filters.is_empty());
    }

    #[test]
    fn test_falsy_values_are_absent() {
        let mut filters = FilterCriteria::new();
        filters.set(FilterKey::Agency, "");
        filters.set(FilterKey::OpenNow, false);
        filters.set(FilterKey::MaxDistance, 0.0);
        assert!(filters.is_empty());

        let parsed: FilterCriteria =
            serde_json::from_str(r#"{"agency":"","openNow":true,"maxDistance":5}"#).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(!parsed.is_active(&FilterKey::Agency));
    }

    #[test]
    fn test_serializes_with_camel_case_keys() {
        let mut filters = FilterCriteria::new();
        filters.toggle(FilterKey::KosherCategory);
        filters.set("neighborhood", "Aventura");
        let json = serde_json::to_value(&filters).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kosherCategory": true, "neighborhood": "Aventura"})
        );
    }
}

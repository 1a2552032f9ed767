// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Great-circle distance between the user and a restaurant.

use crate::models::{Coordinates, UserLocation};
use geo::{Distance, Haversine};
use std::fmt;
use std::str::FromStr;

const METERS_PER_MILE: f64 = 1609.344;
const METERS_PER_KILOMETER: f64 = 1000.0;

/// Below this many miles, show two decimals.
const MILES_FINE_THRESHOLD: f64 = 0.1;
/// Below this many kilometers, show whole meters.
const KILOMETERS_METERS_THRESHOLD: f64 = 0.5;

/// Display units, chosen by the view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DistanceUnit {
    #[default]
    Miles,
    Kilometers,
}

impl DistanceUnit {
    fn from_meters(self, meters: f64) -> f64 {
        match self {
            DistanceUnit::Miles => meters / METERS_PER_MILE,
            DistanceUnit::Kilometers => meters / METERS_PER_KILOMETER,
        }
    }

    /// Convert a value in these units to miles.
    pub fn to_miles(self, value: f64) -> f64 {
        match self {
            DistanceUnit::Miles => value,
            DistanceUnit::Kilometers => value * METERS_PER_KILOMETER / METERS_PER_MILE,
        }
    }
}

impl FromStr for DistanceUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mi" | "mile" | "miles" => Ok(DistanceUnit::Miles),
            "km" | "kilometer" | "kilometers" | "metric" => Ok(DistanceUnit::Kilometers),
            other => Err(format!("unknown distance unit: {}", other)),
        }
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceUnit::Miles => f.write_str("mi"),
            DistanceUnit::Kilometers => f.write_str("km"),
        }
    }
}

/// Haversine distance between two coordinates, in `unit`.
pub fn haversine(from: Coordinates, to: Coordinates, unit: DistanceUnit) -> f64 {
    let meters = Haversine.distance(from.to_point(), to.to_point());
    unit.from_meters(meters)
}

/// Distance from the user to a raw (possibly missing) restaurant position.
///
/// `None` unless every component is present and numeric; never zero by default.
pub fn distance_to(
    user: Option<&UserLocation>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    unit: DistanceUnit,
) -> Option<f64> {
    let here = user?.coordinates()?;
    let there = Coordinates::new(latitude?, longitude?)?;
    Some(haversine(here, there, unit))
}

/// Human-readable distance: "0.5 mi", "0.05 mi", "450m", "0.9km", "12.3km".
pub fn format_distance(value: f64, unit: DistanceUnit) -> String {
    match unit {
        DistanceUnit::Miles if value < MILES_FINE_THRESHOLD => format!("{:.2} mi", value),
        DistanceUnit::Miles => format!("{:.1} mi", value),
        DistanceUnit::Kilometers if value < KILOMETERS_METERS_THRESHOLD => {
            format!("{}m", (value * METERS_PER_KILOMETER).round() as i64)
        }
        DistanceUnit::Kilometers => format!("{:.1}km", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_regimes() {
        assert_eq!(format_distance(0.8, DistanceUnit::Miles), "0.8 mi");
        assert_eq!(format_distance(0.04, DistanceUnit::Miles), "0.04 mi");
        assert_eq!(format_distance(12.34, DistanceUnit::Miles), "12.3 mi");
        assert_eq!(format_distance(0.45, DistanceUnit::Kilometers), "450m");
        assert_eq!(format_distance(0.86, DistanceUnit::Kilometers), "0.9km");
        assert_eq!(format_distance(3.0, DistanceUnit::Kilometers), "3.0km");
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!("KM".parse::<DistanceUnit>(), Ok(DistanceUnit::Kilometers));
        assert_eq!("miles".parse::<DistanceUnit>(), Ok(DistanceUnit::Miles));
        assert!("furlongs".parse::<DistanceUnit>().is_err());
    }
}

//! Application configuration loaded from environment variables.
//!
//! Defaults mirror the timings the map and list views were tuned for.

use crate::services::distance::DistanceUnit;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the backend API (e.g. "https://api.example.com/api/v4")
    pub api_base_url: String,
    /// Number of restaurants requested per full load
    pub restaurant_limit: u32,
    /// How long a cached collection is considered fresh
    pub cache_duration: Duration,
    /// Minimum spacing between filter-worker posts
    pub filter_throttle: Duration,
    /// Quiet period before notifying search-changed consumers
    pub search_debounce: Duration,
    /// Quiet period before querying place autocomplete
    pub places_debounce: Duration,
    /// Cooldown between automatic location prompts
    pub location_prompt_cooldown: chrono::Duration,
    /// HTTP request timeout
    pub request_timeout: Duration,
    /// Where `FileStore` persists its key/value map
    pub storage_path: PathBuf,
    /// Units used for distance display
    pub distance_unit: DistanceUnit,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8082/api".to_string(),
            restaurant_limit: 1000,
            cache_duration: Duration::from_secs(5 * 60),
            filter_throttle: Duration::from_millis(120),
            search_debounce: Duration::from_millis(300),
            places_debounce: Duration::from_millis(500),
            location_prompt_cooldown: chrono::Duration::hours(24),
            request_timeout: Duration::from_secs(15),
            storage_path: PathBuf::from(".restaurant-map/state.json"),
            distance_unit: DistanceUnit::Miles,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Only `API_BASE_URL` is required; everything else falls back to the
    /// defaults above.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Self::default();

        Ok(Self {
            api_base_url: env::var("API_BASE_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("API_BASE_URL"))?,
            restaurant_limit: parse_var("RESTAURANT_LIMIT", defaults.restaurant_limit)?,
            cache_duration: Duration::from_secs(parse_var(
                "CACHE_DURATION_SECS",
                defaults.cache_duration.as_secs(),
            )?),
            filter_throttle: Duration::from_millis(parse_var("FILTER_THROTTLE_MS", 120)?),
            search_debounce: Duration::from_millis(parse_var("SEARCH_DEBOUNCE_MS", 300)?),
            places_debounce: Duration::from_millis(parse_var("PLACES_DEBOUNCE_MS", 500)?),
            location_prompt_cooldown: chrono::Duration::hours(parse_var(
                "LOCATION_PROMPT_COOLDOWN_HOURS",
                24,
            )?),
            request_timeout: Duration::from_secs(parse_var(
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            storage_path: env::var("STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_path),
            distance_unit: parse_var("DISTANCE_UNIT", defaults.distance_unit)?,
        })
    }
}

/// Parse an optional environment variable, falling back to `default` when unset.
fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("API_BASE_URL", "https://api.example.com/api/");
        env::set_var("FILTER_THROTTLE_MS", "200");
        env::set_var("DISTANCE_UNIT", "km");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.api_base_url, "https://api.example.com/api");
        assert_eq!(config.filter_throttle, Duration::from_millis(200));
        assert_eq!(config.distance_unit, DistanceUnit::Kilometers);
        assert_eq!(config.cache_duration, Duration::from_secs(300));
        assert_eq!(config.places_debounce, Duration::from_millis(500));

        env::set_var("FILTER_THROTTLE_MS", "fast");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid {
                name: "FILTER_THROTTLE_MS",
                ..
            })
        ));

        env::remove_var("FILTER_THROTTLE_MS");
        env::remove_var("DISTANCE_UNIT");
    }
}

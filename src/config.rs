//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Cache and demo configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of entries the backend can hold
    pub capacity: usize,
    /// How long an entry stays valid after it was written
    pub ttl: Duration,
    /// Interval between background purges of expired entries, zero disables them
    pub cleanup_interval: Duration,
    /// Number of concurrent callers the demo binary fires
    pub demo_callers: usize,
    /// Number of distinct keys those callers spread over
    pub demo_keys: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 1000)
    /// - `CACHE_TTL_MS` - Entry lifetime in milliseconds (default: 300000)
    /// - `CLEANUP_INTERVAL_MS` - Purge frequency in milliseconds, 0 disables (default: 1000)
    /// - `DEMO_CALLERS` - Concurrent demo callers (default: 32)
    /// - `DEMO_KEYS` - Distinct demo keys (default: 4)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            capacity: parse_or(lookup("CACHE_CAPACITY"), defaults.capacity),
            ttl: millis_or(lookup("CACHE_TTL_MS"), defaults.ttl),
            cleanup_interval: millis_or(lookup("CLEANUP_INTERVAL_MS"), defaults.cleanup_interval),
            demo_callers: parse_or(lookup("DEMO_CALLERS"), defaults.demo_callers),
            demo_keys: parse_or(lookup("DEMO_KEYS"), defaults.demo_keys),
        }
    }

    /// Checks the values a cache cannot be built with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl: Duration::from_secs(300),
            cleanup_interval: Duration::from_secs(1),
            demo_callers: 32,
            demo_keys: 4,
        }
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn millis_or(raw: Option<String>, default: Duration) -> Duration {
    raw.and_then(|v| v.trim().parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.capacity, 1000);
        assert_eq!(config.ttl, Duration::from_secs(300));
        assert_eq!(config.cleanup_interval, Duration::from_secs(1));
        assert_eq!(config.demo_callers, 32);
        assert_eq!(config.demo_keys, 4);
    }

    #[test]
    fn test_config_from_empty_lookup_uses_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_from_lookup_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("CACHE_CAPACITY", "2"),
            ("CACHE_TTL_MS", "1500"),
            ("CLEANUP_INTERVAL_MS", "0"),
            ("DEMO_CALLERS", " 8 "),
        ]));

        assert_eq!(config.capacity, 2);
        assert_eq!(config.ttl, Duration::from_millis(1500));
        assert_eq!(config.cleanup_interval, Duration::ZERO);
        assert_eq!(config.demo_callers, 8);
        assert_eq!(config.demo_keys, 4);
    }

    #[test]
    fn test_config_invalid_values_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("CACHE_CAPACITY", "lots"),
            ("CACHE_TTL_MS", "-5"),
        ]));

        assert_eq!(config.capacity, 1000);
        assert_eq!(config.ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_config_validate() {
        assert!(Config::default().validate().is_ok());

        let config = Config {
            capacity: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroCapacity));
    }
}

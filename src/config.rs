//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::time::Duration;

const DEFAULT_TTL_SECS: u64 = 300;
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;

/// Cache configuration parameters.
///
/// A zero `default_ttl` means entries never expire unless given an explicit
/// TTL. A zero `cleanup_interval` disables the background sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// TTL applied to writes that ask for the default expiration
    pub default_ttl: Duration,
    /// Period between background sweeps of expired entries
    pub cleanup_interval: Duration,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DEFAULT_TTL_SECS` - Default TTL in seconds (default: 300, 0 = never expire)
    /// - `CACHE_CLEANUP_INTERVAL_SECS` - Sweep frequency in seconds (default: 60, 0 = disabled)
    pub fn from_env() -> Self {
        Self {
            default_ttl: secs_from_env("CACHE_DEFAULT_TTL_SECS", DEFAULT_TTL_SECS),
            cleanup_interval: secs_from_env(
                "CACHE_CLEANUP_INTERVAL_SECS",
                DEFAULT_CLEANUP_INTERVAL_SECS,
            ),
        }
    }
}

fn secs_from_env(name: &str, default: u64) -> Duration {
    let secs = env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.default_ttl, Duration::from_secs(300));
        assert_eq!(config.cleanup_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_DEFAULT_TTL_SECS");
        env::remove_var("CACHE_CLEANUP_INTERVAL_SECS");

        let config = Config::from_env();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_secs_from_env_falls_back_on_garbage() {
        env::set_var("TTL_CACHE_TEST_GARBAGE_SECS", "soon");
        assert_eq!(
            secs_from_env("TTL_CACHE_TEST_GARBAGE_SECS", 7),
            Duration::from_secs(7)
        );

        env::set_var("TTL_CACHE_TEST_GARBAGE_SECS", " 0 ");
        assert_eq!(secs_from_env("TTL_CACHE_TEST_GARBAGE_SECS", 7), Duration::ZERO);
        env::remove_var("TTL_CACHE_TEST_GARBAGE_SECS");
    }
}

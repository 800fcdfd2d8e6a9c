//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;

use tracing::warn;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// TTL in seconds applied when a set request omits one
    pub default_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Interval in seconds between reaper sweeps
    pub reaper_interval: u64,
}

const DEFAULT_CAPACITY: usize = 100;
const DEFAULT_TTL_SECS: u64 = 300;
const DEFAULT_PORT: u16 = 8081;
const DEFAULT_REAPER_INTERVAL_SECS: u64 = 1;

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 100, minimum 1)
    /// - `DEFAULT_TTL` - TTL in seconds when a request omits it (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 8081)
    /// - `REAPER_INTERVAL` - Expiration sweep frequency in seconds (default: 1, minimum 1)
    pub fn from_env() -> Self {
        Self {
            capacity: read_var("CACHE_CAPACITY", DEFAULT_CAPACITY).max(1),
            default_ttl: read_var("DEFAULT_TTL", DEFAULT_TTL_SECS).max(1),
            server_port: read_var("SERVER_PORT", DEFAULT_PORT),
            reaper_interval: read_var("REAPER_INTERVAL", DEFAULT_REAPER_INTERVAL_SECS).max(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            default_ttl: DEFAULT_TTL_SECS,
            server_port: DEFAULT_PORT,
            reaper_interval: DEFAULT_REAPER_INTERVAL_SECS,
        }
    }
}

/// Parses an environment variable, falling back to `default` when it is unset
/// or unparsable.
fn read_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid value {:?} for {}", raw, name);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.capacity, 100);
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.server_port, 8081);
        assert_eq!(config.reaper_interval, 1);
    }

    #[test]
    fn test_read_var_fallbacks() {
        // Unique names so parallel tests never race on the same variable
        env::remove_var("LRU_TEST_UNSET_VAR");
        assert_eq!(read_var("LRU_TEST_UNSET_VAR", 42usize), 42);

        env::set_var("LRU_TEST_GARBAGE_VAR", "not-a-number");
        assert_eq!(read_var("LRU_TEST_GARBAGE_VAR", 7u64), 7);

        env::set_var("LRU_TEST_VALID_VAR", " 15 ");
        assert_eq!(read_var("LRU_TEST_VALID_VAR", 7u64), 15);
    }
}

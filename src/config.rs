//! Configuration Module
//!
//! Handles loading and managing storage and server configuration from
//! environment variables.

use std::env;

use serde_json::Value;

/// Default lifetime in seconds for saves without an explicit TTL
pub const DEFAULT_EXPIRES: u64 = 30;

/// Default namespace prepended to every storage key
pub const DEFAULT_KEY_PREFIX: &str = "STORAGE_CACHE: ";

/// Default interval in seconds between expiry sweeps
pub const DEFAULT_AUTO_CLEAR_TIME: u64 = 60;

/// Storage cache options.
///
/// Fetchers and the storage engine are not plain data; they are supplied
/// through [`crate::StorageBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    /// Substrings protecting keys from Clear
    pub white_list: Vec<String>,
    /// Lifetime in seconds for saves without an explicit TTL
    pub default_expires: u64,
    /// Value stored as `expires` for entries that never expire
    pub never_expire_mark: Value,
    /// Namespace prepended to every storage key
    pub storage_key_prefix: String,
    /// Interval in seconds between expiry sweeps
    pub auto_clear_time: u64,
    /// Whether the background sweeper runs
    pub is_enable_auto_clear: bool,
}

impl StorageConfig {
    /// Loads storage options from environment variables.
    ///
    /// # Environment Variables
    /// - `STORAGE_WHITE_LIST` - Comma separated whitelist (default: empty)
    /// - `STORAGE_DEFAULT_EXPIRES` - Default TTL in seconds (default: 30)
    /// - `STORAGE_KEY_PREFIX` - Key namespace (default: "STORAGE_CACHE: ")
    /// - `STORAGE_AUTO_CLEAR_TIME` - Sweep interval in seconds (default: 60)
    /// - `STORAGE_ENABLE_AUTO_CLEAR` - Run the sweeper (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            white_list: env::var("STORAGE_WHITE_LIST")
                .ok()
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.white_list),
            default_expires: env::var("STORAGE_DEFAULT_EXPIRES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_expires),
            never_expire_mark: defaults.never_expire_mark,
            storage_key_prefix: env::var("STORAGE_KEY_PREFIX")
                .unwrap_or(defaults.storage_key_prefix),
            auto_clear_time: env::var("STORAGE_AUTO_CLEAR_TIME")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.auto_clear_time),
            is_enable_auto_clear: env::var("STORAGE_ENABLE_AUTO_CLEAR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.is_enable_auto_clear),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            white_list: Vec::new(),
            default_expires: DEFAULT_EXPIRES,
            never_expire_mark: Value::Null,
            storage_key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            auto_clear_time: DEFAULT_AUTO_CLEAR_TIME,
            is_enable_auto_clear: true,
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Storage cache options
    pub storage: StorageConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - see [`StorageConfig::from_env`] for the storage options
    pub fn from_env() -> Self {
        Self {
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            storage: StorageConfig::from_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            storage: StorageConfig::default(),
        }
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.storage.default_expires, 30);
        assert_eq!(config.storage.auto_clear_time, 60);
        assert_eq!(config.storage.never_expire_mark, Value::Null);
        assert!(config.storage.is_enable_auto_clear);
        assert!(config.storage.white_list.is_empty());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("SERVER_PORT");
        env::remove_var("STORAGE_WHITE_LIST");
        env::remove_var("STORAGE_DEFAULT_EXPIRES");
        env::remove_var("STORAGE_KEY_PREFIX");
        env::remove_var("STORAGE_AUTO_CLEAR_TIME");
        env::remove_var("STORAGE_ENABLE_AUTO_CLEAR");

        let config = Config::from_env();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list(" keep , also,,"),
            vec!["keep".to_string(), "also".to_string()]
        );
    }
}

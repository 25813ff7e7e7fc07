//! Configuration Module
//!
//! Cache sizing, expiry, memory-pressure and preload settings. Values load
//! from environment variables with defaults and can be changed at runtime
//! through [`SharedConfig`]; a change is picked up on the next cleanup or
//! preload cycle.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::error::{CacheError, Result};

/// Bytes in one mebibyte.
pub const MIB: u64 = 1024 * 1024;

/// Runtime-mutable configuration shared by the stores, monitor and scheduler.
pub type SharedConfig = Arc<RwLock<CacheConfig>>;

/// Cache configuration parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of entries per store
    pub max_entries: usize,
    /// Entries idle longer than this are expired during cleanup
    pub expiry: Duration,
    /// Process memory (bytes) above which the monitor runs a cleanup pass
    pub memory_threshold: u64,
    /// Upper bound on simultaneously running preload loads
    pub max_concurrent_preloads: usize,
    /// Memory monitor tick interval
    pub monitor_interval: Duration,
    /// Whether the memory monitor is started at all
    pub monitor_enabled: bool,
    /// A preload load running longer than this is abandoned
    pub preload_timeout: Duration,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_ENTRIES` - Maximum entries per store (default: 100)
    /// - `CACHE_EXPIRY_SECS` - Idle expiry in seconds (default: 1800)
    /// - `CACHE_MEMORY_THRESHOLD_MB` - Memory threshold in MiB (default: 500)
    /// - `CACHE_MAX_CONCURRENT_PRELOADS` - Preload concurrency (default: 3)
    /// - `CACHE_MONITOR_INTERVAL_SECS` - Monitor interval in seconds (default: 60)
    /// - `CACHE_MONITOR_ENABLED` - `true`/`false` (default: true)
    /// - `CACHE_PRELOAD_TIMEOUT_SECS` - Per-load timeout in seconds (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_parse("CACHE_MAX_ENTRIES").unwrap_or(defaults.max_entries),
            expiry: env_parse("CACHE_EXPIRY_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.expiry),
            memory_threshold: env_parse::<u64>("CACHE_MEMORY_THRESHOLD_MB")
                .map(|mb| mb * MIB)
                .unwrap_or(defaults.memory_threshold),
            max_concurrent_preloads: env_parse("CACHE_MAX_CONCURRENT_PRELOADS")
                .unwrap_or(defaults.max_concurrent_preloads),
            monitor_interval: env_parse("CACHE_MONITOR_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.monitor_interval),
            monitor_enabled: env_parse("CACHE_MONITOR_ENABLED")
                .unwrap_or(defaults.monitor_enabled),
            preload_timeout: env_parse("CACHE_PRELOAD_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.preload_timeout),
        }
    }

    /// Rejects values the cache cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(invalid("max_entries must be positive"));
        }
        if self.expiry.is_zero() {
            return Err(invalid("expiry must be a positive duration"));
        }
        if self.memory_threshold == 0 {
            return Err(invalid("memory_threshold must be positive"));
        }
        if self.max_concurrent_preloads == 0 {
            return Err(invalid("max_concurrent_preloads must be positive"));
        }
        if self.monitor_interval.is_zero() {
            return Err(invalid("monitor_interval must be a positive duration"));
        }
        if self.preload_timeout.is_zero() {
            return Err(invalid("preload_timeout must be a positive duration"));
        }
        Ok(())
    }

    /// Size each store is shrunk to under memory pressure.
    pub fn pressure_target(&self) -> usize {
        self.max_entries / 4
    }

    /// Wraps the configuration for sharing across components.
    pub fn into_shared(self) -> SharedConfig {
        Arc::new(RwLock::new(self))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            expiry: Duration::from_secs(30 * 60),
            memory_threshold: 500 * MIB,
            max_concurrent_preloads: 3,
            monitor_interval: Duration::from_secs(60),
            monitor_enabled: true,
            preload_timeout: Duration::from_secs(30),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn invalid(message: &str) -> CacheError {
    CacheError::InvalidConfiguration(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.max_entries, 100);
        assert_eq!(config.expiry, Duration::from_secs(1800));
        assert_eq!(config.memory_threshold, 500 * MIB);
        assert_eq!(config.max_concurrent_preloads, 3);
        assert_eq!(config.monitor_interval, Duration::from_secs(60));
        assert!(config.monitor_enabled);
        assert_ok!(config.validate());
    }

    #[test]
    fn test_config_from_env() {
        env::set_var("CACHE_MAX_ENTRIES", "40");
        env::set_var("CACHE_MEMORY_THRESHOLD_MB", "64");
        env::set_var("CACHE_MONITOR_ENABLED", "false");
        env::set_var("CACHE_EXPIRY_SECS", "not-a-number");

        let config = CacheConfig::from_env();
        assert_eq!(config.max_entries, 40);
        assert_eq!(config.memory_threshold, 64 * MIB);
        assert!(!config.monitor_enabled);
        assert_eq!(config.expiry, Duration::from_secs(1800));

        env::remove_var("CACHE_MAX_ENTRIES");
        env::remove_var("CACHE_MEMORY_THRESHOLD_MB");
        env::remove_var("CACHE_MONITOR_ENABLED");
        env::remove_var("CACHE_EXPIRY_SECS");
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let zero_entries = CacheConfig {
            max_entries: 0,
            ..CacheConfig::default()
        };
        assert_err!(zero_entries.validate());

        let zero_interval = CacheConfig {
            monitor_interval: Duration::ZERO,
            ..CacheConfig::default()
        };
        let err = zero_interval.validate().unwrap_err();
        assert!(err.to_string().contains("monitor_interval"));

        let zero_preloads = CacheConfig {
            max_concurrent_preloads: 0,
            ..CacheConfig::default()
        };
        assert_err!(zero_preloads.validate());
    }

    #[test]
    fn test_pressure_target_is_quarter() {
        let config = CacheConfig {
            max_entries: 10,
            ..CacheConfig::default()
        };
        assert_eq!(config.pressure_target(), 2);
    }
}

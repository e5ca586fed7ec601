//! Engine configuration.
//!
//! Configuration is plain serde data so it can be embedded in a server's
//! config file. Durations use humantime strings (`"3m"`, `"90s"`).
//!
//! # Example
//!
//! ```
//! use helios_search_engine::config::SearchEngineConfig;
//!
//! let config: SearchEngineConfig = serde_json::from_str(
//!     r#"{ "max_page_size": 200, "count_cache": { "ttl": "90s" } }"#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.max_page_size, 200);
//! assert_eq!(config.count_cache.ttl.as_secs(), 90);
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ValidationError;
use crate::types::PageRequest;

/// Configuration for the search orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEngineConfig {
    /// Largest window a single request may fetch.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Window size used when the caller does not specify one.
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Upper bound on include plus revinclude specifications per request.
    #[serde(default = "default_max_includes")]
    pub max_includes: usize,

    /// Count cache settings.
    #[serde(default)]
    pub count_cache: CountCacheConfig,
}

/// Configuration for the exact-count cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountCacheConfig {
    /// Whether exact counts are cached at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// How long a cached count stays valid.
    #[serde(with = "humantime_serde", default = "default_count_ttl")]
    pub ttl: Duration,

    /// Maximum number of cached signatures.
    #[serde(default = "default_count_capacity")]
    pub capacity: usize,
}

fn default_max_page_size() -> usize {
    1000
}

fn default_page_size() -> usize {
    20
}

fn default_max_includes() -> usize {
    20
}

fn default_true() -> bool {
    true
}

fn default_count_ttl() -> Duration {
    Duration::from_secs(180)
}

fn default_count_capacity() -> usize {
    1024
}

impl Default for SearchEngineConfig {
    fn default() -> Self {
        Self {
            max_page_size: default_max_page_size(),
            default_page_size: default_page_size(),
            max_includes: default_max_includes(),
            count_cache: CountCacheConfig::default(),
        }
    }
}

impl Default for CountCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            ttl: default_count_ttl(),
            capacity: default_count_capacity(),
        }
    }
}

impl SearchEngineConfig {
    /// Sets the maximum page size.
    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    /// Sets the maximum number of include specifications.
    pub fn with_max_includes(mut self, max_includes: usize) -> Self {
        self.max_includes = max_includes;
        self
    }

    /// Sets the count cache configuration.
    pub fn with_count_cache(mut self, count_cache: CountCacheConfig) -> Self {
        self.count_cache = count_cache;
        self
    }

    /// Returns a request for the first page at the default page size.
    pub fn default_page(&self) -> Result<PageRequest, ValidationError> {
        PageRequest::first_page(self.default_page_size)
    }

    /// Checks the configuration for values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_page_size == 0 {
            return Err(ConfigError::ZeroValue {
                field: "max_page_size",
            });
        }
        if self.default_page_size == 0 {
            return Err(ConfigError::ZeroValue {
                field: "default_page_size",
            });
        }
        if self.default_page_size > self.max_page_size {
            return Err(ConfigError::DefaultPageTooLarge {
                default_page_size: self.default_page_size,
                max_page_size: self.max_page_size,
            });
        }
        self.count_cache.validate()
    }
}

impl CountCacheConfig {
    /// Returns a configuration with caching turned off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Sets the TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        if self.ttl.is_zero() {
            return Err(ConfigError::ZeroValue {
                field: "count_cache.ttl",
            });
        }
        if self.capacity == 0 {
            return Err(ConfigError::ZeroValue {
                field: "count_cache.capacity",
            });
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field that must be positive is zero.
    #[error("{field} must be greater than zero")]
    ZeroValue {
        /// The offending field.
        field: &'static str,
    },

    /// The default page size exceeds the maximum.
    #[error("default_page_size ({default_page_size}) exceeds max_page_size ({max_page_size})")]
    DefaultPageTooLarge {
        /// Configured default.
        default_page_size: usize,
        /// Configured maximum.
        max_page_size: usize,
    },
}

/// Serde module for Duration with humantime format.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

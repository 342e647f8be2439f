//! Runtime configuration.
//!
//! Configuration is read from a TOML file. Every field has a default, so an
//! empty file (or no file at all) yields a working configuration that talks to
//! the public upstream, keeps the cache in-process and stores the catalog in a
//! local SQLite file.
//!
//! ```toml
//! [origin]
//! host = "api.steampowered.com"
//! path = "/ISteamApps/GetAppList/v2/"
//! retry_attempts = 3
//!
//! [cache]
//! url = "redis://127.0.0.1/"
//! key = "catalog:names"
//!
//! [batch]
//! size = 1000
//! concurrency = 4
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::utils::validation::{
    check_at_most, check_in_range, check_non_empty, check_positive, check_url_path,
    check_url_scheme, ValidationError, MAX_BATCH_SIZE,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub origin: OriginConfig,
    pub cache: CacheConfig,
    pub store: StoreConfig,
    pub batch: BatchConfig,
    pub scheduler: SchedulerConfig,
}

/// Upstream catalog endpoint and its resilience settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    pub scheme: String,
    pub host: String,
    pub path: String,

    /// TCP connect timeout per attempt
    pub connect_timeout_ms: u64,

    /// Whole-response timeout per attempt; the full catalog is large and slow
    pub response_timeout_secs: u64,

    /// Retries after the first attempt
    pub retry_attempts: u32,

    /// Base delay of the exponential backoff
    pub retry_delay_ms: u64,

    /// Upper bound for a single backoff delay
    pub max_retry_delay_ms: u64,

    /// Random spread applied to each delay, in `[0, 1]`
    pub jitter: f64,

    /// Largest response body buffered in memory, in bytes
    pub max_in_memory_size: usize,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            host: "api.steampowered.com".to_string(),
            path: "/ISteamApps/GetAppList/v2/".to_string(),
            connect_timeout_ms: 10_000,
            response_timeout_secs: 300,
            retry_attempts: 3,
            retry_delay_ms: 2_000,
            max_retry_delay_ms: 60_000,
            jitter: 0.5,
            max_in_memory_size: 50 * 1024 * 1024,
        }
    }
}

impl OriginConfig {
    /// Full request target
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.host, self.path)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay_ms)
    }
}

/// Distributed cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Redis URL; when absent the cache lives in-process
    pub url: Option<String>,

    /// Key of the hash holding `name -> id`
    pub key: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: None,
            key: "catalog:names".to_string(),
        }
    }
}

/// Persistent store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://catalog.db".to_string(),
            max_connections: 8,
        }
    }
}

/// Store write batching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Entries per store upsert batch, at most 10000
    pub size: usize,

    /// Batches allowed in flight at once
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: 1_000,
            concurrency: 4,
        }
    }
}

/// Periodic refresh trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub interval_secs: u64,

    /// Refresh immediately instead of waiting one interval
    pub run_on_start: bool,

    /// Release the in-process snapshot after each scheduled refresh
    pub clear_snapshot_after_refresh: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 24 * 60 * 60,
            run_on_start: false,
            clear_snapshot_after_refresh: true,
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file and validate it
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// holds out-of-range values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string and validate it
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or holds out-of-range values.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_url_scheme("origin.scheme", &self.origin.scheme)?;
        check_non_empty("origin.host", &self.origin.host)?;
        check_url_path("origin.path", &self.origin.path)?;
        check_in_range("origin.jitter", self.origin.jitter, 0.0, 1.0)?;
        check_positive("origin.max_in_memory_size", self.origin.max_in_memory_size)?;
        check_non_empty("cache.key", &self.cache.key)?;
        check_non_empty("store.url", &self.store.url)?;
        check_positive("store.max_connections", self.store.max_connections as usize)?;
        check_positive("batch.size", self.batch.size)?;
        check_at_most("batch.size", self.batch.size, MAX_BATCH_SIZE)?;
        check_positive("batch.concurrency", self.batch.concurrency)?;
        check_positive("scheduler.interval_secs", self.scheduler.interval_secs as usize)?;
        Ok(())
    }
}

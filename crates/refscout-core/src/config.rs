//! Engine tuning configuration.
//!
//! Covers the knobs the engine itself owns: shared-cache sizing/expiry and
//! the page size hint handed to host clients. Endpoint and credential
//! persistence belong to the consuming system, not to this crate.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{CacheConfig, MAX_CACHE_ENTRIES};

/// Largest page size a host client may be asked for.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Errors raised while loading tuning configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field value is out of range.
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Tuning knobs for discovery runs and shared caches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryTuning {
    /// Maximum entries per shared cache.
    #[serde(default = "default_cache_entries")]
    pub cache_entries: usize,

    /// Shared-cache entry TTL in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Page size hint for host listing calls.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

const fn default_cache_entries() -> usize {
    100
}

const fn default_cache_ttl_secs() -> u64 {
    30 * 60
}

const fn default_page_size() -> u32 {
    50
}

impl Default for DiscoveryTuning {
    fn default() -> Self {
        Self {
            cache_entries: default_cache_entries(),
            cache_ttl_secs: default_cache_ttl_secs(),
            page_size: default_page_size(),
        }
    }
}

impl DiscoveryTuning {
    /// Loads tuning from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses tuning from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a value is out of range.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let tuning: Self = toml::from_str(content)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Validates field ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when a value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_entries == 0 || self.cache_entries > MAX_CACHE_ENTRIES {
            return Err(ConfigError::Validation(format!(
                "cache_entries must be in 1..={MAX_CACHE_ENTRIES}, got {}",
                self.cache_entries
            )));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::Validation(format!(
                "page_size must be in 1..={MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        Ok(())
    }

    /// The cache configuration these knobs describe.
    #[must_use]
    pub const fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_entries: self.cache_entries,
            ttl: Duration::from_secs(self.cache_ttl_secs),
        }
    }
}

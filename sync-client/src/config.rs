//! Batching configuration for ordsync.
//!
//! Configuration can be built in code or loaded from a TOML file:
//!
//! ```toml
//! read_batch_size = 100
//! list_strategy = "lazy"
//! sharding_strategy = "enabled"
//! cache_strategy = "enabled"
//! ```

use ordsync_core::effective_batch_size;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// How the manager reads a whole collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStrategy {
    /// One query returning every entry.
    #[default]
    Eager,
    /// List names first, then fetch entries in batches.
    Lazy,
}

/// Whether name listings are split by leading character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardingStrategy {
    /// One listing query per location.
    #[default]
    Disabled,
    /// One listing query per name-prefix shard.
    Enabled,
}

/// Whether entries are cached between calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    /// Every call reads the device.
    Disabled,
    /// Reads are served from a per-location cache once initialized.
    #[default]
    Enabled,
}

/// Read batching and caching configuration.
///
/// Pure data; the reader and manager interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BatchingConfig {
    /// Names per batched fetch (default: 50; zero or negative also means 50).
    #[serde(default = "default_read_batch_size")]
    pub read_batch_size: i64,
    /// Whole-collection read strategy (default: eager).
    #[serde(default)]
    pub list_strategy: ListStrategy,
    /// Name listing sharding (default: disabled).
    #[serde(default)]
    pub sharding_strategy: ShardingStrategy,
    /// Entry caching (default: enabled).
    #[serde(default)]
    pub cache_strategy: CacheStrategy,
}

fn default_read_batch_size() -> i64 {
    50
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            read_batch_size: default_read_batch_size(),
            list_strategy: ListStrategy::default(),
            sharding_strategy: ShardingStrategy::default(),
            cache_strategy: CacheStrategy::default(),
        }
    }
}

impl BatchingConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::InvalidToml)
    }

    /// Set the batch size.
    pub fn with_read_batch_size(mut self, size: i64) -> Self {
        self.read_batch_size = size;
        self
    }

    /// Set the list strategy.
    pub fn with_list_strategy(mut self, strategy: ListStrategy) -> Self {
        self.list_strategy = strategy;
        self
    }

    /// Set the sharding strategy.
    pub fn with_sharding_strategy(mut self, strategy: ShardingStrategy) -> Self {
        self.sharding_strategy = strategy;
        self
    }

    /// Set the cache strategy.
    pub fn with_cache_strategy(mut self, strategy: CacheStrategy) -> Self {
        self.cache_strategy = strategy;
        self
    }

    /// The batch size actually used for fetches.
    pub fn effective_batch_size(&self) -> usize {
        effective_batch_size(self.read_batch_size)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// Failed to parse configuration text.
    #[error("invalid configuration: {0}")]
    InvalidToml(#[source] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = BatchingConfig::default();
        assert_eq!(config.read_batch_size, 50);
        assert_eq!(config.list_strategy, ListStrategy::Eager);
        assert_eq!(config.sharding_strategy, ShardingStrategy::Disabled);
        assert_eq!(config.cache_strategy, CacheStrategy::Enabled);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = BatchingConfig::from_toml_str("").unwrap();
        assert_eq!(config, BatchingConfig::default());
    }

    #[test]
    fn parses_every_field() {
        let config = BatchingConfig::from_toml_str(
            r#"
            read_batch_size = 10
            list_strategy = "lazy"
            sharding_strategy = "enabled"
            cache_strategy = "disabled"
            "#,
        )
        .unwrap();
        assert_eq!(config.read_batch_size, 10);
        assert_eq!(config.list_strategy, ListStrategy::Lazy);
        assert_eq!(config.sharding_strategy, ShardingStrategy::Enabled);
        assert_eq!(config.cache_strategy, CacheStrategy::Disabled);
    }

    #[test]
    fn non_positive_batch_size_falls_back() {
        let config = BatchingConfig::default().with_read_batch_size(0);
        assert_eq!(config.effective_batch_size(), 50);

        let config = BatchingConfig::default().with_read_batch_size(-1);
        assert_eq!(config.effective_batch_size(), 50);

        let config = BatchingConfig::default().with_read_batch_size(3);
        assert_eq!(config.effective_batch_size(), 3);
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let result = BatchingConfig::from_toml_str(r#"list_strategy = "sometimes""#);
        assert!(matches!(result, Err(ConfigError::InvalidToml(_))));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "read_batch_size = 25").unwrap();

        let config = BatchingConfig::from_file(file.path()).unwrap();
        assert_eq!(config.read_batch_size, 25);
        assert_eq!(config.list_strategy, ListStrategy::Eager);
    }

    #[test]
    fn missing_file_is_read_error() {
        let result = BatchingConfig::from_file(Path::new("/nonexistent/ordsync.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }
}

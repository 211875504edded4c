//! Cache configuration and builder.
//!
//! Two byte thresholds drive all size accounting:
//!
//! | Field            | Default | Role                                        |
//! |------------------|---------|---------------------------------------------|
//! | `high_threshold` | 2 GiB   | Hard ceiling on total and per-entry size    |
//! |`low_threshold`   | 1 GiB   | Target bytes to free per eviction pass      |
//!
//! The effective target for one eviction pass is
//! `min(low_threshold, high_threshold - incoming_len)`, so an incoming entry
//! close to the ceiling forces a deeper sweep.
//!
//! ## Example
//!
//! ```
//! use memocache::config::CacheConfig;
//!
//! let config = CacheConfig::builder()
//!     .high_threshold(1_000)
//!     .low_threshold(500)
//!     .in_memory()
//!     .build()
//!     .unwrap();
//! assert_eq!(config.eviction_target(200), 500);
//! assert_eq!(config.eviction_target(900), 100);
//! ```

use std::path::PathBuf;

use crate::error::CacheError;

/// Default hard ceiling on total stored size: 2 GiB.
pub const DEFAULT_HIGH_THRESHOLD: u64 = 2 * (1 << 30);

/// Default target bytes to free per eviction pass: 1 GiB.
pub const DEFAULT_LOW_THRESHOLD: u64 = 1 << 30;

/// Where persisted state lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StorageLocation {
    /// No durability across process restarts.
    #[default]
    InMemory,
    /// SQLite database file at the given path.
    Disk(PathBuf),
}

/// Validated cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Hard ceiling on total stored size and on any single entry, in bytes.
    pub high_threshold: u64,
    /// Target amount to free per eviction pass, in bytes.
    pub low_threshold: u64,
    /// Location of the backing store.
    pub storage: StorageLocation,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            high_threshold: DEFAULT_HIGH_THRESHOLD,
            low_threshold: DEFAULT_LOW_THRESHOLD,
            storage: StorageLocation::InMemory,
        }
    }
}

impl CacheConfig {
    /// Starts a builder with default thresholds and in-memory storage.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Effective number of bytes one eviction pass tries to free before
    /// inserting an entry of `incoming_len` bytes.
    pub fn eviction_target(&self, incoming_len: u64) -> u64 {
        self.low_threshold
            .min(self.high_threshold.saturating_sub(incoming_len))
    }

    pub(crate) fn validate(&self) -> Result<(), CacheError> {
        if self.high_threshold == 0 {
            return Err(CacheError::Config(
                "high_threshold must be greater than zero".into(),
            ));
        }
        if self.low_threshold > self.high_threshold {
            return Err(CacheError::Config(format!(
                "low_threshold ({}) must not exceed high_threshold ({})",
                self.low_threshold, self.high_threshold
            )));
        }
        Ok(())
    }
}

/// Fallible builder for [`CacheConfig`].
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    /// Sets the hard ceiling on total and per-entry size, in bytes.
    pub fn high_threshold(mut self, bytes: u64) -> Self {
        self.config.high_threshold = bytes;
        self
    }

    /// Sets the target bytes to free per eviction pass.
    pub fn low_threshold(mut self, bytes: u64) -> Self {
        self.config.low_threshold = bytes;
        self
    }

    /// Keeps all state in memory; nothing survives the process.
    pub fn in_memory(mut self) -> Self {
        self.config.storage = StorageLocation::InMemory;
        self
    }

    /// Persists state to a SQLite database at `path`.
    pub fn on_disk(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.storage = StorageLocation::Disk(path.into());
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<CacheConfig, CacheError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

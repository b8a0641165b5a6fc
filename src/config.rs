//! Configuration for lsmkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{LsmError, Result};

/// Main configuration for an lsmkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding every file the engine owns
    /// Internal structure:
    ///   {segments_dir}/
    ///     ├── wal.log          (write-ahead log)
    ///     ├── database_state   (engine snapshot)
    ///     └── segment-N        (immutable segments)
    pub segments_dir: PathBuf,

    /// Base name for segment files; segments are named `<basename>-<n>`
    pub segment_basename: String,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// File name of the write-ahead log inside `segments_dir`
    pub wal_basename: String,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Memtable footprint (in bytes) that a new key may not push past
    /// without flushing first
    pub flush_threshold: usize,

    /// Sparse index sampling density: one entry every
    /// `flush_threshold / sparsity_factor` records
    pub sparsity_factor: usize,

    // -------------------------------------------------------------------------
    // Membership Filter Configuration
    // -------------------------------------------------------------------------
    /// Expected number of distinct flushed keys
    pub filter_expected_items: usize,

    /// Target false-positive rate, in (0, 1)
    pub filter_false_positive_rate: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            segments_dir: PathBuf::from("./lsmkv_data"),
            segment_basename: "segment".to_string(),
            wal_basename: "wal.log".to_string(),
            flush_threshold: 1_000_000,
            sparsity_factor: 100,
            filter_expected_items: 1_000_000,
            filter_false_positive_rate: 0.2,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Number of records between two sparse index samples (never zero)
    pub fn sparsity(&self) -> usize {
        (self.flush_threshold / self.sparsity_factor.max(1)).max(1)
    }

    /// Check every field for values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.flush_threshold == 0 {
            return Err(LsmError::Config("flush_threshold must be > 0".to_string()));
        }
        if self.sparsity_factor == 0 {
            return Err(LsmError::Config("sparsity_factor must be > 0".to_string()));
        }
        if self.filter_expected_items == 0 {
            return Err(LsmError::Config(
                "filter_expected_items must be > 0".to_string(),
            ));
        }
        let p = self.filter_false_positive_rate;
        if !(p > 0.0 && p < 1.0) {
            return Err(LsmError::Config(format!(
                "filter_false_positive_rate must be in (0, 1), got {}",
                p
            )));
        }
        if self.segment_basename.is_empty() || self.wal_basename.is_empty() {
            return Err(LsmError::Config(
                "segment_basename and wal_basename must not be empty".to_string(),
            ));
        }
        if self.segment_basename == self.wal_basename {
            return Err(LsmError::Config(
                "segment_basename and wal_basename must differ".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the segments directory (root for all storage)
    pub fn segments_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.segments_dir = path.into();
        self
    }

    /// Set the segment base name
    pub fn segment_basename(mut self, name: impl Into<String>) -> Self {
        self.config.segment_basename = name.into();
        self
    }

    /// Set the WAL file name
    pub fn wal_basename(mut self, name: impl Into<String>) -> Self {
        self.config.wal_basename = name.into();
        self
    }

    /// Set the flush threshold (in bytes)
    pub fn flush_threshold(mut self, bytes: usize) -> Self {
        self.config.flush_threshold = bytes;
        self
    }

    /// Set the sparse index sparsity factor
    pub fn sparsity_factor(mut self, factor: usize) -> Self {
        self.config.sparsity_factor = factor;
        self
    }

    /// Set the expected number of flushed keys for the filter
    pub fn filter_expected_items(mut self, items: usize) -> Self {
        self.config.filter_expected_items = items;
        self
    }

    /// Set the filter's target false-positive rate
    pub fn filter_false_positive_rate(mut self, rate: f64) -> Self {
        self.config.filter_false_positive_rate = rate;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

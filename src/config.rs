//! Configuration for blockstore
//!
//! Centralized configuration with sensible defaults.
//!
//! None of these values are persisted in the data file: a store must be
//! reopened with the same block size and strategy that wrote it.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::StoreError;
use crate::record::FieldLimits;

/// Main configuration for a blockstore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // File Configuration
    // -------------------------------------------------------------------------
    /// Data file holding the blocks
    pub data_file: PathBuf,

    // -------------------------------------------------------------------------
    // Layout Configuration
    // -------------------------------------------------------------------------
    /// Size of every block in bytes
    pub block_size: usize,

    /// Packing strategy used to lay records into blocks
    pub strategy: StrategyKind,

    // -------------------------------------------------------------------------
    // Record Configuration
    // -------------------------------------------------------------------------
    /// Maximum byte lengths of the variable-length record fields
    pub limits: FieldLimits,
}

/// Block-packing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Uniform pre-sized slots
    Fixed,

    /// Variable-length frames, never split across blocks
    Contiguous,

    /// Variable-length frames that may continue into the following blocks
    Fragmented,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::Fixed => "fixed",
            StrategyKind::Contiguous => "contiguous",
            StrategyKind::Fragmented => "fragmented",
        };
        f.write_str(name)
    }
}

impl FromStr for StrategyKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" => Ok(StrategyKind::Fixed),
            "contiguous" | "variable" => Ok(StrategyKind::Contiguous),
            "fragmented" | "spanned" => Ok(StrategyKind::Fragmented),
            other => Err(StoreError::Config(format!(
                "Unknown strategy '{}' (expected fixed, contiguous or fragmented)",
                other
            ))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("students.dat"),
            block_size: 512,
            strategy: StrategyKind::Contiguous,
            limits: FieldLimits::default(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data file path
    pub fn data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_file = path.into();
        self
    }

    /// Set the block size (in bytes)
    pub fn block_size(mut self, size: usize) -> Self {
        self.config.block_size = size;
        self
    }

    /// Set the packing strategy
    pub fn strategy(mut self, strategy: StrategyKind) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Set the field length limits
    pub fn limits(mut self, limits: FieldLimits) -> Self {
        self.config.limits = limits;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

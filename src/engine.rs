//! Engine Module
//!
//! Binds a `Config` (data file, block size, strategy, field limits) to the
//! matching `Storage` implementation.
//!
//! ## Responsibilities
//! - Build the configured strategy and validate its block size
//! - Truncate and validate records before they reach the strategy
//! - Expose the record operations against the configured data file

use std::path::Path;

use crate::config::{Config, StrategyKind};
use crate::error::{Result, StoreError};
use crate::record::Student;
use crate::storage::{open_storage, ReorganizationReport, Storage, StoreStats};

/// The record store facade
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Strategy that owns the on-disk layout
    storage: Box<dyn Storage>,
}

impl Engine {
    /// Build the engine for `config`
    ///
    /// Fails with `StoreError::Config` when the block size cannot be used by
    /// the chosen strategy. The data file is not touched.
    pub fn open(config: Config) -> Result<Self> {
        let storage = open_storage(config.strategy, config.block_size, config.limits)?;

        tracing::debug!(
            file = %config.data_file.display(),
            strategy = %config.strategy,
            block_size = config.block_size,
            "engine opened"
        );

        Ok(Self { config, storage })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses the default config with the specified data file
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_file(path).build();
        Self::open(config)
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Replace the data file with `records`
    ///
    /// Returns the number of records written.
    pub fn load(&self, records: &[Student]) -> Result<usize> {
        let prepared = self.prepare_all(records)?;
        self.storage.write_all(self.data_file(), &prepared)?;
        Ok(prepared.len())
    }

    /// Look up the active record with `key`
    pub fn get(&self, key: u32) -> Result<Student> {
        self.storage.find_by_key(self.data_file(), key)
    }

    /// Every active record in file order
    pub fn list(&self) -> Result<Vec<Student>> {
        self.storage.list_all(self.data_file())
    }

    /// Insert `records` into free space, creating the file if needed
    ///
    /// Returns the number of records inserted.
    pub fn add(&self, records: &[Student]) -> Result<usize> {
        let prepared = self.prepare_all(records)?;
        self.storage.add_many(self.data_file(), &prepared)?;
        Ok(prepared.len())
    }

    /// Replace the active record that has the same key as `record`
    pub fn update(&self, record: &Student) -> Result<()> {
        let prepared = self.prepare(record)?;
        self.storage.update(self.data_file(), &prepared)
    }

    /// Tombstone the active record with `key`
    pub fn delete(&self, key: u32) -> Result<()> {
        self.storage.delete(self.data_file(), key)
    }

    /// Compact the active records into the `_reorg` sibling file
    pub fn reorganize(&self) -> Result<ReorganizationReport> {
        self.storage.reorganize(self.data_file())
    }

    /// Occupancy statistics of the data file
    pub fn stats(&self) -> Result<StoreStats> {
        self.storage.stats(self.data_file())
    }

    /// First key after the largest active key, or 1 when the store is empty
    pub fn next_key(&self) -> Result<u32> {
        if !self.data_file().exists() {
            return Ok(1);
        }
        let max = self.list()?.iter().map(|s| s.key).max().unwrap_or(0);
        max.checked_add(1).ok_or(StoreError::KeysExhausted(max))
    }

    // =========================================================================
    // Record Preparation
    // =========================================================================

    fn prepare(&self, record: &Student) -> Result<Student> {
        let mut prepared = record.clone();
        prepared.truncate_fields(&self.config.limits);
        prepared.validate()?;
        Ok(prepared)
    }

    fn prepare_all(&self, records: &[Student]) -> Result<Vec<Student>> {
        records.iter().map(|r| self.prepare(r)).collect()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn block_size(&self) -> usize {
        self.storage.block_size()
    }

    pub fn strategy(&self) -> StrategyKind {
        self.storage.kind()
    }

    /// Get the data file path
    pub fn data_file(&self) -> &Path {
        &self.config.data_file
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

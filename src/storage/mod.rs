//! Storage Module
//!
//! Block-organized record files behind one contract.
//!
//! ## Strategies
//! - `FixedStorage`: uniform slots sized from the field limits, O(1) addressing
//! - `ContiguousStorage`: variable-length frames packed without crossing a block boundary
//! - `FragmentedStorage`: variable-length frames that continue into the next block(s)
//!
//! ## File Layout
//! ```text
//! ┌───────────────┬───────────────┬───────────────┬─────┐
//! │   Block 0     │   Block 1     │   Block 2     │ ... │
//! │ frames | 0000 │ frames | 0000 │ frames | 0000 │     │
//! └───────────────┴───────────────┴───────────────┴─────┘
//! offset(block n) = n * block_size; unused tail bytes are zero
//! ```
//! There is no file header: the block size and strategy must be supplied by
//! the caller every time a file is opened.
//!
//! ## Statistics
//! Every operation that needs occupancy figures rescans the file. Nothing is
//! cached between calls.

mod block;
mod contiguous;
mod fixed;
mod fragmented;
mod packer;
mod stats;

use std::path::Path;

pub use block::{BlockFile, Blocks};
pub use contiguous::ContiguousStorage;
pub use fixed::FixedStorage;
pub use fragmented::FragmentedStorage;
pub use packer::{BlockPacker, PackMode, PackedBlock};
pub use stats::{reorganized_path, BlockStats, ReorganizationReport, StoreStats, REORG_SUFFIX};

use crate::config::StrategyKind;
use crate::error::Result;
use crate::record::{FieldLimits, Student};

/// Contract shared by every packing strategy
///
/// Records passed in must already have been truncated and validated.
/// Each call opens the file, works on it and closes it before returning.
pub trait Storage {
    /// Replace the file at `path` with `records`, packed sequentially
    fn write_all(&self, path: &Path, records: &[Student]) -> Result<()>;

    /// First active record with `key`, or `StoreError::NotFound`
    fn find_by_key(&self, path: &Path, key: u32) -> Result<Student>;

    /// Every active record in file order
    fn list_all(&self, path: &Path) -> Result<Vec<Student>>;

    /// Insert `records` into free space, appending blocks when needed
    fn add_many(&self, path: &Path, records: &[Student]) -> Result<()>;

    /// Replace the active record with the same key as `record`
    fn update(&self, path: &Path, record: &Student) -> Result<()>;

    /// Tombstone the active record with `key`
    fn delete(&self, path: &Path, key: u32) -> Result<()>;

    /// Occupancy statistics derived from the file's bytes
    fn stats(&self, path: &Path) -> Result<StoreStats>;

    /// Reject block sizes this strategy cannot use
    fn validate_block_size(&self, block_size: usize) -> Result<()>;

    fn block_size(&self) -> usize;

    fn kind(&self) -> StrategyKind;

    /// Rewrite the active records of `path` into a compacted sibling file
    ///
    /// The source file is left untouched.
    fn reorganize(&self, path: &Path) -> Result<ReorganizationReport> {
        let before = self.stats(path)?;
        let records = self.list_all(path)?;
        let target = reorganized_path(path);

        self.write_all(&target, &records)?;
        let after = self.stats(&target)?;

        let report = ReorganizationReport::compare(&before, &after, target);
        tracing::info!(
            strategy = %self.kind(),
            records = records.len(),
            blocks_before = report.blocks_before,
            blocks_after = report.blocks_after,
            freed = report.freed_blocks,
            "reorganized {} into {}",
            path.display(),
            report.output.display()
        );
        Ok(report)
    }
}

/// Build the strategy for `kind`, validating `block_size`
pub fn open_storage(
    kind: StrategyKind,
    block_size: usize,
    limits: FieldLimits,
) -> Result<Box<dyn Storage>> {
    let storage: Box<dyn Storage> = match kind {
        StrategyKind::Fixed => Box::new(FixedStorage::new(block_size, limits)?),
        StrategyKind::Contiguous => Box::new(ContiguousStorage::new(block_size)?),
        StrategyKind::Fragmented => Box::new(FragmentedStorage::new(block_size)?),
    };
    Ok(storage)
}

//! Occupancy statistics and reorganization reports
//!
//! Statistics are never stored. Every strategy derives them by scanning the
//! data file and hands the per-block figures to `StoreStats::from_blocks`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix inserted before the extension of a reorganized file
pub const REORG_SUFFIX: &str = "_reorg";

/// Occupancy of a single block
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStats {
    /// 0-based block index
    pub index: usize,
    /// Bytes holding live or tombstoned record data
    pub bytes_used: usize,
    /// Block capacity
    pub bytes_total: usize,
    /// `bytes_used / bytes_total * 100`
    pub occupancy_rate: f64,
    /// Active records attributed to this block
    pub record_count: usize,
}

impl BlockStats {
    pub fn new(index: usize, bytes_used: usize, bytes_total: usize, record_count: usize) -> Self {
        Self {
            index,
            bytes_used,
            bytes_total,
            occupancy_rate: percentage(bytes_used, bytes_total),
            record_count,
        }
    }

    /// Neither empty nor full
    pub fn is_partial(&self) -> bool {
        self.occupancy_rate > 0.0 && self.occupancy_rate < 100.0
    }
}

/// Aggregate occupancy of a data file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoreStats {
    pub total_blocks: usize,
    pub total_bytes_used: usize,
    /// Always `total_blocks * block_size`
    pub total_bytes_total: usize,
    /// `total_bytes_used / total_bytes_total * 100`
    pub efficiency_rate: f64,
    pub partial_blocks: usize,
    pub blocks: Vec<BlockStats>,
}

impl StoreStats {
    /// Statistics of a file with no blocks
    pub fn empty() -> Self {
        Self::default()
    }

    /// Aggregate per-block statistics produced by a file scan
    pub fn from_blocks(block_size: usize, blocks: Vec<BlockStats>) -> Self {
        let total_blocks = blocks.len();
        let total_bytes_used = blocks.iter().map(|b| b.bytes_used).sum();
        let total_bytes_total = total_blocks * block_size;
        let partial_blocks = blocks.iter().filter(|b| b.is_partial()).count();

        Self {
            total_blocks,
            total_bytes_used,
            total_bytes_total,
            efficiency_rate: percentage(total_bytes_used, total_bytes_total),
            partial_blocks,
            blocks,
        }
    }

    /// Unweighted mean of the per-block occupancy rates
    pub fn mean_occupancy(&self) -> f64 {
        if self.blocks.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.blocks.iter().map(|b| b.occupancy_rate).sum();
        sum / self.blocks.len() as f64
    }

    /// Active records across all blocks
    pub fn record_count(&self) -> usize {
        self.blocks.iter().map(|b| b.record_count).sum()
    }
}

/// Before/after comparison produced by a reorganization
#[derive(Debug, Clone, PartialEq)]
pub struct ReorganizationReport {
    pub blocks_before: usize,
    pub blocks_after: usize,
    pub mean_occupancy_before: f64,
    pub mean_occupancy_after: f64,
    pub efficiency_before: f64,
    pub efficiency_after: f64,
    /// `efficiency_after - efficiency_before`
    pub efficiency_gain: f64,
    /// `blocks_before - blocks_after`
    pub freed_blocks: i64,
    /// File the compacted records were written to
    pub output: PathBuf,
}

impl ReorganizationReport {
    pub fn compare(before: &StoreStats, after: &StoreStats, output: PathBuf) -> Self {
        Self {
            blocks_before: before.total_blocks,
            blocks_after: after.total_blocks,
            mean_occupancy_before: before.mean_occupancy(),
            mean_occupancy_after: after.mean_occupancy(),
            efficiency_before: before.efficiency_rate,
            efficiency_after: after.efficiency_rate,
            efficiency_gain: after.efficiency_rate - before.efficiency_rate,
            freed_blocks: before.total_blocks as i64 - after.total_blocks as i64,
            output,
        }
    }
}

/// Sibling path a reorganization writes to
///
/// "students.dat" → "students_reorg.dat", "students" → "students_reorg"
pub fn reorganized_path(path: &Path) -> PathBuf {
    let mut name: OsString = path
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_default();

    name.push(REORG_SUFFIX);
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }

    path.with_file_name(name)
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

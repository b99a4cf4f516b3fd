//! Plain-text reports
//!
//! Read-only formatting of `StoreStats` and `ReorganizationReport` for the
//! CLI. Nothing here touches the data file.

use crate::storage::{BlockStats, ReorganizationReport, StoreStats};

/// Width of a block bar in `render_block_visualization`
pub const BAR_WIDTH: usize = 40;

/// Aggregate figures, one per line
pub fn render_summary(stats: &StoreStats) -> String {
    [
        format!("Blocks:             {}", stats.total_blocks),
        format!("Records:            {}", stats.record_count()),
        format!(
            "Bytes used:         {} / {}",
            stats.total_bytes_used, stats.total_bytes_total
        ),
        format!("Efficiency:         {:.2}%", stats.efficiency_rate),
        format!("Mean occupancy:     {:.2}%", stats.mean_occupancy()),
        format!("Partial blocks:     {}", stats.partial_blocks),
    ]
    .join("\n")
}

/// One line per block: index, used/total bytes, occupancy and record count
pub fn render_block_map(stats: &StoreStats) -> String {
    if stats.blocks.is_empty() {
        return "(no blocks)".to_string();
    }

    stats
        .blocks
        .iter()
        .map(|b| {
            format!(
                "block {:>4}  {:>6}/{:<6} bytes  {:>6.2}%  {} record(s)",
                b.index, b.bytes_used, b.bytes_total, b.occupancy_rate, b.record_count
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// A fixed-width occupancy bar per block
///
/// ```text
/// #0000 [################........................]  40.00%
/// ```
pub fn render_block_visualization(stats: &StoreStats) -> String {
    if stats.blocks.is_empty() {
        return "(no blocks)".to_string();
    }

    stats
        .blocks
        .iter()
        .map(|b| format!("#{:04} [{}] {:>6.2}%", b.index, bar(b), b.occupancy_rate))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Before/after comparison of a reorganization
pub fn render_reorganization(report: &ReorganizationReport) -> String {
    [
        format!("Output:             {}", report.output.display()),
        format!(
            "Blocks:             {} -> {}",
            report.blocks_before, report.blocks_after
        ),
        format!(
            "Mean occupancy:     {:.2}% -> {:.2}%",
            report.mean_occupancy_before, report.mean_occupancy_after
        ),
        format!(
            "Efficiency:         {:.2}% -> {:.2}%",
            report.efficiency_before, report.efficiency_after
        ),
        format!("Efficiency gain:    {:+.2} points", report.efficiency_gain),
        format!("Freed blocks:       {}", report.freed_blocks),
    ]
    .join("\n")
}

fn bar(block: &BlockStats) -> String {
    let filled = if block.bytes_total == 0 {
        0
    } else {
        // Round up so any used byte shows at least one cell
        (block.bytes_used * BAR_WIDTH).div_ceil(block.bytes_total).min(BAR_WIDTH)
    };
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

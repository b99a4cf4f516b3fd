//! # blockstore
//!
//! A block-organized student-record store with:
//! - Three packing strategies: fixed slots, contiguous variable-length
//!   frames, and variable-length frames that span block boundaries
//! - Tombstone deletion and in-place or relocating updates
//! - Occupancy statistics recomputed from the file on every call
//! - Reorganization into a compacted sibling file
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  CLI / Interactive Shell                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Engine                                │
//! │        (truncate + validate, then delegate to Storage)       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!      ┌────────────────┼────────────────┐
//!      ▼                ▼                ▼
//! ┌──────────┐   ┌─────────────┐   ┌─────────────┐
//! │  Fixed   │   │ Contiguous  │   │ Fragmented  │
//! │ (slots)  │   │  (frames)   │   │  (spanning) │
//! └────┬─────┘   └──────┬──────┘   └──────┬──────┘
//!      │                │                 │
//!      └────────────────┼─────────────────┘
//!                       ▼
//!          ┌─────────────────────────┐
//!          │  Codec  +  BlockFile    │
//!          │ (frames, slots, blocks) │
//!          └─────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod codec;
pub mod storage;
pub mod engine;
pub mod report;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, StoreError};
pub use config::{Config, StrategyKind};
pub use engine::Engine;
pub use record::{FieldLimits, Student, StudentGenerator};
pub use storage::{open_storage, ReorganizationReport, Storage, StoreStats};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of blockstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

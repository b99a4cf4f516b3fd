//! Error types for blockstore
//!
//! Provides a unified error type for all storage operations.

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for blockstore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Capacity Errors
    // -------------------------------------------------------------------------
    /// A single record cannot fit in one block (or one slot).
    #[error(
        "Record {key} needs {frame_len} bytes but only {limit} are available; increase the block size"
    )]
    Capacity {
        key: u32,
        frame_len: usize,
        limit: usize,
    },

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    /// Corrupt or truncated frame: zero size, out-of-bounds length,
    /// or a record that fails validation after decoding.
    #[error("Format error: {0}")]
    Format(String),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Record with key {0} not found")]
    NotFound(u32),

    /// The store already holds the largest possible key.
    #[error("No key left to allocate after {0}")]
    KeysExhausted(u32),

    // -------------------------------------------------------------------------
    // Record Validation Errors
    // -------------------------------------------------------------------------
    #[error("Validation error: {0}")]
    Validation(String),
}

impl StoreError {
    /// Shorthand for building a `Format` error
    pub(crate) fn format(message: impl Into<String>) -> Self {
        StoreError::Format(message.into())
    }
}

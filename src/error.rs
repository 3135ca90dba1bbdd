//! Error types for hyperkv
//!
//! Provides a unified error type for all storage operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using HyperError
pub type Result<T> = std::result::Result<T, HyperError>;

/// Unified error type for hyperkv operations
#[derive(Debug, Error)]
pub enum HyperError {
    // -------------------------------------------------------------------------
    // Backing Store Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store is locked by another handle: {}", .0.display())]
    Locked(PathBuf),

    #[error("Store is closed")]
    Closed,

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Not Found
    // -------------------------------------------------------------------------
    /// The backing store's own not-found signal.
    #[error("Key not found")]
    KeyNotFound,

    #[error("No node found at index {index}")]
    NodeNotFound { index: u64 },

    #[error("No signature found at index {index}")]
    SignatureNotFound { index: u64 },

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Flat stream of {size} bytes exceeds the {limit} byte limit")]
    StreamTooLarge { size: u64, limit: u64 },

    // -------------------------------------------------------------------------
    // Caller Contract Violations
    // -------------------------------------------------------------------------
    #[error(
        "Bitfield write not page aligned: offset {offset}, length {len}, page size {page_size}"
    )]
    PageMisaligned {
        offset: u64,
        len: usize,
        page_size: u16,
    },

    #[error("Index {index} plus {delta} overflows the slot space")]
    IndexOverflow { index: u64, delta: u64 },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Joined task failed: {0}")]
    JoinFailed(String),
}

impl HyperError {
    /// True for every flavour of "no record at this index".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            HyperError::KeyNotFound
                | HyperError::NodeNotFound { .. }
                | HyperError::SignatureNotFound { .. }
        )
    }

    /// True when the caller broke an API contract. These are programming
    /// errors and must not be retried.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            HyperError::PageMisaligned { .. } | HyperError::IndexOverflow { .. }
        )
    }
}

impl From<bincode::Error> for HyperError {
    fn from(err: bincode::Error) -> Self {
        HyperError::Serialization(err.to_string())
    }
}

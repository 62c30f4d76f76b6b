//! Error types for FeedStore
//!
//! Provides a unified error type for all operations. The first group is the
//! store's own taxonomy and is what callers see on the wire; the rest are
//! ambient failures of the journal, codec and transport.

use thiserror::Error;

use crate::protocol::Status;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for FeedStore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Unauthorized: {0}")]
    Authorization(String),

    #[error("Block number {block_number} is not greater than last block number {last_block_number}")]
    Ordering {
        block_number: u64,
        last_block_number: u64,
    },

    #[error("Out of range: {0}")]
    Range(String),

    #[error("Data of {len} bytes exceeds capacity of {capacity} bytes for stride {stride}")]
    Capacity { len: u64, capacity: u64, stride: u8 },

    #[error("Admin access violation: {0}")]
    AdminAccess(String),

    #[error("Invalid implementation: {0}")]
    Implementation(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Request rejected ({status:?}): {message}")]
    Rejected { status: Status, message: String },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Shorthand for building a range error
    pub fn range(message: impl Into<String>) -> Self {
        StoreError::Range(message.into())
    }
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

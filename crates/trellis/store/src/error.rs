//! Store error types

use thiserror::Error;
use trellis_types::{KindName, RecordError, RecordId};

/// Record store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("Record already exists: {kind}/{name}")]
    AlreadyExists { kind: KindName, name: String },

    #[error("Revision conflict: current {current}, expected {expected}")]
    RevisionConflict { current: u64, expected: u64 },

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

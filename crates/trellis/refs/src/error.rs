//! Resolution error types
//!
//! Every resolution error names the referring field, so a failure on a
//! record with several reference fields points at the one that broke.

use thiserror::Error;
use trellis_types::{FieldName, KindName};

/// Reference resolution errors
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("field {field}: referenced {kind} record not found: {name}")]
    ReferenceNotFound {
        field: FieldName,
        kind: KindName,
        name: String,
    },

    #[error("field {field}: no {kind} record matches the selector")]
    NoMatchingCandidate { field: FieldName, kind: KindName },

    #[error("field {field}: selector matches {matches} {kind} records, expected exactly one")]
    AmbiguousSelector {
        field: FieldName,
        kind: KindName,
        matches: usize,
    },

    #[error("candidate source error: {0}")]
    Source(String),
}

/// Result type for resolution operations
pub type Result<T> = std::result::Result<T, ResolveError>;

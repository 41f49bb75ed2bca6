//! Reconciliation error types
//!
//! Every error classifies into an [`ErrorClass`], which is what the driver
//! schedules retries from: the machine decides *what kind* of failure
//! happened, the driver decides *when* to try again.

use crate::provider::ProviderError;
use thiserror::Error;
use trellis_refs::ResolveError;
use trellis_store::StoreError;
use trellis_types::{ErrorClass, KindName, RecordError};

/// Reconciliation errors
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Unknown kind: {0}")]
    UnknownKind(KindName),

    #[error("Kind already registered: {0}")]
    KindAlreadyRegistered(KindName),

    #[error("Provider call {operation} failed: {source}")]
    Provider {
        operation: String,
        #[source]
        source: ProviderError,
    },

    #[error("Call {operation} exceeded its deadline")]
    DeadlineExceeded { operation: String },

    #[error("Reference resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),
}

impl ReconcileError {
    pub(crate) fn provider(operation: &str, source: ProviderError) -> Self {
        Self::Provider {
            operation: operation.to_string(),
            source,
        }
    }

    /// Classify this error for retry scheduling.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownKind(_) | Self::KindAlreadyRegistered(_) => ErrorClass::Fatal,

            Self::Provider { source, .. } => match source {
                ProviderError::NotFound(_) => ErrorClass::NotFound,
                ProviderError::Throttled(_) | ProviderError::Connection(_) => {
                    ErrorClass::Retryable
                }
                ProviderError::Api(_) => ErrorClass::Fatal,
            },

            // A call that timed out may have landed; the next cycle
            // re-observes before mutating again.
            Self::DeadlineExceeded { .. } => ErrorClass::Retryable,

            Self::Resolve(source) => match source {
                ResolveError::Source(_) => ErrorClass::Retryable,
                _ => ErrorClass::ReferenceUnresolved,
            },

            Self::Store(source) => match source {
                StoreError::RecordNotFound(_) => ErrorClass::NotFound,
                StoreError::RevisionConflict { .. } | StoreError::Storage(_) => {
                    ErrorClass::Retryable
                }
                StoreError::AlreadyExists { .. } | StoreError::Record(_) => ErrorClass::Fatal,
            },

            Self::Record(_) => ErrorClass::Fatal,
        }
    }
}

/// Result type for reconciliation operations
pub type Result<T> = std::result::Result<T, ReconcileError>;

//! Shared error vocabulary
//!
//! [`ErrorClass`] is the taxonomy every reconcile failure is classified
//! into; the control loop turns the class into a retry decision. The
//! record-level invariant violations live here too.

use crate::ids::ExternalId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a reconcile failure, driving retry scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Expected absence (remote resource or record gone); drives state
    /// transitions rather than retries.
    NotFound,
    /// Provider, network, timeout, or storage-conflict failure; requeued
    /// with exponential backoff.
    Retryable,
    /// A reference could not be resolved; retryable, the referenced
    /// resource may simply not exist yet.
    ReferenceUnresolved,
    /// Malformed declaration or misconfiguration; retried only at normal
    /// poll cadence since caller action is needed.
    Fatal,
}

impl ErrorClass {
    /// Whether backoff-driven requeueing is warranted.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable | Self::ReferenceUnresolved)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not-found"),
            Self::Retryable => write!(f, "retryable"),
            Self::ReferenceUnresolved => write!(f, "reference-unresolved"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}

/// Violations of record-level invariants.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The external identifier is immutable once assigned.
    #[error("external identifier is already {current}, refusing to change it to {proposed}")]
    ExternalIdImmutable {
        current: ExternalId,
        proposed: ExternalId,
    },
}

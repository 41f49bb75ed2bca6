//! Record conditions
//!
//! Two orthogonal conditions describe a record to its caller: *ready*
//! tracks what the provider reports about the remote resource, *synced*
//! tracks whether the last reconcile cycle converged. The ready condition
//! advances monotonically: it is re-stamped only when the classified state
//! actually changes, so the transition timestamp survives repeated
//! observations of the same state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a provider status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadyClass {
    /// No observation has classified the resource yet.
    Unknown,
    /// Transient provisioning state.
    Creating,
    /// Steady healthy state.
    Available,
    /// Steady degraded or failed state.
    Unavailable,
    /// Tombstone state, the provider is tearing the resource down.
    Deleting,
}

impl fmt::Display for ReadyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Creating => write!(f, "creating"),
            Self::Available => write!(f, "available"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::Deleting => write!(f, "deleting"),
        }
    }
}

/// Readiness of the remote resource as last classified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReadyCondition {
    /// Nothing observed yet.
    Unknown,
    /// The resource is being provisioned.
    Creating {
        since: DateTime<Utc>,
    },
    /// The resource is up and serving.
    Available {
        since: DateTime<Utc>,
    },
    /// The resource exists but is degraded or failed.
    Unavailable {
        reason: Option<String>,
        since: DateTime<Utc>,
    },
    /// Deletion has been issued or the provider is tearing down.
    Deleting {
        since: DateTime<Utc>,
    },
}

impl Default for ReadyCondition {
    fn default() -> Self {
        Self::Unknown
    }
}

impl ReadyCondition {
    /// The classification this condition currently sits in.
    pub fn class(&self) -> ReadyClass {
        match self {
            Self::Unknown => ReadyClass::Unknown,
            Self::Creating { .. } => ReadyClass::Creating,
            Self::Available { .. } => ReadyClass::Available,
            Self::Unavailable { .. } => ReadyClass::Unavailable,
            Self::Deleting { .. } => ReadyClass::Deleting,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }
}

/// Whether the last reconcile cycle converged desired and observed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncedCondition {
    /// No cycle has completed yet.
    Unknown,
    /// The last cycle found or produced a converged resource.
    Synced {
        at: DateTime<Utc>,
    },
    /// The last cycle failed; the message is the user-visible explanation.
    SyncFailed {
        message: String,
        at: DateTime<Utc>,
    },
}

impl Default for SyncedCondition {
    fn default() -> Self {
        Self::Unknown
    }
}

impl SyncedCondition {
    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced { .. })
    }
}

/// The conditions attached to a desired record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionSet {
    /// Readiness of the remote resource.
    pub ready: ReadyCondition,

    /// Convergence of the last reconcile cycle.
    pub synced: SyncedCondition,
}

impl ConditionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the ready condition to `class`, keeping the existing
    /// condition (and its transition timestamp) when the classification has
    /// not changed. `Unknown` never overwrites a known state. Returns
    /// whether the condition changed.
    pub fn advance_ready(&mut self, class: ReadyClass, reason: Option<String>) -> bool {
        if class == ReadyClass::Unknown || self.ready.class() == class {
            return false;
        }
        let since = Utc::now();
        self.ready = match class {
            ReadyClass::Unknown => return false,
            ReadyClass::Creating => ReadyCondition::Creating { since },
            ReadyClass::Available => ReadyCondition::Available { since },
            ReadyClass::Unavailable => ReadyCondition::Unavailable { reason, since },
            ReadyClass::Deleting => ReadyCondition::Deleting { since },
        };
        true
    }

    /// Record a converged cycle. A record that is already synced keeps its
    /// original convergence timestamp.
    pub fn mark_synced(&mut self) -> bool {
        if self.synced.is_synced() {
            return false;
        }
        self.synced = SyncedCondition::Synced { at: Utc::now() };
        true
    }

    /// Record a failed cycle with its user-visible message. The message is
    /// refreshed on every failure.
    pub fn mark_sync_failed(&mut self, message: impl Into<String>) {
        self.synced = SyncedCondition::SyncFailed {
            message: message.into(),
            at: Utc::now(),
        };
    }
}

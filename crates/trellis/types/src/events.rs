//! Reconcile event stream types
//!
//! Events give embedders a unified feed of what the control loop did to
//! which record, beyond the per-record status bag.

use crate::condition::ReadyClass;
use crate::error::ErrorClass;
use crate::ids::{ExternalId, FieldName, KindName, RecordId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all reconcile events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileEventEnvelope {
    /// Unique event ID
    pub id: Uuid,

    /// Event timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Event source
    pub source: EventSource,

    /// Event severity
    pub severity: EventSeverity,

    /// Correlation ID for tracing
    pub correlation_id: Option<String>,

    /// The actual event
    pub event: ReconcileEvent,
}

/// Event sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSource {
    /// The reconcile state machine
    Machine,
    /// The poll/trigger driver
    Driver,
    /// The record store
    Store,
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level event
    Debug,
    /// Informational event
    Info,
    /// Warning event
    Warning,
    /// Error event
    Error,
}

/// Reconcile events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReconcileEvent {
    // ═══════════════════════════════════════════════════════════════════
    // CONVERGENCE EVENTS
    // ═══════════════════════════════════════════════════════════════════
    /// The remote resource was created
    ExternalCreated {
        record_id: RecordId,
        kind: KindName,
        external_id: Option<ExternalId>,
    },

    /// The remote resource was updated toward the declaration
    ExternalUpdated {
        record_id: RecordId,
        kind: KindName,
        difference: String,
    },

    /// The remote resource was deleted
    ExternalDeleted {
        record_id: RecordId,
        kind: KindName,
        external_id: ExternalId,
    },

    /// The record was dropped, leaving the remote resource in place
    RecordOrphaned {
        record_id: RecordId,
        kind: KindName,
    },

    // ═══════════════════════════════════════════════════════════════════
    // OBSERVATION EVENTS
    // ═══════════════════════════════════════════════════════════════════
    /// Observed state diverged from the declaration
    DriftDetected {
        record_id: RecordId,
        kind: KindName,
        difference: String,
    },

    /// Unset parameters were filled from observed state
    LateInitialized {
        record_id: RecordId,
        kind: KindName,
        fields: Vec<FieldName>,
    },

    /// The ready condition moved to a new classification
    ReadyChanged {
        record_id: RecordId,
        kind: KindName,
        from: ReadyClass,
        to: ReadyClass,
    },

    /// Reference fields were resolved to concrete values
    ReferencesResolved {
        record_id: RecordId,
        kind: KindName,
        fields: Vec<FieldName>,
    },

    // ═══════════════════════════════════════════════════════════════════
    // FAILURE EVENTS
    // ═══════════════════════════════════════════════════════════════════
    /// A reconcile cycle failed
    CycleFailed {
        record_id: RecordId,
        kind: KindName,
        class: ErrorClass,
        message: String,
    },
}

impl ReconcileEventEnvelope {
    /// Create a new event envelope
    pub fn new(event: ReconcileEvent, source: EventSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            source,
            severity: Self::infer_severity(&event),
            correlation_id: None,
            event,
        }
    }

    /// Create with correlation ID
    pub fn with_correlation(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Infer severity from event type
    fn infer_severity(event: &ReconcileEvent) -> EventSeverity {
        match event {
            ReconcileEvent::CycleFailed { .. } => EventSeverity::Error,

            ReconcileEvent::DriftDetected { .. }
            | ReconcileEvent::RecordOrphaned { .. } => EventSeverity::Warning,

            ReconcileEvent::ReadyChanged { to, .. } => match to {
                ReadyClass::Unavailable => EventSeverity::Warning,
                _ => EventSeverity::Info,
            },

            ReconcileEvent::LateInitialized { .. }
            | ReconcileEvent::ReferencesResolved { .. } => EventSeverity::Debug,

            _ => EventSeverity::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_inference() {
        let envelope = ReconcileEventEnvelope::new(
            ReconcileEvent::CycleFailed {
                record_id: RecordId::generate(),
                kind: KindName::new("load_balancer"),
                class: ErrorClass::Retryable,
                message: "throttled".to_string(),
            },
            EventSource::Machine,
        );
        assert_eq!(envelope.severity, EventSeverity::Error);

        let envelope = ReconcileEventEnvelope::new(
            ReconcileEvent::ReadyChanged {
                record_id: RecordId::generate(),
                kind: KindName::new("load_balancer"),
                from: ReadyClass::Creating,
                to: ReadyClass::Available,
            },
            EventSource::Machine,
        );
        assert_eq!(envelope.severity, EventSeverity::Info);

        let envelope = ReconcileEventEnvelope::new(
            ReconcileEvent::ReadyChanged {
                record_id: RecordId::generate(),
                kind: KindName::new("load_balancer"),
                from: ReadyClass::Available,
                to: ReadyClass::Unavailable,
            },
            EventSource::Machine,
        );
        assert_eq!(envelope.severity, EventSeverity::Warning);
    }

    #[test]
    fn test_correlation_builder() {
        let envelope = ReconcileEventEnvelope::new(
            ReconcileEvent::RecordOrphaned {
                record_id: RecordId::generate(),
                kind: KindName::new("role"),
            },
            EventSource::Machine,
        )
        .with_correlation("cycle-42");
        assert_eq!(envelope.correlation_id.as_deref(), Some("cycle-42"));
    }
}

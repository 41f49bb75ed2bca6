//! Desired and observed resource records
//!
//! A [`DesiredRecord`] is the caller's declaration of an externally managed
//! resource. The caller owns its parameters, tags, references, and labels;
//! the control loop owns the status bag, the conditions, and the resolved
//! reference values. An [`ObservedRecord`] is the transient result of one
//! provider query, rebuilt on every observation.

use crate::condition::ConditionSet;
use crate::error::RecordError;
use crate::ids::{ExternalId, FieldName, KindName, RecordId};
use crate::reference::ReferenceBinding;
use crate::tags::TagSet;
use crate::value::{FieldValue, ParamSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What happens to the remote resource when the record is removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionPolicy {
    /// Tear down the remote resource, then drop the record.
    #[default]
    Delete,
    /// Drop the record and leave the remote resource in place.
    Orphan,
}

/// Observed-only projection of the remote resource, owned by the control
/// loop and surfaced to the caller on the desired record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusBag {
    /// Observed status fields (provider-computed, never caller-writable).
    pub fields: BTreeMap<FieldName, FieldValue>,

    /// Raw provider status code from the last observation.
    pub state_code: Option<String>,

    /// Human-readable diff or failure message from the last cycle.
    pub message: Option<String>,

    /// When the resource was last observed.
    pub observed_at: Option<DateTime<Utc>>,
}

impl StatusBag {
    /// Project one observation into the status bag.
    pub fn project(&mut self, observed: &ObservedRecord) {
        self.fields = observed.status.clone();
        self.state_code = observed.state_code.clone();
        self.observed_at = Some(Utc::now());
    }
}

/// The caller's declaration of a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredRecord {
    /// Stable local identity.
    pub id: RecordId,

    /// Caller-chosen name, unique per kind.
    pub name: String,

    /// The resource kind this record declares.
    pub kind: KindName,

    /// Metadata labels, used for selector matching.
    pub labels: BTreeMap<String, String>,

    /// Provider-assigned identifier; absent until creation (or adopted
    /// from the name for kinds addressed by caller-chosen names).
    external_id: Option<ExternalId>,

    /// Caller-controlled parameters.
    pub parameters: ParamSet,

    /// Desired tags on the remote resource.
    pub tags: TagSet,

    /// Reference declarations per parameter field.
    pub references: BTreeMap<FieldName, ReferenceBinding>,

    /// Observed-only status, owned by the control loop.
    pub status: StatusBag,

    /// Ready/synced conditions, owned by the control loop.
    pub conditions: ConditionSet,

    /// What removal means for the remote resource.
    pub deletion_policy: DeletionPolicy,

    /// Set when the caller asks for the record to be removed.
    pub deletion_requested: bool,

    /// Optimistic-concurrency revision, bumped by the store on update.
    pub revision: u64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DesiredRecord {
    /// Create a fresh declaration for `kind` named `name`.
    pub fn new(kind: KindName, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::generate(),
            name: name.into(),
            kind,
            labels: BTreeMap::new(),
            external_id: None,
            parameters: ParamSet::new(),
            tags: TagSet::new(),
            references: BTreeMap::new(),
            status: StatusBag::default(),
            conditions: ConditionSet::new(),
            deletion_policy: DeletionPolicy::default(),
            deletion_requested: false,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Builder-style parameter.
    pub fn with_parameter(mut self, name: impl Into<FieldName>, value: FieldValue) -> Self {
        self.parameters.set(name, value);
        self
    }

    /// Builder-style tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key, value);
        self
    }

    /// Builder-style reference binding for a parameter field.
    pub fn with_reference(
        mut self,
        field: impl Into<FieldName>,
        binding: ReferenceBinding,
    ) -> Self {
        self.references.insert(field.into(), binding);
        self
    }

    /// Builder-style deletion policy.
    pub fn with_deletion_policy(mut self, policy: DeletionPolicy) -> Self {
        self.deletion_policy = policy;
        self
    }

    pub fn external_id(&self) -> Option<&ExternalId> {
        self.external_id.as_ref()
    }

    /// Record the provider-assigned identifier. Assigning the identifier
    /// it already holds is a no-op; assigning a different one is an
    /// invariant violation.
    pub fn assign_external_id(&mut self, id: ExternalId) -> Result<(), RecordError> {
        match &self.external_id {
            Some(current) if *current == id => Ok(()),
            Some(current) => Err(RecordError::ExternalIdImmutable {
                current: current.clone(),
                proposed: id,
            }),
            None => {
                self.external_id = Some(id);
                Ok(())
            }
        }
    }

    /// Ask for this record to be removed; picked up by the next cycle.
    pub fn mark_for_deletion(&mut self) {
        self.deletion_requested = true;
    }
}

/// The result of querying the remote provider for one external identifier.
///
/// Reconstructed on every observation and discarded after the cycle; its
/// fields are projected into [`DesiredRecord::status`] and used to
/// late-initialize unset parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedRecord {
    /// The identifier the provider was queried by.
    pub external_id: ExternalId,

    /// Provider-shaped mirror of the caller-controllable parameters.
    pub parameters: ParamSet,

    /// Tags currently on the remote resource.
    pub tags: TagSet,

    /// Raw provider status code (classified through the kind schema).
    pub state_code: Option<String>,

    /// Provider-computed status fields.
    pub status: BTreeMap<FieldName, FieldValue>,
}

impl ObservedRecord {
    pub fn new(external_id: ExternalId) -> Self {
        Self {
            external_id,
            parameters: ParamSet::new(),
            tags: TagSet::new(),
            state_code: None,
            status: BTreeMap::new(),
        }
    }

    /// Builder-style parameter.
    pub fn with_parameter(mut self, name: impl Into<FieldName>, value: FieldValue) -> Self {
        self.parameters.set(name, value);
        self
    }

    /// Builder-style tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key, value);
        self
    }

    /// Builder-style state code.
    pub fn with_state_code(mut self, code: impl Into<String>) -> Self {
        self.state_code = Some(code.into());
        self
    }

    /// Builder-style status field.
    pub fn with_status_field(mut self, name: impl Into<FieldName>, value: FieldValue) -> Self {
        self.status.insert(name.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_id_assignment_is_immutable() {
        let mut record = DesiredRecord::new(KindName::new("role"), "app-role");
        assert!(record.external_id().is_none());

        record
            .assign_external_id(ExternalId::new("arn:role/app-role"))
            .unwrap();

        // Re-assigning the same identifier is idempotent.
        record
            .assign_external_id(ExternalId::new("arn:role/app-role"))
            .unwrap();

        let err = record
            .assign_external_id(ExternalId::new("arn:role/other"))
            .unwrap_err();
        assert!(matches!(err, RecordError::ExternalIdImmutable { .. }));
        assert_eq!(record.external_id().unwrap().as_str(), "arn:role/app-role");
    }

    #[test]
    fn test_status_projection() {
        let observed = ObservedRecord::new(ExternalId::new("lb-1"))
            .with_state_code("active")
            .with_status_field("dns_name", FieldValue::str("lb-1.example.com"));

        let mut record = DesiredRecord::new(KindName::new("load_balancer"), "edge");
        record.status.project(&observed);

        assert_eq!(record.status.state_code.as_deref(), Some("active"));
        assert_eq!(
            record.status.fields.get("dns_name"),
            Some(&FieldValue::str("lb-1.example.com"))
        );
        assert!(record.status.observed_at.is_some());
    }

    #[test]
    fn test_record_serializes() {
        let record = DesiredRecord::new(KindName::new("load_balancer"), "edge")
            .with_label("env", "prod")
            .with_parameter("scheme", FieldValue::str("internal"))
            .with_tag("env", "prod");

        let json = serde_json::to_string(&record).unwrap();
        let back: DesiredRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}

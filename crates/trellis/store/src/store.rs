//! Record store trait and change notifications
//!
//! The store holds the desired records the control loop works from. Two
//! write paths exist with different concurrency rules: `update` is
//! revision-checked and owned by the declaring caller (and by the loop for
//! the spec fields it fills in), while `update_status` and
//! `assign_external_id` are loop-owned and never conflict, so a caller
//! editing parameters can never make the loop lose an observation or a
//! provider-assigned identifier.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use trellis_types::{
    ConditionSet, DesiredRecord, ExternalId, KindName, RecordId, StatusBag,
};

/// A change to the stored record set, broadcast to subscribers.
///
/// Only caller-visible spec changes are announced; status writes are not,
/// so the control loop does not wake itself with its own persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordChange {
    /// A record was inserted.
    Created { id: RecordId, kind: KindName },
    /// A record's spec fields were updated.
    SpecUpdated { id: RecordId, kind: KindName },
    /// A record was marked for deletion.
    DeletionRequested { id: RecordId, kind: KindName },
    /// A record was dropped from the store.
    Removed { id: RecordId, kind: KindName },
}

impl RecordChange {
    /// The record the change concerns.
    pub fn record_id(&self) -> &RecordId {
        match self {
            Self::Created { id, .. }
            | Self::SpecUpdated { id, .. }
            | Self::DeletionRequested { id, .. }
            | Self::Removed { id, .. } => id,
        }
    }

    /// The kind of the record the change concerns.
    pub fn kind(&self) -> &KindName {
        match self {
            Self::Created { kind, .. }
            | Self::SpecUpdated { kind, .. }
            | Self::DeletionRequested { kind, .. }
            | Self::Removed { kind, .. } => kind,
        }
    }
}

/// Storage for desired records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new record. Names are unique per kind.
    async fn insert(&self, record: DesiredRecord) -> Result<RecordId>;

    /// Fetch a record by identity.
    async fn get(&self, id: &RecordId) -> Result<Option<DesiredRecord>>;

    /// Fetch a record by kind and name.
    async fn get_by_name(&self, kind: &KindName, name: &str) -> Result<Option<DesiredRecord>>;

    /// All records of `kind`.
    async fn list(&self, kind: &KindName) -> Result<Vec<DesiredRecord>>;

    /// All records.
    async fn list_all(&self) -> Result<Vec<DesiredRecord>>;

    /// Replace a record's spec fields. Fails with a revision conflict when
    /// the stored record has moved past the given record's revision;
    /// bumps the revision on success and returns the stored result.
    async fn update(&self, record: DesiredRecord) -> Result<DesiredRecord>;

    /// Overwrite a record's observed status and conditions. Never
    /// conflicts and never bumps the revision.
    async fn update_status(
        &self,
        id: &RecordId,
        status: StatusBag,
        conditions: ConditionSet,
    ) -> Result<()>;

    /// Record the provider-assigned identifier. Never conflicts and never
    /// bumps the revision; assigning a different identifier than the one
    /// already held fails.
    async fn assign_external_id(&self, id: &RecordId, external_id: ExternalId) -> Result<()>;

    /// Ask for a record to be deleted. Idempotent.
    async fn mark_deleted(&self, id: &RecordId) -> Result<()>;

    /// Drop a record from the store. Idempotent.
    async fn remove(&self, id: &RecordId) -> Result<()>;

    /// Subscribe to spec-level changes.
    fn subscribe(&self) -> broadcast::Receiver<RecordChange>;
}

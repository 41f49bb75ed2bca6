//! In-memory implementation of the record store
//!
//! Suitable for development and testing. Production deployments should use
//! a persistent backend that implements the same trait.

use crate::error::{Result, StoreError};
use crate::store::{RecordChange, RecordStore};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::broadcast;
use trellis_types::{ConditionSet, DesiredRecord, ExternalId, KindName, RecordId, StatusBag};

/// Change-feed capacity. A subscriber that lags past this many changes
/// misses the oldest ones and should fall back to a full listing.
const CHANGE_CAPACITY: usize = 1024;

/// In-memory record store
pub struct InMemoryRecordStore {
    records: DashMap<RecordId, DesiredRecord>,
    by_name: DashMap<(KindName, String), RecordId>,
    changes: broadcast::Sender<RecordChange>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            records: DashMap::new(),
            by_name: DashMap::new(),
            changes,
        }
    }

    fn announce(&self, change: RecordChange) {
        // Nobody subscribed is fine.
        let _ = self.changes.send(change);
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert(&self, record: DesiredRecord) -> Result<RecordId> {
        let id = record.id.clone();
        let kind = record.kind.clone();
        let key = (record.kind.clone(), record.name.clone());

        if self.by_name.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind: record.kind,
                name: record.name,
            });
        }

        self.by_name.insert(key, id.clone());
        self.records.insert(id.clone(), record);

        self.announce(RecordChange::Created {
            id: id.clone(),
            kind,
        });
        Ok(id)
    }

    async fn get(&self, id: &RecordId) -> Result<Option<DesiredRecord>> {
        Ok(self.records.get(id).map(|r| r.clone()))
    }

    async fn get_by_name(&self, kind: &KindName, name: &str) -> Result<Option<DesiredRecord>> {
        let id = match self.by_name.get(&(kind.clone(), name.to_string())) {
            Some(entry) => entry.value().clone(),
            None => return Ok(None),
        };
        Ok(self.records.get(&id).map(|r| r.clone()))
    }

    async fn list(&self, kind: &KindName) -> Result<Vec<DesiredRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| &r.value().kind == kind)
            .map(|r| r.value().clone())
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<DesiredRecord>> {
        Ok(self.records.iter().map(|r| r.value().clone()).collect())
    }

    async fn update(&self, record: DesiredRecord) -> Result<DesiredRecord> {
        let updated = {
            let mut stored = self
                .records
                .get_mut(&record.id)
                .ok_or_else(|| StoreError::RecordNotFound(record.id.clone()))?;

            if stored.revision != record.revision {
                return Err(StoreError::RevisionConflict {
                    current: stored.revision,
                    expected: record.revision,
                });
            }
            if stored.kind != record.kind || stored.name != record.name {
                return Err(StoreError::Storage(
                    "record kind and name are immutable".to_string(),
                ));
            }

            let mut updated = record;
            updated.revision += 1;
            updated.updated_at = Utc::now();
            *stored = updated.clone();
            updated
        };

        self.announce(RecordChange::SpecUpdated {
            id: updated.id.clone(),
            kind: updated.kind.clone(),
        });
        Ok(updated)
    }

    async fn update_status(
        &self,
        id: &RecordId,
        status: StatusBag,
        conditions: ConditionSet,
    ) -> Result<()> {
        if let Some(mut record) = self.records.get_mut(id) {
            record.status = status;
            record.conditions = conditions;
            Ok(())
        } else {
            Err(StoreError::RecordNotFound(id.clone()))
        }
    }

    async fn assign_external_id(&self, id: &RecordId, external_id: ExternalId) -> Result<()> {
        if let Some(mut record) = self.records.get_mut(id) {
            record.assign_external_id(external_id)?;
            Ok(())
        } else {
            Err(StoreError::RecordNotFound(id.clone()))
        }
    }

    async fn mark_deleted(&self, id: &RecordId) -> Result<()> {
        let kind = {
            let mut record = self
                .records
                .get_mut(id)
                .ok_or_else(|| StoreError::RecordNotFound(id.clone()))?;
            if record.deletion_requested {
                return Ok(());
            }
            record.mark_for_deletion();
            record.updated_at = Utc::now();
            record.kind.clone()
        };

        self.announce(RecordChange::DeletionRequested {
            id: id.clone(),
            kind,
        });
        Ok(())
    }

    async fn remove(&self, id: &RecordId) -> Result<()> {
        if let Some((_, record)) = self.records.remove(id) {
            // Remove from name index
            self.by_name
                .remove(&(record.kind.clone(), record.name.clone()));
            self.announce(RecordChange::Removed {
                id: id.clone(),
                kind: record.kind,
            });
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<RecordChange> {
        self.changes.subscribe()
    }
}

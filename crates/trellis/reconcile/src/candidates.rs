//! Record store as a resolution candidate source

use async_trait::async_trait;
use std::sync::Arc;
use trellis_refs::{CandidateSource, ResolveError};
use trellis_store::RecordStore;
use trellis_types::{DesiredRecord, KindName};

/// Adapts the record store into the resolver's candidate source, so
/// references resolve against the same records the loop reconciles.
pub struct StoreCandidates {
    store: Arc<dyn RecordStore>,
}

impl StoreCandidates {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CandidateSource for StoreCandidates {
    async fn list(&self, kind: &KindName) -> trellis_refs::Result<Vec<DesiredRecord>> {
        self.store
            .list(kind)
            .await
            .map_err(|err| ResolveError::Source(err.to_string()))
    }

    async fn get(&self, kind: &KindName, name: &str) -> trellis_refs::Result<Option<DesiredRecord>> {
        self.store
            .get_by_name(kind, name)
            .await
            .map_err(|err| ResolveError::Source(err.to_string()))
    }
}

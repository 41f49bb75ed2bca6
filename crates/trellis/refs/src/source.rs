//! Candidate lookup for reference resolution
//!
//! The resolver finds referenced records through a [`CandidateSource`]
//! rather than a concrete store, so it can run against the record store in
//! production and against a plain map in tests.

use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use trellis_types::{DesiredRecord, KindName};

/// Where the resolver finds candidate records of a referenced kind.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// All records of `kind`.
    async fn list(&self, kind: &KindName) -> Result<Vec<DesiredRecord>>;

    /// The record of `kind` named `name`, if any.
    async fn get(&self, kind: &KindName, name: &str) -> Result<Option<DesiredRecord>>;
}

/// In-memory candidate source, suitable for development and testing.
pub struct InMemoryCandidateSource {
    records: DashMap<(KindName, String), DesiredRecord>,
}

impl InMemoryCandidateSource {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Add a candidate, replacing any previous record of the same kind and
    /// name.
    pub fn insert(&self, record: DesiredRecord) {
        self.records
            .insert((record.kind.clone(), record.name.clone()), record);
    }
}

impl Default for InMemoryCandidateSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CandidateSource for InMemoryCandidateSource {
    async fn list(&self, kind: &KindName) -> Result<Vec<DesiredRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|entry| &entry.key().0 == kind)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn get(&self, kind: &KindName, name: &str) -> Result<Option<DesiredRecord>> {
        Ok(self
            .records
            .get(&(kind.clone(), name.to_string()))
            .map(|entry| entry.value().clone()))
    }
}

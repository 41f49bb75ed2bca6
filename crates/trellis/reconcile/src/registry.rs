//! Kind capability registry
//!
//! A capability is the pair that makes a kind reconcilable: its declarative
//! [`KindSchema`] and the [`ProviderConnector`] that reaches the remote
//! system. The state machine looks capabilities up by kind name; nothing in
//! the loop is specific to any one kind.

use crate::error::{ReconcileError, Result};
use crate::provider::ProviderConnector;
use dashmap::DashMap;
use std::sync::Arc;
use trellis_types::{KindName, KindSchema};

/// Everything the loop needs to reconcile records of one kind.
#[derive(Clone)]
pub struct KindCapability {
    /// The declarative half: field groups, references, state codes.
    pub schema: Arc<KindSchema>,

    /// The imperative half: how to reach the provider.
    pub connector: Arc<dyn ProviderConnector>,
}

/// Registry of reconcilable kinds
pub struct KindRegistry {
    kinds: DashMap<KindName, KindCapability>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self {
            kinds: DashMap::new(),
        }
    }

    /// Register a kind's capability. Each kind name registers once.
    pub fn register(
        &self,
        schema: KindSchema,
        connector: Arc<dyn ProviderConnector>,
    ) -> Result<()> {
        let kind = schema.kind.clone();
        if self.kinds.contains_key(&kind) {
            return Err(ReconcileError::KindAlreadyRegistered(kind));
        }
        self.kinds.insert(
            kind,
            KindCapability {
                schema: Arc::new(schema),
                connector,
            },
        );
        Ok(())
    }

    /// Look up the capability for a kind.
    pub fn get(&self, kind: &KindName) -> Option<KindCapability> {
        self.kinds.get(kind).map(|entry| entry.value().clone())
    }

    /// All registered kind names.
    pub fn kinds(&self) -> Vec<KindName> {
        self.kinds.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderClient, ProviderResult};
    use async_trait::async_trait;
    use trellis_types::DesiredRecord;

    struct NullConnector;

    #[async_trait]
    impl ProviderConnector for NullConnector {
        async fn connect(
            &self,
            _record: &DesiredRecord,
        ) -> ProviderResult<Box<dyn ProviderClient>> {
            unimplemented!("never connected in this test")
        }
    }

    #[test]
    fn test_each_kind_registers_once() {
        let registry = KindRegistry::new();
        registry
            .register(
                KindSchema::new(KindName::new("load_balancer")),
                Arc::new(NullConnector),
            )
            .unwrap();

        let err = registry
            .register(
                KindSchema::new(KindName::new("load_balancer")),
                Arc::new(NullConnector),
            )
            .unwrap_err();
        assert!(matches!(err, ReconcileError::KindAlreadyRegistered(_)));

        assert!(registry.get(&KindName::new("load_balancer")).is_some());
        assert!(registry.get(&KindName::new("target_group")).is_none());
        assert_eq!(registry.kinds().len(), 1);
    }
}

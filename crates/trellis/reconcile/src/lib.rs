//! # Trellis Reconcile
//!
//! The reconciliation control loop: a generic state machine that converges
//! externally managed resources onto their declared records, and a driver
//! that schedules its cycles.
//!
//! ## Overview
//!
//! Callers declare resources as records in a [`trellis_store::RecordStore`]
//! and register each resource kind with a [`KindRegistry`]: the kind's
//! schema (how it is compared and classified) together with a
//! [`ProviderConnector`] (how its provider is reached). The
//! [`ReconcileMachine`] runs one cycle per record, observing, creating,
//! correcting, and tearing down as needed; the [`ReconcileDriver`] decides
//! when cycles run, on a poll interval, on store changes, and on explicit
//! triggers, with per-record retry backoff.
//!
//! ## Key Components
//!
//! - [`KindRegistry`]: kind schemas wired to their provider connectors
//! - [`ReconcileMachine`]: one reconcile cycle, start to finish
//! - [`ReconcileDriver`]: poll/trigger scheduling across records
//! - [`ProviderClient`] / [`ProviderConnector`]: the provider seam
//! - [`ReconcileConfig`]: intervals, deadlines, backoff
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trellis_reconcile::{
//!     KindRegistry, ProviderConnector, ReconcileConfig, ReconcileDriver,
//!     ReconcileMachine,
//! };
//! use trellis_store::{InMemoryRecordStore, RecordStore};
//! use trellis_types::{DesiredRecord, FieldGroup, KindName, KindSchema, ReadyClass};
//!
//! # async fn example(connector: Arc<dyn ProviderConnector>) {
//! // Describe a kind and wire it to its provider
//! let registry = Arc::new(KindRegistry::new());
//! let schema = KindSchema::new(KindName::new("load_balancer"))
//!     .with_group(FieldGroup::scalar("scheme"))
//!     .with_group(FieldGroup::unordered_list("security_groups"))
//!     .with_state_code("active", ReadyClass::Available)
//!     .with_state_code("provisioning", ReadyClass::Creating);
//! registry
//!     .register(schema, connector)
//!     .expect("kind registers once");
//!
//! // Shared record store and the machine over it
//! let store: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new());
//! let machine = Arc::new(ReconcileMachine::new(
//!     registry,
//!     store.clone(),
//!     ReconcileConfig::default(),
//! ));
//!
//! // Drive cycles on the poll interval and on store changes
//! let (driver, trigger_rx) =
//!     ReconcileDriver::new(ReconcileConfig::default(), store.clone(), machine);
//! tokio::spawn(driver.clone().start(trigger_rx));
//!
//! // Declare a resource; the loop converges it
//! let record = DesiredRecord::new(KindName::new("load_balancer"), "edge");
//! let id = store.insert(record).await.expect("record inserts");
//! driver.trigger(id).await;
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod candidates;
pub mod config;
pub mod driver;
pub mod error;
pub mod machine;
pub mod provider;
pub mod registry;

// Re-exports
pub use candidates::StoreCandidates;
pub use config::ReconcileConfig;
pub use driver::ReconcileDriver;
pub use error::{ReconcileError, Result};
pub use machine::{CycleOutcome, ReconcileMachine};
pub use provider::{
    CreateOutcome, ModifyRequest, ProviderClient, ProviderConnector, ProviderError,
    ProviderResult,
};
pub use registry::{KindCapability, KindRegistry};

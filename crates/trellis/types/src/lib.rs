//! Trellis Core Types
//!
//! Shared data model for the Trellis reconciliation control plane: desired
//! and observed resource records, kind schemas, conditions, references,
//! tag sets, and the reconcile event stream.
//!
//! ## Architectural Boundaries
//!
//! - `trellis-types` owns: the data model and its invariants (external-id
//!   immutability, unset-vs-set field semantics, condition advancement)
//! - `trellis-drift` owns: comparing desired against observed state
//! - `trellis-refs` owns: resolving cross-record references
//! - `trellis-store` owns: persisting records and change notification
//! - `trellis-reconcile` owns: the control loop that drives convergence
//!
//! ## Key Concepts
//!
//! - **DesiredRecord**: a caller's declaration of an externally managed
//!   resource. The caller owns the parameters; the control loop owns only
//!   the status bag and resolved reference fields.
//! - **ObservedRecord**: a transient snapshot of the remote resource,
//!   rebuilt on every observation and never persisted directly.
//! - **KindSchema**: the static, per-kind description of how a resource is
//!   compared, referenced, and classified.
//! - **Unset vs set**: a field missing from a [`ParamSet`] is unset; a
//!   present-but-empty collection is an explicit "no members" declaration.
//!   The two are never conflated.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod condition;
pub mod error;
pub mod events;
pub mod ids;
pub mod record;
pub mod reference;
pub mod schema;
pub mod tags;
pub mod value;

// Identifiers
pub use ids::{ExternalId, FieldName, KindName, RecordId};

// Field values and parameter bags
pub use value::{FieldValue, ParamSet};

// Tag sets
pub use tags::TagSet;

// Records
pub use record::{DeletionPolicy, DesiredRecord, ObservedRecord, StatusBag};

// Conditions
pub use condition::{ConditionSet, ReadyClass, ReadyCondition, SyncedCondition};

// References
pub use reference::{RecordRef, ReferenceBinding, Selector};

// Kind schemas
pub use schema::{ComparePolicy, FieldGroup, KindSchema, ReferenceSpec, ValueExtractor};

// Events
pub use events::{EventSeverity, EventSource, ReconcileEvent, ReconcileEventEnvelope};

// Errors
pub use error::{ErrorClass, RecordError};

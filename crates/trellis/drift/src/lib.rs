//! Trellis Drift Detection
//!
//! The pure convergence calculus of the control plane: comparing a desired
//! record against an observed one, computing minimal tag edits, and
//! filling unset parameters from observed state.
//!
//! ## Architectural Boundaries
//!
//! - `trellis-drift` owns: deciding *whether* and *where* desired and
//!   observed state differ
//! - `trellis-reconcile` owns: acting on that verdict (and all logging)
//!
//! Everything in this crate is a pure function over the data model: no
//! I/O, no logging, no failure paths. A missing observation is the
//! caller's responsibility to rule out before comparing.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod diff;
pub mod lateinit;
pub mod tags;

// Re-exports
pub use diff::{is_up_to_date, DiffOutcome, FieldDiff, TAG_GROUP};
pub use lateinit::late_initialize;
pub use tags::{diff_tags, TagDelta};

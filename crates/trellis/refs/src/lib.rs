//! Trellis Refs - Cross-record reference resolution
//!
//! This crate turns declared references on desired records into concrete
//! field values before the control loop talks to the provider:
//!
//! - **CandidateSource**: where referenced records are looked up
//! - **Resolver**: the resolution pass itself
//!
//! ## Resolution order
//!
//! For each reference-typed field, the first of these that applies wins: a
//! literal value already in the parameter bag (never overwritten once
//! set), an explicit named reference, then a label selector. A selector
//! must match exactly one usable candidate for single-valued fields and at
//! least one for list-valued fields; matches are remembered on the binding
//! so later cycles re-resolve idempotently.
//!
//! ## Failure atomicity
//!
//! All fields of a record are computed before any of them is written back.
//! A record whose resolution fails is returned exactly as it was.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod resolver;
pub mod source;

// Re-exports
pub use error::{ResolveError, Result};
pub use resolver::Resolver;
pub use source::{CandidateSource, InMemoryCandidateSource};

//! Trellis Store - Desired-record storage
//!
//! This crate holds the declared side of the control loop:
//!
//! - **RecordStore**: storage trait for desired records
//! - **RecordChange**: spec-level change notifications for subscribers
//! - **InMemoryRecordStore**: implementation for development and testing
//!
//! ## Write paths
//!
//! `update` is revision-checked: the caller passes back the record it
//! read, and a conflicting edit in between fails the write instead of
//! clobbering it. `update_status` and `assign_external_id` are owned by
//! the control loop and never conflict, so an observation or a freshly
//! created resource's identifier cannot be lost to a concurrent spec
//! edit.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod memory;
pub mod store;

// Re-exports
pub use error::{Result, StoreError};
pub use memory::InMemoryRecordStore;
pub use store::{RecordChange, RecordStore};

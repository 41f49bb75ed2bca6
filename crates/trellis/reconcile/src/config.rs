//! Reconciliation configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the reconcile machine and driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Interval between full sweeps over the stored records.
    pub poll_interval: Duration,

    /// Deadline for a single provider, store, or resolver call.
    pub call_timeout: Duration,

    /// First retry delay after a failed cycle; doubles per consecutive
    /// failure.
    pub retry_backoff_base: Duration,

    /// Upper bound on the retry delay.
    pub retry_backoff_max: Duration,

    /// Capacity of the reconcile event stream. Slow subscribers past this
    /// lag lose the oldest events.
    pub event_capacity: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            call_timeout: Duration::from_secs(30),
            retry_backoff_base: Duration::from_secs(1),
            retry_backoff_max: Duration::from_secs(300),
            event_capacity: 4096,
        }
    }
}

//! Poll/trigger driver
//!
//! The driver decides *when* records reconcile; the machine decides what
//! one cycle does. Cycles for different records run on their own spawned
//! tasks, while an in-flight guard keeps each record on at most one cycle
//! at a time. Failed cycles back off exponentially per record; caller
//! edits arriving on the store's change feed cut any backoff short and
//! dispatch the record immediately.

use crate::config::ReconcileConfig;
use crate::machine::ReconcileMachine;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::interval;
use trellis_store::{RecordChange, RecordStore};
use trellis_types::{ErrorClass, RecordId};

const TRIGGER_CAPACITY: usize = 64;

/// Per-record retry bookkeeping.
struct RetryState {
    failures: u32,
    not_before: Instant,
}

/// Exponential per-record backoff. Fatal failures are not retried on the
/// curve; they wait out a full poll interval instead.
struct RetryTracker {
    entries: DashMap<RecordId, RetryState>,
    base: Duration,
    max: Duration,
    fatal_delay: Duration,
}

impl RetryTracker {
    fn new(config: &ReconcileConfig) -> Self {
        Self {
            entries: DashMap::new(),
            base: config.retry_backoff_base,
            max: config.retry_backoff_max,
            fatal_delay: config.poll_interval,
        }
    }

    /// Whether the record is still inside its backoff window.
    fn is_blocked(&self, id: &RecordId) -> bool {
        self.entries
            .get(id)
            .is_some_and(|state| Instant::now() < state.not_before)
    }

    /// Push the record's next attempt out and return the delay.
    fn record_failure(&self, id: &RecordId, class: ErrorClass) -> Duration {
        let mut state = self.entries.entry(id.clone()).or_insert(RetryState {
            failures: 0,
            not_before: Instant::now(),
        });
        state.failures = state.failures.saturating_add(1);
        let delay = if class == ErrorClass::Fatal {
            self.fatal_delay
        } else {
            self.delay_for(state.failures)
        };
        state.not_before = Instant::now() + delay;
        delay
    }

    /// Forget the record's failure history.
    fn clear(&self, id: &RecordId) {
        self.entries.remove(id);
    }

    fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        self.base.saturating_mul(1 << exponent).min(self.max)
    }
}

/// Driver state
pub struct ReconcileDriver {
    config: ReconcileConfig,
    store: Arc<dyn RecordStore>,
    machine: Arc<ReconcileMachine>,
    in_flight: Arc<DashMap<RecordId, ()>>,
    backoff: Arc<RetryTracker>,
    trigger_tx: mpsc::Sender<RecordId>,
    running: Arc<RwLock<bool>>,
}

impl ReconcileDriver {
    /// Create a new driver
    pub fn new(
        config: ReconcileConfig,
        store: Arc<dyn RecordStore>,
        machine: Arc<ReconcileMachine>,
    ) -> (Arc<Self>, mpsc::Receiver<RecordId>) {
        let (trigger_tx, trigger_rx) = mpsc::channel(TRIGGER_CAPACITY);
        let backoff = Arc::new(RetryTracker::new(&config));

        let driver = Arc::new(Self {
            config,
            store,
            machine,
            in_flight: Arc::new(DashMap::new()),
            backoff,
            trigger_tx,
            running: Arc::new(RwLock::new(false)),
        });

        (driver, trigger_rx)
    }

    /// Ask for an immediate cycle for one record, skipping any backoff.
    pub async fn trigger(&self, record_id: RecordId) {
        let _ = self.trigger_tx.send(record_id).await;
    }

    /// Start the driver background task
    pub async fn start(self: Arc<Self>, mut trigger_rx: mpsc::Receiver<RecordId>) {
        {
            let mut running = self.running.write().await;
            *running = true;
        }

        tracing::info!(
            poll_interval = ?self.config.poll_interval,
            "Reconcile driver started"
        );

        let driver = self.clone();
        let sweep_handle = tokio::spawn(async move {
            let mut ticker = interval(driver.config.poll_interval);
            let mut changes = driver.store.subscribe();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        driver.sweep().await;
                    }
                    Some(record_id) = trigger_rx.recv() => {
                        driver.backoff.clear(&record_id);
                        driver.dispatch(record_id);
                    }
                    result = changes.recv() => match result {
                        Ok(change) => driver.on_change(change),
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            tracing::warn!(
                                missed = missed,
                                "Change feed lagged; falling back to a full sweep"
                            );
                            driver.sweep().await;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    else => break,
                }

                let running = driver.running.read().await;
                if !*running {
                    break;
                }
            }
        });

        let _ = sweep_handle.await;

        tracing::info!("Reconcile driver stopped");
    }

    /// Stop the driver
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
    }

    /// Dispatch every record that is neither in flight nor backed off.
    async fn sweep(&self) {
        let records = match self.store.list_all().await {
            Ok(records) => records,
            Err(err) => {
                tracing::error!(error = %err, "Failed to list records for sweep");
                return;
            }
        };

        for record in records {
            if self.backoff.is_blocked(&record.id) {
                continue;
            }
            self.dispatch(record.id);
        }
    }

    /// Spawn a cycle for one record unless one is already running.
    fn dispatch(&self, record_id: RecordId) {
        match self.in_flight.entry(record_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => return,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(());
            }
        }

        let machine = self.machine.clone();
        let in_flight = self.in_flight.clone();
        let backoff = self.backoff.clone();
        tokio::spawn(async move {
            match machine.run_cycle(&record_id).await {
                Ok(_) => backoff.clear(&record_id),
                Err(err) => {
                    let delay = backoff.record_failure(&record_id, err.class());
                    tracing::debug!(
                        record_id = %record_id,
                        class = %err.class(),
                        delay = ?delay,
                        "Cycle failed; retry scheduled"
                    );
                }
            }
            in_flight.remove(&record_id);
        });
    }

    /// React to one store change. Caller edits re-dispatch immediately;
    /// removals only clean up.
    fn on_change(&self, change: RecordChange) {
        match change {
            RecordChange::Removed { id, .. } => {
                self.backoff.clear(&id);
            }
            RecordChange::Created { id, .. }
            | RecordChange::SpecUpdated { id, .. }
            | RecordChange::DeletionRequested { id, .. } => {
                self.backoff.clear(&id);
                self.dispatch(id);
            }
        }
    }
}

//! The reconciliation state machine
//!
//! One generic machine reconciles every registered kind. A cycle walks a
//! fixed path:
//!
//! 1. load the record; a record gone from the store ends the cycle
//! 2. teardown when deletion is requested
//! 3. resolve references, before anything touches the provider
//! 4. adopt the record name as identifier where the kind says so
//! 5. observe; nothing observed means create
//! 6. late-initialize unset parameters from the observation
//! 7. project status and classify readiness
//! 8. compare; correct the first drifted group, then the tag set
//!    (removals before additions)
//!
//! Every provider and store call runs under the configured deadline. A
//! failing cycle marks the record sync-failed with the error's class
//! and message; when to try again is the driver's decision.

use crate::candidates::StoreCandidates;
use crate::config::ReconcileConfig;
use crate::error::{ReconcileError, Result};
use crate::provider::{ModifyRequest, ProviderClient, ProviderError};
use crate::registry::{KindCapability, KindRegistry};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::instrument;
use trellis_drift::{diff_tags, is_up_to_date, late_initialize, FieldDiff, TAG_GROUP};
use trellis_refs::Resolver;
use trellis_store::RecordStore;
use trellis_types::{
    DeletionPolicy, DesiredRecord, ErrorClass, EventSource, ExternalId, KindName, KindSchema,
    ObservedRecord, ReadyClass, ReconcileEvent, ReconcileEventEnvelope, RecordId,
};

/// What one reconcile cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Observed state already matched the declaration.
    UpToDate,
    /// The remote resource was created.
    Created,
    /// One drifted field group (or the tag set) was corrected.
    Updated,
    /// Deletion was issued; the record stays until the provider reports
    /// the resource gone.
    Deleting,
    /// The record was dropped from the store.
    Removed,
    /// The record no longer exists.
    Gone,
}

/// The generic reconcile state machine.
///
/// Kind-specific behavior comes entirely from the registry: the schema
/// drives comparison and classification, the connector reaches the
/// provider. The machine itself never branches on a kind name.
pub struct ReconcileMachine {
    registry: Arc<KindRegistry>,
    store: Arc<dyn RecordStore>,
    resolver: Resolver,
    config: ReconcileConfig,
    events: broadcast::Sender<ReconcileEventEnvelope>,
}

impl ReconcileMachine {
    pub fn new(
        registry: Arc<KindRegistry>,
        store: Arc<dyn RecordStore>,
        config: ReconcileConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity);
        let resolver = Resolver::new(Arc::new(StoreCandidates::new(store.clone())));
        Self {
            registry,
            store,
            resolver,
            config,
            events,
        }
    }

    /// Subscribe to the reconcile event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ReconcileEventEnvelope> {
        self.events.subscribe()
    }

    /// Run one reconcile cycle for a record.
    #[instrument(skip(self), fields(record_id = %record_id))]
    pub async fn run_cycle(&self, record_id: &RecordId) -> Result<CycleOutcome> {
        // 1. Load. A record that is gone needs nothing from us.
        let record = match self.bounded("load record", self.store.get(record_id)).await? {
            Some(record) => record,
            None => return Ok(CycleOutcome::Gone),
        };
        let kind = record.kind.clone();

        let result = match self.registry.get(&kind) {
            Some(capability) => self.reconcile(&capability, record).await,
            None => Err(ReconcileError::UnknownKind(kind.clone())),
        };

        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.record_failure(record_id, &kind, &err).await;
                Err(err)
            }
        }
    }

    async fn reconcile(
        &self,
        capability: &KindCapability,
        mut record: DesiredRecord,
    ) -> Result<CycleOutcome> {
        let schema = capability.schema.as_ref();

        // 2. Teardown needs no reference values.
        if record.deletion_requested {
            return self.teardown(capability, record).await;
        }

        // 3. Resolve references before anything touches the provider.
        let resolved = self
            .bounded("resolve", self.resolver.resolve_record(schema, &mut record))
            .await?;
        if !resolved.is_empty() {
            record = self.bounded("persist record", self.store.update(record)).await?;
            self.emit(ReconcileEvent::ReferencesResolved {
                record_id: record.id.clone(),
                kind: record.kind.clone(),
                fields: resolved,
            });
        }

        // 4. Kinds addressed by caller-chosen names adopt the name as the
        //    external identifier before the first observation.
        if schema.external_id_from_name && record.external_id().is_none() {
            let external_id = ExternalId::new(record.name.clone());
            record.assign_external_id(external_id.clone())?;
            self.bounded(
                "persist external id",
                self.store.assign_external_id(&record.id, external_id),
            )
            .await?;
        }

        // 5. Observe. Without an identifier there is nothing to ask the
        //    provider about.
        let client = self
            .deadline("connect", capability.connector.connect(&record))
            .await?;
        let observed = match record.external_id().cloned() {
            Some(external_id) => self.describe(client.as_ref(), &external_id).await?,
            None => None,
        };
        let Some(observed) = observed else {
            return self.create(client.as_ref(), record).await;
        };

        // 6. Fill unset parameters from the observation.
        let filled = late_initialize(&mut record.parameters, &observed.parameters);
        if !filled.is_empty() {
            record = self.bounded("persist record", self.store.update(record)).await?;
            self.emit(ReconcileEvent::LateInitialized {
                record_id: record.id.clone(),
                kind: record.kind.clone(),
                fields: filled,
            });
        }

        // 7. Project the observation and classify readiness.
        self.project_status(schema, &mut record, &observed);

        // 8. Compare and converge.
        let verdict = is_up_to_date(schema, &record, &observed);
        match verdict.difference {
            None => {
                record.status.message = None;
                record.conditions.mark_synced();
                self.persist_status(&record).await?;
                tracing::debug!(record_id = %record.id, kind = %record.kind, "Record is up to date");
                Ok(CycleOutcome::UpToDate)
            }
            Some(difference) => {
                self.emit(ReconcileEvent::DriftDetected {
                    record_id: record.id.clone(),
                    kind: record.kind.clone(),
                    difference: difference.to_string(),
                });
                self.correct(client.as_ref(), record, &observed, difference)
                    .await
            }
        }
    }

    /// Create the remote resource for a record nothing was observed for.
    async fn create(
        &self,
        client: &dyn ProviderClient,
        mut record: DesiredRecord,
    ) -> Result<CycleOutcome> {
        // Creating is visible in the store before the provider call, so
        // a create that fails midway still reads as mid-creation.
        if self.advance_ready(&mut record, ReadyClass::Creating, None) {
            self.persist_status(&record).await?;
        }

        let outcome = self.deadline("create", client.create(&record)).await?;

        // Persist a provider-assigned identifier before anything else can
        // fail; a record that loses it cannot find what it just made.
        if let Some(external_id) = outcome.external_id {
            record.assign_external_id(external_id.clone())?;
            self.bounded(
                "persist external id",
                self.store.assign_external_id(&record.id, external_id),
            )
            .await?;
        }

        record.status.message = Some("creation issued".to_string());
        record.conditions.mark_synced();
        self.persist_status(&record).await?;

        tracing::info!(
            record_id = %record.id,
            kind = %record.kind,
            external_id = ?record.external_id().map(ExternalId::as_str),
            "Created remote resource"
        );
        self.emit(ReconcileEvent::ExternalCreated {
            record_id: record.id.clone(),
            kind: record.kind.clone(),
            external_id: record.external_id().cloned(),
        });
        Ok(CycleOutcome::Created)
    }

    /// Correct the first drifted field group, then converge the tag set,
    /// both in this cycle. A failure partway fails the cycle as a unit;
    /// the retry re-derives the sequence from a fresh observation, and a
    /// modify that already took effect repeats as a no-op.
    async fn correct(
        &self,
        client: &dyn ProviderClient,
        mut record: DesiredRecord,
        observed: &ObservedRecord,
        difference: FieldDiff,
    ) -> Result<CycleOutcome> {
        let external_id = observed.external_id.clone();

        // Tags compare last, so any other group names structural drift.
        if difference.group != TAG_GROUP {
            let request = ModifyRequest::new(difference.group.clone(), record.parameters.clone());
            self.deadline("modify", client.modify(&external_id, &request))
                .await?;
        }

        // Removals land before additions.
        let delta = diff_tags(&record.tags, &observed.tags);
        let removed = delta.removed_keys();
        if !removed.is_empty() {
            self.deadline("remove_tags", client.remove_tags(&external_id, &removed))
                .await?;
        }
        let added = delta.added_tags();
        if !added.is_empty() {
            self.deadline("add_tags", client.add_tags(&external_id, &added))
                .await?;
        }

        record.status.message = Some(format!("corrected {}", difference));
        record.conditions.mark_synced();
        self.persist_status(&record).await?;

        tracing::info!(
            record_id = %record.id,
            kind = %record.kind,
            group = %difference.group,
            "Corrected drifted field group"
        );
        self.emit(ReconcileEvent::ExternalUpdated {
            record_id: record.id.clone(),
            kind: record.kind.clone(),
            difference: difference.to_string(),
        });
        Ok(CycleOutcome::Updated)
    }

    /// Tear down a record whose deletion was requested.
    async fn teardown(
        &self,
        capability: &KindCapability,
        mut record: DesiredRecord,
    ) -> Result<CycleOutcome> {
        // Orphaning keeps the remote resource and drops the record.
        if record.deletion_policy == DeletionPolicy::Orphan {
            self.bounded("remove record", self.store.remove(&record.id))
                .await?;
            tracing::info!(record_id = %record.id, kind = %record.kind, "Orphaned remote resource");
            self.emit(ReconcileEvent::RecordOrphaned {
                record_id: record.id.clone(),
                kind: record.kind.clone(),
            });
            return Ok(CycleOutcome::Removed);
        }

        // Nothing was ever created remotely; just drop the record.
        let Some(external_id) = record.external_id().cloned() else {
            self.bounded("remove record", self.store.remove(&record.id))
                .await?;
            return Ok(CycleOutcome::Removed);
        };

        let client = self
            .deadline("connect", capability.connector.connect(&record))
            .await?;
        match self.describe(client.as_ref(), &external_id).await? {
            None => {
                // Confirmed gone; release the record.
                self.bounded("remove record", self.store.remove(&record.id))
                    .await?;
                tracing::info!(
                    record_id = %record.id,
                    kind = %record.kind,
                    external_id = %external_id,
                    "Remote resource deleted"
                );
                self.emit(ReconcileEvent::ExternalDeleted {
                    record_id: record.id.clone(),
                    kind: record.kind.clone(),
                    external_id,
                });
                Ok(CycleOutcome::Removed)
            }
            Some(_) => {
                // Deleting is visible in the store before the provider
                // call, so a delete that fails midway still reads as
                // mid-teardown.
                record.status.message = Some("deletion issued".to_string());
                if self.advance_ready(&mut record, ReadyClass::Deleting, None) {
                    self.persist_status(&record).await?;
                }

                match self.deadline("delete", client.delete(&external_id)).await {
                    Ok(()) => {}
                    // Deleting what is already gone is success.
                    Err(err) if err.class() == ErrorClass::NotFound => {}
                    Err(err) => return Err(err),
                }

                record.conditions.mark_synced();
                self.persist_status(&record).await?;
                tracing::info!(
                    record_id = %record.id,
                    kind = %record.kind,
                    external_id = %external_id,
                    "Issued deletion"
                );
                Ok(CycleOutcome::Deleting)
            }
        }
    }

    /// Observe the remote resource; absence is a fact, not a failure.
    async fn describe(
        &self,
        client: &dyn ProviderClient,
        external_id: &ExternalId,
    ) -> Result<Option<ObservedRecord>> {
        match self.deadline("describe", client.describe(external_id)).await {
            Ok(observed) => Ok(Some(observed)),
            Err(err) if err.class() == ErrorClass::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Project an observation into the record's status and advance the
    /// ready condition through the kind's state-code table.
    fn project_status(
        &self,
        schema: &KindSchema,
        record: &mut DesiredRecord,
        observed: &ObservedRecord,
    ) {
        record.status.project(observed);

        // Kinds without a state-code table are ready by existing.
        let class = if schema.state_codes.is_empty() {
            ReadyClass::Available
        } else {
            match &observed.state_code {
                Some(code) => schema.classify_state(code),
                None => ReadyClass::Unknown,
            }
        };

        self.advance_ready(record, class, observed.state_code.clone());
    }

    /// Advance the ready condition, surfacing any transition on the
    /// event stream. Returns whether the condition changed.
    fn advance_ready(
        &self,
        record: &mut DesiredRecord,
        class: ReadyClass,
        reason: Option<String>,
    ) -> bool {
        let from = record.conditions.ready.class();
        if !record.conditions.advance_ready(class, reason) {
            return false;
        }
        self.emit(ReconcileEvent::ReadyChanged {
            record_id: record.id.clone(),
            kind: record.kind.clone(),
            from,
            to: class,
        });
        true
    }

    /// Persist the record's status bag and conditions.
    async fn persist_status(&self, record: &DesiredRecord) -> Result<()> {
        self.bounded(
            "persist status",
            self.store
                .update_status(&record.id, record.status.clone(), record.conditions.clone()),
        )
        .await
    }

    /// Surface a failed cycle on the record and the event stream.
    async fn record_failure(&self, record_id: &RecordId, kind: &KindName, err: &ReconcileError) {
        let class = err.class();
        tracing::warn!(
            record_id = %record_id,
            kind = %kind,
            class = %class,
            error = %err,
            "Reconcile cycle failed"
        );
        self.emit(ReconcileEvent::CycleFailed {
            record_id: record_id.clone(),
            kind: kind.clone(),
            class,
            message: err.to_string(),
        });

        // Best effort; the event above already carries the failure.
        if let Ok(Some(mut record)) = self.store.get(record_id).await {
            record.conditions.mark_sync_failed(err.to_string());
            record.status.message = Some(err.to_string());
            let _ = self
                .store
                .update_status(record_id, record.status, record.conditions)
                .await;
        }
    }

    /// Run a provider call under the configured deadline.
    async fn deadline<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, ProviderError>>,
    {
        match timeout(self.config.call_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(ReconcileError::provider(operation, err)),
            Err(_) => Err(ReconcileError::DeadlineExceeded {
                operation: operation.to_string(),
            }),
        }
    }

    /// Run a store or resolver call under the same deadline.
    async fn bounded<T, E, F>(&self, operation: &str, call: F) -> Result<T>
    where
        E: Into<ReconcileError>,
        F: Future<Output = std::result::Result<T, E>>,
    {
        match timeout(self.config.call_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Err(ReconcileError::DeadlineExceeded {
                operation: operation.to_string(),
            }),
        }
    }

    fn emit(&self, event: ReconcileEvent) {
        let envelope = ReconcileEventEnvelope::new(event, EventSource::Machine);
        // Nobody subscribed is fine.
        let _ = self.events.send(envelope);
    }
}

//! Provider capability interface
//!
//! A resource kind plugs into the control loop through two traits: a
//! [`ProviderConnector`] that builds a client scoped to one record (its
//! account, region, credentials), and the [`ProviderClient`] that speaks
//! to the remote system. Everything the state machine does remotely goes
//! through the client operations; kinds differ only in their schema and
//! in how the client maps parameters onto provider calls.

use async_trait::async_trait;
use thiserror::Error;
use trellis_types::{DesiredRecord, ExternalId, FieldName, ObservedRecord, ParamSet, TagSet};

/// Errors a provider client can return.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The remote resource does not exist. For observation and deletion
    /// this is a recoverable fact, not a failure.
    #[error("Remote resource not found: {0}")]
    NotFound(ExternalId),

    /// The provider rejected the call for rate or quota reasons.
    #[error("Provider throttled the call: {0}")]
    Throttled(String),

    /// The provider could not be reached.
    #[error("Provider connection failed: {0}")]
    Connection(String),

    /// The provider rejected the request itself.
    #[error("Provider rejected the request: {0}")]
    Api(String),
}

impl ProviderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether retrying the same call later can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Throttled(_) | Self::Connection(_))
    }
}

/// Result type for provider operations
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// What a creation call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOutcome {
    /// The provider-assigned identifier, absent for kinds addressed by
    /// caller-chosen names.
    pub external_id: Option<ExternalId>,
}

impl CreateOutcome {
    pub fn assigned(external_id: ExternalId) -> Self {
        Self {
            external_id: Some(external_id),
        }
    }

    pub fn adopted() -> Self {
        Self { external_id: None }
    }
}

/// A narrow update payload: the one field group to correct, plus the full
/// desired parameter bag for the provider calls that need context beyond
/// the group itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifyRequest {
    /// The drifted group to bring in line.
    pub group: FieldName,

    /// The desired parameters the group should converge to.
    pub desired: ParamSet,
}

impl ModifyRequest {
    pub fn new(group: impl Into<FieldName>, desired: ParamSet) -> Self {
        Self {
            group: group.into(),
            desired,
        }
    }
}

/// The imperative half of a kind's capability.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Query the remote resource addressed by `external_id`.
    async fn describe(&self, external_id: &ExternalId) -> ProviderResult<ObservedRecord>;

    /// Create the remote resource from the record's parameters and tags.
    async fn create(&self, record: &DesiredRecord) -> ProviderResult<CreateOutcome>;

    /// Correct one drifted field group.
    async fn modify(
        &self,
        external_id: &ExternalId,
        request: &ModifyRequest,
    ) -> ProviderResult<()>;

    /// Add tags, overwriting existing values for the same keys.
    async fn add_tags(&self, external_id: &ExternalId, tags: &TagSet) -> ProviderResult<()>;

    /// Remove tags by key.
    async fn remove_tags(&self, external_id: &ExternalId, keys: &[String]) -> ProviderResult<()>;

    /// Tear the remote resource down.
    async fn delete(&self, external_id: &ExternalId) -> ProviderResult<()>;
}

/// Builds provider clients scoped to individual records.
#[async_trait]
pub trait ProviderConnector: Send + Sync {
    /// Build a client for the record's provider, account, and region.
    async fn connect(&self, record: &DesiredRecord) -> ProviderResult<Box<dyn ProviderClient>>;
}

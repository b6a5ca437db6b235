//! Provider boundary.
//!
//! A provider owns the real resources of both clouds. It receives fully
//! resolved records and reports the identifier and generated attributes of
//! what it created.

use std::collections::BTreeMap;
use thiserror::Error;
use topology_api::{ResourceKey, ResourceKind, ResourceSpec};

/// Failure reported by a provider. Only `Transient` is worth retrying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }

    /// Metric label
    pub fn label(&self) -> &'static str {
        match self {
            ProviderError::Transient(_) => "transient",
            ProviderError::QuotaExceeded(_) => "quota_exceeded",
            ProviderError::PermissionDenied(_) => "permission_denied",
            ProviderError::NotFound(_) => "not_found",
            ProviderError::Conflict(_) => "conflict",
        }
    }
}

/// What the provider reports for a created or updated resource
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderResource {
    pub id: String,
    /// Generated and echoed attributes, keyed by attribute name
    pub outputs: BTreeMap<String, String>,
}

/// Cloud provider operations on single resources
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str {
        "provider"
    }

    async fn create(
        &self,
        key: &ResourceKey,
        spec: &ResourceSpec,
    ) -> Result<ProviderResource, ProviderError>;

    /// Change a mutable resource in place
    async fn update(
        &self,
        key: &ResourceKey,
        id: &str,
        spec: &ResourceSpec,
    ) -> Result<ProviderResource, ProviderError>;

    /// Delete a resource. Deleting something already gone succeeds.
    async fn delete(
        &self,
        key: &ResourceKey,
        kind: ResourceKind,
        id: &str,
    ) -> Result<(), ProviderError>;
}

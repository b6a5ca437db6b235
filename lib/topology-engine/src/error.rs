use crate::provider::ProviderError;
use thiserror::Error;
use topology_api::ResourceKey;
use topology_core::{Action, CoreError};

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Provider failure, wrapped only with where it happened
    #[error("Failed to {action} {key}: {source}")]
    Provider {
        key: ResourceKey,
        action: Action,
        #[source]
        source: ProviderError,
    },

    #[error("Inputs of {key} are still unresolved: {pending}")]
    Unresolved { key: ResourceKey, pending: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Metrics encoding error: {0}")]
    MetricsEncoding(#[from] std::string::FromUtf8Error),
}

impl EngineError {
    /// Provider error behind this failure, if any
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            EngineError::Provider { source, .. } => Some(source),
            _ => None,
        }
    }
}

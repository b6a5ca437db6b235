use thiserror::Error;
use topology_api::ResourceKey;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Missing required configuration value: {0}")]
    MissingConfig(&'static str),

    #[error("Invalid base name {name:?}: {reason}")]
    InvalidBaseName { name: String, reason: String },

    #[error("Invalid CIDR in {field}: {value:?} ({reason})")]
    InvalidCidr {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Address blocks overlap: {first_field} ({first}) and {second_field} ({second})")]
    OverlappingBlocks {
        first_field: String,
        first: String,
        second_field: String,
        second: String,
    },

    #[error("Subnet {field} ({subnet}) is outside network block {network}")]
    SubnetOutsideNetwork {
        field: String,
        subnet: String,
        network: String,
    },

    #[error("Invalid port in {field}: {value:?}")]
    InvalidPort { field: String, value: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Failed to read configuration file {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("Failed to access state file {path}: {source}")]
    StateIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Duplicate resource: {0}")]
    DuplicateResource(ResourceKey),

    #[error("{from} references unknown resource {to}")]
    UnknownReference { from: ResourceKey, to: ResourceKey },

    #[error("Dependency cycle among resources: {}", join_keys(.0))]
    DependencyCycle(Vec<ResourceKey>),

    #[error("Resource not found: {0}")]
    ResourceNotFound(ResourceKey),

    #[error("Output not available: {0}")]
    UnresolvedOutput(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

fn join_keys(keys: &[ResourceKey]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

//! Reference reconciler for topology descriptors
//!
//! This library provides:
//! - The provider boundary and its typed errors
//! - An in-memory simulated provider for both clouds
//! - Level-by-level apply with retry of transient provider failures
//! - Prometheus metrics of provider operations

pub mod error;
pub mod metrics;
pub mod policy;
pub mod provider;
pub mod reconciler;
pub mod simulated;

pub use error::{EngineError, Result};
pub use metrics::EngineMetrics;
pub use policy::RetryPolicy;
pub use provider::{Provider, ProviderError, ProviderResource};
pub use reconciler::{ApplyReport, Reconciler};
pub use simulated::SimulatedProvider;

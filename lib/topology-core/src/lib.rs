//! Core topology functionality
//!
//! This library provides:
//! - Configuration loading and fail-fast validation
//! - Deterministic resource naming from the base name
//! - The dependency graph with topological ordering and cycle detection
//! - The topology descriptor declaring both clouds and the VPN between them
//! - Resource state, input resolution and diff planning

pub mod config;
pub mod descriptor;
pub mod error;
pub mod exports;
pub mod graph;
pub mod naming;
pub mod plan;
pub mod resolve;
pub mod state;

pub use config::{TopologyConfig, ValidatedConfig};
pub use descriptor::{describe, Topology};
pub use error::{CoreError, Result};
pub use exports::{Exports, ResolvedExports};
pub use graph::{GraphBuilder, ResourceGraph, ResourceNode};
pub use naming::Namer;
pub use plan::{Action, Change, Plan, PlanSummary};
pub use resolve::{resolve_spec, OutputSource};
pub use state::{ResourceState, StateSnapshot, StateStore};

//! Resource record types for the cross-cloud VPN topology
//!
//! This library defines the declarative records the topology is made of:
//! - Resource keys and the cloud each record lives in
//! - Inputs, which are either literal values or placeholders bound to
//!   another record's generated attribute
//! - AWS records: VPC, subnets, gateways, VPN connection, route table,
//!   security groups
//! - GCP records: network, subnetworks, reserved address, VPN gateway,
//!   forwarding rules, routers, tunnels, router interfaces and peers,
//!   firewalls

pub mod aws;
pub mod gcp;
pub mod resource;
pub mod spec;
pub mod value;

pub use resource::{attrs, Cloud, ResourceKey, ResourceKind};
pub use spec::ResourceSpec;
pub use value::{Input, OutputRef, Transform};

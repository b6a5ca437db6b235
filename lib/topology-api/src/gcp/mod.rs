//! GCP (cloud B) resource records

pub mod firewall;
pub mod network;
pub mod router;
pub mod vpn;

pub use firewall::{Firewall, FirewallAllow};
pub use network::{Address, Network, Subnetwork};
pub use router::{Router, RouterBgp, RouterInterface, RouterPeer};
pub use vpn::{ForwardingRule, VpnGateway, VpnTunnel};

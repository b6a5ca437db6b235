//! AWS (cloud A) resource records

pub mod gateway;
pub mod network;
pub mod route_table;
pub mod security_group;
pub mod vpn_connection;

pub use gateway::{CustomerGateway, InternetGateway, VpnGateway};
pub use network::{Subnet, Vpc};
pub use route_table::{DefaultRouteTable, Route};
pub use security_group::{SecurityGroup, SecurityGroupRule};
pub use vpn_connection::{TunnelAttributes, VpnConnection};

use std::collections::BTreeMap;

/// Tag set carrying only the `Name` tag
pub fn name_tag(name: &str) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();
    tags.insert("Name".to_string(), name.to_string());
    tags
}

use crate::Input;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Site-to-site VPN connection between the VPN gateway and the customer
/// gateway. On creation the provider generates two tunnels, see
/// [`TunnelAttributes`] for the attributes each one exposes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VpnConnection {
    pub customer_gateway_id: Input,

    pub vpn_gateway_id: Input,

    /// Connection type, always `ipsec.1`
    #[serde(rename = "type")]
    pub connection_type: String,

    /// `false` selects BGP dynamic routing
    pub static_routes_only: bool,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl VpnConnection {
    /// Number of tunnels the provider generates per connection
    pub const TUNNEL_COUNT: usize = 2;

    pub fn inputs(&self) -> Vec<&Input> {
        vec![&self.customer_gateway_id, &self.vpn_gateway_id]
    }

    pub fn inputs_mut(&mut self) -> Vec<&mut Input> {
        vec![&mut self.customer_gateway_id, &mut self.vpn_gateway_id]
    }
}

/// Names of the attributes generated for one tunnel of a VPN connection.
///
/// Provider attributes are numbered from 1, so tunnel set `0` reads the
/// `tunnel1_*` attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TunnelAttributes {
    index: usize,
}

impl TunnelAttributes {
    pub fn for_set(set: usize) -> Self {
        Self { index: set + 1 }
    }

    /// Outside address of the AWS tunnel endpoint
    pub fn address(&self) -> String {
        format!("tunnel{}_address", self.index)
    }

    pub fn preshared_key(&self) -> String {
        format!("tunnel{}_preshared_key", self.index)
    }

    /// Inside address on the customer gateway side (GCP)
    pub fn cgw_inside_address(&self) -> String {
        format!("tunnel{}_cgw_inside_address", self.index)
    }

    /// Inside address on the VPN gateway side (AWS)
    pub fn vgw_inside_address(&self) -> String {
        format!("tunnel{}_vgw_inside_address", self.index)
    }

    /// Every attribute generated for this tunnel
    pub fn all(&self) -> [String; 4] {
        [
            self.address(),
            self.preshared_key(),
            self.cgw_inside_address(),
            self.vgw_inside_address(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tunnel_attributes_are_one_based() {
        let first = TunnelAttributes::for_set(0);
        assert_eq!(first.address(), "tunnel1_address");
        assert_eq!(first.preshared_key(), "tunnel1_preshared_key");

        let second = TunnelAttributes::for_set(1);
        assert_eq!(second.cgw_inside_address(), "tunnel2_cgw_inside_address");
        assert_eq!(second.vgw_inside_address(), "tunnel2_vgw_inside_address");
    }

    #[test]
    fn test_tunnel_sets_share_no_attribute() {
        let first = TunnelAttributes::for_set(0).all();
        let second = TunnelAttributes::for_set(1).all();
        assert!(first.iter().all(|attr| !second.contains(attr)));
    }
}

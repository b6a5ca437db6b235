use crate::Input;
use serde::{Deserialize, Serialize};

/// Cloud router running the BGP session for one tunnel
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Router {
    pub name: String,

    /// Network name (not id)
    pub network: Input,

    pub bgp: RouterBgp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouterBgp {
    /// Local ASN
    pub asn: Input,

    /// `DEFAULT` advertises all subnetworks of the network
    pub advertise_mode: String,
}

impl Router {
    pub fn inputs(&self) -> Vec<&Input> {
        vec![&self.network, &self.bgp.asn]
    }

    pub fn inputs_mut(&mut self) -> Vec<&mut Input> {
        vec![&mut self.network, &mut self.bgp.asn]
    }
}

/// Router interface bound to a tunnel, holding the local inside address
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouterInterface {
    pub name: String,

    pub router: Input,

    /// Inside address with its `/30` prefix
    pub ip_range: Input,

    pub vpn_tunnel: Input,
}

impl RouterInterface {
    pub fn inputs(&self) -> Vec<&Input> {
        vec![&self.router, &self.ip_range, &self.vpn_tunnel]
    }

    pub fn inputs_mut(&mut self) -> Vec<&mut Input> {
        vec![&mut self.router, &mut self.ip_range, &mut self.vpn_tunnel]
    }
}

/// BGP peer on the AWS side of one tunnel
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouterPeer {
    pub name: String,

    pub router: Input,

    pub peer_ip_address: Input,

    pub peer_asn: u32,

    pub interface: Input,
}

impl RouterPeer {
    pub fn inputs(&self) -> Vec<&Input> {
        vec![&self.router, &self.peer_ip_address, &self.interface]
    }

    pub fn inputs_mut(&mut self) -> Vec<&mut Input> {
        vec![
            &mut self.router,
            &mut self.peer_ip_address,
            &mut self.interface,
        ]
    }
}

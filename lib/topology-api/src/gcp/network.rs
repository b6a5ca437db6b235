use crate::Input;
use serde::{Deserialize, Serialize};

/// Custom-mode VPC network. GCP networks carry no address block of their
/// own; the block lives on the subnetworks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub name: String,

    /// Always `false`: subnetworks are declared explicitly
    pub auto_create_subnetworks: bool,
}

impl Network {
    pub fn inputs(&self) -> Vec<&Input> {
        Vec::new()
    }

    pub fn inputs_mut(&mut self) -> Vec<&mut Input> {
        Vec::new()
    }
}

/// Regional subnetwork
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Subnetwork {
    pub name: String,

    pub network: Input,

    pub ip_cidr_range: String,
}

impl Subnetwork {
    pub fn inputs(&self) -> Vec<&Input> {
        vec![&self.network]
    }

    pub fn inputs_mut(&mut self) -> Vec<&mut Input> {
        vec![&mut self.network]
    }
}

/// Reserved static external address.
///
/// Serves as the public identity of the GCP VPN gateway and as the peer
/// address of the AWS customer gateway.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
}

impl Address {
    pub fn inputs(&self) -> Vec<&Input> {
        Vec::new()
    }

    pub fn inputs_mut(&mut self) -> Vec<&mut Input> {
        Vec::new()
    }
}

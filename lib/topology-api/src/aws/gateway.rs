use crate::Input;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Internet gateway attached to the VPC
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InternetGateway {
    pub vpc_id: Input,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl InternetGateway {
    pub fn inputs(&self) -> Vec<&Input> {
        vec![&self.vpc_id]
    }

    pub fn inputs_mut(&mut self) -> Vec<&mut Input> {
        vec![&mut self.vpc_id]
    }
}

/// Virtual private gateway, the AWS end of the VPN
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VpnGateway {
    pub vpc_id: Input,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl VpnGateway {
    pub fn inputs(&self) -> Vec<&Input> {
        vec![&self.vpc_id]
    }

    pub fn inputs_mut(&mut self) -> Vec<&mut Input> {
        vec![&mut self.vpc_id]
    }
}

/// AWS record of the remote (GCP) end of the VPN
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerGateway {
    /// ASN advertised by the remote end
    pub bgp_asn: u32,

    /// Public address of the remote gateway
    pub ip_address: Input,

    /// Connection type, always `ipsec.1`
    #[serde(rename = "type")]
    pub gateway_type: String,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl CustomerGateway {
    pub fn inputs(&self) -> Vec<&Input> {
        vec![&self.ip_address]
    }

    pub fn inputs_mut(&mut self) -> Vec<&mut Input> {
        vec![&mut self.ip_address]
    }
}

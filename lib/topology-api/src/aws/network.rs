use crate::Input;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// VPC owning cloud A's address block
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vpc {
    /// IPv4 block of the VPC
    pub cidr_block: String,

    pub enable_dns_support: bool,

    pub enable_dns_hostnames: bool,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Vpc {
    pub fn inputs(&self) -> Vec<&Input> {
        Vec::new()
    }

    pub fn inputs_mut(&mut self) -> Vec<&mut Input> {
        Vec::new()
    }
}

/// Subnet carved out of the VPC block
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Subnet {
    /// Owning VPC
    pub vpc_id: Input,

    /// Sub-block of the VPC block
    pub cidr_block: String,

    /// Assign public addresses to instances launched here
    pub map_public_ip_on_launch: bool,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Subnet {
    pub fn inputs(&self) -> Vec<&Input> {
        vec![&self.vpc_id]
    }

    pub fn inputs_mut(&mut self) -> Vec<&mut Input> {
        vec![&mut self.vpc_id]
    }
}

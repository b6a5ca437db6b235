use crate::Input;
use serde::{Deserialize, Serialize};

/// Ingress firewall rule set of the network
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Firewall {
    pub name: String,

    /// Network self link
    pub network: Input,

    pub allows: Vec<FirewallAllow>,

    pub source_ranges: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FirewallAllow {
    pub protocol: String,

    /// Ports or port ranges; empty means every port
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
}

impl FirewallAllow {
    pub fn protocol(protocol: &str) -> Self {
        Self {
            protocol: protocol.to_string(),
            ports: Vec::new(),
        }
    }

    pub fn ports(protocol: &str, ports: &[String]) -> Self {
        Self {
            protocol: protocol.to_string(),
            ports: ports.to_vec(),
        }
    }
}

impl Firewall {
    pub fn inputs(&self) -> Vec<&Input> {
        vec![&self.network]
    }

    pub fn inputs_mut(&mut self) -> Vec<&mut Input> {
        vec![&mut self.network]
    }
}

use crate::Input;
use serde::{Deserialize, Serialize};

/// Security group with inline ingress and egress rules
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub name: String,

    pub vpc_id: Input,

    #[serde(default)]
    pub ingress: Vec<SecurityGroupRule>,

    #[serde(default)]
    pub egress: Vec<SecurityGroupRule>,
}

/// Security group rule.
///
/// For ICMP the ports carry the ICMP type and code, so `from_port: 8,
/// to_port: 0` is echo request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroupRule {
    /// `tcp`, `udp`, `icmp` or `-1` for all protocols
    pub protocol: String,

    pub from_port: i32,

    pub to_port: i32,

    pub cidr_blocks: Vec<String>,
}

impl SecurityGroupRule {
    pub fn new(protocol: &str, from_port: i32, to_port: i32, cidr: &str) -> Self {
        Self {
            protocol: protocol.to_string(),
            from_port,
            to_port,
            cidr_blocks: vec![cidr.to_string()],
        }
    }

    /// Rule matching every protocol and port
    pub fn all(cidr: &str) -> Self {
        Self::new("-1", 0, 0, cidr)
    }
}

impl SecurityGroup {
    pub fn inputs(&self) -> Vec<&Input> {
        vec![&self.vpc_id]
    }

    pub fn inputs_mut(&mut self) -> Vec<&mut Input> {
        vec![&mut self.vpc_id]
    }
}

use crate::Input;
use serde::{Deserialize, Serialize};

/// Classic target VPN gateway
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VpnGateway {
    pub name: String,

    pub network: Input,
}

impl VpnGateway {
    pub fn inputs(&self) -> Vec<&Input> {
        vec![&self.network]
    }

    pub fn inputs_mut(&mut self) -> Vec<&mut Input> {
        vec![&mut self.network]
    }
}

/// Forwards IPsec traffic arriving on the reserved address to the gateway
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForwardingRule {
    pub name: String,

    /// Reserved address the rule listens on
    pub ip_address: Input,

    /// `ESP` or `UDP`
    pub ip_protocol: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_range: Option<String>,

    /// Self link of the target VPN gateway
    pub target: Input,
}

impl ForwardingRule {
    pub fn inputs(&self) -> Vec<&Input> {
        vec![&self.ip_address, &self.target]
    }

    pub fn inputs_mut(&mut self) -> Vec<&mut Input> {
        vec![&mut self.ip_address, &mut self.target]
    }
}

/// IPsec tunnel towards one AWS tunnel endpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VpnTunnel {
    pub name: String,

    pub ike_version: u8,

    /// Outside address of the AWS endpoint
    pub peer_ip: Input,

    pub shared_secret: Input,

    pub target_vpn_gateway: Input,

    /// Cloud router learning routes over this tunnel
    pub router: Input,
}

impl VpnTunnel {
    pub fn inputs(&self) -> Vec<&Input> {
        vec![
            &self.peer_ip,
            &self.shared_secret,
            &self.target_vpn_gateway,
            &self.router,
        ]
    }

    pub fn inputs_mut(&mut self) -> Vec<&mut Input> {
        vec![
            &mut self.peer_ip,
            &mut self.shared_secret,
            &mut self.target_vpn_gateway,
            &mut self.router,
        ]
    }
}

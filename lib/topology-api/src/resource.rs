//! Resource identity: clouds, keys and kinds

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cloud a resource record is provisioned in
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cloud {
    /// Cloud A
    Aws,
    /// Cloud B
    Gcp,
}

impl fmt::Display for Cloud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cloud::Aws => write!(f, "aws"),
            Cloud::Gcp => write!(f, "gcp"),
        }
    }
}

/// Stable identity of a resource record.
///
/// Names are unique within a cloud, so the pair is unique across the
/// whole topology. The key is what reconciliation matches desired records
/// against, which is why renaming a record means replacing it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub cloud: Cloud,
    pub name: String,
}

impl ResourceKey {
    pub fn new(cloud: Cloud, name: impl Into<String>) -> Self {
        Self {
            cloud,
            name: name.into(),
        }
    }

    pub fn aws(name: impl Into<String>) -> Self {
        Self::new(Cloud::Aws, name)
    }

    pub fn gcp(name: impl Into<String>) -> Self {
        Self::new(Cloud::Gcp, name)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.cloud, self.name)
    }
}

/// Provider resource type of a record
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    AwsVpc,
    AwsSubnet,
    AwsInternetGateway,
    AwsVpnGateway,
    AwsCustomerGateway,
    AwsDefaultRouteTable,
    AwsVpnConnection,
    AwsSecurityGroup,
    GcpNetwork,
    GcpSubnetwork,
    GcpAddress,
    GcpVpnGateway,
    GcpForwardingRule,
    GcpRouter,
    GcpVpnTunnel,
    GcpRouterInterface,
    GcpRouterPeer,
    GcpFirewall,
}

impl ResourceKind {
    pub fn cloud(self) -> Cloud {
        match self {
            ResourceKind::AwsVpc
            | ResourceKind::AwsSubnet
            | ResourceKind::AwsInternetGateway
            | ResourceKind::AwsVpnGateway
            | ResourceKind::AwsCustomerGateway
            | ResourceKind::AwsDefaultRouteTable
            | ResourceKind::AwsVpnConnection
            | ResourceKind::AwsSecurityGroup => Cloud::Aws,
            _ => Cloud::Gcp,
        }
    }

    /// Provider type token this record maps to
    pub fn type_token(self) -> &'static str {
        match self {
            ResourceKind::AwsVpc => "aws:ec2/vpc:Vpc",
            ResourceKind::AwsSubnet => "aws:ec2/subnet:Subnet",
            ResourceKind::AwsInternetGateway => "aws:ec2/internetGateway:InternetGateway",
            ResourceKind::AwsVpnGateway => "aws:ec2/vpnGateway:VpnGateway",
            ResourceKind::AwsCustomerGateway => "aws:ec2/customerGateway:CustomerGateway",
            ResourceKind::AwsDefaultRouteTable => "aws:ec2/defaultRouteTable:DefaultRouteTable",
            ResourceKind::AwsVpnConnection => "aws:ec2/vpnConnection:VpnConnection",
            ResourceKind::AwsSecurityGroup => "aws:ec2/securityGroup:SecurityGroup",
            ResourceKind::GcpNetwork => "gcp:compute/network:Network",
            ResourceKind::GcpSubnetwork => "gcp:compute/subnetwork:Subnetwork",
            ResourceKind::GcpAddress => "gcp:compute/address:Address",
            ResourceKind::GcpVpnGateway => "gcp:compute/vPNGateway:VPNGateway",
            ResourceKind::GcpForwardingRule => "gcp:compute/forwardingRule:ForwardingRule",
            ResourceKind::GcpRouter => "gcp:compute/router:Router",
            ResourceKind::GcpVpnTunnel => "gcp:compute/vPNTunnel:VPNTunnel",
            ResourceKind::GcpRouterInterface => "gcp:compute/routerInterface:RouterInterface",
            ResourceKind::GcpRouterPeer => "gcp:compute/routerPeer:RouterPeer",
            ResourceKind::GcpFirewall => "gcp:compute/firewall:Firewall",
        }
    }

    /// Whether the provider can change this record in place.
    ///
    /// Any input change on an immutable kind is a replacement.
    pub fn is_mutable(self) -> bool {
        matches!(
            self,
            ResourceKind::AwsDefaultRouteTable
                | ResourceKind::AwsSecurityGroup
                | ResourceKind::GcpRouter
                | ResourceKind::GcpFirewall
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_token())
    }
}

/// Well-known attribute names exposed by providers after creation
pub mod attrs {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const SELF_LINK: &str = "self_link";
    pub const ADDRESS: &str = "address";
    pub const BGP_ASN: &str = "bgp_asn";
    pub const DEFAULT_ROUTE_TABLE_ID: &str = "default_route_table_id";
}

//! Typed record payloads

use crate::{aws, gcp, Input, OutputRef, ResourceKind};
use serde::{Deserialize, Serialize};

/// Desired state of one record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "properties", rename_all = "kebab-case")]
pub enum ResourceSpec {
    AwsVpc(aws::Vpc),
    AwsSubnet(aws::Subnet),
    AwsInternetGateway(aws::InternetGateway),
    AwsVpnGateway(aws::VpnGateway),
    AwsCustomerGateway(aws::CustomerGateway),
    AwsDefaultRouteTable(aws::DefaultRouteTable),
    AwsVpnConnection(aws::VpnConnection),
    AwsSecurityGroup(aws::SecurityGroup),
    GcpNetwork(gcp::Network),
    GcpSubnetwork(gcp::Subnetwork),
    GcpAddress(gcp::Address),
    GcpVpnGateway(gcp::VpnGateway),
    GcpForwardingRule(gcp::ForwardingRule),
    GcpRouter(gcp::Router),
    GcpVpnTunnel(gcp::VpnTunnel),
    GcpRouterInterface(gcp::RouterInterface),
    GcpRouterPeer(gcp::RouterPeer),
    GcpFirewall(gcp::Firewall),
}

macro_rules! each_record {
    ($spec:expr, $record:ident => $body:expr) => {
        match $spec {
            ResourceSpec::AwsVpc($record) => $body,
            ResourceSpec::AwsSubnet($record) => $body,
            ResourceSpec::AwsInternetGateway($record) => $body,
            ResourceSpec::AwsVpnGateway($record) => $body,
            ResourceSpec::AwsCustomerGateway($record) => $body,
            ResourceSpec::AwsDefaultRouteTable($record) => $body,
            ResourceSpec::AwsVpnConnection($record) => $body,
            ResourceSpec::AwsSecurityGroup($record) => $body,
            ResourceSpec::GcpNetwork($record) => $body,
            ResourceSpec::GcpSubnetwork($record) => $body,
            ResourceSpec::GcpAddress($record) => $body,
            ResourceSpec::GcpVpnGateway($record) => $body,
            ResourceSpec::GcpForwardingRule($record) => $body,
            ResourceSpec::GcpRouter($record) => $body,
            ResourceSpec::GcpVpnTunnel($record) => $body,
            ResourceSpec::GcpRouterInterface($record) => $body,
            ResourceSpec::GcpRouterPeer($record) => $body,
            ResourceSpec::GcpFirewall($record) => $body,
        }
    };
}

impl ResourceSpec {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceSpec::AwsVpc(_) => ResourceKind::AwsVpc,
            ResourceSpec::AwsSubnet(_) => ResourceKind::AwsSubnet,
            ResourceSpec::AwsInternetGateway(_) => ResourceKind::AwsInternetGateway,
            ResourceSpec::AwsVpnGateway(_) => ResourceKind::AwsVpnGateway,
            ResourceSpec::AwsCustomerGateway(_) => ResourceKind::AwsCustomerGateway,
            ResourceSpec::AwsDefaultRouteTable(_) => ResourceKind::AwsDefaultRouteTable,
            ResourceSpec::AwsVpnConnection(_) => ResourceKind::AwsVpnConnection,
            ResourceSpec::AwsSecurityGroup(_) => ResourceKind::AwsSecurityGroup,
            ResourceSpec::GcpNetwork(_) => ResourceKind::GcpNetwork,
            ResourceSpec::GcpSubnetwork(_) => ResourceKind::GcpSubnetwork,
            ResourceSpec::GcpAddress(_) => ResourceKind::GcpAddress,
            ResourceSpec::GcpVpnGateway(_) => ResourceKind::GcpVpnGateway,
            ResourceSpec::GcpForwardingRule(_) => ResourceKind::GcpForwardingRule,
            ResourceSpec::GcpRouter(_) => ResourceKind::GcpRouter,
            ResourceSpec::GcpVpnTunnel(_) => ResourceKind::GcpVpnTunnel,
            ResourceSpec::GcpRouterInterface(_) => ResourceKind::GcpRouterInterface,
            ResourceSpec::GcpRouterPeer(_) => ResourceKind::GcpRouterPeer,
            ResourceSpec::GcpFirewall(_) => ResourceKind::GcpFirewall,
        }
    }

    /// Every input field of the record, literal or placeholder
    pub fn inputs(&self) -> Vec<&Input> {
        each_record!(self, record => record.inputs())
    }

    pub fn inputs_mut(&mut self) -> Vec<&mut Input> {
        each_record!(self, record => record.inputs_mut())
    }

    /// Placeholders this record reads, in field order
    pub fn references(&self) -> Vec<&OutputRef> {
        self.inputs()
            .into_iter()
            .filter_map(Input::output_ref)
            .collect()
    }

    /// True once every placeholder has been bound
    pub fn is_resolved(&self) -> bool {
        self.inputs().iter().all(|input| input.is_known())
    }

    /// Canonical JSON payload submitted to the provider
    pub fn payload(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

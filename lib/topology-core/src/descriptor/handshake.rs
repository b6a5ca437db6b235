//! Cross-cloud handshake.
//!
//! The reserved GCP address is read by two independent chains: the AWS
//! customer gateway and the three GCP forwarding rules. Both only need the
//! address to exist; nothing else orders them against each other.

use super::{Edge, Layer, CUSTOMER_ASN, IPSEC_TYPE};
use crate::naming::roles;
use crate::Result;
use topology_api::{attrs, aws, gcp, Input, ResourceKey, ResourceSpec};

pub struct Handshake {
    pub customer_gateway: ResourceKey,
    pub vpn_connection: ResourceKey,
    /// ESP, UDP/500 and UDP/4500, in that order
    pub forwarding_rules: Vec<ResourceKey>,
}

/// IPsec traffic the GCP gateway must receive: ESP, IKE and NAT-T
const FORWARDED_PROTOCOLS: [(&str, &str, Option<&str>); 3] = [
    (roles::FORWARDING_ESP, "ESP", None),
    (roles::FORWARDING_UDP500, "UDP", Some("500")),
    (roles::FORWARDING_UDP4500, "UDP", Some("4500")),
];

pub(super) fn declare(layer: &mut Layer<'_>, edge: &Edge) -> Result<Handshake> {
    let cgw_name = layer.namer.name(roles::CUSTOMER_GATEWAY);
    let customer_gateway = layer.add(
        ResourceKey::aws(&cgw_name),
        ResourceSpec::AwsCustomerGateway(aws::CustomerGateway {
            bgp_asn: CUSTOMER_ASN,
            ip_address: Input::output(&edge.reserved_address, attrs::ADDRESS),
            gateway_type: IPSEC_TYPE.to_string(),
            tags: aws::name_tag(&cgw_name),
        }),
    )?;

    let conn_name = layer.namer.name(roles::VPN_CONNECTION);
    let vpn_connection = layer.add(
        ResourceKey::aws(&conn_name),
        ResourceSpec::AwsVpnConnection(aws::VpnConnection {
            customer_gateway_id: Input::output(&customer_gateway, attrs::ID),
            vpn_gateway_id: Input::output(&edge.aws_vpn_gateway, attrs::ID),
            connection_type: IPSEC_TYPE.to_string(),
            static_routes_only: false,
            tags: aws::name_tag(&conn_name),
        }),
    )?;

    let mut forwarding_rules = Vec::with_capacity(FORWARDED_PROTOCOLS.len());
    for (role, protocol, port_range) in FORWARDED_PROTOCOLS {
        let name = layer.namer.name(role);
        forwarding_rules.push(layer.add(
            ResourceKey::gcp(&name),
            ResourceSpec::GcpForwardingRule(gcp::ForwardingRule {
                name,
                ip_address: Input::output(&edge.reserved_address, attrs::ADDRESS),
                ip_protocol: protocol.to_string(),
                port_range: port_range.map(str::to_string),
                target: Input::output(&edge.gcp_vpn_gateway, attrs::SELF_LINK),
            }),
        )?);
    }

    Ok(Handshake {
        customer_gateway,
        vpn_connection,
        forwarding_rules,
    })
}

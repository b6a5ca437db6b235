//! Perimeter policy: an internet-facing rule set that only lets ICMP and
//! the configured TCP ports in, and an intra-VPN rule set trusting the
//! other cloud's block.

use super::{Foundation, Layer, ANYWHERE};
use crate::config::PortRange;
use crate::naming::roles;
use crate::Result;
use topology_api::aws::SecurityGroupRule;
use topology_api::gcp::FirewallAllow;
use topology_api::{attrs, aws, gcp, Input, ResourceKey, ResourceSpec};

pub struct Perimeter {
    pub aws_internet: ResourceKey,
    pub aws_vpn: ResourceKey,
    pub gcp_internet: ResourceKey,
    pub gcp_vpn: ResourceKey,
}

/// ICMP type 8 (echo request), code 0
const ICMP_ECHO_REQUEST: (i32, i32) = (8, 0);

pub(super) fn declare(layer: &mut Layer<'_>, foundation: &Foundation) -> Result<Perimeter> {
    let aws_block = layer.config.aws.block.to_string();
    let gcp_block = layer.config.gcp.block.to_string();
    let aws_vpc_id = Input::output(&foundation.aws_vpc, attrs::ID);
    let gcp_self_link = Input::output(&foundation.gcp_network, attrs::SELF_LINK);

    let internet_name = layer.namer.name(roles::FIREWALL);
    let mut ingress = vec![SecurityGroupRule::new(
        "icmp",
        ICMP_ECHO_REQUEST.0,
        ICMP_ECHO_REQUEST.1,
        ANYWHERE,
    )];
    ingress.extend(layer.config.aws.internet_tcp_ports.iter().map(|ports| {
        SecurityGroupRule::new("tcp", ports.low.into(), ports.high.into(), ANYWHERE)
    }));
    let aws_internet = layer.add(
        ResourceKey::aws(&internet_name),
        ResourceSpec::AwsSecurityGroup(aws::SecurityGroup {
            name: internet_name,
            vpc_id: aws_vpc_id.clone(),
            ingress,
            egress: vec![SecurityGroupRule::all(ANYWHERE)],
        }),
    )?;

    let vpn_name = layer.namer.name(roles::FIREWALL_VPN);
    let aws_vpn = layer.add(
        ResourceKey::aws(&vpn_name),
        ResourceSpec::AwsSecurityGroup(aws::SecurityGroup {
            name: vpn_name.clone(),
            vpc_id: aws_vpc_id,
            ingress: vec![SecurityGroupRule::all(&gcp_block)],
            egress: Vec::new(),
        }),
    )?;

    let gcp_internet_name = layer.namer.name(roles::FIREWALL_INTERNET);
    let internet_ports: Vec<String> = layer
        .config
        .gcp
        .internet_tcp_ports
        .iter()
        .map(PortRange::to_string)
        .collect();
    let gcp_internet = layer.add(
        ResourceKey::gcp(&gcp_internet_name),
        ResourceSpec::GcpFirewall(gcp::Firewall {
            name: gcp_internet_name,
            network: gcp_self_link.clone(),
            allows: vec![
                FirewallAllow::protocol("icmp"),
                FirewallAllow::ports("tcp", &internet_ports),
            ],
            source_ranges: vec![ANYWHERE.to_string()],
        }),
    )?;

    let all_ports = vec![PortRange::ALL.to_string()];
    let gcp_vpn = layer.add(
        ResourceKey::gcp(&vpn_name),
        ResourceSpec::GcpFirewall(gcp::Firewall {
            name: vpn_name,
            network: gcp_self_link,
            allows: vec![
                FirewallAllow::protocol("icmp"),
                FirewallAllow::ports("tcp", &all_ports),
                FirewallAllow::ports("udp", &all_ports),
            ],
            source_ranges: vec![aws_block],
        }),
    )?;

    Ok(Perimeter {
        aws_internet,
        aws_vpn,
        gcp_internet,
        gcp_vpn,
    })
}

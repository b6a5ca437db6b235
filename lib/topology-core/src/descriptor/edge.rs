//! Edge and gateway layer

use super::{Foundation, Layer};
use crate::naming::roles;
use crate::Result;
use topology_api::{attrs, aws, gcp, Input, ResourceKey, ResourceSpec};

pub struct Edge {
    pub internet_gateway: ResourceKey,
    pub aws_vpn_gateway: ResourceKey,
    pub gcp_vpn_gateway: ResourceKey,
    /// Reserved public address of the GCP end
    pub reserved_address: ResourceKey,
}

pub(super) fn declare(layer: &mut Layer<'_>, foundation: &Foundation) -> Result<Edge> {
    let igw_name = layer.namer.name(roles::INTERNET_GATEWAY);
    let internet_gateway = layer.add(
        ResourceKey::aws(&igw_name),
        ResourceSpec::AwsInternetGateway(aws::InternetGateway {
            vpc_id: Input::output(&foundation.aws_vpc, attrs::ID),
            tags: aws::name_tag(&igw_name),
        }),
    )?;

    let vgw_name = layer.namer.name(roles::VPN_GATEWAY);
    let aws_vpn_gateway = layer.add(
        ResourceKey::aws(&vgw_name),
        ResourceSpec::AwsVpnGateway(aws::VpnGateway {
            vpc_id: Input::output(&foundation.aws_vpc, attrs::ID),
            tags: aws::name_tag(&vgw_name),
        }),
    )?;

    let gcp_vpn_gateway = layer.add(
        ResourceKey::gcp(&vgw_name),
        ResourceSpec::GcpVpnGateway(gcp::VpnGateway {
            name: vgw_name.clone(),
            network: Input::output(&foundation.gcp_network, attrs::ID),
        }),
    )?;

    let address_name = layer.namer.name(roles::RESERVED_ADDRESS);
    let reserved_address = layer.add(
        ResourceKey::gcp(&address_name),
        ResourceSpec::GcpAddress(gcp::Address { name: address_name }),
    )?;

    Ok(Edge {
        internet_gateway,
        aws_vpn_gateway,
        gcp_vpn_gateway,
        reserved_address,
    })
}

//! Network foundation: the VPC/network of each cloud and its subnets

use super::Layer;
use crate::naming::roles;
use crate::Result;
use topology_api::{attrs, aws, gcp, Input, ResourceKey, ResourceSpec};

pub struct Foundation {
    pub aws_vpc: ResourceKey,
    pub aws_subnets: Vec<ResourceKey>,
    pub gcp_network: ResourceKey,
    pub gcp_subnets: Vec<ResourceKey>,
}

pub(super) fn declare(layer: &mut Layer<'_>) -> Result<Foundation> {
    let aws_plan = &layer.config.aws;
    let gcp_plan = &layer.config.gcp;

    let vpc_name = layer.namer.name(roles::VPC);
    let aws_vpc = layer.add(
        ResourceKey::aws(&vpc_name),
        ResourceSpec::AwsVpc(aws::Vpc {
            cidr_block: aws_plan.block.to_string(),
            enable_dns_support: true,
            enable_dns_hostnames: true,
            tags: aws::name_tag(layer.namer.base()),
        }),
    )?;

    let mut aws_subnets = Vec::with_capacity(aws_plan.subnets.len());
    for (index, block) in aws_plan.subnets.iter().enumerate() {
        let name = layer.namer.indexed(roles::SUBNET, index);
        aws_subnets.push(layer.add(
            ResourceKey::aws(&name),
            ResourceSpec::AwsSubnet(aws::Subnet {
                vpc_id: Input::output(&aws_vpc, attrs::ID),
                cidr_block: block.to_string(),
                map_public_ip_on_launch: true,
                tags: aws::name_tag(&name),
            }),
        )?);
    }

    let gcp_network = layer.add(
        ResourceKey::gcp(&vpc_name),
        ResourceSpec::GcpNetwork(gcp::Network {
            name: vpc_name.clone(),
            auto_create_subnetworks: false,
        }),
    )?;

    let mut gcp_subnets = Vec::with_capacity(gcp_plan.subnets.len());
    for (index, block) in gcp_plan.subnets.iter().enumerate() {
        let name = layer.namer.indexed(roles::SUBNET, index);
        gcp_subnets.push(layer.add(
            ResourceKey::gcp(&name),
            ResourceSpec::GcpSubnetwork(gcp::Subnetwork {
                name: name.clone(),
                network: Input::output(&gcp_network, attrs::ID),
                ip_cidr_range: block.to_string(),
            }),
        )?);
    }

    Ok(Foundation {
        aws_vpc,
        aws_subnets,
        gcp_network,
        gcp_subnets,
    })
}

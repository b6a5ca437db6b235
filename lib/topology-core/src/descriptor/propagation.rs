//! Route propagation on the AWS side

use super::{Edge, Foundation, Layer, ANYWHERE};
use crate::naming::roles;
use crate::Result;
use topology_api::{attrs, aws, Input, ResourceKey, ResourceSpec};

pub(super) fn declare(
    layer: &mut Layer<'_>,
    foundation: &Foundation,
    edge: &Edge,
) -> Result<ResourceKey> {
    let name = layer.namer.name(roles::DEFAULT_ROUTE_TABLE);
    let remote_block = layer.config.gcp.block.to_string();

    layer.add(
        ResourceKey::aws(&name),
        ResourceSpec::AwsDefaultRouteTable(aws::DefaultRouteTable {
            default_route_table_id: Input::output(
                &foundation.aws_vpc,
                attrs::DEFAULT_ROUTE_TABLE_ID,
            ),
            routes: vec![
                aws::Route {
                    cidr_block: ANYWHERE.to_string(),
                    gateway_id: Input::output(&edge.internet_gateway, attrs::ID),
                },
                aws::Route {
                    cidr_block: remote_block,
                    gateway_id: Input::output(&edge.aws_vpn_gateway, attrs::ID),
                },
            ],
            propagating_vgws: vec![Input::output(&edge.aws_vpn_gateway, attrs::ID)],
            tags: aws::name_tag(&name),
        }),
    )
}

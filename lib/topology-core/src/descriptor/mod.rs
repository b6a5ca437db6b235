//! Topology descriptor.
//!
//! Declares every record of both clouds and the VPN between them from a
//! validated configuration. The descriptor only produces data: the graph
//! is handed to a reconciler which decides what to submit.

mod edge;
mod foundation;
mod handshake;
mod perimeter;
mod propagation;
mod routing;

pub use edge::Edge;
pub use foundation::Foundation;
pub use handshake::Handshake;
pub use perimeter::Perimeter;
pub use routing::TunnelSet;

use crate::config::ValidatedConfig;
use crate::exports::Exports;
use crate::graph::{GraphBuilder, ResourceGraph, ResourceNode};
use crate::naming::Namer;
use crate::Result;
use std::collections::BTreeSet;
use topology_api::{attrs, OutputRef, ResourceKey, ResourceSpec};
use tracing::{debug, info};

/// BGP ASN of the customer gateway, mirrored by the GCP routers
pub const CUSTOMER_ASN: u32 = 65000;

/// BGP ASN of the AWS side, peered by the GCP routers
pub const PEER_ASN: u32 = 64512;

pub const IKE_VERSION: u8 = 1;

/// Prefix length of the link-local tunnel inside addresses
pub const INSIDE_PREFIX_LEN: u8 = 30;

pub const IPSEC_TYPE: &str = "ipsec.1";

pub const ADVERTISE_MODE: &str = "DEFAULT";

pub const ANYWHERE: &str = "0.0.0.0/0";

/// Complete topology of both clouds
#[derive(Clone, Debug)]
pub struct Topology {
    pub graph: ResourceGraph,
    pub exports: Exports,
    /// Redundant tunnel sets, in index order
    pub tunnel_sets: Vec<TunnelSet>,
}

impl Topology {
    /// Topology with one tunnel set removed, e.g. while draining it
    pub fn without_tunnel_set(&self, index: usize) -> Result<Topology> {
        let Some(set) = self.tunnel_sets.iter().find(|set| set.index == index) else {
            return Ok(self.clone());
        };
        let removed: BTreeSet<ResourceKey> = set.keys().into_iter().cloned().collect();
        Ok(Topology {
            graph: self.graph.without(&removed)?,
            exports: self.exports.clone(),
            tunnel_sets: self
                .tunnel_sets
                .iter()
                .filter(|set| set.index != index)
                .cloned()
                .collect(),
        })
    }
}

/// Declaration context shared by the layers
struct Layer<'a> {
    config: &'a ValidatedConfig,
    namer: &'a Namer,
    builder: GraphBuilder,
}

impl Layer<'_> {
    fn add(&mut self, key: ResourceKey, spec: ResourceSpec) -> Result<ResourceKey> {
        debug!("Declaring {} ({})", key, spec.kind());
        self.builder.add(ResourceNode::new(key, spec))
    }

    /// Declare a record that must also wait for records it reads nothing from
    fn add_after(
        &mut self,
        key: ResourceKey,
        spec: ResourceSpec,
        after: impl IntoIterator<Item = ResourceKey>,
    ) -> Result<ResourceKey> {
        debug!("Declaring {} ({}) with ordering hints", key, spec.kind());
        self.builder
            .add(ResourceNode::new(key, spec).depends_on(after))
    }
}

/// Declare the topology for a validated configuration
pub fn describe(config: &ValidatedConfig) -> Result<Topology> {
    let namer = Namer::new(&config.base_name)?;
    let mut layer = Layer {
        config,
        namer: &namer,
        builder: GraphBuilder::new(),
    };

    let foundation = foundation::declare(&mut layer)?;
    let edge = edge::declare(&mut layer, &foundation)?;
    let handshake = handshake::declare(&mut layer, &edge)?;
    let tunnel_sets = routing::declare(&mut layer, &foundation, &edge, &handshake)?;
    propagation::declare(&mut layer, &foundation, &edge)?;
    perimeter::declare(&mut layer, &foundation)?;

    let exports = Exports {
        aws_vpc_id: OutputRef::new(&foundation.aws_vpc, attrs::ID),
        aws_subnet_ids: foundation
            .aws_subnets
            .iter()
            .map(|key| OutputRef::new(key, attrs::ID))
            .collect(),
        gcp_vpc_id: OutputRef::new(&foundation.gcp_network, attrs::NAME),
        gcp_subnet_ids: foundation
            .gcp_subnets
            .iter()
            .map(|key| OutputRef::new(key, attrs::NAME))
            .collect(),
    };

    let graph = layer.builder.build()?;
    info!(
        "Described topology {} with {} resources and {} edges",
        namer.base(),
        graph.len(),
        graph.edge_count()
    );

    Ok(Topology {
        graph,
        exports,
        tunnel_sets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopologyConfig;
    use topology_api::aws::TunnelAttributes;
    use topology_api::{Cloud, Input, ResourceKind};

    fn topology(base: &str) -> Topology {
        let config = TopologyConfig::new(base).validate().unwrap();
        describe(&config).unwrap()
    }

    fn spec<'a>(topology: &'a Topology, key: &ResourceKey) -> &'a ResourceSpec {
        &topology.graph.get(key).unwrap().spec
    }

    #[test]
    fn test_subnets_for_test_base_name() {
        let topology = topology("test");

        let mut aws: Vec<(String, String)> = topology
            .graph
            .nodes_in(Cloud::Aws)
            .filter_map(|node| match &node.spec {
                ResourceSpec::AwsSubnet(subnet) => {
                    Some((node.key.name.clone(), subnet.cidr_block.clone()))
                }
                _ => None,
            })
            .collect();
        aws.sort();
        assert_eq!(
            aws,
            vec![
                ("test-subnet-0".to_string(), "10.0.0.0/24".to_string()),
                ("test-subnet-1".to_string(), "10.0.1.0/24".to_string()),
                ("test-subnet-2".to_string(), "10.0.2.0/24".to_string()),
            ]
        );

        let mut gcp: Vec<(String, String)> = topology
            .graph
            .nodes_in(Cloud::Gcp)
            .filter_map(|node| match &node.spec {
                ResourceSpec::GcpSubnetwork(subnet) => {
                    Some((subnet.name.clone(), subnet.ip_cidr_range.clone()))
                }
                _ => None,
            })
            .collect();
        gcp.sort();
        assert_eq!(
            gcp,
            vec![
                ("test-subnet-0".to_string(), "10.0.4.0/24".to_string()),
                ("test-subnet-1".to_string(), "10.0.5.0/24".to_string()),
                ("test-subnet-2".to_string(), "10.0.6.0/24".to_string()),
            ]
        );
    }

    #[test]
    fn test_record_count_and_kinds() {
        let topology = topology("test");
        assert_eq!(topology.graph.nodes_in(Cloud::Aws).count(), 11);
        assert_eq!(topology.graph.nodes_in(Cloud::Gcp).count(), 19);

        let forwarding = topology
            .graph
            .iter()
            .filter(|node| node.spec.kind() == ResourceKind::GcpForwardingRule)
            .count();
        assert_eq!(forwarding, 3);
        assert_eq!(topology.tunnel_sets.len(), 2);
    }

    #[test]
    fn test_names_unique_within_each_cloud() {
        let topology = topology("test");
        for cloud in [Cloud::Aws, Cloud::Gcp] {
            let names: Vec<&str> = topology
                .graph
                .nodes_in(cloud)
                .map(|node| node.key.name.as_str())
                .collect();
            let unique: BTreeSet<&str> = names.iter().copied().collect();
            assert_eq!(names.len(), unique.len());
        }
    }

    #[test]
    fn test_every_name_starts_with_base() {
        let topology = topology("prod-net");
        assert!(topology
            .graph
            .iter()
            .all(|node| node.key.name.starts_with("prod-net-")));
    }

    #[test]
    fn test_topological_order_puts_upstreams_first() {
        let topology = topology("test");
        let order = topology.graph.topological_order();
        let position = |key: &ResourceKey| order.iter().position(|k| k == key).unwrap();

        for node in topology.graph.iter() {
            for upstream in node.upstreams() {
                assert!(position(&upstream) < position(&node.key));
            }
        }
    }

    #[test]
    fn test_tunnels_wait_for_every_forwarding_rule() {
        let topology = topology("test");
        let rules: BTreeSet<ResourceKey> = ["test-fr-esp", "test-fr-udp500", "test-fr-udp4500"]
            .into_iter()
            .map(ResourceKey::gcp)
            .collect();

        for set in &topology.tunnel_sets {
            let node = topology.graph.get(&set.tunnel).unwrap();
            assert_eq!(node.depends_on, rules);
        }
    }

    #[test]
    fn test_only_tunnels_carry_ordering_hints() {
        let topology = topology("test");
        for node in topology.graph.iter() {
            let is_tunnel = node.spec.kind() == ResourceKind::GcpVpnTunnel;
            assert_eq!(!node.depends_on.is_empty(), is_tunnel, "{}", node.key);
        }
    }

    #[test]
    fn test_tunnel_sets_are_not_cross_wired() {
        let topology = topology("test");
        let conn = ResourceKey::aws("test-vpn-conn");

        for set in &topology.tunnel_sets {
            let own = TunnelAttributes::for_set(set.index).all();
            for key in set.keys() {
                for output in spec(&topology, key).references() {
                    if output.resource == conn {
                        assert!(own.contains(&output.attribute), "{} reads {}", key, output);
                    }
                }
            }
        }
    }

    #[test]
    fn test_tunnel_set_fields() {
        let topology = topology("test");
        let set = &topology.tunnel_sets[1];

        match spec(&topology, &set.interface) {
            ResourceSpec::GcpRouterInterface(interface) => {
                let ip_range = interface.ip_range.output_ref().unwrap();
                assert_eq!(ip_range.attribute, "tunnel2_cgw_inside_address");
                assert_eq!(ip_range.to_string(), "aws/test-vpn-conn.tunnel2_cgw_inside_address + \"/30\"");
            }
            other => panic!("unexpected {:?}", other.kind()),
        }
        match spec(&topology, &set.peer) {
            ResourceSpec::GcpRouterPeer(peer) => assert_eq!(peer.peer_asn, PEER_ASN),
            other => panic!("unexpected {:?}", other.kind()),
        }
        match spec(&topology, &set.tunnel) {
            ResourceSpec::GcpVpnTunnel(tunnel) => {
                assert_eq!(tunnel.ike_version, 1);
                assert_eq!(
                    tunnel.router,
                    Input::output(&ResourceKey::gcp("test-router-1"), attrs::ID)
                );
            }
            other => panic!("unexpected {:?}", other.kind()),
        }
    }

    #[test]
    fn test_reserved_address_read_by_both_chains() {
        let topology = topology("test");
        let address = ResourceKey::gcp("test-eip-aws-cgw");
        let dependents = topology.graph.dependents(&address).unwrap();

        let expected: BTreeSet<ResourceKey> = [
            ResourceKey::aws("test-cgw"),
            ResourceKey::gcp("test-fr-esp"),
            ResourceKey::gcp("test-fr-udp500"),
            ResourceKey::gcp("test-fr-udp4500"),
        ]
        .into_iter()
        .collect();
        assert_eq!(dependents, &expected);
        assert_eq!(
            topology.graph.get(&address).unwrap().upstreams(),
            BTreeSet::new()
        );
    }

    #[test]
    fn test_router_asn_mirrors_customer_gateway() {
        let topology = topology("test");
        match spec(&topology, &ResourceKey::gcp("test-router-0")) {
            ResourceSpec::GcpRouter(router) => {
                assert_eq!(
                    router.bgp.asn,
                    Input::output(&ResourceKey::aws("test-cgw"), attrs::BGP_ASN)
                );
                assert_eq!(router.bgp.advertise_mode, "DEFAULT");
            }
            other => panic!("unexpected {:?}", other.kind()),
        }
    }

    #[test]
    fn test_internet_security_group_rules() {
        let topology = topology("test");
        match spec(&topology, &ResourceKey::aws("test-fwl")) {
            ResourceSpec::AwsSecurityGroup(group) => {
                let ingress: Vec<(&str, i32, i32)> = group
                    .ingress
                    .iter()
                    .map(|rule| (rule.protocol.as_str(), rule.from_port, rule.to_port))
                    .collect();
                assert_eq!(ingress, vec![("icmp", 8, 0), ("tcp", 22, 22)]);
                assert_eq!(group.egress[0].protocol, "-1");
            }
            other => panic!("unexpected {:?}", other.kind()),
        }
    }

    #[test]
    fn test_vpn_firewall_trusts_remote_block() {
        let topology = topology("test");
        match spec(&topology, &ResourceKey::gcp("test-fwl-vpn")) {
            ResourceSpec::GcpFirewall(firewall) => {
                assert_eq!(firewall.source_ranges, vec!["10.0.0.0/22".to_string()]);
                assert_eq!(firewall.allows.len(), 3);
                assert_eq!(firewall.allows[1].ports, vec!["0-65535".to_string()]);
            }
            other => panic!("unexpected {:?}", other.kind()),
        }
    }

    #[test]
    fn test_default_route_table_routes() {
        let topology = topology("test");
        match spec(&topology, &ResourceKey::aws("test-rtb-default")) {
            ResourceSpec::AwsDefaultRouteTable(table) => {
                let blocks: Vec<&str> = table.routes.iter().map(|r| r.cidr_block.as_str()).collect();
                assert_eq!(blocks, vec!["0.0.0.0/0", "10.0.4.0/22"]);
                assert_eq!(table.propagating_vgws.len(), 1);
            }
            other => panic!("unexpected {:?}", other.kind()),
        }
    }

    #[test]
    fn test_exports_reference_foundation() {
        let topology = topology("test");
        assert_eq!(topology.exports.aws_vpc_id.to_string(), "aws/test-vpc.id");
        assert_eq!(topology.exports.gcp_vpc_id.to_string(), "gcp/test-vpc.name");
        assert_eq!(topology.exports.aws_subnet_ids.len(), 3);
        assert_eq!(
            topology.exports.gcp_subnet_ids[2].to_string(),
            "gcp/test-subnet-2.name"
        );
    }

    #[test]
    fn test_removing_tunnel_set_keeps_the_other() {
        let topology = topology("test");
        let reduced = topology.without_tunnel_set(1).unwrap();

        assert_eq!(reduced.graph.len(), topology.graph.len() - 4);
        for key in topology.tunnel_sets[0].keys() {
            assert_eq!(reduced.graph.get(key), topology.graph.get(key));
        }
        assert!(!reduced.graph.contains(&ResourceKey::gcp("test-router-1")));
    }

    #[test]
    fn test_describe_is_deterministic() {
        let first = topology("test");
        let second = topology("test");
        assert_eq!(
            first.graph.topological_order(),
            second.graph.topological_order()
        );
    }
}

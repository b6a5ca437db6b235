//! Dynamic routing layer of GCP.
//!
//! One router, tunnel, interface and BGP peer per tunnel generated by the
//! AWS VPN connection. Each set has its own router so that one BGP session
//! failing leaves the other untouched, and set `i` only ever reads the
//! attributes of AWS tunnel `i + 1`.

use super::{
    Edge, Foundation, Handshake, Layer, ADVERTISE_MODE, IKE_VERSION, INSIDE_PREFIX_LEN, PEER_ASN,
};
use crate::naming::roles;
use crate::Result;
use topology_api::aws::{TunnelAttributes, VpnConnection};
use topology_api::{attrs, gcp, Input, ResourceKey, ResourceSpec, Transform};

/// Records of one redundant tunnel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TunnelSet {
    pub index: usize,
    pub router: ResourceKey,
    pub tunnel: ResourceKey,
    pub interface: ResourceKey,
    pub peer: ResourceKey,
}

impl TunnelSet {
    pub fn keys(&self) -> [&ResourceKey; 4] {
        [&self.router, &self.tunnel, &self.interface, &self.peer]
    }
}

pub(super) fn declare(
    layer: &mut Layer<'_>,
    foundation: &Foundation,
    edge: &Edge,
    handshake: &Handshake,
) -> Result<Vec<TunnelSet>> {
    let mut sets = Vec::with_capacity(VpnConnection::TUNNEL_COUNT);
    for index in 0..VpnConnection::TUNNEL_COUNT {
        sets.push(declare_set(layer, index, foundation, edge, handshake)?);
    }
    Ok(sets)
}

fn declare_set(
    layer: &mut Layer<'_>,
    index: usize,
    foundation: &Foundation,
    edge: &Edge,
    handshake: &Handshake,
) -> Result<TunnelSet> {
    let tunnel_attrs = TunnelAttributes::for_set(index);
    let conn = &handshake.vpn_connection;

    let router_name = layer.namer.indexed(roles::ROUTER, index);
    let router = layer.add(
        ResourceKey::gcp(&router_name),
        ResourceSpec::GcpRouter(gcp::Router {
            name: router_name,
            network: Input::output(&foundation.gcp_network, attrs::NAME),
            bgp: gcp::RouterBgp {
                // Mirrors the customer gateway so both ends agree on the ASN
                asn: Input::output(&handshake.customer_gateway, attrs::BGP_ASN),
                advertise_mode: ADVERTISE_MODE.to_string(),
            },
        }),
    )?;

    // The tunnel reads nothing from the forwarding rules, but the provider
    // rejects it until they route ESP and IKE traffic to the gateway.
    let tunnel_name = layer.namer.indexed(roles::VPN_TUNNEL, index);
    let tunnel = layer.add_after(
        ResourceKey::gcp(&tunnel_name),
        ResourceSpec::GcpVpnTunnel(gcp::VpnTunnel {
            name: tunnel_name,
            ike_version: IKE_VERSION,
            peer_ip: Input::output(conn, &tunnel_attrs.address()),
            shared_secret: Input::output(conn, &tunnel_attrs.preshared_key()),
            target_vpn_gateway: Input::output(&edge.gcp_vpn_gateway, attrs::SELF_LINK),
            router: Input::output(&router, attrs::ID),
        }),
        handshake.forwarding_rules.iter().cloned(),
    )?;

    let interface_name = layer
        .namer
        .indexed_child(roles::ROUTER, index, roles::INTERFACE);
    let interface = layer.add(
        ResourceKey::gcp(&interface_name),
        ResourceSpec::GcpRouterInterface(gcp::RouterInterface {
            name: interface_name,
            router: Input::output(&router, attrs::NAME),
            ip_range: Input::output(conn, &tunnel_attrs.cgw_inside_address())
                .map(Transform::CidrSuffix(INSIDE_PREFIX_LEN)),
            vpn_tunnel: Input::output(&tunnel, attrs::NAME),
        }),
    )?;

    let peer_name = layer.namer.indexed_child(roles::ROUTER, index, roles::PEER);
    let peer = layer.add(
        ResourceKey::gcp(&peer_name),
        ResourceSpec::GcpRouterPeer(gcp::RouterPeer {
            name: peer_name,
            router: Input::output(&router, attrs::NAME),
            peer_ip_address: Input::output(conn, &tunnel_attrs.vgw_inside_address()),
            peer_asn: PEER_ASN,
            interface: Input::output(&interface, attrs::NAME),
        }),
    )?;

    Ok(TunnelSet {
        index,
        router,
        tunnel,
        interface,
        peer,
    })
}

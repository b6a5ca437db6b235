//! In-memory provider simulating both clouds.
//!
//! Resources live in a shared map keyed like the descriptor. Every create
//! or update checks that the resources it points at already exist, the way
//! the real APIs do, so an ordering mistake in the graph surfaces as a
//! provider error instead of passing silently. Deletes are refused while
//! another resource still points at the target. Generated values (ids, the
//! reserved address, tunnel endpoints, pre-shared keys and inside
//! addresses) are random.

use crate::provider::{Provider, ProviderError, ProviderResource};
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use topology_api::aws::{TunnelAttributes, VpnConnection};
use topology_api::{attrs, Cloud, Input, ResourceKey, ResourceKind, ResourceSpec};
use tracing::debug;
use uuid::Uuid;

const SELF_LINK_BASE: &str = "https://www.googleapis.com/compute/v1/projects/simulated";

/// Protocols a target gateway must receive before a tunnel can use it
const REQUIRED_FORWARDING: [(&str, Option<&str>); 3] =
    [("ESP", None), ("UDP", Some("500")), ("UDP", Some("4500"))];

/// Provider operation recorded by the simulator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operation {
    pub kind: OperationKind,
    pub key: ResourceKey,
}

/// A resource held by the simulator
#[derive(Clone, Debug)]
pub struct SimulatedResource {
    pub kind: ResourceKind,
    pub id: String,
    pub spec: ResourceSpec,
    pub outputs: BTreeMap<String, String>,
}

impl SimulatedResource {
    fn output(&self, attribute: &str) -> Option<&str> {
        if attribute == attrs::ID {
            return Some(&self.id);
        }
        self.outputs.get(attribute).map(String::as_str)
    }
}

/// Error injected for the next calls touching a resource
struct Fault {
    error: ProviderError,
    remaining: usize,
}

/// In-memory provider for both clouds
#[derive(Clone, Default)]
pub struct SimulatedProvider {
    resources: Arc<RwLock<HashMap<ResourceKey, SimulatedResource>>>,
    operations: Arc<Mutex<Vec<Operation>>>,
    faults: Arc<Mutex<HashMap<ResourceKey, Fault>>>,
}

impl SimulatedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` calls on `key` with `error`
    pub fn inject_fault(&self, key: &ResourceKey, error: ProviderError, times: usize) {
        if let Ok(mut faults) = self.faults.lock() {
            if times == 0 {
                faults.remove(key);
                return;
            }
            faults.insert(
                key.clone(),
                Fault {
                    error,
                    remaining: times,
                },
            );
        }
    }

    pub fn clear_faults(&self) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.clear();
        }
    }

    /// Every successful operation so far, in order
    pub fn operations(&self) -> Vec<Operation> {
        self.operations
            .lock()
            .map(|operations| operations.clone())
            .unwrap_or_default()
    }

    pub fn operation_count(&self) -> usize {
        self.operations
            .lock()
            .map(|operations| operations.len())
            .unwrap_or_default()
    }

    pub async fn get(&self, key: &ResourceKey) -> Option<SimulatedResource> {
        self.resources.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.resources.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.resources.read().await.is_empty()
    }

    /// Keys held in one cloud, sorted
    pub async fn keys_in(&self, cloud: Cloud) -> Vec<ResourceKey> {
        let resources = self.resources.read().await;
        let mut keys: Vec<ResourceKey> = resources
            .keys()
            .filter(|key| key.cloud == cloud)
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    fn take_fault(&self, key: &ResourceKey) -> Result<(), ProviderError> {
        let Ok(mut faults) = self.faults.lock() else {
            return Ok(());
        };
        let Some(fault) = faults.get_mut(key) else {
            return Ok(());
        };
        let error = fault.error.clone();
        fault.remaining = fault.remaining.saturating_sub(1);
        if fault.remaining == 0 {
            faults.remove(key);
        }
        debug!("Injecting fault on {}: {}", key, error);
        Err(error)
    }

    fn log(&self, kind: OperationKind, key: &ResourceKey) {
        if let Ok(mut operations) = self.operations.lock() {
            operations.push(Operation {
                kind,
                key: key.clone(),
            });
        }
    }
}

#[async_trait::async_trait]
impl Provider for SimulatedProvider {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn create(
        &self,
        key: &ResourceKey,
        spec: &ResourceSpec,
    ) -> Result<ProviderResource, ProviderError> {
        self.take_fault(key)?;
        check_resolved(key, spec)?;

        let mut resources = self.resources.write().await;
        if resources.contains_key(key) {
            return Err(ProviderError::Conflict(format!("{} already exists", key)));
        }
        check_targets(&resources, spec)?;

        let kind = spec.kind();
        let id = generate_id(kind, spec);
        let outputs = generate_outputs(key, spec, &resources)?;
        resources.insert(
            key.clone(),
            SimulatedResource {
                kind,
                id: id.clone(),
                spec: spec.clone(),
                outputs: outputs.clone(),
            },
        );
        drop(resources);

        debug!("Simulated create of {} as {}", key, id);
        self.log(OperationKind::Create, key);
        Ok(ProviderResource { id, outputs })
    }

    async fn update(
        &self,
        key: &ResourceKey,
        id: &str,
        spec: &ResourceSpec,
    ) -> Result<ProviderResource, ProviderError> {
        self.take_fault(key)?;
        check_resolved(key, spec)?;

        let kind = spec.kind();
        if !kind.is_mutable() {
            return Err(ProviderError::Conflict(format!(
                "{} cannot be changed in place",
                kind
            )));
        }

        let mut resources = self.resources.write().await;
        match resources.get(key) {
            Some(existing) if existing.id == id && existing.kind == kind => {}
            _ => return Err(ProviderError::NotFound(format!("{} ({})", key, id))),
        }
        check_targets(&resources, spec)?;

        // A default route table follows whichever table its spec names
        let id = match spec {
            ResourceSpec::AwsDefaultRouteTable(_) => generate_id(kind, spec),
            _ => id.to_string(),
        };
        let outputs = generate_outputs(key, spec, &resources)?;
        if let Some(existing) = resources.get_mut(key) {
            existing.id = id.clone();
            existing.spec = spec.clone();
            existing.outputs = outputs.clone();
        }
        drop(resources);

        debug!("Simulated update of {}", key);
        self.log(OperationKind::Update, key);
        Ok(ProviderResource { id, outputs })
    }

    async fn delete(
        &self,
        key: &ResourceKey,
        kind: ResourceKind,
        id: &str,
    ) -> Result<(), ProviderError> {
        self.take_fault(key)?;

        let mut resources = self.resources.write().await;
        if let Some(existing) = resources.get(key) {
            if existing.id != id || existing.kind != kind {
                return Err(ProviderError::Conflict(format!(
                    "{} is {} ({}), not {}",
                    key, existing.id, existing.kind, id
                )));
            }
            if let Some(dependent) = referenced_by(&resources, key, existing) {
                return Err(ProviderError::Conflict(format!(
                    "{} is still referenced by {}",
                    key, dependent
                )));
            }
        }
        if resources.remove(key).is_none() {
            debug!("{} already deleted", key);
        }
        drop(resources);

        self.log(OperationKind::Delete, key);
        Ok(())
    }
}

fn check_resolved(key: &ResourceKey, spec: &ResourceSpec) -> Result<(), ProviderError> {
    match spec.references().first() {
        Some(output) => Err(ProviderError::Conflict(format!(
            "{} submitted with unresolved input {}",
            key, output
        ))),
        None => Ok(()),
    }
}

/// Existing resource another one points at
struct Target<'a> {
    what: &'static str,
    value: &'a Input,
    kinds: &'static [ResourceKind],
    attribute: &'static str,
}

impl<'a> Target<'a> {
    fn new(
        what: &'static str,
        value: &'a Input,
        kinds: &'static [ResourceKind],
        attribute: &'static str,
    ) -> Self {
        Self {
            what,
            value,
            kinds,
            attribute,
        }
    }
}

fn targets(spec: &ResourceSpec) -> Vec<Target<'_>> {
    use ResourceKind::*;

    match spec {
        ResourceSpec::AwsSubnet(s) => vec![Target::new("vpc", &s.vpc_id, &[AwsVpc], attrs::ID)],
        ResourceSpec::AwsInternetGateway(s) => {
            vec![Target::new("vpc", &s.vpc_id, &[AwsVpc], attrs::ID)]
        }
        ResourceSpec::AwsVpnGateway(s) => vec![Target::new("vpc", &s.vpc_id, &[AwsVpc], attrs::ID)],
        ResourceSpec::AwsCustomerGateway(s) => vec![Target::new(
            "remote address",
            &s.ip_address,
            &[GcpAddress],
            attrs::ADDRESS,
        )],
        ResourceSpec::AwsDefaultRouteTable(s) => {
            let mut targets = vec![Target::new(
                "route table",
                &s.default_route_table_id,
                &[AwsVpc],
                attrs::DEFAULT_ROUTE_TABLE_ID,
            )];
            for route in &s.routes {
                targets.push(Target::new(
                    "route gateway",
                    &route.gateway_id,
                    &[AwsInternetGateway, AwsVpnGateway],
                    attrs::ID,
                ));
            }
            for vgw in &s.propagating_vgws {
                targets.push(Target::new("propagating gateway", vgw, &[AwsVpnGateway], attrs::ID));
            }
            targets
        }
        ResourceSpec::AwsVpnConnection(s) => vec![
            Target::new(
                "customer gateway",
                &s.customer_gateway_id,
                &[AwsCustomerGateway],
                attrs::ID,
            ),
            Target::new("vpn gateway", &s.vpn_gateway_id, &[AwsVpnGateway], attrs::ID),
        ],
        ResourceSpec::AwsSecurityGroup(s) => {
            vec![Target::new("vpc", &s.vpc_id, &[AwsVpc], attrs::ID)]
        }
        ResourceSpec::GcpSubnetwork(s) => {
            vec![Target::new("network", &s.network, &[GcpNetwork], attrs::ID)]
        }
        ResourceSpec::GcpVpnGateway(s) => {
            vec![Target::new("network", &s.network, &[GcpNetwork], attrs::ID)]
        }
        ResourceSpec::GcpForwardingRule(s) => vec![
            Target::new("address", &s.ip_address, &[GcpAddress], attrs::ADDRESS),
            Target::new("target gateway", &s.target, &[GcpVpnGateway], attrs::SELF_LINK),
        ],
        ResourceSpec::GcpRouter(s) => {
            vec![Target::new("network", &s.network, &[GcpNetwork], attrs::NAME)]
        }
        ResourceSpec::GcpVpnTunnel(s) => vec![
            Target::new(
                "target gateway",
                &s.target_vpn_gateway,
                &[GcpVpnGateway],
                attrs::SELF_LINK,
            ),
            Target::new("router", &s.router, &[GcpRouter], attrs::ID),
        ],
        ResourceSpec::GcpRouterInterface(s) => vec![
            Target::new("router", &s.router, &[GcpRouter], attrs::NAME),
            Target::new("vpn tunnel", &s.vpn_tunnel, &[GcpVpnTunnel], attrs::NAME),
        ],
        ResourceSpec::GcpRouterPeer(s) => vec![
            Target::new("router", &s.router, &[GcpRouter], attrs::NAME),
            Target::new("interface", &s.interface, &[GcpRouterInterface], attrs::NAME),
        ],
        ResourceSpec::GcpFirewall(s) => {
            vec![Target::new("network", &s.network, &[GcpNetwork], attrs::SELF_LINK)]
        }
        ResourceSpec::AwsVpc(_) | ResourceSpec::GcpNetwork(_) | ResourceSpec::GcpAddress(_) => {
            Vec::new()
        }
    }
}

fn check_targets(
    resources: &HashMap<ResourceKey, SimulatedResource>,
    spec: &ResourceSpec,
) -> Result<(), ProviderError> {
    for target in targets(spec) {
        let value = target.value.as_known().unwrap_or_default();
        let found = resources.values().any(|resource| {
            target.kinds.contains(&resource.kind) && resource.output(target.attribute) == Some(value)
        });
        if !found {
            return Err(ProviderError::NotFound(format!(
                "{} {} not found",
                target.what, value
            )));
        }
    }

    if let ResourceSpec::GcpVpnTunnel(tunnel) = spec {
        let gateway = tunnel.target_vpn_gateway.as_known().unwrap_or_default();
        for (protocol, port) in REQUIRED_FORWARDING {
            let forwarded = resources.values().any(|resource| match &resource.spec {
                ResourceSpec::GcpForwardingRule(rule) => {
                    rule.target.as_known() == Some(gateway)
                        && rule.ip_protocol == protocol
                        && rule.port_range.as_deref() == port
                }
                _ => false,
            });
            if !forwarded {
                return Err(ProviderError::NotFound(format!(
                    "gateway {} has no {} {} forwarding rule",
                    gateway,
                    protocol,
                    port.unwrap_or_default()
                )));
            }
        }
    }
    Ok(())
}

/// Another resource whose targets include `target`
fn referenced_by<'a>(
    resources: &'a HashMap<ResourceKey, SimulatedResource>,
    key: &ResourceKey,
    target: &SimulatedResource,
) -> Option<&'a ResourceKey> {
    resources
        .iter()
        .filter(|(other, _)| *other != key)
        .find(|(_, resource)| {
            targets(&resource.spec).iter().any(|pointer| {
                pointer.kinds.contains(&target.kind)
                    && matches!(
                        pointer.value.as_known(),
                        Some(value) if target.output(pointer.attribute) == Some(value)
                    )
            })
        })
        .map(|(other, _)| other)
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..17].to_string()
}

fn generate_id(kind: ResourceKind, spec: &ResourceSpec) -> String {
    let prefix = match kind {
        ResourceKind::AwsVpc => "vpc",
        ResourceKind::AwsSubnet => "subnet",
        ResourceKind::AwsInternetGateway => "igw",
        ResourceKind::AwsVpnGateway => "vgw",
        ResourceKind::AwsCustomerGateway => "cgw",
        ResourceKind::AwsVpnConnection => "vpn",
        ResourceKind::AwsSecurityGroup => "sg",
        ResourceKind::AwsDefaultRouteTable => {
            // Adopts the route table the VPC was created with
            if let ResourceSpec::AwsDefaultRouteTable(table) = spec {
                if let Some(id) = table.default_route_table_id.as_known() {
                    return id.to_string();
                }
            }
            "rtb"
        }
        _ => return Uuid::new_v4().to_string(),
    };
    format!("{}-{}", prefix, short_id())
}

fn collection(kind: ResourceKind) -> Option<&'static str> {
    match kind {
        ResourceKind::GcpNetwork => Some("global/networks"),
        ResourceKind::GcpFirewall => Some("global/firewalls"),
        ResourceKind::GcpSubnetwork => Some("regions/simulated/subnetworks"),
        ResourceKind::GcpAddress => Some("regions/simulated/addresses"),
        ResourceKind::GcpVpnGateway => Some("regions/simulated/targetVpnGateways"),
        ResourceKind::GcpForwardingRule => Some("regions/simulated/forwardingRules"),
        ResourceKind::GcpRouter => Some("regions/simulated/routers"),
        ResourceKind::GcpVpnTunnel => Some("regions/simulated/vpnTunnels"),
        _ => None,
    }
}

fn public_address(rng: &mut impl Rng, first_octet: u8) -> String {
    Ipv4Addr::new(first_octet, rng.gen(), rng.gen(), rng.gen_range(1..255)).to_string()
}

/// Third and fourth octet of a 169.254.0.0/16 /30 block
fn inside_block(rng: &mut impl Rng) -> (u8, u8) {
    (rng.gen(), rng.gen_range(0..64u8) * 4)
}

fn generate_outputs(
    key: &ResourceKey,
    spec: &ResourceSpec,
    resources: &HashMap<ResourceKey, SimulatedResource>,
) -> Result<BTreeMap<String, String>, ProviderError> {
    let mut rng = rand::thread_rng();
    let mut outputs = BTreeMap::new();
    outputs.insert(attrs::NAME.to_string(), key.name.clone());

    if let Some(collection) = collection(spec.kind()) {
        outputs.insert(
            attrs::SELF_LINK.to_string(),
            format!("{}/{}/{}", SELF_LINK_BASE, collection, key.name),
        );
    }

    match spec {
        ResourceSpec::AwsVpc(_) => {
            outputs.insert(
                attrs::DEFAULT_ROUTE_TABLE_ID.to_string(),
                format!("rtb-{}", short_id()),
            );
        }
        ResourceSpec::AwsCustomerGateway(cgw) => {
            outputs.insert(attrs::BGP_ASN.to_string(), cgw.bgp_asn.to_string());
        }
        ResourceSpec::GcpAddress(_) => {
            let in_use: Vec<&str> = resources
                .values()
                .filter_map(|resource| resource.output(attrs::ADDRESS))
                .collect();
            let address = loop {
                let candidate = public_address(&mut rng, 34);
                if !in_use.contains(&candidate.as_str()) {
                    break candidate;
                }
            };
            outputs.insert(attrs::ADDRESS.to_string(), address);
        }
        ResourceSpec::AwsVpnConnection(_) => {
            let mut blocks: Vec<(u8, u8)> = Vec::with_capacity(VpnConnection::TUNNEL_COUNT);
            while blocks.len() < VpnConnection::TUNNEL_COUNT {
                let block = inside_block(&mut rng);
                if !blocks.contains(&block) {
                    blocks.push(block);
                }
            }
            for (set, (third, fourth)) in blocks.into_iter().enumerate() {
                let tunnel = TunnelAttributes::for_set(set);
                let psk: [u8; 16] = rng.gen();
                outputs.insert(tunnel.address(), public_address(&mut rng, 52));
                outputs.insert(tunnel.preshared_key(), hex::encode(psk));
                outputs.insert(
                    tunnel.vgw_inside_address(),
                    Ipv4Addr::new(169, 254, third, fourth + 1).to_string(),
                );
                outputs.insert(
                    tunnel.cgw_inside_address(),
                    Ipv4Addr::new(169, 254, third, fourth + 2).to_string(),
                );
            }
        }
        ResourceSpec::GcpRouterInterface(interface) => {
            let ip_range = interface.ip_range.as_known().unwrap_or_default();
            let valid = ip_range
                .split_once('/')
                .map(|(ip, len)| ip.parse::<Ipv4Addr>().is_ok() && len == "30")
                .unwrap_or(false);
            if !valid {
                return Err(ProviderError::Conflict(format!(
                    "invalid interface ip range {:?}",
                    ip_range
                )));
            }
        }
        _ => {}
    }

    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use topology_api::{aws, gcp};

    fn network(name: &str) -> ResourceSpec {
        ResourceSpec::GcpNetwork(gcp::Network {
            name: name.to_string(),
            auto_create_subnetworks: false,
        })
    }

    fn gateway(network_id: &str) -> ResourceSpec {
        ResourceSpec::GcpVpnGateway(gcp::VpnGateway {
            name: "t-vgw".to_string(),
            network: Input::known(network_id),
        })
    }

    fn rule(
        name: &str,
        address: &str,
        target: &str,
        protocol: &str,
        port: Option<&str>,
    ) -> ResourceSpec {
        ResourceSpec::GcpForwardingRule(gcp::ForwardingRule {
            name: name.to_string(),
            ip_address: Input::known(address),
            ip_protocol: protocol.to_string(),
            port_range: port.map(str::to_string),
            target: Input::known(target),
        })
    }

    #[tokio::test]
    async fn test_create_generates_outputs() {
        let provider = SimulatedProvider::new();
        let key = ResourceKey::gcp("t-vpc");
        let created = provider.create(&key, &network("t-vpc")).await.unwrap();

        assert_eq!(created.outputs["name"], "t-vpc");
        assert!(created.outputs["self_link"].ends_with("/global/networks/t-vpc"));
        assert_eq!(provider.len().await, 1);
        assert_eq!(
            provider.operations(),
            vec![Operation {
                kind: OperationKind::Create,
                key
            }]
        );
    }

    #[tokio::test]
    async fn test_create_twice_conflicts() {
        let provider = SimulatedProvider::new();
        let key = ResourceKey::gcp("t-vpc");
        provider.create(&key, &network("t-vpc")).await.unwrap();

        let err = provider.create(&key, &network("t-vpc")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_forwarding_rule_requires_target_gateway() {
        let provider = SimulatedProvider::new();
        let address = provider
            .create(
                &ResourceKey::gcp("t-eip-aws-cgw"),
                &ResourceSpec::GcpAddress(gcp::Address {
                    name: "t-eip-aws-cgw".to_string(),
                }),
            )
            .await
            .unwrap();

        let err = provider
            .create(
                &ResourceKey::gcp("t-fr-esp"),
                &rule("t-fr-esp", &address.outputs["address"], "missing-link", "ESP", None),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProviderError::NotFound("target gateway missing-link not found".to_string())
        );
    }

    #[tokio::test]
    async fn test_tunnel_requires_every_forwarding_rule() {
        let provider = SimulatedProvider::new();
        let net = provider
            .create(&ResourceKey::gcp("t-vpc"), &network("t-vpc"))
            .await
            .unwrap();
        let vgw = provider
            .create(&ResourceKey::gcp("t-vgw"), &gateway(&net.id))
            .await
            .unwrap();
        let address = provider
            .create(
                &ResourceKey::gcp("t-eip-aws-cgw"),
                &ResourceSpec::GcpAddress(gcp::Address {
                    name: "t-eip-aws-cgw".to_string(),
                }),
            )
            .await
            .unwrap();
        let router = provider
            .create(
                &ResourceKey::gcp("t-router-0"),
                &ResourceSpec::GcpRouter(gcp::Router {
                    name: "t-router-0".to_string(),
                    network: Input::known("t-vpc"),
                    bgp: gcp::RouterBgp {
                        asn: Input::known("65000"),
                        advertise_mode: "DEFAULT".to_string(),
                    },
                }),
            )
            .await
            .unwrap();

        let self_link = vgw.outputs["self_link"].clone();
        let ip = address.outputs["address"].clone();
        let tunnel = ResourceSpec::GcpVpnTunnel(gcp::VpnTunnel {
            name: "t-vpn-tunnel-0".to_string(),
            ike_version: 1,
            peer_ip: Input::known("52.0.0.1"),
            shared_secret: Input::known("secret"),
            target_vpn_gateway: Input::known(self_link.as_str()),
            router: Input::known(router.id.as_str()),
        });
        let tunnel_key = ResourceKey::gcp("t-vpn-tunnel-0");

        provider
            .create(&ResourceKey::gcp("t-fr-esp"), &rule("t-fr-esp", &ip, &self_link, "ESP", None))
            .await
            .unwrap();
        provider
            .create(
                &ResourceKey::gcp("t-fr-udp500"),
                &rule("t-fr-udp500", &ip, &self_link, "UDP", Some("500")),
            )
            .await
            .unwrap();

        let err = provider.create(&tunnel_key, &tunnel).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));

        provider
            .create(
                &ResourceKey::gcp("t-fr-udp4500"),
                &rule("t-fr-udp4500", &ip, &self_link, "UDP", Some("4500")),
            )
            .await
            .unwrap();
        assert!(provider.create(&tunnel_key, &tunnel).await.is_ok());
    }

    #[tokio::test]
    async fn test_vpn_connection_tunnel_attributes() {
        let mut outputs = BTreeMap::new();
        let spec = ResourceSpec::AwsVpnConnection(VpnConnection {
            customer_gateway_id: Input::known("cgw-1"),
            vpn_gateway_id: Input::known("vgw-1"),
            connection_type: "ipsec.1".to_string(),
            static_routes_only: false,
            tags: BTreeMap::new(),
        });
        outputs.extend(
            generate_outputs(&ResourceKey::aws("t-vpn-conn"), &spec, &HashMap::new()).unwrap(),
        );

        for set in 0..VpnConnection::TUNNEL_COUNT {
            let tunnel = TunnelAttributes::for_set(set);
            let vgw: Ipv4Addr = outputs[&tunnel.vgw_inside_address()].parse().unwrap();
            let cgw: Ipv4Addr = outputs[&tunnel.cgw_inside_address()].parse().unwrap();
            assert_eq!((vgw.octets()[0], vgw.octets()[1]), (169, 254));
            assert_eq!(vgw.octets()[3] % 4, 1);
            assert_eq!(u32::from(cgw), u32::from(vgw) + 1);
            assert_eq!(outputs[&tunnel.preshared_key()].len(), 32);
        }
        assert_ne!(
            outputs["tunnel1_vgw_inside_address"],
            outputs["tunnel2_vgw_inside_address"]
        );
    }

    #[tokio::test]
    async fn test_unresolved_input_is_rejected() {
        let provider = SimulatedProvider::new();
        let spec = ResourceSpec::GcpVpnGateway(gcp::VpnGateway {
            name: "t-vgw".to_string(),
            network: Input::output(&ResourceKey::gcp("t-vpc"), attrs::ID),
        });
        let err = provider.create(&ResourceKey::gcp("t-vgw"), &spec).await.unwrap_err();
        assert!(matches!(err, ProviderError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_rejects_immutable_kind() {
        let provider = SimulatedProvider::new();
        let key = ResourceKey::gcp("t-vpc");
        let created = provider.create(&key, &network("t-vpc")).await.unwrap();

        let err = provider
            .update(&key, &created.id, &network("t-vpc"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let provider = SimulatedProvider::new();
        let key = ResourceKey::gcp("t-vpc");
        let created = provider.create(&key, &network("t-vpc")).await.unwrap();

        provider
            .delete(&key, ResourceKind::GcpNetwork, &created.id)
            .await
            .unwrap();
        provider
            .delete(&key, ResourceKind::GcpNetwork, &created.id)
            .await
            .unwrap();
        assert!(provider.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_refuses_referenced_target() {
        let provider = SimulatedProvider::new();
        let net_key = ResourceKey::gcp("t-vpc");
        let vgw_key = ResourceKey::gcp("t-vgw");
        let net = provider.create(&net_key, &network("t-vpc")).await.unwrap();
        let vgw = provider.create(&vgw_key, &gateway(&net.id)).await.unwrap();

        let err = provider
            .delete(&net_key, ResourceKind::GcpNetwork, &net.id)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProviderError::Conflict("gcp/t-vpc is still referenced by gcp/t-vgw".to_string())
        );
        assert!(provider.get(&net_key).await.is_some());

        provider
            .delete(&vgw_key, ResourceKind::GcpVpnGateway, &vgw.id)
            .await
            .unwrap();
        provider
            .delete(&net_key, ResourceKind::GcpNetwork, &net.id)
            .await
            .unwrap();
        assert!(provider.is_empty().await);
    }

    #[tokio::test]
    async fn test_route_table_update_follows_new_table() {
        let provider = SimulatedProvider::new();
        let vpc = |cidr: &str| {
            ResourceSpec::AwsVpc(aws::Vpc {
                cidr_block: cidr.to_string(),
                enable_dns_support: true,
                enable_dns_hostnames: true,
                tags: Default::default(),
            })
        };
        let table = |id: &str| {
            ResourceSpec::AwsDefaultRouteTable(aws::DefaultRouteTable {
                default_route_table_id: Input::known(id),
                routes: Vec::new(),
                propagating_vgws: Vec::new(),
                tags: Default::default(),
            })
        };
        let old = provider
            .create(&ResourceKey::aws("t-vpc-old"), &vpc("10.0.0.0/22"))
            .await
            .unwrap();
        let new = provider
            .create(&ResourceKey::aws("t-vpc-new"), &vpc("10.0.8.0/22"))
            .await
            .unwrap();
        let old_table = old.outputs["default_route_table_id"].clone();
        let new_table = new.outputs["default_route_table_id"].clone();

        let key = ResourceKey::aws("t-rtb-default");
        let created = provider.create(&key, &table(&old_table)).await.unwrap();
        assert_eq!(created.id, old_table);

        let updated = provider
            .update(&key, &created.id, &table(&new_table))
            .await
            .unwrap();
        assert_eq!(updated.id, new_table);
        assert_eq!(provider.get(&key).await.unwrap().id, new_table);
    }

    #[tokio::test]
    async fn test_zero_fault_count_is_ignored() {
        let provider = SimulatedProvider::new();
        let key = ResourceKey::gcp("t-vpc");
        provider.inject_fault(&key, ProviderError::Transient("throttled".into()), 0);

        assert!(provider.create(&key, &network("t-vpc")).await.is_ok());
        assert_eq!(provider.operation_count(), 1);
    }

    #[tokio::test]
    async fn test_injected_fault_expires() {
        let provider = SimulatedProvider::new();
        let key = ResourceKey::gcp("t-vpc");
        provider.inject_fault(&key, ProviderError::Transient("throttled".into()), 2);

        for _ in 0..2 {
            let err = provider.create(&key, &network("t-vpc")).await.unwrap_err();
            assert!(err.is_transient());
        }
        assert!(provider.create(&key, &network("t-vpc")).await.is_ok());
        assert_eq!(provider.operation_count(), 1);
    }
}

//! Resource dependency graph.
//!
//! Edges come from two places: placeholders (a record reading another
//! record's attribute depends on it) and explicit ordering hints for
//! side effects that carry no attribute. The graph is sorted when it is
//! built, so a cycle or a dangling reference never reaches apply time.

use crate::{CoreError, Result};
use std::collections::{BTreeMap, BTreeSet};
use topology_api::{Cloud, ResourceKey, ResourceSpec};
use tracing::debug;

/// One declared record
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceNode {
    pub key: ResourceKey,
    pub spec: ResourceSpec,
    /// Ordering hints without an attribute reference
    pub depends_on: BTreeSet<ResourceKey>,
}

impl ResourceNode {
    pub fn new(key: ResourceKey, spec: ResourceSpec) -> Self {
        Self {
            key,
            spec,
            depends_on: BTreeSet::new(),
        }
    }

    pub fn depends_on(mut self, keys: impl IntoIterator<Item = ResourceKey>) -> Self {
        self.depends_on.extend(keys);
        self
    }

    /// Records that must exist before this one
    pub fn upstreams(&self) -> BTreeSet<ResourceKey> {
        let mut upstreams: BTreeSet<ResourceKey> = self
            .spec
            .references()
            .into_iter()
            .map(|r| r.resource.clone())
            .collect();
        upstreams.extend(self.depends_on.iter().cloned());
        upstreams
    }
}

/// Collects nodes in declaration order
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: BTreeMap<ResourceKey, ResourceNode>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a record, returning its key for downstream references
    pub fn add(&mut self, node: ResourceNode) -> Result<ResourceKey> {
        let key = node.key.clone();
        if node.spec.kind().cloud() != key.cloud {
            return Err(CoreError::InvalidConfiguration(format!(
                "{} declared with a {} record",
                key,
                node.spec.kind()
            )));
        }
        if self.nodes.contains_key(&key) {
            return Err(CoreError::DuplicateResource(key));
        }
        self.nodes.insert(key.clone(), node);
        Ok(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check references and sort
    pub fn build(self) -> Result<ResourceGraph> {
        let nodes = self.nodes;

        let mut upstreams: BTreeMap<ResourceKey, BTreeSet<ResourceKey>> = BTreeMap::new();
        let mut downstreams: BTreeMap<ResourceKey, BTreeSet<ResourceKey>> = nodes
            .keys()
            .map(|key| (key.clone(), BTreeSet::new()))
            .collect();

        for (key, node) in &nodes {
            let node_upstreams = node.upstreams();
            for upstream in &node_upstreams {
                let Some(dependents) = downstreams.get_mut(upstream) else {
                    return Err(CoreError::UnknownReference {
                        from: key.clone(),
                        to: upstream.clone(),
                    });
                };
                dependents.insert(key.clone());
            }
            upstreams.insert(key.clone(), node_upstreams);
        }

        let levels = sort_into_levels(&upstreams, &downstreams)?;
        let order: Vec<ResourceKey> = levels.iter().flatten().cloned().collect();

        debug!(
            "Built resource graph with {} nodes in {} levels",
            nodes.len(),
            levels.len()
        );

        Ok(ResourceGraph {
            nodes,
            upstreams,
            downstreams,
            order,
            levels,
        })
    }
}

/// Kahn's algorithm, grouping nodes whose upstreams all sit in earlier
/// levels. Ties break on key order so the result is deterministic.
fn sort_into_levels(
    upstreams: &BTreeMap<ResourceKey, BTreeSet<ResourceKey>>,
    downstreams: &BTreeMap<ResourceKey, BTreeSet<ResourceKey>>,
) -> Result<Vec<Vec<ResourceKey>>> {
    let mut pending: BTreeMap<&ResourceKey, usize> = upstreams
        .iter()
        .map(|(key, ups)| (key, ups.len()))
        .collect();

    let mut levels = Vec::new();
    let mut ready: Vec<ResourceKey> = pending
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(key, _)| (*key).clone())
        .collect();

    while !ready.is_empty() {
        for key in &ready {
            pending.remove(key);
        }
        let mut next = BTreeSet::new();
        for key in &ready {
            for dependent in &downstreams[key] {
                if let Some(count) = pending.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        next.insert(dependent.clone());
                    }
                }
            }
        }
        levels.push(ready);
        ready = next.into_iter().collect();
    }

    if !pending.is_empty() {
        let stuck: BTreeSet<&ResourceKey> = pending.into_keys().collect();
        return Err(CoreError::DependencyCycle(
            cycle_members(stuck, downstreams).into_iter().cloned().collect(),
        ));
    }
    Ok(levels)
}

/// Narrow the nodes Kahn's pass could not place down to those on a cycle.
///
/// Everything left over is either on a cycle or downstream of one. Nodes
/// with no dependent left in the set cannot close a cycle, so they are
/// peeled off until none remain.
fn cycle_members<'a>(
    mut stuck: BTreeSet<&'a ResourceKey>,
    downstreams: &BTreeMap<ResourceKey, BTreeSet<ResourceKey>>,
) -> BTreeSet<&'a ResourceKey> {
    loop {
        let sinks: Vec<&ResourceKey> = stuck
            .iter()
            .copied()
            .filter(|key| {
                downstreams
                    .get(*key)
                    .map_or(true, |dependents| !dependents.iter().any(|d| stuck.contains(d)))
            })
            .collect();
        if sinks.is_empty() {
            return stuck;
        }
        for key in sinks {
            stuck.remove(key);
        }
    }
}

/// Validated, topologically sorted graph
#[derive(Clone, Debug)]
pub struct ResourceGraph {
    nodes: BTreeMap<ResourceKey, ResourceNode>,
    upstreams: BTreeMap<ResourceKey, BTreeSet<ResourceKey>>,
    downstreams: BTreeMap<ResourceKey, BTreeSet<ResourceKey>>,
    order: Vec<ResourceKey>,
    levels: Vec<Vec<ResourceKey>>,
}

impl ResourceGraph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&ResourceNode> {
        self.nodes.get(key)
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Keys in an order where every upstream precedes its dependents
    pub fn topological_order(&self) -> &[ResourceKey] {
        &self.order
    }

    /// Nodes grouped by dependency depth; nodes in one level are independent
    pub fn levels(&self) -> &[Vec<ResourceKey>] {
        &self.levels
    }

    /// Nodes in topological order
    pub fn iter(&self) -> impl Iterator<Item = &ResourceNode> {
        self.order.iter().map(move |key| &self.nodes[key])
    }

    pub fn nodes_in(&self, cloud: Cloud) -> impl Iterator<Item = &ResourceNode> {
        self.iter().filter(move |node| node.key.cloud == cloud)
    }

    /// Direct upstreams of a node
    pub fn upstreams(&self, key: &ResourceKey) -> Option<&BTreeSet<ResourceKey>> {
        self.upstreams.get(key)
    }

    /// Direct dependents of a node
    pub fn dependents(&self, key: &ResourceKey) -> Option<&BTreeSet<ResourceKey>> {
        self.downstreams.get(key)
    }

    /// Every node reachable downstream of `key`
    pub fn transitive_dependents(&self, key: &ResourceKey) -> BTreeSet<ResourceKey> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&ResourceKey> = vec![key];
        while let Some(current) = stack.pop() {
            if let Some(dependents) = self.downstreams.get(current) {
                for dependent in dependents {
                    if seen.insert(dependent.clone()) {
                        stack.push(dependent);
                    }
                }
            }
        }
        seen
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.upstreams.values().map(BTreeSet::len).sum()
    }

    /// Rebuild the graph without the given nodes. Fails if a remaining node
    /// still references a removed one.
    pub fn without(&self, removed: &BTreeSet<ResourceKey>) -> Result<ResourceGraph> {
        let mut builder = GraphBuilder::new();
        for node in self.iter().filter(|node| !removed.contains(&node.key)) {
            builder.add(node.clone())?;
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topology_api::{aws, gcp, attrs, Input};

    fn vpc() -> ResourceNode {
        ResourceNode::new(
            ResourceKey::aws("t-vpc"),
            ResourceSpec::AwsVpc(aws::Vpc {
                cidr_block: "10.0.0.0/22".to_string(),
                enable_dns_support: true,
                enable_dns_hostnames: true,
                tags: Default::default(),
            }),
        )
    }

    fn subnet(name: &str, vpc: &ResourceKey) -> ResourceNode {
        ResourceNode::new(
            ResourceKey::aws(name),
            ResourceSpec::AwsSubnet(aws::Subnet {
                vpc_id: Input::output(vpc, attrs::ID),
                cidr_block: "10.0.0.0/24".to_string(),
                map_public_ip_on_launch: true,
                tags: Default::default(),
            }),
        )
    }

    fn address(name: &str) -> ResourceNode {
        ResourceNode::new(
            ResourceKey::gcp(name),
            ResourceSpec::GcpAddress(gcp::Address {
                name: name.to_string(),
            }),
        )
    }

    #[test]
    fn test_reference_orders_upstream_first() {
        let mut builder = GraphBuilder::new();
        // Declared out of order on purpose
        builder.add(subnet("t-subnet-0", &ResourceKey::aws("t-vpc"))).unwrap();
        let vpc_key = builder.add(vpc()).unwrap();
        let graph = builder.build().unwrap();

        assert_eq!(graph.topological_order()[0], vpc_key);
        assert_eq!(graph.levels().len(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut builder = GraphBuilder::new();
        builder.add(vpc()).unwrap();
        assert!(matches!(
            builder.add(vpc()),
            Err(CoreError::DuplicateResource(_))
        ));
    }

    #[test]
    fn test_cloud_mismatch_rejected() {
        let mut node = vpc();
        node.key = ResourceKey::gcp("t-vpc");
        assert!(GraphBuilder::new().add(node).is_err());
    }

    #[test]
    fn test_unknown_reference_rejected() {
        let mut builder = GraphBuilder::new();
        builder.add(subnet("t-subnet-0", &ResourceKey::aws("missing"))).unwrap();
        match builder.build().unwrap_err() {
            CoreError::UnknownReference { from, to } => {
                assert_eq!(from, ResourceKey::aws("t-subnet-0"));
                assert_eq!(to, ResourceKey::aws("missing"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_cycle_detected_at_build() {
        let mut builder = GraphBuilder::new();
        builder
            .add(address("a").depends_on([ResourceKey::gcp("b")]))
            .unwrap();
        builder
            .add(address("b").depends_on([ResourceKey::gcp("a")]))
            .unwrap();
        builder.add(address("c")).unwrap();

        match builder.build().unwrap_err() {
            CoreError::DependencyCycle(keys) => {
                assert_eq!(keys, vec![ResourceKey::gcp("a"), ResourceKey::gcp("b")]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_cycle_error_names_only_members() {
        let mut builder = GraphBuilder::new();
        builder
            .add(address("a").depends_on([ResourceKey::gcp("b")]))
            .unwrap();
        builder
            .add(address("b").depends_on([ResourceKey::gcp("a")]))
            .unwrap();
        builder
            .add(address("c").depends_on([ResourceKey::gcp("b")]))
            .unwrap();
        builder
            .add(address("d").depends_on([ResourceKey::gcp("c")]))
            .unwrap();

        match builder.build().unwrap_err() {
            CoreError::DependencyCycle(keys) => {
                assert_eq!(keys, vec![ResourceKey::gcp("a"), ResourceKey::gcp("b")]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_explicit_hint_adds_edge() {
        let mut builder = GraphBuilder::new();
        builder.add(address("first")).unwrap();
        builder
            .add(address("second").depends_on([ResourceKey::gcp("first")]))
            .unwrap();
        let graph = builder.build().unwrap();

        assert_eq!(
            graph.topological_order(),
            &[ResourceKey::gcp("first"), ResourceKey::gcp("second")]
        );
    }

    #[test]
    fn test_independent_nodes_share_a_level() {
        let mut builder = GraphBuilder::new();
        let vpc_key = builder.add(vpc()).unwrap();
        builder.add(subnet("t-subnet-0", &vpc_key)).unwrap();
        builder.add(subnet("t-subnet-1", &vpc_key)).unwrap();
        let graph = builder.build().unwrap();

        assert_eq!(graph.levels()[1].len(), 2);
        assert_eq!(graph.transitive_dependents(&vpc_key).len(), 2);
    }

    #[test]
    fn test_without_rejects_dangling() {
        let mut builder = GraphBuilder::new();
        let vpc_key = builder.add(vpc()).unwrap();
        let subnet_key = builder.add(subnet("t-subnet-0", &vpc_key)).unwrap();
        let graph = builder.build().unwrap();

        let pruned = graph.without(&BTreeSet::from([subnet_key])).unwrap();
        assert_eq!(pruned.len(), 1);
        assert!(graph.without(&BTreeSet::from([vpc_key])).is_err());
    }
}

//! Diff planning between the desired graph and applied state.
//!
//! Every record in the graph gets an action. Inputs are resolved against
//! the outputs already in state; outputs of records that will be created or
//! replaced are unknown, so anything reading them is changed as well. A
//! record reading a replaced one is replaced too: it still points at the old
//! copy, which cannot be deleted while it does.
//!
//! Records in state but no longer declared are deleted, and replaced records
//! lose their old copy, all before anything is created and dependents first.

use crate::graph::ResourceGraph;
use crate::resolve::resolve_spec;
use crate::state::{fingerprint, StateSnapshot};
use crate::Result;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use topology_api::{ResourceKey, ResourceKind};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Create,
    /// In-place change of a mutable record
    Update,
    /// Delete then create under the same name
    Replace,
    Delete,
    NoOp,
}

impl Action {
    pub fn symbol(&self) -> &'static str {
        match self {
            Action::Create => "+",
            Action::Update => "~",
            Action::Replace => "-/+",
            Action::Delete => "-",
            Action::NoOp => "=",
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, Action::NoOp)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Replace => "replace",
            Action::Delete => "delete",
            Action::NoOp => "no-op",
        };
        write!(f, "{}", name)
    }
}

/// Planned action for one record
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Change {
    pub key: ResourceKey,
    pub kind: ResourceKind,
    pub action: Action,
    /// Short explanation, empty for no-ops
    pub reason: String,
}

impl Change {
    fn new(
        key: &ResourceKey,
        kind: ResourceKind,
        action: Action,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            key: key.clone(),
            kind,
            action,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>3} {} ({})",
            self.action.symbol(),
            self.key,
            self.kind.type_token()
        )?;
        if !self.reason.is_empty() {
            write!(f, ": {}", self.reason)?;
        }
        Ok(())
    }
}

/// Ordered set of changes
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Plan {
    /// Deletions, every record after all of its dependents
    pub deletes: Vec<Change>,
    /// Old copies to remove before the levels run: every deletion plus the
    /// delete half of each replacement, dependents first
    pub teardown: Vec<Change>,
    /// Remaining actions grouped by graph level
    pub levels: Vec<Vec<Change>>,
}

impl Plan {
    /// Diff the desired graph against applied state
    pub fn build(graph: &ResourceGraph, state: &StateSnapshot) -> Result<Plan> {
        let mut unknown: BTreeSet<ResourceKey> = BTreeSet::new();
        let mut replaced: BTreeMap<ResourceKey, String> = BTreeMap::new();
        let mut levels = Vec::with_capacity(graph.levels().len());

        for level in graph.levels() {
            let mut changes = Vec::with_capacity(level.len());
            for key in level {
                let Some(node) = graph.get(key) else {
                    continue;
                };
                let kind = node.spec.kind();

                let Some(current) = state.get(key) else {
                    unknown.insert(key.clone());
                    changes.push(Change::new(key, kind, Action::Create, "not in state"));
                    continue;
                };

                let mut in_place = kind.is_mutable() && current.kind == kind;
                let reason = if current.kind != kind {
                    Some(format!("kind changed from {}", current.kind))
                } else {
                    let (resolved, pending) =
                        resolve_spec(&node.spec, state, |k| unknown.contains(k));
                    if let Some(output) = pending
                        .iter()
                        .find(|output| replaced.contains_key(&output.resource))
                    {
                        in_place = false;
                        Some(format!(
                            "reads {} of replaced {}",
                            output.attribute, output.resource
                        ))
                    } else if let Some(output) = pending.first() {
                        Some(format!("reads unknown {}", output))
                    } else if fingerprint(&resolved)? != current.fingerprint {
                        Some("inputs changed".to_string())
                    } else {
                        None
                    }
                };

                let change = match reason {
                    None => Change::new(key, kind, Action::NoOp, ""),
                    Some(reason) if in_place => Change::new(key, kind, Action::Update, reason),
                    Some(reason) => {
                        unknown.insert(key.clone());
                        replaced.insert(key.clone(), reason.clone());
                        Change::new(key, kind, Action::Replace, reason)
                    }
                };
                debug!("Planned {} for {}", change.action, key);
                changes.push(change);
            }
            levels.push(changes);
        }

        let removed: BTreeSet<ResourceKey> = state
            .keys()
            .filter(|key| !graph.contains(key))
            .cloned()
            .collect();
        let doomed: BTreeSet<ResourceKey> =
            removed.iter().chain(replaced.keys()).cloned().collect();

        let mut deletes = Vec::with_capacity(removed.len());
        let mut teardown = Vec::with_capacity(doomed.len());
        for key in deletion_order(state, &doomed) {
            let Some(current) = state.get(&key) else {
                continue;
            };
            match replaced.get(&key) {
                Some(reason) => teardown.push(Change::new(
                    &key,
                    current.kind,
                    Action::Replace,
                    reason.clone(),
                )),
                None => {
                    let change =
                        Change::new(&key, current.kind, Action::Delete, "no longer declared");
                    deletes.push(change.clone());
                    teardown.push(change);
                }
            }
        }

        Ok(Plan {
            deletes,
            teardown,
            levels,
        })
    }

    /// Delete everything in state
    pub fn teardown(state: &StateSnapshot) -> Plan {
        let all: BTreeSet<ResourceKey> = state.keys().cloned().collect();
        let deletes: Vec<Change> = deletion_order(state, &all)
            .into_iter()
            .filter_map(|key| {
                let current = state.get(&key)?;
                Some(Change::new(&key, current.kind, Action::Delete, "teardown"))
            })
            .collect();
        Plan {
            teardown: deletes.clone(),
            deletes,
            levels: Vec::new(),
        }
    }

    /// Every change in execution order
    pub fn changes(&self) -> impl Iterator<Item = &Change> {
        self.deletes.iter().chain(self.levels.iter().flatten())
    }

    pub fn change(&self, key: &ResourceKey) -> Option<&Change> {
        self.changes().find(|change| &change.key == key)
    }

    pub fn has_changes(&self) -> bool {
        self.changes().any(|change| change.action.is_change())
    }

    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for change in self.changes() {
            match change.action {
                Action::Create => summary.create += 1,
                Action::Update => summary.update += 1,
                Action::Replace => summary.replace += 1,
                Action::Delete => summary.delete += 1,
                Action::NoOp => summary.unchanged += 1,
            }
        }
        summary
    }

    /// True when nothing already applied survives the plan, the signature
    /// of a base name change
    pub fn replaces_everything(&self) -> bool {
        let survivors = self
            .levels
            .iter()
            .flatten()
            .filter(|change| matches!(change.action, Action::NoOp | Action::Update))
            .count();
        let replaced = self
            .changes()
            .filter(|change| matches!(change.action, Action::Delete | Action::Replace))
            .count();
        survivors == 0 && replaced > 0
    }
}

/// Order keys so that every record comes after each record depending on it
fn deletion_order(state: &StateSnapshot, keys: &BTreeSet<ResourceKey>) -> Vec<ResourceKey> {
    // remaining dependents of each key within the deleted set
    let mut dependents: BTreeMap<&ResourceKey, usize> = keys.iter().map(|key| (key, 0)).collect();
    for key in keys {
        if let Some(current) = state.get(key) {
            for upstream in &current.dependencies {
                if let Some(count) = dependents.get_mut(upstream) {
                    *count += 1;
                }
            }
        }
    }

    let mut order = Vec::with_capacity(keys.len());
    while !dependents.is_empty() {
        let ready: Vec<&ResourceKey> = dependents
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(key, _)| *key)
            .collect();

        // State written by hand can contain a cycle; fall back to key order
        let ready = if ready.is_empty() {
            dependents.keys().copied().collect()
        } else {
            ready
        };

        for key in ready {
            dependents.remove(key);
            if let Some(current) = state.get(key) {
                for upstream in &current.dependencies {
                    if let Some(count) = dependents.get_mut(upstream) {
                        *count = count.saturating_sub(1);
                    }
                }
            }
            order.push(key.clone());
        }
    }
    order
}

/// Counts of planned actions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub delete: usize,
    pub unchanged: usize,
}

impl PlanSummary {
    /// True when applying would issue no operation
    pub fn is_empty(&self) -> bool {
        self.create + self.update + self.replace + self.delete == 0
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to replace, {} to delete, {} unchanged",
            self.create, self.update, self.replace, self.delete, self.unchanged
        )
    }
}

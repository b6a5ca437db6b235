//! Applied resource state

use crate::resolve::OutputSource;
use crate::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use topology_api::{attrs, ResourceKey, ResourceKind, ResourceSpec};
use tracing::debug;

/// What the provider holds for one record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub key: ResourceKey,
    pub kind: ResourceKind,
    /// Provider identifier
    pub id: String,
    /// Fully resolved payload last submitted
    pub inputs: serde_json::Value,
    /// SHA-256 of `inputs`
    pub fingerprint: String,
    /// Attributes reported by the provider, including generated ones
    pub outputs: BTreeMap<String, String>,
    /// Upstreams at apply time, used to order deletion
    pub dependencies: BTreeSet<ResourceKey>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    /// Attribute value; `id` is always available
    pub fn output(&self, attribute: &str) -> Option<&str> {
        if attribute == attrs::ID {
            return Some(&self.id);
        }
        self.outputs.get(attribute).map(String::as_str)
    }
}

/// SHA-256 over the canonical JSON payload of a resolved record
pub fn fingerprint(spec: &ResourceSpec) -> Result<String> {
    let payload = serde_json::to_vec(&spec.payload()?)?;
    Ok(hex::encode(Sha256::digest(&payload)))
}

/// Point-in-time copy of the store
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Written as a list; each state carries its own key
    #[serde(with = "resource_list")]
    pub resources: BTreeMap<ResourceKey, ResourceState>,
}

mod resource_list {
    use super::ResourceState;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;
    use topology_api::ResourceKey;

    pub fn serialize<S>(
        resources: &BTreeMap<ResourceKey, ResourceState>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(resources.values())
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<BTreeMap<ResourceKey, ResourceState>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let states = Vec::<ResourceState>::deserialize(deserializer)?;
        Ok(states
            .into_iter()
            .map(|state| (state.key.clone(), state))
            .collect())
    }
}

impl StateSnapshot {
    pub fn get(&self, key: &ResourceKey) -> Option<&ResourceState> {
        self.resources.get(key)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ResourceKey> {
        self.resources.keys()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| state_io(path, source))?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|source| state_io(path, source))?;
        debug!("Wrote {} resource states to {}", self.len(), path.display());
        Ok(())
    }
}

fn state_io(path: &Path, source: std::io::Error) -> CoreError {
    CoreError::StateIo {
        path: path.display().to_string(),
        source,
    }
}

impl OutputSource for StateSnapshot {
    fn output(&self, resource: &ResourceKey, attribute: &str) -> Option<&str> {
        self.resources.get(resource)?.output(attribute)
    }
}

/// StateStore holds the state of every applied record.
///
/// Shared by concurrent apply tasks; each task records its own result.
pub struct StateStore {
    resources: Arc<RwLock<HashMap<ResourceKey, ResourceState>>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            resources: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn from_snapshot(snapshot: StateSnapshot) -> Self {
        Self {
            resources: Arc::new(RwLock::new(snapshot.resources.into_iter().collect())),
        }
    }

    /// Record or replace the state of a resource
    pub async fn record(&self, state: ResourceState) {
        let key = state.key.clone();
        let mut resources = self.resources.write().await;
        resources.insert(key.clone(), state);
        debug!("Recorded state for {}", key);
    }

    pub async fn get(&self, key: &ResourceKey) -> Result<ResourceState> {
        let resources = self.resources.read().await;
        resources
            .get(key)
            .cloned()
            .ok_or_else(|| CoreError::ResourceNotFound(key.clone()))
    }

    pub async fn remove(&self, key: &ResourceKey) -> Option<ResourceState> {
        let mut resources = self.resources.write().await;
        let removed = resources.remove(key);
        debug!("Removed state for {}", key);
        removed
    }

    pub async fn snapshot(&self) -> StateSnapshot {
        let resources = self.resources.read().await;
        StateSnapshot {
            resources: resources
                .iter()
                .map(|(key, state)| (key.clone(), state.clone()))
                .collect(),
        }
    }

    pub async fn len(&self) -> usize {
        let resources = self.resources.read().await;
        resources.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

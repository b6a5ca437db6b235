//! Apply a topology against a provider.
//!
//! Deletions run first, dependents before their upstreams; a replaced
//! record loses its old copy in this pass too. The remaining changes run
//! level by level: every record in a level has its upstreams applied
//! already, so a level runs concurrently. Each completed operation
//! is recorded in state at once, which lets a failed apply be rerun and
//! pick up where it stopped.

use crate::metrics::EngineMetrics;
use crate::policy::RetryPolicy;
use crate::provider::{Provider, ProviderError, ProviderResource};
use crate::{EngineError, Result};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use topology_api::{ResourceKey, ResourceKind, ResourceSpec};
use topology_core::state::fingerprint;
use topology_core::{
    resolve_spec, Action, Change, CoreError, Plan, ResolvedExports, ResourceState, StateStore,
    Topology,
};
use tracing::{debug, error, info, warn};

/// Outcome of a successful apply
#[derive(Clone, Debug)]
pub struct ApplyReport {
    pub plan: Plan,
    pub exports: ResolvedExports,
}

/// Single provider call, retried as a unit
enum ProviderCall<'a> {
    Create(&'a ResourceSpec),
    Update(&'a str, &'a ResourceSpec),
    Delete(ResourceKind, &'a str),
}

impl ProviderCall<'_> {
    fn action(&self) -> &'static str {
        match self {
            ProviderCall::Create(_) => "create",
            ProviderCall::Update(..) => "update",
            ProviderCall::Delete(..) => "delete",
        }
    }
}

/// Reconciler drives a provider towards a described topology
pub struct Reconciler {
    provider: Arc<dyn Provider>,
    state: Arc<StateStore>,
    retry: RetryPolicy,
    metrics: EngineMetrics,
}

impl Reconciler {
    pub fn new(provider: Arc<dyn Provider>, state: Arc<StateStore>) -> Result<Self> {
        Ok(Self {
            provider,
            state,
            retry: RetryPolicy::default(),
            metrics: EngineMetrics::new()?,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Diff the topology against the current state
    pub async fn plan(&self, topology: &Topology) -> Result<Plan> {
        let snapshot = self.state.snapshot().await;
        Ok(Plan::build(&topology.graph, &snapshot)?)
    }

    /// Bring the provider in line with the topology and resolve its exports
    pub async fn apply(&self, topology: &Topology) -> Result<ApplyReport> {
        let timer = self.metrics.apply_duration_seconds.start_timer();
        let plan = self.plan(topology).await?;

        if plan.replaces_everything() {
            warn!(
                "Plan replaces every applied resource ({}); was the base name changed?",
                plan.summary()
            );
        }
        info!(
            "Applying plan against {} provider: {}",
            self.provider.name(),
            plan.summary()
        );

        for change in &plan.teardown {
            self.delete(change).await?;
        }

        for (depth, level) in plan.levels.iter().enumerate() {
            let pending: Vec<&Change> = level.iter().filter(|c| c.action.is_change()).collect();
            if pending.is_empty() {
                continue;
            }
            debug!("Applying level {} with {} changes", depth, pending.len());

            let results = join_all(
                pending
                    .iter()
                    .map(|change| self.apply_change(topology, change)),
            )
            .await;

            let mut failures = results.into_iter().filter_map(|result| result.err());
            if let Some(first) = failures.next() {
                for other in failures {
                    error!("Apply failed: {}", other);
                }
                return Err(first);
            }
        }

        let snapshot = self.state.snapshot().await;
        let exports = topology.exports.resolve(&snapshot)?;
        timer.observe_duration();

        info!("Apply complete: {}", plan.summary());
        Ok(ApplyReport { plan, exports })
    }

    /// Delete every resource in state
    pub async fn destroy(&self) -> Result<Plan> {
        let snapshot = self.state.snapshot().await;
        let plan = Plan::teardown(&snapshot);
        info!("Destroying {} resources", plan.deletes.len());

        for change in &plan.deletes {
            self.delete(change).await?;
        }
        Ok(plan)
    }

    async fn delete(&self, change: &Change) -> Result<()> {
        let current = self.state.get(&change.key).await?;
        self.call(change, ProviderCall::Delete(current.kind, &current.id))
            .await?;
        self.state.remove(&change.key).await;
        Ok(())
    }

    async fn apply_change(&self, topology: &Topology, change: &Change) -> Result<()> {
        let node = topology
            .graph
            .get(&change.key)
            .ok_or_else(|| CoreError::ResourceNotFound(change.key.clone()))?;

        let snapshot = self.state.snapshot().await;
        let (resolved, pending) = resolve_spec(&node.spec, &snapshot, |_| false);
        if !pending.is_empty() {
            let pending: Vec<String> = pending.iter().map(ToString::to_string).collect();
            return Err(EngineError::Unresolved {
                key: change.key.clone(),
                pending: pending.join(", "),
            });
        }

        let previous = snapshot.get(&change.key);
        let created_at = match change.action {
            Action::Update => previous.map(|state| state.created_at),
            _ => None,
        };

        let resource = match change.action {
            Action::Create => self.call_create(change, &resolved).await?,
            Action::Update => {
                let current =
                    previous.ok_or_else(|| CoreError::ResourceNotFound(change.key.clone()))?;
                self.call(change, ProviderCall::Update(&current.id, &resolved))
                    .await?
                    .unwrap_or_default()
            }
            // The old copy went with the teardown pass
            Action::Replace => self.call_create(change, &resolved).await?,
            Action::Delete | Action::NoOp => return Ok(()),
        };

        let now = Utc::now();
        self.state
            .record(ResourceState {
                key: change.key.clone(),
                kind: change.kind,
                id: resource.id,
                inputs: resolved.payload()?,
                fingerprint: fingerprint(&resolved)?,
                outputs: resource.outputs,
                dependencies: node.upstreams(),
                created_at: created_at.unwrap_or(now),
                updated_at: now,
            })
            .await;
        Ok(())
    }

    async fn call_create(&self, change: &Change, spec: &ResourceSpec) -> Result<ProviderResource> {
        Ok(self
            .call(change, ProviderCall::Create(spec))
            .await?
            .unwrap_or_default())
    }

    /// Issue a provider call, retrying transient failures
    async fn call(
        &self,
        change: &Change,
        call: ProviderCall<'_>,
    ) -> Result<Option<ProviderResource>> {
        let key = &change.key;
        let mut retries = 0;
        loop {
            let result = match &call {
                ProviderCall::Create(spec) => self.provider.create(key, spec).await.map(Some),
                ProviderCall::Update(id, spec) => {
                    self.provider.update(key, id, spec).await.map(Some)
                }
                ProviderCall::Delete(kind, id) => {
                    self.provider.delete(key, *kind, id).await.map(|_| None)
                }
            };

            match result {
                Ok(resource) => {
                    self.metrics
                        .operations_total
                        .with_label_values(&[change.kind.type_token(), call.action()])
                        .inc();
                    debug!("{} {} succeeded", call.action(), key);
                    return Ok(resource);
                }
                Err(error) => {
                    self.metrics
                        .provider_errors_total
                        .with_label_values(&[error.label()])
                        .inc();
                    if !self.retry.should_retry(&error, retries) {
                        return Err(provider_failure(key, change.action, error));
                    }
                    let backoff = self.retry.backoff_duration(retries);
                    warn!(
                        "{} {} failed: {}; retrying in {:?}",
                        call.action(),
                        key,
                        error,
                        backoff
                    );
                    self.metrics.retries_total.inc();
                    tokio::time::sleep(backoff).await;
                    retries += 1;
                }
            }
        }
    }
}

fn provider_failure(key: &ResourceKey, action: Action, source: ProviderError) -> EngineError {
    EngineError::Provider {
        key: key.clone(),
        action,
        source,
    }
}

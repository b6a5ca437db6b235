//! Prometheus metrics for provider operations

use crate::Result;
use prometheus::{Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Prometheus metrics collector for reconciliation
#[derive(Clone)]
pub struct EngineMetrics {
    /// Provider operations by resource kind and action
    pub operations_total: CounterVec,
    /// Provider errors by error kind
    pub provider_errors_total: CounterVec,
    /// Retried provider calls
    pub retries_total: Counter,
    /// Duration of a whole apply
    pub apply_duration_seconds: Histogram,
    /// Prometheus registry for metrics
    pub registry: Arc<Registry>,
}

impl EngineMetrics {
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let operations_total = CounterVec::new(
            Opts::new("topology_operations_total", "Provider operations issued"),
            &["kind", "action"],
        )?;

        let provider_errors_total = CounterVec::new(
            Opts::new("topology_provider_errors_total", "Provider errors by kind"),
            &["error"],
        )?;

        let retries_total = Counter::new(
            "topology_retries_total",
            "Provider calls retried after a transient failure",
        )?;

        let apply_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "topology_apply_duration_seconds",
            "Duration of an apply in seconds",
        ))?;

        registry.register(Box::new(operations_total.clone()))?;
        registry.register(Box::new(provider_errors_total.clone()))?;
        registry.register(Box::new(retries_total.clone()))?;
        registry.register(Box::new(apply_duration_seconds.clone()))?;

        Ok(Self {
            operations_total,
            provider_errors_total,
            retries_total,
            apply_duration_seconds,
            registry,
        })
    }

    /// Gather all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Total operations recorded for one action across all kinds
    pub fn operations_for(&self, action: &str) -> f64 {
        self.registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == "topology_operations_total")
            .flat_map(|family| family.get_metric())
            .filter(|metric| {
                metric
                    .get_label()
                    .iter()
                    .any(|label| label.get_name() == "action" && label.get_value() == action)
            })
            .map(|metric| metric.get_counter().get_value())
            .sum()
    }
}

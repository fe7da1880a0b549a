//! Fixtures shared by the unit tests of this crate.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use healthmgr_adapters::{
    ClusterState, MetricsProvider, ProviderError, StateStore, StaticProvider,
};
use healthmgr_types::{ComponentMetrics, PackingPlan, Topology};

use crate::cache::{PackingPlanProvider, TopologyProvider};
use crate::sensors::{Sensor, SensorContext, COLLECTOR};
use crate::HealthError;

pub const JOB: &str = "word-count";

/// `sentence` spout, `bolt-1` with one instance, `bolt-2` with two.
pub fn word_count_state() -> ClusterState {
    ClusterState::new(
        Topology::new(JOB)
            .spout("sentence", 1)
            .bolt("bolt-1", 1)
            .bolt("bolt-2", 2),
        PackingPlan::new("plan")
            .container(1, &[("sentence", 1), ("bolt-1", 2), ("bolt-2", 3)])
            .container(2, &[("bolt-2", 4)]),
    )
}

/// Collector response holding one collector instance per value.
pub fn collector(key: &str, values: &[f64]) -> ComponentMetrics {
    values
        .iter()
        .enumerate()
        .fold(ComponentMetrics::builder(COLLECTOR), |b, (n, v)| {
            b.instance(format!("stmgr-{}", n + 1), |i| i.metric(key, *v))
        })
        .build()
}

/// Sensor context over a provider serving both metrics and state.
pub fn context<P>(provider: Arc<P>) -> SensorContext
where
    P: MetricsProvider + StateStore + 'static,
{
    let store: Arc<dyn StateStore> = provider.clone();
    SensorContext::new(
        Arc::new(TopologyProvider::new(store.clone(), JOB)),
        Arc::new(PackingPlanProvider::new(store, JOB)),
        provider,
    )
}

/// Static provider with per-key failures and delays.
pub struct ScriptedProvider {
    inner: StaticProvider,
    failures: BTreeMap<String, fn() -> ProviderError>,
    delays: BTreeMap<String, Duration>,
    pub calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(state: ClusterState) -> Self {
        Self {
            inner: StaticProvider::new(state),
            failures: BTreeMap::new(),
            delays: BTreeMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fail(mut self, key: &str, error: fn() -> ProviderError) -> Self {
        self.failures.insert(key.to_string(), error);
        self
    }

    pub fn delay(mut self, key: &str, delay: Duration) -> Self {
        self.delays.insert(key.to_string(), delay);
        self
    }
}

#[async_trait]
impl MetricsProvider for ScriptedProvider {
    async fn component_metrics(
        &self,
        metric: &str,
        window: Duration,
        component: &str,
    ) -> Result<BTreeMap<String, ComponentMetrics>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(metric) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(error) = self.failures.get(metric) {
            return Err(error());
        }
        self.inner.component_metrics(metric, window, component).await
    }
}

#[async_trait]
impl StateStore for ScriptedProvider {
    async fn topology(&self, job: &str) -> Result<Topology, ProviderError> {
        self.inner.topology(job).await
    }

    async fn packing_plan(&self, job: &str) -> Result<PackingPlan, ProviderError> {
        self.inner.packing_plan(job).await
    }
}

/// Sensor returning canned component metrics.
pub struct FixedSensor {
    metric: &'static str,
    data: BTreeMap<String, ComponentMetrics>,
    unavailable: bool,
    pub calls: AtomicUsize,
}

impl FixedSensor {
    pub fn new(metric: &'static str, components: Vec<ComponentMetrics>) -> Self {
        Self {
            metric,
            data: components.into_iter().map(|c| (c.name.clone(), c)).collect(),
            unavailable: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable(metric: &'static str) -> Self {
        Self {
            unavailable: true,
            ..Self::new(metric, Vec::new())
        }
    }
}

#[async_trait]
impl Sensor for FixedSensor {
    fn metric(&self) -> &'static str {
        self.metric
    }

    async fn get(
        &self,
        filter: &[&str],
    ) -> Result<BTreeMap<String, ComponentMetrics>, HealthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(HealthError::DataUnavailable {
                what: self.metric.to_string(),
                source: ProviderError::Unavailable("sensor offline".to_string()),
            });
        }
        Ok(self
            .data
            .iter()
            .filter(|(name, _)| filter.is_empty() || filter.contains(&name.as_str()))
            .map(|(name, metrics)| (name.clone(), metrics.clone()))
            .collect())
    }
}

/// Component whose instances report `(instance, [(metric, value)])`.
pub fn component(name: &str, instances: &[(&str, &[(&str, f64)])]) -> ComponentMetrics {
    instances
        .iter()
        .fold(ComponentMetrics::builder(name), |b, (id, metrics)| {
            b.instance(*id, |i| {
                metrics
                    .iter()
                    .fold(i, |i, (metric, value)| i.metric(*metric, *value))
            })
        })
        .build()
}

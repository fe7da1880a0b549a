//! In-memory provider backed by a cluster state snapshot.
//!
//! The state can be built in code or loaded from a JSON file, and replaced
//! while the provider is shared. Marking the provider unavailable makes every
//! call fail as if the backend were down.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use healthmgr_types::{ComponentMetrics, PackingPlan, Topology};

use crate::{MetricsProvider, ProviderError, StateStore};

/// Everything a provider knows about one running job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterState {
    pub topology: Topology,
    pub packing_plan: PackingPlan,

    /// Metric name -> component name -> reported values.
    #[serde(default)]
    pub metrics: BTreeMap<String, BTreeMap<String, ComponentMetrics>>,
}

impl ClusterState {
    pub fn new(topology: Topology, packing_plan: PackingPlan) -> Self {
        Self {
            topology,
            packing_plan,
            metrics: BTreeMap::new(),
        }
    }

    /// Register the values a component reports for `metric`.
    ///
    /// Registering the same component twice for a metric replaces the
    /// earlier values.
    pub fn metric(mut self, metric: impl Into<String>, values: ComponentMetrics) -> Self {
        self.metrics
            .entry(metric.into())
            .or_default()
            .insert(values.name.clone(), values);
        self
    }

    /// Parse a cluster state from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a cluster state from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ProviderError::NotFound(path.display().to_string()),
            _ => ProviderError::Io(e),
        })?;
        Self::from_json(&content)
    }
}

/// Provider serving a [`ClusterState`] from memory.
#[derive(Debug, Default)]
pub struct StaticProvider {
    state: RwLock<ClusterState>,
    unavailable: AtomicBool,
}

impl StaticProvider {
    pub fn new(state: ClusterState) -> Self {
        Self {
            state: RwLock::new(state),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Create a provider from a JSON state file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        ClusterState::from_file(path).map(Self::new)
    }

    /// Swap in a new cluster state.
    pub fn replace(&self, state: ClusterState) {
        *self.state.write() = state;
    }

    /// Get a copy of the current cluster state.
    pub fn state(&self) -> ClusterState {
        self.state.read().clone()
    }

    /// Simulate the backend going down (or coming back).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), ProviderError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable(
                "static provider marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl MetricsProvider for StaticProvider {
    async fn component_metrics(
        &self,
        metric: &str,
        _window: Duration,
        component: &str,
    ) -> Result<BTreeMap<String, ComponentMetrics>, ProviderError> {
        self.check_available()?;

        let state = self.state.read();
        let result = state
            .metrics
            .get(metric)
            .and_then(|components| components.get(component))
            .map(|values| BTreeMap::from([(component.to_string(), values.clone())]))
            .unwrap_or_default();
        Ok(result)
    }
}

#[async_trait]
impl StateStore for StaticProvider {
    async fn topology(&self, job: &str) -> Result<Topology, ProviderError> {
        self.check_available()?;

        let state = self.state.read();
        if state.topology.name != job {
            return Err(ProviderError::NotFound(format!("topology '{}'", job)));
        }
        Ok(state.topology.clone())
    }

    async fn packing_plan(&self, job: &str) -> Result<PackingPlan, ProviderError> {
        self.check_available()?;

        let state = self.state.read();
        if state.topology.name != job {
            return Err(ProviderError::NotFound(format!("packing plan of '{}'", job)));
        }
        Ok(state.packing_plan.clone())
    }
}

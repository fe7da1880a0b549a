//! Provider traits consumed by the health manager.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use healthmgr_types::{ComponentMetrics, PackingPlan, Topology};

use crate::ProviderError;

/// Source of windowed metric values.
///
/// Queries must be idempotent and free of side effects.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Fetch `metric` aggregated over the last `window`, as reported by the
    /// instances of `component`.
    ///
    /// The result maps component name to the metrics of its reporting
    /// instances. A metric nobody reported yields an empty map or a
    /// component with no instances.
    async fn component_metrics(
        &self,
        metric: &str,
        window: Duration,
        component: &str,
    ) -> Result<BTreeMap<String, ComponentMetrics>, ProviderError>;
}

/// Backing store for the logical topology and packing plan of a job.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn topology(&self, job: &str) -> Result<Topology, ProviderError>;

    async fn packing_plan(&self, job: &str) -> Result<PackingPlan, ProviderError>;
}

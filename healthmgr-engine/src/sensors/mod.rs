//! Sensors fetch one metric for the bolts of the monitored job.
//!
//! Most metrics are not reported by the instances themselves but by the
//! collector process co-located with them (`__stmgr__`). A collector query is
//! made per instance with a key embedding the instance id, and must come back
//! with exactly one collector.

mod back_pressure;
mod buffer_size;
mod execute_count;

pub use back_pressure::BackPressureSensor;
pub use buffer_size::BufferSizeSensor;
pub use execute_count::ExecuteCountSensor;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use healthmgr_adapters::MetricsProvider;
use healthmgr_types::{ComponentMetrics, InstanceMetric};
use tracing::{debug, warn};

use crate::cache::{PackingPlanProvider, TopologyProvider};
use crate::HealthError;

/// Role of the process reporting per-instance metrics.
pub const COLLECTOR: &str = "__stmgr__";

/// Milliseconds an instance spent throttled by back pressure.
pub const BACK_PRESSURE: &str = "__time_spent_back_pressure_by_compid/";

/// Bytes buffered for an instance by its collector.
pub const BUFFER_SIZE: &str = "__connection_buffer_by_instanceid/";
pub const BUFFER_SIZE_SUFFIX: &str = "/bytes";

/// Tuples executed by an instance.
pub const EXECUTE_COUNT: &str = "__execute-count/default";

/// A source of one metric for the bolts of the job.
#[async_trait]
pub trait Sensor: Send + Sync {
    /// Name the metric is stored under in returned instances.
    fn metric(&self) -> &'static str;

    /// Fetch the metric for the bolts named in `filter`, or all bolts when
    /// `filter` is empty.
    ///
    /// Returns component name to metrics. Instances whose data could not be
    /// fetched are left out.
    async fn get(&self, filter: &[&str]) -> Result<BTreeMap<String, ComponentMetrics>, HealthError>;
}

/// Query parameters shared by all sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorConfig {
    /// Aggregation window of every metric query.
    pub window: Duration,
    /// Upper bound of a single provider call.
    pub call_timeout: Duration,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            call_timeout: Duration::from_secs(10),
        }
    }
}

/// Everything a sensor needs to resolve components and query metrics.
#[derive(Clone)]
pub struct SensorContext {
    pub topology: Arc<TopologyProvider>,
    pub packing: Arc<PackingPlanProvider>,
    pub metrics: Arc<dyn MetricsProvider>,
    pub config: SensorConfig,
}

impl SensorContext {
    pub fn new(
        topology: Arc<TopologyProvider>,
        packing: Arc<PackingPlanProvider>,
        metrics: Arc<dyn MetricsProvider>,
    ) -> Self {
        Self {
            topology,
            packing,
            metrics,
            config: SensorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SensorConfig) -> Self {
        self.config = config;
        self
    }

    /// Bolts of the job restricted to `filter` (empty means all).
    pub async fn components(&self, filter: &[&str]) -> Result<Vec<String>, HealthError> {
        let bolts = self
            .topology
            .bolt_names()
            .await
            .map_err(|e| HealthError::unavailable("topology", e))?;

        if filter.is_empty() {
            return Ok(bolts);
        }
        Ok(bolts
            .into_iter()
            .filter(|bolt| filter.contains(&bolt.as_str()))
            .collect())
    }

    /// Instance ids of a component according to the packing plan.
    pub async fn instances(&self, component: &str) -> Result<Vec<String>, HealthError> {
        self.packing
            .instance_names(component)
            .await
            .map_err(|e| HealthError::unavailable("packing plan", e))
    }

    /// Run one bounded provider query.
    ///
    /// `Ok(None)` means this query failed and its data should be skipped.
    /// An unreachable provider fails the whole sensor call.
    pub async fn query(
        &self,
        metric: &str,
        component: &str,
    ) -> Result<Option<BTreeMap<String, ComponentMetrics>>, HealthError> {
        let call = self
            .metrics
            .component_metrics(metric, self.config.window, component);

        match tokio::time::timeout(self.config.call_timeout, call).await {
            Ok(Ok(result)) => Ok(Some(result)),
            Ok(Err(e)) if e.is_unreachable() => {
                Err(HealthError::unavailable(format!("metric '{}'", metric), e))
            }
            Ok(Err(e)) => {
                warn!(metric, component, error = %e, "metric query failed, skipping");
                Ok(None)
            }
            Err(_) => {
                warn!(
                    metric,
                    component,
                    timeout = ?self.config.call_timeout,
                    "metric query timed out, skipping"
                );
                Ok(None)
            }
        }
    }

    /// Value the collector reports under `key` for one instance.
    ///
    /// `Ok(None)` when the value is missing or unusable.
    pub async fn collector_value(
        &self,
        component: &str,
        instance: &str,
        key: &str,
    ) -> Result<Option<f64>, HealthError> {
        let mut result = match self.query(key, COLLECTOR).await? {
            Some(result) => result,
            None => return Ok(None),
        };

        let collector = match result.remove(COLLECTOR) {
            Some(collector) => collector,
            None => {
                warn!(component, instance, key, "no collector data, skipping instance");
                return Ok(None);
            }
        };

        if collector.instance_count() != 1 {
            return Err(HealthError::UnexpectedResultCount {
                component: component.to_string(),
                instance: instance.to_string(),
                count: collector.instance_count(),
            });
        }

        let reported = collector.iter().next().and_then(|c| c.get(key));
        match reported {
            Some(value) if value.is_finite() => Ok(Some(value)),
            Some(value) => {
                warn!(
                    component,
                    instance,
                    key,
                    value,
                    "non-finite collector value, skipping instance"
                );
                Ok(None)
            }
            None => {
                warn!(
                    component,
                    instance,
                    key,
                    "collector did not report metric, skipping instance"
                );
                Ok(None)
            }
        }
    }

    /// Query the collector once per instance of every selected bolt.
    ///
    /// `key` builds the query key from an instance id; `convert` maps the
    /// reported value before it is stored under `stored_as`.
    pub async fn collect_per_instance<K, C>(
        &self,
        filter: &[&str],
        stored_as: &str,
        key: K,
        convert: C,
    ) -> Result<BTreeMap<String, ComponentMetrics>, HealthError>
    where
        K: Fn(&str) -> String + Send + Sync,
        C: Fn(f64) -> f64 + Send + Sync,
    {
        let mut result = BTreeMap::new();

        for component in self.components(filter).await? {
            let mut metrics = ComponentMetrics::new(component.clone());

            for instance in self.instances(&component).await? {
                let query_key = key(&instance);
                let value = self
                    .collector_value(&component, &instance, &query_key)
                    .await?;
                if let Some(value) = value {
                    metrics.insert(InstanceMetric::with_metric(
                        instance.clone(),
                        stored_as,
                        convert(value),
                    ));
                }
            }

            debug!(
                component = %component,
                metric = stored_as,
                instances = metrics.instance_count(),
                "collected metric"
            );
            result.insert(component, metrics);
        }

        Ok(result)
    }
}

//! Tracker adapter using the tracker REST API.
//!
//! The tracker exposes the logical plan, the packing plan and windowed
//! metrics of every running job. Responses are wrapped in a
//! `{"status": ..., "result": ...}` envelope.
//!
//! ## Endpoints Used
//!
//! - `/topologies/logicalplan` - spouts and bolts of a job
//! - `/topologies/packingplan` - container placement of every instance
//! - `/topologies/metrics` - metric values per instance over an interval
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use healthmgr_adapters::tracker::TrackerClient;
//! use healthmgr_adapters::{MetricsProvider, StateStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tracker = TrackerClient::builder()
//!         .endpoint("http://localhost:8888")
//!         .cluster("local")
//!         .environ("default")
//!         .build()?;
//!
//!     let topology = tracker.topology("word-count").await?;
//!     for bolt in topology.bolt_names() {
//!         let metrics = tracker
//!             .component_metrics("__execute-count/default", Duration::from_secs(60), &bolt)
//!             .await?;
//!         println!("{}: {:?}", bolt, metrics);
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use healthmgr_types::{
    ComponentMetrics, ComponentRole, ContainerPlan, InstanceMetric, InstancePlan, PackingPlan,
    Topology,
};

use crate::{MetricsProvider, ProviderError, StateStore};

/// Client for a tracker REST API.
///
/// The job queried by [`MetricsProvider`] calls is the one set with
/// [`TrackerClientBuilder::topology`]; [`StateStore`] calls name the job
/// explicitly.
#[derive(Debug, Clone)]
pub struct TrackerClient {
    client: Client,
    endpoint: String,
    cluster: String,
    environ: String,
    topology: String,
}

impl TrackerClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> TrackerClientBuilder {
        TrackerClientBuilder::default()
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}/topologies/{}", self.endpoint, path);

        let response = self
            .client
            .get(&url)
            .query(&[("cluster", &self.cluster), ("environ", &self.environ)])
            .query(query)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(url));
        }

        if response.status().is_server_error() {
            return Err(ProviderError::Unavailable(format!(
                "tracker returned status {}",
                response.status()
            )));
        }

        if !response.status().is_success() {
            return Err(ProviderError::Http(format!(
                "tracker returned status {}",
                response.status()
            )));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(envelope.result)
    }
}

#[async_trait]
impl MetricsProvider for TrackerClient {
    async fn component_metrics(
        &self,
        metric: &str,
        window: Duration,
        component: &str,
    ) -> Result<BTreeMap<String, ComponentMetrics>, ProviderError> {
        let query = [
            ("topology", self.topology.clone()),
            ("component", component.to_string()),
            ("metricname", metric.to_string()),
            ("interval", window.as_secs().to_string()),
        ];
        let response: MetricsResponse = self.fetch("metrics", &query).await?;
        Ok(metrics_to_components(component, response))
    }
}

#[async_trait]
impl StateStore for TrackerClient {
    async fn topology(&self, job: &str) -> Result<Topology, ProviderError> {
        let plan: LogicalPlan = self
            .fetch("logicalplan", &[("topology", job.to_string())])
            .await?;
        Ok(logical_plan_to_topology(job, plan))
    }

    async fn packing_plan(&self, job: &str) -> Result<PackingPlan, ProviderError> {
        let plan: PackingPlanResponse = self
            .fetch("packingplan", &[("topology", job.to_string())])
            .await?;
        Ok(plan.into())
    }
}

/// Builder for TrackerClient.
#[derive(Debug, Default)]
pub struct TrackerClientBuilder {
    endpoint: Option<String>,
    cluster: Option<String>,
    environ: Option<String>,
    topology: Option<String>,
    timeout: Option<Duration>,
}

impl TrackerClientBuilder {
    /// Set the tracker endpoint (e.g., "http://localhost:8888").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the cluster the job runs on (default: "local").
    pub fn cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    /// Set the environment of the job (default: "default").
    pub fn environ(mut self, environ: impl Into<String>) -> Self {
        self.environ = Some(environ.into());
        self
    }

    /// Set the job whose metrics are queried.
    pub fn topology(mut self, topology: impl Into<String>) -> Self {
        self.topology = Some(topology.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<TrackerClient, ProviderError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));

        let client = Client::builder().timeout(timeout).build()?;

        Ok(TrackerClient {
            client,
            endpoint: self
                .endpoint
                .map(|e| e.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "http://localhost:8888".to_string()),
            cluster: self.cluster.unwrap_or_else(|| "local".to_string()),
            environ: self.environ.unwrap_or_else(|| "default".to_string()),
            topology: self.topology.unwrap_or_default(),
        })
    }
}

fn logical_plan_to_topology(job: &str, plan: LogicalPlan) -> Topology {
    let spouts = plan
        .spouts
        .into_iter()
        .map(|(name, c)| (name, ComponentRole::Spout, c.parallelism));
    let bolts = plan
        .bolts
        .into_iter()
        .map(|(name, c)| (name, ComponentRole::Bolt, c.parallelism));

    spouts
        .chain(bolts)
        .fold(Topology::new(job), |t, (name, role, parallelism)| {
            t.component(name, role, parallelism)
        })
}

fn metrics_to_components(
    component: &str,
    response: MetricsResponse,
) -> BTreeMap<String, ComponentMetrics> {
    let mut metrics = ComponentMetrics::new(component);

    for (metric, per_instance) in response.metrics {
        for (instance, value) in per_instance {
            let value = match value.as_f64() {
                Some(v) => v,
                None => continue,
            };
            let mut entry = metrics
                .instance(&instance)
                .cloned()
                .unwrap_or_else(|| InstanceMetric::new(instance.clone()));
            entry.metrics.insert(metric.clone(), value);
            metrics.insert(entry);
        }
    }

    if metrics.is_empty() {
        return BTreeMap::new();
    }
    BTreeMap::from([(component.to_string(), metrics)])
}

/// Response envelope of every tracker endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct LogicalPlan {
    #[serde(default)]
    spouts: BTreeMap<String, LogicalComponent>,
    #[serde(default)]
    bolts: BTreeMap<String, LogicalComponent>,
}

#[derive(Debug, Deserialize)]
struct LogicalComponent {
    #[serde(default = "default_parallelism")]
    parallelism: u32,
}

fn default_parallelism() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct PackingPlanResponse {
    id: String,
    #[serde(default)]
    container_plans: Vec<ContainerPlanResponse>,
}

#[derive(Debug, Deserialize)]
struct ContainerPlanResponse {
    id: u32,
    #[serde(default)]
    instances: Vec<InstancePlanResponse>,
}

#[derive(Debug, Deserialize)]
struct InstancePlanResponse {
    component_name: String,
    task_id: u32,
    #[serde(default)]
    component_index: u32,
}

impl From<PackingPlanResponse> for PackingPlan {
    fn from(plan: PackingPlanResponse) -> Self {
        PackingPlan {
            id: plan.id,
            containers: plan
                .container_plans
                .into_iter()
                .map(|c| ContainerPlan {
                    id: c.id,
                    instances: c
                        .instances
                        .into_iter()
                        .map(|i| InstancePlan {
                            component: i.component_name,
                            task_id: i.task_id,
                            component_index: i.component_index,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MetricsResponse {
    #[serde(default)]
    metrics: BTreeMap<String, BTreeMap<String, MetricValue>>,
}

/// The tracker reports values either as numbers or as numeric strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(v) => Some(*v),
            MetricValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

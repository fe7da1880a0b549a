//! Per-instance and per-component metric types.

use std::collections::BTreeMap;

use crate::MergeError;

/// Metric values reported for a single running instance.
///
/// An instance is one running unit of a component (e.g. one bolt task).
/// Metric names are unique within an instance.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceMetric {
    /// Instance id, unique within a job.
    pub name: String,

    /// Metric values keyed by metric name.
    #[cfg_attr(feature = "serde", serde(default))]
    pub metrics: BTreeMap<String, f64>,
}

impl InstanceMetric {
    /// Create an instance with no metrics.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metrics: BTreeMap::new(),
        }
    }

    /// Create an instance holding a single metric.
    pub fn with_metric(name: impl Into<String>, metric: impl Into<String>, value: f64) -> Self {
        Self::builder(name).metric(metric, value).build()
    }

    /// Create a builder for an instance.
    pub fn builder(name: impl Into<String>) -> InstanceMetricBuilder {
        InstanceMetricBuilder::new(name)
    }

    /// Value of a metric, if reported.
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).copied()
    }

    /// Check whether the instance reports a metric.
    pub fn contains(&self, metric: &str) -> bool {
        self.metrics.contains_key(metric)
    }

    /// Union with another instance's metrics, `other` winning on collision.
    fn merged(mut self, other: InstanceMetric) -> Self {
        self.metrics.extend(other.metrics);
        self
    }
}

/// Metrics of every reporting instance of one component.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentMetrics {
    /// Component name.
    pub name: String,

    /// Instance metrics keyed by instance id.
    #[cfg_attr(feature = "serde", serde(default))]
    pub instances: BTreeMap<String, InstanceMetric>,
}

impl ComponentMetrics {
    /// Create a component with no instances.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instances: BTreeMap::new(),
        }
    }

    /// Create a builder for component metrics.
    pub fn builder(name: impl Into<String>) -> ComponentMetricsBuilder {
        ComponentMetricsBuilder::new(name)
    }

    /// Check if no instance reported anything.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Number of reporting instances.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Metrics of a single instance.
    pub fn instance(&self, id: &str) -> Option<&InstanceMetric> {
        self.instances.get(id)
    }

    /// Iterate over all instances in id order.
    pub fn iter(&self) -> impl Iterator<Item = &InstanceMetric> {
        self.instances.values()
    }

    /// Add an instance, replacing any previous entry with the same id.
    pub fn insert(&mut self, instance: InstanceMetric) {
        self.instances.insert(instance.name.clone(), instance);
    }

    /// Merge two views of the same component.
    ///
    /// The result holds the union of both instance sets. For an instance
    /// present on both sides the metric maps are unioned and `other`'s value
    /// wins when both report the same metric.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::ComponentMismatch`] when the component names differ.
    pub fn merge(mut self, other: ComponentMetrics) -> Result<Self, MergeError> {
        if self.name != other.name {
            return Err(MergeError::ComponentMismatch {
                left: self.name,
                right: other.name,
            });
        }

        for (id, theirs) in other.instances {
            let merged = match self.instances.remove(&id) {
                Some(ours) => ours.merged(theirs),
                None => theirs,
            };
            self.instances.insert(id, merged);
        }

        Ok(self)
    }

    /// A copy restricted to a single instance.
    ///
    /// Returns `None` when the instance is not part of this component.
    pub fn only(&self, id: &str) -> Option<ComponentMetrics> {
        let instance = self.instances.get(id)?;
        let mut single = ComponentMetrics::new(self.name.clone());
        single.insert(instance.clone());
        Some(single)
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Builder for `ComponentMetrics`.
#[derive(Debug, Default)]
pub struct ComponentMetricsBuilder {
    name: String,
    instances: BTreeMap<String, InstanceMetric>,
}

impl ComponentMetricsBuilder {
    /// Create a new builder for the named component.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instances: BTreeMap::new(),
        }
    }

    /// Add an instance with metrics built using a closure.
    pub fn instance<F>(mut self, id: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(InstanceMetricBuilder) -> InstanceMetricBuilder,
    {
        let instance = f(InstanceMetricBuilder::new(id)).build();
        self.instances.insert(instance.name.clone(), instance);
        self
    }

    /// Add a pre-built instance.
    pub fn instance_metric(mut self, instance: InstanceMetric) -> Self {
        self.instances.insert(instance.name.clone(), instance);
        self
    }

    /// Build the component metrics.
    pub fn build(self) -> ComponentMetrics {
        ComponentMetrics {
            name: self.name,
            instances: self.instances,
        }
    }
}

/// Builder for `InstanceMetric`.
#[derive(Debug, Default)]
pub struct InstanceMetricBuilder {
    name: String,
    metrics: BTreeMap<String, f64>,
}

impl InstanceMetricBuilder {
    /// Create a new builder for the named instance.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metrics: BTreeMap::new(),
        }
    }

    /// Set a metric value.
    pub fn metric(mut self, metric: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(metric.into(), value);
        self
    }

    /// Build the instance metrics.
    pub fn build(self) -> InstanceMetric {
        InstanceMetric {
            name: self.name,
            metrics: self.metrics,
        }
    }
}

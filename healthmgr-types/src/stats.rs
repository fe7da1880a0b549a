//! Aggregate statistics over the instances of a component.
//!
//! Statistics are derived on demand from a [`ComponentMetrics`] and are never
//! cached across evaluation cycles.

use crate::{ComponentMetrics, InstanceMetric};

/// Minimum and maximum of a metric across the instances reporting it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricRange {
    pub min: f64,
    pub max: f64,
}

impl MetricRange {
    /// Check whether `max > factor * min`.
    ///
    /// With a zero minimum any positive maximum exceeds the spread, while an
    /// all-zero range never does.
    pub fn spread_exceeds(&self, factor: f64) -> bool {
        self.max > factor * self.min
    }

    /// Check whether `max < factor * value`, i.e. `value` sits close to the top
    /// of the range.
    pub fn near_max(&self, value: f64, factor: f64) -> bool {
        self.max < factor * value
    }
}

/// Instances split by whether a metric is strictly above a threshold.
#[derive(Debug, Default)]
pub struct Partition<'a> {
    pub above: Vec<&'a InstanceMetric>,
    pub below: Vec<&'a InstanceMetric>,
}

/// Statistics helper borrowing one component's metrics.
#[derive(Debug, Clone, Copy)]
pub struct ComponentStats<'a> {
    metrics: &'a ComponentMetrics,
}

impl<'a> ComponentStats<'a> {
    pub fn new(metrics: &'a ComponentMetrics) -> Self {
        Self { metrics }
    }

    /// Min/max of `metric` over the instances that report it.
    ///
    /// Returns `None` when no instance reports the metric.
    pub fn range(&self, metric: &str) -> Option<MetricRange> {
        self.values(metric).into_iter().fold(None, |range, value| {
            Some(match range {
                None => MetricRange {
                    min: value,
                    max: value,
                },
                Some(r) => MetricRange {
                    min: r.min.min(value),
                    max: r.max.max(value),
                },
            })
        })
    }

    /// Sum of `metric` over the instances that report it.
    pub fn sum(&self, metric: &str) -> f64 {
        self.values(metric).into_iter().sum()
    }

    /// Number of instances reporting `metric`.
    pub fn reporting(&self, metric: &str) -> usize {
        self.values(metric).len()
    }

    /// Split instances into those with `metric > threshold` and the rest.
    ///
    /// Instances that do not report the metric land in `below`.
    pub fn partition(&self, metric: &str, threshold: f64) -> Partition<'a> {
        let mut partition = Partition::default();
        for instance in self.metrics.iter() {
            match instance.get(metric) {
                Some(value) if value > threshold => partition.above.push(instance),
                _ => partition.below.push(instance),
            }
        }
        partition
    }

    fn values(&self, metric: &str) -> Vec<f64> {
        self.metrics.iter().filter_map(|i| i.get(metric)).collect()
    }
}

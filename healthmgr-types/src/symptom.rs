//! Symptoms raised by detectors and diagnoses produced by diagnosers.

use std::collections::BTreeMap;
use std::fmt;

use crate::ComponentMetrics;

/// The kind of abnormal condition a symptom reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[non_exhaustive]
pub enum SymptomKind {
    /// Instances of the component are throttling their upstream.
    BackPressure,
    /// Instances of the component process very different amounts of work.
    LoadDisparity,
    /// One instance drains its input queue slower than its peers.
    SlowInstance,
    /// One instance receives a disproportionate share of the input.
    DataSkew,
    /// The component as a whole lacks capacity for its input.
    UnderProvisioning,
}

impl SymptomKind {
    /// Stable identifier used in logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            SymptomKind::BackPressure => "back_pressure",
            SymptomKind::LoadDisparity => "load_disparity",
            SymptomKind::SlowInstance => "slow_instance",
            SymptomKind::DataSkew => "data_skew",
            SymptomKind::UnderProvisioning => "under_provisioning",
        }
    }
}

impl fmt::Display for SymptomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An observation that a component may be unhealthy, with the metrics that
/// triggered it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Symptom {
    pub kind: SymptomKind,
    pub metrics: ComponentMetrics,
}

impl Symptom {
    pub fn new(kind: SymptomKind, metrics: ComponentMetrics) -> Self {
        Self { kind, metrics }
    }

    /// Name of the component this symptom is about.
    pub fn component(&self) -> &str {
        &self.metrics.name
    }

    pub fn is(&self, kind: SymptomKind) -> bool {
        self.kind == kind
    }
}

/// Symptoms judged to share a root cause, plus free-form evidence.
///
/// A diagnosis is handed to remediation logic. It always carries at least
/// one symptom when produced by a diagnoser; "no diagnosis" is expressed as
/// `Option::None` by the caller.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnosis {
    pub symptoms: Vec<Symptom>,

    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "BTreeMap::is_empty")
    )]
    pub annotations: BTreeMap<String, String>,
}

impl Diagnosis {
    pub fn new(symptoms: Vec<Symptom>) -> Self {
        Self {
            symptoms,
            annotations: BTreeMap::new(),
        }
    }

    /// Attach a piece of evidence.
    pub fn annotate(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.annotations.insert(key.into(), value.into());
    }

    /// Builder-style variant of [`Diagnosis::annotate`].
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotate(key, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.symptoms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.symptoms.len()
    }

    /// Ids of every instance referenced by the symptoms, in symptom order.
    pub fn instance_ids(&self) -> Vec<&str> {
        self.symptoms
            .iter()
            .flat_map(|s| s.metrics.instances.keys().map(String::as_str))
            .collect()
    }
}

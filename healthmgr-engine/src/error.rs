//! Errors raised while sensing, detecting and diagnosing.

use healthmgr_adapters::ProviderError;
use healthmgr_types::MergeError;
use thiserror::Error;

/// Errors produced by sensors, detectors and diagnosers.
#[derive(Debug, Error)]
pub enum HealthError {
    /// The provider or the cluster state could not be reached this cycle.
    #[error("data unavailable for {what}: {source}")]
    DataUnavailable {
        what: String,
        #[source]
        source: ProviderError,
    },

    /// A collector query returned something other than exactly one collector.
    #[error(
        "expected exactly one collector result for instance '{instance}' \
         of component '{component}', got {count}"
    )]
    UnexpectedResultCount {
        component: String,
        instance: String,
        count: usize,
    },

    /// Metrics of different components were combined.
    #[error(transparent)]
    Merge(#[from] MergeError),
}

impl HealthError {
    pub(crate) fn unavailable(what: impl Into<String>, source: ProviderError) -> Self {
        HealthError::DataUnavailable {
            what: what.into(),
            source,
        }
    }

    /// Check whether the error reveals a broken assumption about the data
    /// rather than a transient outage.
    ///
    /// Contract violations are surfaced from a cycle; everything else
    /// degrades to "no data".
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            HealthError::UnexpectedResultCount { .. } | HealthError::Merge(_)
        )
    }
}

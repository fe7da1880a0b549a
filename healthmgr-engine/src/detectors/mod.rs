//! Detectors turn sensor readings into symptoms.
//!
//! A detector reads one sensor, computes a statistic per component and emits
//! one symptom for every component crossing its threshold. Missing data is
//! not an error: it yields no symptoms for the cycle.

mod back_pressure;
mod load_disparity;

pub use back_pressure::BackPressureDetector;
pub use load_disparity::LoadDisparityDetector;

use std::collections::BTreeMap;

use async_trait::async_trait;
use healthmgr_types::{ComponentMetrics, Symptom};
use tracing::warn;

use crate::sensors::Sensor;
use crate::HealthError;

#[async_trait]
pub trait Detector: Send + Sync {
    fn name(&self) -> &'static str;

    async fn detect(&self) -> Result<Vec<Symptom>, HealthError>;
}

/// Read every bolt from `sensor`, treating unavailable data as "nothing".
pub(crate) async fn read_all(
    detector: &str,
    sensor: &dyn Sensor,
) -> Result<BTreeMap<String, ComponentMetrics>, HealthError> {
    match sensor.get(&[]).await {
        Ok(metrics) => Ok(metrics),
        Err(e @ HealthError::DataUnavailable { .. }) => {
            warn!(detector, error = %e, "no data this cycle");
            Ok(BTreeMap::new())
        }
        Err(e) => Err(e),
    }
}

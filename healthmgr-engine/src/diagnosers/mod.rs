//! Diagnosers turn symptoms into root-cause diagnoses.
//!
//! A diagnoser picks the symptoms it understands, re-queries a supplementary
//! sensor for the affected component, merges both views and applies a
//! heuristic. "No diagnosis" is the healthy outcome.

mod data_skew;
mod slow_instance;
mod under_provisioning;

pub use data_skew::DataSkewDiagnoser;
pub use slow_instance::SlowInstanceDiagnoser;
pub use under_provisioning::UnderProvisioningDiagnoser;

use async_trait::async_trait;
use healthmgr_types::{ComponentMetrics, ComponentStats, Diagnosis, Symptom};
use tracing::{debug, warn};

use crate::sensors::{Sensor, BACK_PRESSURE};
use crate::HealthError;

#[async_trait]
pub trait Diagnoser: Send + Sync {
    fn name(&self) -> &'static str;

    async fn diagnose(&self, symptoms: &[Symptom]) -> Result<Option<Diagnosis>, HealthError>;
}

/// Fetch `sensor`'s view of the symptom's component and merge it into the
/// symptom's metrics.
///
/// `Ok(None)` when the sensor has nothing for the component this cycle.
pub(crate) async fn supplement(
    diagnoser: &str,
    sensor: &dyn Sensor,
    symptom: &Symptom,
) -> Result<Option<ComponentMetrics>, HealthError> {
    let component = symptom.component();

    let mut fetched = match sensor.get(&[component]).await {
        Ok(fetched) => fetched,
        Err(e @ HealthError::DataUnavailable { .. }) => {
            warn!(
                diagnoser,
                component,
                error = %e,
                "supplementary data unavailable, skipping symptom"
            );
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    match fetched.remove(component) {
        Some(extra) => Ok(Some(symptom.metrics.clone().merge(extra)?)),
        None => {
            debug!(diagnoser, component, metric = sensor.metric(), "no supplementary data");
            Ok(None)
        }
    }
}

/// A back-pressured instance whose `metric` sits near the component maximum.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Outlier {
    pub id: String,
    pub back_pressure: f64,
    pub value: f64,
    pub max: f64,
}

/// Instances of `merged` that are back-pressured and close to the maximum of
/// `metric`, provided the spread of `metric` exceeds `limit`.
pub(crate) fn outliers(
    merged: &ComponentMetrics,
    metric: &str,
    limit: f64,
    proximity: f64,
) -> Vec<Outlier> {
    let stats = ComponentStats::new(merged);

    let range = match stats.range(metric) {
        Some(range) if range.spread_exceeds(limit) => range,
        _ => return Vec::new(),
    };

    stats
        .partition(BACK_PRESSURE, 0.0)
        .above
        .into_iter()
        .filter_map(|instance| {
            let value = instance.get(metric)?;
            range.near_max(value, proximity).then(|| Outlier {
                id: instance.name.clone(),
                back_pressure: instance.get(BACK_PRESSURE).unwrap_or_default(),
                value,
                max: range.max,
            })
        })
        .collect()
}

use std::sync::Arc;

use async_trait::async_trait;
use healthmgr_types::{ComponentStats, Symptom, SymptomKind};
use tracing::{debug, info};

use super::{read_all, Detector};
use crate::policy::{PolicyConfig, NOISE_FILTER_THRESHOLD};
use crate::sensors::{Sensor, BACK_PRESSURE};
use crate::HealthError;

/// Flags components whose total back pressure exceeds a noise threshold.
pub struct BackPressureDetector {
    sensor: Arc<dyn Sensor>,
    noise_filter: f64,
}

impl BackPressureDetector {
    pub const DEFAULT_NOISE_FILTER: f64 = 20.0;

    pub fn new(sensor: Arc<dyn Sensor>, noise_filter: f64) -> Self {
        Self {
            sensor,
            noise_filter,
        }
    }

    pub fn from_policy(sensor: Arc<dyn Sensor>, policy: &PolicyConfig) -> Self {
        Self::new(
            sensor,
            policy.get_f64(NOISE_FILTER_THRESHOLD, Self::DEFAULT_NOISE_FILTER),
        )
    }
}

#[async_trait]
impl Detector for BackPressureDetector {
    fn name(&self) -> &'static str {
        "BackPressureDetector"
    }

    async fn detect(&self) -> Result<Vec<Symptom>, HealthError> {
        let mut symptoms = Vec::new();

        for (component, metrics) in read_all(self.name(), self.sensor.as_ref()).await? {
            let total = ComponentStats::new(&metrics).sum(BACK_PRESSURE);
            if total > self.noise_filter {
                info!(
                    component = %component,
                    total,
                    threshold = self.noise_filter,
                    "back pressure detected"
                );
                symptoms.push(Symptom::new(SymptomKind::BackPressure, metrics));
            } else {
                debug!(component = %component, total, "back pressure below noise filter");
            }
        }

        Ok(symptoms)
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use healthmgr_types::{ComponentStats, Symptom, SymptomKind};
use tracing::{debug, info};

use super::{read_all, Detector};
use crate::policy::{PolicyConfig, DISPARITY_RATIO};
use crate::sensors::{Sensor, EXECUTE_COUNT};
use crate::HealthError;

/// Flags components whose busiest instance executes far more than the
/// least busy one.
pub struct LoadDisparityDetector {
    sensor: Arc<dyn Sensor>,
    ratio: f64,
}

impl LoadDisparityDetector {
    pub const DEFAULT_RATIO: f64 = 1.5;

    pub fn new(sensor: Arc<dyn Sensor>, ratio: f64) -> Self {
        Self { sensor, ratio }
    }

    pub fn from_policy(sensor: Arc<dyn Sensor>, policy: &PolicyConfig) -> Self {
        Self::new(sensor, policy.get_f64(DISPARITY_RATIO, Self::DEFAULT_RATIO))
    }
}

#[async_trait]
impl Detector for LoadDisparityDetector {
    fn name(&self) -> &'static str {
        "LoadDisparityDetector"
    }

    async fn detect(&self) -> Result<Vec<Symptom>, HealthError> {
        let mut symptoms = Vec::new();

        for (component, metrics) in read_all(self.name(), self.sensor.as_ref()).await? {
            let range = match ComponentStats::new(&metrics).range(EXECUTE_COUNT) {
                Some(range) => range,
                None => {
                    debug!(component = %component, "no execute counts reported");
                    continue;
                }
            };

            if range.spread_exceeds(self.ratio) {
                info!(
                    component = %component,
                    min = range.min,
                    max = range.max,
                    ratio = self.ratio,
                    "load disparity detected"
                );
                symptoms.push(Symptom::new(SymptomKind::LoadDisparity, metrics));
            }
        }

        Ok(symptoms)
    }
}

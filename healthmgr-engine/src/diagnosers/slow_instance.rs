use std::sync::Arc;

use async_trait::async_trait;
use healthmgr_types::{Diagnosis, Symptom, SymptomKind};
use tracing::{debug, info};

use super::{outliers, supplement, Diagnoser};
use crate::policy::{PolicyConfig, SLOW_INSTANCE_LIMIT, SLOW_INSTANCE_PROXIMITY};
use crate::sensors::{Sensor, BUFFER_SIZE};
use crate::HealthError;

/// Finds instances that throttle their upstream because they drain their
/// input slower than their peers.
///
/// A slow instance is back-pressured while its collector buffers far more
/// data for it than for the least loaded peer.
pub struct SlowInstanceDiagnoser {
    buffer_size: Arc<dyn Sensor>,
    limit: f64,
    proximity: f64,
}

impl SlowInstanceDiagnoser {
    pub const DEFAULT_LIMIT: f64 = 25.0;
    pub const DEFAULT_PROXIMITY: f64 = 2.0;

    pub fn new(buffer_size: Arc<dyn Sensor>, limit: f64, proximity: f64) -> Self {
        Self {
            buffer_size,
            limit,
            proximity,
        }
    }

    pub fn from_policy(buffer_size: Arc<dyn Sensor>, policy: &PolicyConfig) -> Self {
        Self::new(
            buffer_size,
            policy.get_f64(SLOW_INSTANCE_LIMIT, Self::DEFAULT_LIMIT),
            policy.get_f64(SLOW_INSTANCE_PROXIMITY, Self::DEFAULT_PROXIMITY),
        )
    }
}

#[async_trait]
impl Diagnoser for SlowInstanceDiagnoser {
    fn name(&self) -> &'static str {
        "SlowInstanceDiagnoser"
    }

    async fn diagnose(&self, symptoms: &[Symptom]) -> Result<Option<Diagnosis>, HealthError> {
        let mut diagnosis = Diagnosis::default();

        for symptom in symptoms.iter().filter(|s| s.is(SymptomKind::BackPressure)) {
            if symptom.metrics.instance_count() <= 1 {
                debug!(component = symptom.component(), "single instance, no peer to compare with");
                continue;
            }

            let merged = match supplement(self.name(), self.buffer_size.as_ref(), symptom).await? {
                Some(merged) => merged,
                None => continue,
            };

            for slow in outliers(&merged, BUFFER_SIZE, self.limit, self.proximity) {
                info!(
                    component = %merged.name,
                    instance = %slow.id,
                    buffer_size = slow.value,
                    "slow instance"
                );
                diagnosis.annotate(
                    slow.id.clone(),
                    format!(
                        "back_pressure={} buffer_size={} max_buffer_size={}",
                        slow.back_pressure, slow.value, slow.max
                    ),
                );
                if let Some(single) = merged.only(&slow.id) {
                    diagnosis
                        .symptoms
                        .push(Symptom::new(SymptomKind::SlowInstance, single));
                }
            }
        }

        Ok((!diagnosis.is_empty()).then_some(diagnosis))
    }
}

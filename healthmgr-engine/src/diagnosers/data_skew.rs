use std::sync::Arc;

use async_trait::async_trait;
use healthmgr_types::{Diagnosis, Symptom, SymptomKind};
use tracing::{debug, info};

use super::{outliers, supplement, Diagnoser};
use crate::policy::{PolicyConfig, DATA_SKEW_LIMIT, DATA_SKEW_PROXIMITY};
use crate::sensors::{Sensor, EXECUTE_COUNT};
use crate::HealthError;

/// Finds back-pressured instances that execute far more tuples than their
/// peers, i.e. receive a disproportionate share of the input.
pub struct DataSkewDiagnoser {
    execute_count: Arc<dyn Sensor>,
    limit: f64,
    proximity: f64,
}

impl DataSkewDiagnoser {
    pub const DEFAULT_LIMIT: f64 = 1.5;
    pub const DEFAULT_PROXIMITY: f64 = 1.1;

    pub fn new(execute_count: Arc<dyn Sensor>, limit: f64, proximity: f64) -> Self {
        Self {
            execute_count,
            limit,
            proximity,
        }
    }

    pub fn from_policy(execute_count: Arc<dyn Sensor>, policy: &PolicyConfig) -> Self {
        Self::new(
            execute_count,
            policy.get_f64(DATA_SKEW_LIMIT, Self::DEFAULT_LIMIT),
            policy.get_f64(DATA_SKEW_PROXIMITY, Self::DEFAULT_PROXIMITY),
        )
    }
}

#[async_trait]
impl Diagnoser for DataSkewDiagnoser {
    fn name(&self) -> &'static str {
        "DataSkewDiagnoser"
    }

    async fn diagnose(&self, symptoms: &[Symptom]) -> Result<Option<Diagnosis>, HealthError> {
        let mut diagnosis = Diagnosis::default();

        for symptom in symptoms.iter().filter(|s| s.is(SymptomKind::BackPressure)) {
            if symptom.metrics.instance_count() <= 1 {
                debug!(component = symptom.component(), "single instance, skew impossible");
                continue;
            }

            let execute_count = self.execute_count.as_ref();
            let merged = match supplement(self.name(), execute_count, symptom).await? {
                Some(merged) => merged,
                None => continue,
            };

            for skewed in outliers(&merged, EXECUTE_COUNT, self.limit, self.proximity) {
                info!(
                    component = %merged.name,
                    instance = %skewed.id,
                    execute_count = skewed.value,
                    "data skew"
                );
                diagnosis.annotate(
                    skewed.id.clone(),
                    format!(
                        "back_pressure={} execute_count={} max_execute_count={}",
                        skewed.back_pressure, skewed.value, skewed.max
                    ),
                );
                if let Some(single) = merged.only(&skewed.id) {
                    diagnosis.symptoms.push(Symptom::new(SymptomKind::DataSkew, single));
                }
            }
        }

        Ok((!diagnosis.is_empty()).then_some(diagnosis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::BACK_PRESSURE;
    use crate::testing::{component, FixedSensor};

    fn symptom() -> Symptom {
        Symptom::new(
            SymptomKind::BackPressure,
            component(
                "bolt-2",
                &[
                    ("i1", &[(BACK_PRESSURE, 30.0)]),
                    ("i2", &[(BACK_PRESSURE, 0.0)]),
                    ("i3", &[(BACK_PRESSURE, 0.0)]),
                ],
            ),
        )
    }

    fn counts(i1: f64, i2: f64, i3: f64) -> Arc<FixedSensor> {
        Arc::new(FixedSensor::new(
            EXECUTE_COUNT,
            vec![component(
                "bolt-2",
                &[
                    ("i1", &[(EXECUTE_COUNT, i1)]),
                    ("i2", &[(EXECUTE_COUNT, i2)]),
                    ("i3", &[(EXECUTE_COUNT, i3)]),
                ],
            )],
        ))
    }

    #[tokio::test]
    async fn test_busiest_back_pressured_instance_is_skewed() {
        let diagnoser = DataSkewDiagnoser::new(counts(500.0, 100.0, 120.0), 1.5, 1.1);

        let diagnosis = diagnoser.diagnose(&[symptom()]).await.unwrap().unwrap();

        assert_eq!(diagnosis.instance_ids(), vec!["i1"]);
        assert!(diagnosis.symptoms[0].is(SymptomKind::DataSkew));
        assert_eq!(
            diagnosis.annotations["i1"],
            "back_pressure=30 execute_count=500 max_execute_count=500"
        );
    }

    #[tokio::test]
    async fn test_back_pressured_instance_below_max_is_not_skewed() {
        let diagnoser = DataSkewDiagnoser::new(counts(300.0, 500.0, 100.0), 1.5, 1.1);
        assert!(diagnoser.diagnose(&[symptom()]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_balanced_load_is_not_skewed() {
        let diagnoser = DataSkewDiagnoser::new(counts(120.0, 100.0, 110.0), 1.5, 1.1);
        assert!(diagnoser.diagnose(&[symptom()]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_thresholds_from_policy_defaults() {
        let sensor = counts(500.0, 100.0, 120.0);
        let diagnoser = DataSkewDiagnoser::from_policy(sensor, &PolicyConfig::default());
        assert!(diagnoser.diagnose(&[symptom()]).await.unwrap().is_some());
    }
}

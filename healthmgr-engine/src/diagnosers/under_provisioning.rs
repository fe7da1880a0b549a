use std::sync::Arc;

use async_trait::async_trait;
use healthmgr_types::{ComponentStats, Diagnosis, Symptom, SymptomKind};
use tracing::{debug, info};

use super::{supplement, Diagnoser};
use crate::policy::{PolicyConfig, BALANCE_RATIO};
use crate::sensors::{Sensor, EXECUTE_COUNT};
use crate::HealthError;

/// Finds back-pressured components whose load is evenly spread: no single
/// instance is at fault, the component as a whole lacks capacity.
pub struct UnderProvisioningDiagnoser {
    execute_count: Arc<dyn Sensor>,
    balance_ratio: f64,
}

impl UnderProvisioningDiagnoser {
    pub const DEFAULT_BALANCE_RATIO: f64 = 1.5;

    pub fn new(execute_count: Arc<dyn Sensor>, balance_ratio: f64) -> Self {
        Self {
            execute_count,
            balance_ratio,
        }
    }

    pub fn from_policy(execute_count: Arc<dyn Sensor>, policy: &PolicyConfig) -> Self {
        Self::new(
            execute_count,
            policy.get_f64(BALANCE_RATIO, Self::DEFAULT_BALANCE_RATIO),
        )
    }
}

#[async_trait]
impl Diagnoser for UnderProvisioningDiagnoser {
    fn name(&self) -> &'static str {
        "UnderProvisioningDiagnoser"
    }

    async fn diagnose(&self, symptoms: &[Symptom]) -> Result<Option<Diagnosis>, HealthError> {
        let mut diagnosis = Diagnosis::default();

        for symptom in symptoms.iter().filter(|s| s.is(SymptomKind::BackPressure)) {
            if symptom.metrics.is_empty() {
                continue;
            }

            let execute_count = self.execute_count.as_ref();
            let merged = match supplement(self.name(), execute_count, symptom).await? {
                Some(merged) => merged,
                None => continue,
            };

            let range = match ComponentStats::new(&merged).range(EXECUTE_COUNT) {
                Some(range) => range,
                None => {
                    debug!(component = %merged.name, "no execute counts reported");
                    continue;
                }
            };

            if range.spread_exceeds(self.balance_ratio) {
                debug!(
                    component = %merged.name,
                    min = range.min,
                    max = range.max,
                    "load unbalanced"
                );
                continue;
            }

            info!(
                component = %merged.name,
                instances = merged.instance_count(),
                "component under-provisioned"
            );
            diagnosis.annotate(
                merged.name.clone(),
                format!(
                    "min_execute_count={} max_execute_count={}",
                    range.min, range.max
                ),
            );
            diagnosis
                .symptoms
                .push(Symptom::new(SymptomKind::UnderProvisioning, merged));
        }

        Ok((!diagnosis.is_empty()).then_some(diagnosis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::BACK_PRESSURE;
    use crate::testing::{component, FixedSensor};

    fn symptom(name: &str) -> Symptom {
        Symptom::new(
            SymptomKind::BackPressure,
            component(
                name,
                &[("i1", &[(BACK_PRESSURE, 30.0)]), ("i2", &[(BACK_PRESSURE, 25.0)])],
            ),
        )
    }

    fn counts(name: &str, i1: f64, i2: f64) -> healthmgr_types::ComponentMetrics {
        component(name, &[("i1", &[(EXECUTE_COUNT, i1)]), ("i2", &[(EXECUTE_COUNT, i2)])])
    }

    #[tokio::test]
    async fn test_balanced_back_pressured_component_is_under_provisioned() {
        let sensor = Arc::new(FixedSensor::new(
            EXECUTE_COUNT,
            vec![counts("bolt-1", 100.0, 110.0)],
        ));
        let diagnoser = UnderProvisioningDiagnoser::new(sensor, 1.5);

        let diagnosis = diagnoser.diagnose(&[symptom("bolt-1")]).await.unwrap().unwrap();

        assert_eq!(diagnosis.len(), 1);
        let s = &diagnosis.symptoms[0];
        assert!(s.is(SymptomKind::UnderProvisioning));
        assert_eq!(s.component(), "bolt-1");
        assert_eq!(s.metrics.instance_count(), 2);
        assert_eq!(s.metrics.instance("i1").unwrap().get(BACK_PRESSURE), Some(30.0));
        assert_eq!(
            diagnosis.annotations["bolt-1"],
            "min_execute_count=100 max_execute_count=110"
        );
    }

    #[tokio::test]
    async fn test_unbalanced_component_is_not_under_provisioned() {
        let sensor = Arc::new(FixedSensor::new(
            EXECUTE_COUNT,
            vec![counts("bolt-1", 100.0, 400.0)],
        ));
        let diagnoser = UnderProvisioningDiagnoser::new(sensor, 1.5);

        assert!(diagnoser.diagnose(&[symptom("bolt-1")]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_single_instance_counts_as_balanced() {
        let sensor = Arc::new(FixedSensor::new(
            EXECUTE_COUNT,
            vec![component("bolt-1", &[("i1", &[(EXECUTE_COUNT, 10.0)])])],
        ));
        let diagnoser = UnderProvisioningDiagnoser::new(sensor, 1.5);
        let symptom = Symptom::new(
            SymptomKind::BackPressure,
            component("bolt-1", &[("i1", &[(BACK_PRESSURE, 90.0)])]),
        );

        assert!(diagnoser.diagnose(&[symptom]).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_only_diagnoses_components_with_data() {
        let sensor = Arc::new(FixedSensor::new(EXECUTE_COUNT, vec![counts("bolt-1", 10.0, 10.0)]));
        let diagnoser = UnderProvisioningDiagnoser::from_policy(sensor, &PolicyConfig::default());

        let diagnosis = diagnoser
            .diagnose(&[symptom("bolt-1"), symptom("bolt-2")])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(diagnosis.len(), 1);
        assert_eq!(diagnosis.symptoms[0].component(), "bolt-1");
    }
}

//! The detect-then-diagnose cycle.

use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info};

use healthmgr_engine::{
    BackPressureDetector, BackPressureSensor, BufferSizeSensor, DataSkewDiagnoser, Detector,
    Diagnoser, ExecuteCountSensor, HealthError, LoadDisparityDetector, PolicyConfig, SensorContext,
    SlowInstanceDiagnoser, UnderProvisioningDiagnoser,
};
use healthmgr_types::{Diagnosis, Symptom};

/// Outcome of one health cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleReport {
    /// Symptoms from every detector, in detector order.
    pub symptoms: Vec<Symptom>,
    /// Diagnoses from every diagnoser that found something, in diagnoser order.
    pub diagnoses: Vec<Diagnosis>,
}

impl CycleReport {
    /// Whether nothing abnormal was detected.
    pub fn is_healthy(&self) -> bool {
        self.symptoms.is_empty() && self.diagnoses.is_empty()
    }
}

/// Runs detectors and diagnosers over the monitored job.
///
/// # Example
///
/// ```rust
/// use healthmgr::HealthManager;
///
/// # tokio_test::block_on(async {
/// let manager = HealthManager::builder().build();
/// let report = manager.run_cycle().await?;
/// assert!(report.is_healthy());
/// # Ok::<(), healthmgr_engine::HealthError>(())
/// # }).unwrap();
/// ```
pub struct HealthManager {
    detectors: Vec<Arc<dyn Detector>>,
    diagnosers: Vec<Arc<dyn Diagnoser>>,
}

impl HealthManager {
    pub fn builder() -> HealthManagerBuilder {
        HealthManagerBuilder::default()
    }

    /// The standard pipeline with thresholds taken from `policy`.
    ///
    /// Detects back pressure and load disparity, then looks for slow
    /// instances, data skew and under-provisioning.
    pub fn from_policy(ctx: SensorContext, policy: &PolicyConfig) -> Self {
        let back_pressure = Arc::new(BackPressureSensor::new(ctx.clone()));
        let buffer_size = Arc::new(BufferSizeSensor::new(ctx.clone()));
        let execute_count = Arc::new(ExecuteCountSensor::new(ctx));

        Self::builder()
            .detector(BackPressureDetector::from_policy(back_pressure, policy))
            .detector(LoadDisparityDetector::from_policy(execute_count.clone(), policy))
            .diagnoser(SlowInstanceDiagnoser::from_policy(buffer_size, policy))
            .diagnoser(DataSkewDiagnoser::from_policy(execute_count.clone(), policy))
            .diagnoser(UnderProvisioningDiagnoser::from_policy(execute_count, policy))
            .build()
    }

    /// Run every detector concurrently, then feed all symptoms to each
    /// diagnoser in turn.
    ///
    /// Fails on the first contract violation; degraded data only shrinks
    /// the report.
    pub async fn run_cycle(&self) -> Result<CycleReport, HealthError> {
        let mut report = CycleReport::default();

        let detected = join_all(self.detectors.iter().map(|d| d.detect())).await;
        for (detector, result) in self.detectors.iter().zip(detected) {
            match result {
                Ok(symptoms) => {
                    debug!(
                        detector = detector.name(),
                        symptoms = symptoms.len(),
                        "detector finished"
                    );
                    report.symptoms.extend(symptoms);
                }
                Err(e) => {
                    error!(detector = detector.name(), error = %e, "detector failed");
                    return Err(e);
                }
            }
        }

        for diagnoser in &self.diagnosers {
            match diagnoser.diagnose(&report.symptoms).await {
                Ok(Some(diagnosis)) => {
                    info!(diagnoser = diagnoser.name(), symptoms = diagnosis.len(), "diagnosis");
                    report.diagnoses.push(diagnosis);
                }
                Ok(None) => {}
                Err(e) => {
                    error!(diagnoser = diagnoser.name(), error = %e, "diagnoser failed");
                    return Err(e);
                }
            }
        }

        Ok(report)
    }
}

/// Builder for HealthManager.
#[derive(Default)]
pub struct HealthManagerBuilder {
    detectors: Vec<Arc<dyn Detector>>,
    diagnosers: Vec<Arc<dyn Diagnoser>>,
}

impl HealthManagerBuilder {
    /// Add a detector. Detectors run concurrently.
    pub fn detector(mut self, detector: impl Detector + 'static) -> Self {
        self.detectors.push(Arc::new(detector));
        self
    }

    /// Add a diagnoser. Diagnosers run in the order they were added.
    pub fn diagnoser(mut self, diagnoser: impl Diagnoser + 'static) -> Self {
        self.diagnosers.push(Arc::new(diagnoser));
        self
    }

    pub fn build(self) -> HealthManager {
        HealthManager {
            detectors: self.detectors,
            diagnosers: self.diagnosers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use healthmgr_adapters::{ClusterState, StateStore, StaticProvider};
    use healthmgr_engine::sensors::{
        BACK_PRESSURE, BUFFER_SIZE, BUFFER_SIZE_SUFFIX, COLLECTOR, EXECUTE_COUNT,
    };
    use healthmgr_engine::{PackingPlanProvider, TopologyProvider};
    use healthmgr_types::{ComponentMetrics, PackingPlan, SymptomKind, Topology};

    const INSTANCES: [&str; 3] = [
        "container_1_split_1",
        "container_1_split_2",
        "container_2_split_3",
    ];

    fn collector(key: &str, value: f64) -> ComponentMetrics {
        ComponentMetrics::builder(COLLECTOR)
            .instance("stmgr-1", |i| i.metric(key, value))
            .build()
    }

    /// `split` has three instances; the first one is slow.
    fn state() -> ClusterState {
        let mut state = ClusterState::new(
            Topology::new("word-count").spout("sentence", 1).bolt("split", 3),
            PackingPlan::new("plan")
                .container(1, &[("sentence", 0), ("split", 1), ("split", 2)])
                .container(2, &[("split", 3)]),
        );

        let throttled_ms = [18_000.0, 0.0, 0.0];
        let buffered = [100.0, 2.0, 3.0];
        let executed = [50.0, 100.0, 100.0];

        let mut counts = ComponentMetrics::builder("split");
        for (n, id) in INSTANCES.iter().enumerate() {
            let bp_key = format!("{}{}", BACK_PRESSURE, id);
            let buf_key = format!("{}{}{}", BUFFER_SIZE, id, BUFFER_SIZE_SUFFIX);
            state = state
                .metric(bp_key.clone(), collector(&bp_key, throttled_ms[n]))
                .metric(buf_key.clone(), collector(&buf_key, buffered[n]));
            counts = counts.instance(*id, |i| i.metric(EXECUTE_COUNT, executed[n]));
        }
        state.metric(EXECUTE_COUNT, counts.build())
    }

    fn manager(provider: Arc<StaticProvider>) -> HealthManager {
        let store: Arc<dyn StateStore> = provider.clone();
        let ctx = SensorContext::new(
            Arc::new(TopologyProvider::new(store.clone(), "word-count")),
            Arc::new(PackingPlanProvider::new(store, "word-count")),
            provider,
        );
        HealthManager::from_policy(ctx, &PolicyConfig::default())
    }

    #[tokio::test]
    async fn test_cycle_detects_and_diagnoses_slow_instance() {
        let report = manager(Arc::new(StaticProvider::new(state())))
            .run_cycle()
            .await
            .unwrap();

        let kinds: Vec<SymptomKind> = report.symptoms.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SymptomKind::BackPressure, SymptomKind::LoadDisparity]);

        assert_eq!(report.diagnoses.len(), 1);
        let diagnosis = &report.diagnoses[0];
        assert!(diagnosis.symptoms[0].is(SymptomKind::SlowInstance));
        assert_eq!(diagnosis.instance_ids(), vec!["container_1_split_1"]);
        assert!(!report.is_healthy());
    }

    #[tokio::test]
    async fn test_unavailable_provider_yields_empty_report() {
        let provider = Arc::new(StaticProvider::new(state()));
        provider.set_unavailable(true);

        let report = manager(provider).run_cycle().await.unwrap();
        assert!(report.is_healthy());
    }

    #[tokio::test]
    async fn test_report_serializes_to_json() {
        let report = manager(Arc::new(StaticProvider::new(state())))
            .run_cycle()
            .await
            .unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["symptoms"][0]["kind"], "back_pressure");
        assert_eq!(json["diagnoses"][0]["symptoms"][0]["kind"], "slow_instance");
    }

    // ========================================================================
    // Error propagation
    // ========================================================================

    struct BrokenDetector;

    #[async_trait]
    impl Detector for BrokenDetector {
        fn name(&self) -> &'static str {
            "BrokenDetector"
        }

        async fn detect(&self) -> Result<Vec<Symptom>, HealthError> {
            Err(HealthError::UnexpectedResultCount {
                component: "split".into(),
                instance: "container_1_split_1".into(),
                count: 2,
            })
        }
    }

    struct CountingDiagnoser(Arc<std::sync::atomic::AtomicUsize>);

    #[async_trait]
    impl Diagnoser for CountingDiagnoser {
        fn name(&self) -> &'static str {
            "CountingDiagnoser"
        }

        async fn diagnose(&self, _symptoms: &[Symptom]) -> Result<Option<Diagnosis>, HealthError> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_contract_violation_aborts_cycle() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let manager = HealthManager::builder()
            .detector(BrokenDetector)
            .diagnoser(CountingDiagnoser(calls.clone()))
            .build();

        let err = manager.run_cycle().await.unwrap_err();
        assert!(err.is_contract_violation());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_diagnosers_see_all_symptoms() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let manager = HealthManager::builder()
            .diagnoser(CountingDiagnoser(calls.clone()))
            .diagnoser(CountingDiagnoser(calls.clone()))
            .build();

        let report = manager.run_cycle().await.unwrap();
        assert!(report.is_healthy());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}

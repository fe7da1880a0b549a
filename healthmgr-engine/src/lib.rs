//! # healthmgr-engine
//!
//! Sensors, detectors and diagnosers of the health manager.
//!
//! Data flows in one direction each cycle:
//!
//! 1. **Sensors** fetch one metric for the bolts of the job, resolving
//!    components from the cached topology and instances from the cached
//!    packing plan.
//! 2. **Detectors** read one sensor each and emit a [`Symptom`] per
//!    component crossing a threshold.
//! 3. **Diagnosers** take all symptoms of the cycle, re-query a
//!    supplementary sensor and emit at most one [`Diagnosis`].
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use healthmgr_adapters::{ClusterState, StateStore, StaticProvider};
//! use healthmgr_engine::{
//!     BackPressureDetector, BackPressureSensor, Detector, PackingPlanProvider, SensorContext,
//!     TopologyProvider,
//! };
//! use healthmgr_types::{PackingPlan, Topology};
//!
//! # tokio_test::block_on(async {
//! let provider = Arc::new(StaticProvider::new(ClusterState::new(
//!     Topology::new("word-count").bolt("split", 1),
//!     PackingPlan::new("plan").container(1, &[("split", 1)]),
//! )));
//! let store: Arc<dyn StateStore> = provider.clone();
//!
//! let ctx = SensorContext::new(
//!     Arc::new(TopologyProvider::new(store.clone(), "word-count")),
//!     Arc::new(PackingPlanProvider::new(store, "word-count")),
//!     provider,
//! );
//! let detector = BackPressureDetector::new(Arc::new(BackPressureSensor::new(ctx)), 20.0);
//!
//! // No collector reports anything yet, so nothing is throttled.
//! assert!(detector.detect().await?.is_empty());
//! # Ok::<(), healthmgr_engine::HealthError>(())
//! # }).unwrap();
//! ```

mod cache;
mod error;
mod events;
pub mod policy;

pub mod detectors;
pub mod diagnosers;
pub mod sensors;

#[cfg(test)]
mod testing;

pub use cache::{Cached, PackingPlanProvider, TopologyProvider};
pub use detectors::{BackPressureDetector, Detector, LoadDisparityDetector};
pub use diagnosers::{
    DataSkewDiagnoser, Diagnoser, SlowInstanceDiagnoser, UnderProvisioningDiagnoser,
};
pub use error::HealthError;
pub use events::{spawn_invalidation_listener, EventBus, HealthEvent};
pub use policy::PolicyConfig;
pub use sensors::{
    BackPressureSensor, BufferSizeSensor, ExecuteCountSensor, Sensor, SensorConfig, SensorContext,
};

// Re-export types for convenience
pub use healthmgr_types::{ComponentMetrics, Diagnosis, Symptom, SymptomKind};

//! # healthmgr-adapters
//!
//! Providers that feed the health manager with metrics and cluster state.
//!
//! The health manager never talks to a metrics backend or a state store
//! directly. It consumes two traits:
//!
//! - [`MetricsProvider`] - windowed metric queries scoped to a component
//! - [`StateStore`] - the logical topology and the packing plan of a job
//!
//! ## Implementations
//!
//! - [`StaticProvider`] - in-memory cluster state, optionally loaded from a
//!   JSON file. Used by tests and by the file-driven mode of the binary.
//! - **Tracker** (`tracker` feature) - queries a tracker REST API for logical
//!   plans, packing plans and metrics
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use healthmgr_adapters::{ClusterState, MetricsProvider, StaticProvider};
//! use healthmgr_types::{ComponentMetrics, PackingPlan, Topology};
//!
//! # tokio_test::block_on(async {
//! let state = ClusterState::new(
//!     Topology::new("word-count").bolt("split", 1),
//!     PackingPlan::new("plan").container(1, &[("split", 1)]),
//! )
//! .metric(
//!     "__execute-count/default",
//!     ComponentMetrics::builder("split")
//!         .instance("container_1_split_1", |i| i.metric("__execute-count/default", 42.0))
//!         .build(),
//! );
//!
//! let provider = StaticProvider::new(state);
//! let result = provider
//!     .component_metrics("__execute-count/default", Duration::from_secs(60), "split")
//!     .await?;
//! assert_eq!(result["split"].instance_count(), 1);
//! # Ok::<(), healthmgr_adapters::ProviderError>(())
//! # }).unwrap();
//! ```

pub mod error;
mod provider;
mod static_provider;

#[cfg(feature = "tracker")]
pub mod tracker;

pub use error::ProviderError;
pub use provider::{MetricsProvider, StateStore};
pub use static_provider::{ClusterState, StaticProvider};

// Re-export types for convenience
pub use healthmgr_types::{ComponentMetrics, InstanceMetric, PackingPlan, Topology};

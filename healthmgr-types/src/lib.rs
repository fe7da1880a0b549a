//! # healthmgr-types
//!
//! Core types for stream-processing health management. This crate defines
//! the data that flows through the sensor → detector → diagnoser pipeline:
//! per-instance metrics grouped by component, the symptoms detectors raise,
//! and the diagnoses that remediation logic consumes.
//!
//! ## Design Goals
//!
//! - **Identity-keyed metrics**: Every value is addressed by component name,
//!   instance id and metric name
//! - **Right-biased merge**: Metric streams for the same component combine
//!   into one view, later values winning
//! - **No sentinels**: Statistics over an empty set are `None`, never
//!   `f64::MAX` leaking into a comparison
//! - **Optional serialization**: Enable the `serde` feature as needed
//!
//! ## Example
//!
//! ```rust
//! use healthmgr_types::{ComponentMetrics, ComponentStats};
//!
//! let metrics = ComponentMetrics::builder("split-bolt")
//!     .instance("container_1_split-bolt_1", |i| i.metric("buffer_size", 100.0))
//!     .instance("container_2_split-bolt_2", |i| i.metric("buffer_size", 4.0))
//!     .build();
//!
//! let range = ComponentStats::new(&metrics).range("buffer_size").unwrap();
//! assert_eq!(range.max, 100.0);
//! assert!(range.spread_exceeds(20.0));
//! ```

mod error;
mod metrics;
mod stats;
mod symptom;
mod topology;

pub use error::*;
pub use metrics::*;
pub use stats::*;
pub use symptom::*;
pub use topology::*;

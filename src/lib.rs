//! # healthmgr
//!
//! A health manager for stream-processing jobs.
//!
//! Each cycle reads windowed metrics of the running job, detects abnormal
//! conditions (symptoms) and diagnoses their root cause:
//!
//! ```text
//! ┌──────────────┐    ┌─────────┐    ┌───────────┐    ┌────────────┐
//! │ StateStore / │───▶│ sensors │───▶│ detectors │───▶│ diagnosers │
//! │ Metrics      │    └─────────┘    └───────────┘    └─────┬──────┘
//! └──────▲───────┘                                          │
//!        │ cached topology + packing plan                   ▼
//!   TopologyUpdate ─▶ invalidation                     CycleReport
//! ```
//!
//! - **[`healthmgr_types`]**: metrics, topology, symptoms and statistics
//! - **[`healthmgr_adapters`]**: metrics providers and state stores
//! - **[`healthmgr_engine`]**: caches, sensors, detectors and diagnosers
//! - **this crate**: the [`HealthManager`] cycle driver, [`StateFile`]
//!   watching, and the `healthmgr` binary
//!
//! ## Usage
//!
//! ```bash
//! # Diagnose a job described by a local state file, once
//! healthmgr --state cluster-state.json --once
//!
//! # Poll a tracker every 30 seconds with a custom policy
//! healthmgr --tracker http://localhost:8888 --topology word-count \
//!     --policy policy.toml --interval 30
//! ```

mod manager;
mod state_file;

pub use manager::{CycleReport, HealthManager, HealthManagerBuilder};
pub use state_file::StateFile;

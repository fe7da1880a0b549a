//! File-based cluster state.
//!
//! Polls a JSON file holding a [`ClusterState`] and swaps changes into a
//! [`StaticProvider`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use healthmgr_adapters::{ClusterState, StaticProvider};
use healthmgr_engine::{EventBus, HealthEvent};
use tracing::{info, warn};

/// Watches a cluster state file by modification time.
///
/// [`poll`](Self::poll) only returns a state when the file changed since the
/// last successful read, so callers can treat every returned state as a
/// topology update.
#[derive(Debug)]
pub struct StateFile {
    path: PathBuf,
    last_error: Option<String>,
    last_modified: Option<SystemTime>,
}

impl StateFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            last_error: None,
            last_modified: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Error of the last failed read, cleared by the next successful one.
    pub fn error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn modified_time(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).ok()?.modified().ok()
    }

    /// Read the state if the file changed since the last successful read.
    pub fn poll(&mut self) -> Option<ClusterState> {
        let current = self.modified_time();

        let changed = match (&self.last_modified, &current) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(last), Some(current)) => current > last,
        };
        if !changed {
            return None;
        }

        match ClusterState::from_file(&self.path) {
            Ok(state) => {
                self.last_error = None;
                self.last_modified = current;
                Some(state)
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                None
            }
        }
    }

    /// Swap a changed state into `provider` and announce the topology update.
    ///
    /// Returns `true` when a new state was loaded.
    pub fn reload(&mut self, provider: &StaticProvider, bus: &EventBus) -> bool {
        match self.poll() {
            Some(state) => {
                info!(path = %self.path.display(), "cluster state changed, reloading");
                provider.replace(state);
                bus.publish(HealthEvent::TopologyUpdate);
                true
            }
            None => {
                if let Some(e) = &self.last_error {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "failed to reload cluster state"
                    );
                }
                false
            }
        }
    }
}

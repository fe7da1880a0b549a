//! Cluster events and cache invalidation.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{PackingPlanProvider, TopologyProvider};

/// Events published about the monitored job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// The topology or packing plan of the job changed.
    TopologyUpdate,
}

/// Broadcast bus for [`HealthEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<HealthEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(16)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Returns the number of subscribers that will see it.
    pub fn publish(&self, event: HealthEvent) -> usize {
        debug!(?event, "publishing event");
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HealthEvent> {
        self.tx.subscribe()
    }
}

/// Invalidate both caches whenever the topology changes.
///
/// A lagging receiver may have missed updates, so it invalidates as well.
/// The task ends when every sender of the bus is dropped.
pub fn spawn_invalidation_listener(
    mut rx: broadcast::Receiver<HealthEvent>,
    topology: Arc<TopologyProvider>,
    packing: Arc<PackingPlanProvider>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while apply(rx.recv().await, &topology, &packing) {}
    })
}

/// Apply one received event to the caches. Returns `false` once the bus is closed.
fn apply(
    received: Result<HealthEvent, RecvError>,
    topology: &TopologyProvider,
    packing: &PackingPlanProvider,
) -> bool {
    match received {
        Ok(HealthEvent::TopologyUpdate) => {
            info!(job = topology.job(), "topology updated, invalidating caches");
        }
        Err(RecvError::Lagged(missed)) => {
            warn!(missed, "event listener lagged, invalidating caches");
        }
        Err(RecvError::Closed) => return false,
    }
    topology.invalidate();
    packing.invalidate();
    true
}

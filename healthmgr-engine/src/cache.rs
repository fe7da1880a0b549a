//! Lazily populated caches of the topology and packing plan.
//!
//! Each cache is a `{value, version}` slot. A miss fetches from the
//! [`StateStore`] without holding the lock; the result is only stored if no
//! invalidation bumped the version in the meantime.

use std::future::Future;
use std::sync::Arc;

use healthmgr_adapters::{ProviderError, StateStore};
use healthmgr_types::{PackingPlan, Topology};
use parking_lot::RwLock;
use tracing::debug;

#[derive(Debug)]
struct Slot<T> {
    value: Option<Arc<T>>,
    version: u64,
}

/// A versioned cache slot.
#[derive(Debug)]
pub struct Cached<T> {
    slot: RwLock<Slot<T>>,
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Self {
            slot: RwLock::new(Slot {
                value: None,
                version: 0,
            }),
        }
    }
}

impl<T> Cached<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value (if any) and the version it belongs to.
    pub fn current(&self) -> (Option<Arc<T>>, u64) {
        let slot = self.slot.read();
        (slot.value.clone(), slot.version)
    }

    /// Store `value` if the slot is still at `version`.
    ///
    /// Returns `false` when an invalidation happened since `version` was read.
    pub fn store(&self, version: u64, value: Arc<T>) -> bool {
        let mut slot = self.slot.write();
        if slot.version != version {
            return false;
        }
        slot.value = Some(value);
        true
    }

    /// Clear the value and bump the version.
    pub fn invalidate(&self) {
        let mut slot = self.slot.write();
        slot.value = None;
        slot.version += 1;
    }

    pub fn version(&self) -> u64 {
        self.slot.read().version
    }

    /// Return the cached value, fetching and storing it on a miss.
    pub async fn get_or_fetch<F, Fut, E>(&self, fetch: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let (cached, version) = self.current();
        if let Some(value) = cached {
            return Ok(value);
        }

        let value = Arc::new(fetch().await?);
        if !self.store(version, value.clone()) {
            debug!("cache invalidated during fetch, value not stored");
        }
        Ok(value)
    }
}

/// Cached access to the logical topology of one job.
pub struct TopologyProvider {
    store: Arc<dyn StateStore>,
    job: String,
    cache: Cached<Topology>,
}

impl TopologyProvider {
    pub fn new(store: Arc<dyn StateStore>, job: impl Into<String>) -> Self {
        Self {
            store,
            job: job.into(),
            cache: Cached::new(),
        }
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    /// The topology, fetched from the store on a cache miss.
    pub async fn get(&self) -> Result<Arc<Topology>, ProviderError> {
        self.cache
            .get_or_fetch(move || async move {
                debug!(job = %self.job, "fetching topology");
                self.store.topology(&self.job).await
            })
            .await
    }

    pub async fn bolt_names(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.get().await?.bolt_names())
    }

    pub async fn spout_names(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.get().await?.spout_names())
    }

    /// Drop the cached topology. The next [`get`](Self::get) refetches.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }
}

/// Cached access to the packing plan of one job.
pub struct PackingPlanProvider {
    store: Arc<dyn StateStore>,
    job: String,
    cache: Cached<PackingPlan>,
}

impl PackingPlanProvider {
    pub fn new(store: Arc<dyn StateStore>, job: impl Into<String>) -> Self {
        Self {
            store,
            job: job.into(),
            cache: Cached::new(),
        }
    }

    pub async fn get(&self) -> Result<Arc<PackingPlan>, ProviderError> {
        self.cache
            .get_or_fetch(move || async move {
                debug!(job = %self.job, "fetching packing plan");
                self.store.packing_plan(&self.job).await
            })
            .await
    }

    /// Instance ids of `component` in placement order.
    pub async fn instance_names(&self, component: &str) -> Result<Vec<String>, ProviderError> {
        Ok(self.get().await?.instance_names(component))
    }

    pub fn invalidate(&self) {
        self.cache.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Store counting its calls, optionally parking inside each call.
    #[derive(Default)]
    struct CountingStore {
        topology_calls: AtomicUsize,
        packing_calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl StateStore for CountingStore {
        async fn topology(&self, job: &str) -> Result<Topology, ProviderError> {
            self.topology_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(Topology::new(job).spout("sentence", 1).bolt("bolt-1", 1).bolt("bolt-2", 2))
        }

        async fn packing_plan(&self, _job: &str) -> Result<PackingPlan, ProviderError> {
            self.packing_calls.fetch_add(1, Ordering::SeqCst);
            Ok(PackingPlan::new("plan")
                .container(1, &[("bolt-1", 1), ("bolt-2", 2)])
                .container(2, &[("bolt-2", 3)]))
        }
    }

    struct FailingStore;

    #[async_trait]
    impl StateStore for FailingStore {
        async fn topology(&self, _job: &str) -> Result<Topology, ProviderError> {
            Err(ProviderError::Connection("refused".to_string()))
        }

        async fn packing_plan(&self, _job: &str) -> Result<PackingPlan, ProviderError> {
            Err(ProviderError::Timeout)
        }
    }

    #[tokio::test]
    async fn test_cache_hit_calls_store_once() {
        let store = Arc::new(CountingStore::default());
        let provider = TopologyProvider::new(store.clone(), "word-count");

        assert_eq!(provider.bolt_names().await.unwrap(), vec!["bolt-1", "bolt-2"]);
        assert_eq!(provider.spout_names().await.unwrap(), vec!["sentence"]);
        provider.get().await.unwrap();

        assert_eq!(store.topology_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_refetches_exactly_once() {
        let store = Arc::new(CountingStore::default());
        let provider = TopologyProvider::new(store.clone(), "word-count");

        provider.get().await.unwrap();
        provider.invalidate();
        assert_eq!(store.topology_calls.load(Ordering::SeqCst), 1);

        provider.get().await.unwrap();
        provider.get().await.unwrap();
        assert_eq!(store.topology_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_packing_plan_cache() {
        let store = Arc::new(CountingStore::default());
        let provider = PackingPlanProvider::new(store.clone(), "word-count");

        assert_eq!(
            provider.instance_names("bolt-2").await.unwrap(),
            vec!["container_1_bolt-2_2", "container_2_bolt-2_3"]
        );
        assert_eq!(
            provider.instance_names("bolt-1").await.unwrap(),
            vec!["container_1_bolt-1_1"]
        );
        assert_eq!(store.packing_calls.load(Ordering::SeqCst), 1);

        provider.invalidate();
        provider.get().await.unwrap();
        assert_eq!(store.packing_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_store_errors_propagate_and_are_not_cached() {
        let provider = TopologyProvider::new(Arc::new(FailingStore), "word-count");
        assert!(provider.get().await.unwrap_err().is_unreachable());

        let packing = PackingPlanProvider::new(Arc::new(FailingStore), "word-count");
        assert!(matches!(packing.get().await, Err(ProviderError::Timeout)));
    }

    #[tokio::test]
    async fn test_invalidation_during_fetch_is_not_stored() {
        let gate = Arc::new(Notify::new());
        let store = Arc::new(CountingStore {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let provider = Arc::new(TopologyProvider::new(store.clone(), "word-count"));

        let fetching = tokio::spawn({
            let provider = provider.clone();
            async move { provider.get().await }
        });

        while store.topology_calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        provider.invalidate();
        gate.notify_one();

        // The in-flight caller still gets its value.
        let topology = fetching.await.unwrap().unwrap();
        assert_eq!(topology.bolt_count(), 2);

        // But it was not cached, so the next call goes back to the store.
        gate.notify_one();
        provider.get().await.unwrap();
        assert_eq!(store.topology_calls.load(Ordering::SeqCst), 2);
    }

    // ========================================================================
    // Slot behaviour
    // ========================================================================

    #[test]
    fn test_store_rejects_stale_version() {
        let cache: Cached<u32> = Cached::new();
        let (_, version) = cache.current();

        cache.invalidate();
        assert!(!cache.store(version, Arc::new(1)));
        assert!(cache.current().0.is_none());

        assert!(cache.store(cache.version(), Arc::new(2)));
        assert_eq!(cache.current().0.as_deref(), Some(&2));
    }
}

//! Memoized, labeled content of measurement files.
//!
//! [`DatasetCache::get`] fetches and parses a key the first time it is asked
//! for and hands out the stored table afterwards. Concurrent callers asking for
//! the same uncached key share a single fetch. Failures are never stored, so a
//! later call retries. Which entries stay resident is decided by an injected
//! [`EvictionPolicy`]; the default keeps everything for the life of the cache.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use dash_core::error::{DashError, Result};
use dash_core::key_codec::KeyCodec;
use dash_core::models::{LabeledTable, ObjectKey};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use crate::reader::read_table;
use crate::store::ObjectFetcher;

// ── Eviction policies ─────────────────────────────────────────────────────────

/// Decides which resident entries to drop after an insert.
pub trait EvictionPolicy: Send + Sync + fmt::Debug {
    /// `resident` lists cached keys oldest-insert first and already includes
    /// `inserted`. Returns the keys to drop.
    fn evict(&self, resident: &[ObjectKey], inserted: &ObjectKey) -> Vec<ObjectKey>;
}

/// Keep every entry forever.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverEvict;

impl EvictionPolicy for NeverEvict {
    fn evict(&self, _resident: &[ObjectKey], _inserted: &ObjectKey) -> Vec<ObjectKey> {
        Vec::new()
    }
}

/// Keep at most `n` entries, dropping the oldest inserts first.
///
/// The entry just inserted is never dropped, so `MaxEntries(0)` behaves like
/// `MaxEntries(1)`.
#[derive(Debug, Clone, Copy)]
pub struct MaxEntries(pub usize);

impl EvictionPolicy for MaxEntries {
    fn evict(&self, resident: &[ObjectKey], inserted: &ObjectKey) -> Vec<ObjectKey> {
        let limit = self.0.max(1);
        let excess = resident.len().saturating_sub(limit);
        resident
            .iter()
            .filter(|k| *k != inserted)
            .take(excess)
            .cloned()
            .collect()
    }
}

// ── DatasetCache ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct CacheState {
    cells: HashMap<ObjectKey, Arc<OnceCell<Arc<LabeledTable>>>>,
    /// Resolved keys, oldest insert first.
    order: Vec<ObjectKey>,
}

/// Key → parsed table map shared by every request in the process.
pub struct DatasetCache {
    fetcher: Arc<dyn ObjectFetcher>,
    codec: KeyCodec,
    policy: Box<dyn EvictionPolicy>,
    state: Mutex<CacheState>,
    fetches: AtomicUsize,
}

impl fmt::Debug for DatasetCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetCache")
            .field("prefix", &self.codec.prefix())
            .field("policy", &self.policy)
            .field("fetches", &self.fetch_count())
            .finish()
    }
}

impl DatasetCache {
    /// A cache that never evicts.
    pub fn new(fetcher: Arc<dyn ObjectFetcher>, codec: KeyCodec) -> Self {
        Self::with_policy(fetcher, codec, Box::new(NeverEvict))
    }

    pub fn with_policy(
        fetcher: Arc<dyn ObjectFetcher>,
        codec: KeyCodec,
        policy: Box<dyn EvictionPolicy>,
    ) -> Self {
        Self {
            fetcher,
            codec,
            policy,
            state: Mutex::new(CacheState::default()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    /// Labeled content of `key`, fetching and parsing it on first use.
    ///
    /// A key that does not decode fails with [`DashError::MalformedKey`]
    /// before anything is fetched; fetch and parse failures surface as
    /// [`DashError::DataUnavailable`].
    pub async fn get(&self, key: &ObjectKey) -> Result<Arc<LabeledTable>> {
        let label = self.codec.label(key)?;

        let cell = {
            let mut state = self.state.lock().await;
            Arc::clone(state.cells.entry(key.clone()).or_default())
        };

        if let Some(table) = cell.get() {
            debug!(%key, "dataset cache hit");
            return Ok(Arc::clone(table));
        }

        let loaded = AtomicBool::new(false);
        let table = match cell
            .get_or_try_init(|| async {
                loaded.store(true, Ordering::SeqCst);
                self.load(key, &label).await.map(Arc::new)
            })
            .await
        {
            Ok(table) => Arc::clone(table),
            Err(e) => {
                self.discard_unresolved(key, &cell).await;
                return Err(e);
            }
        };

        if loaded.load(Ordering::SeqCst) {
            self.record_insert(key, &cell).await;
        }
        Ok(table)
    }

    /// Number of resolved entries currently resident.
    pub async fn len(&self) -> usize {
        self.state.lock().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// `true` when `key` is resident and resolved.
    pub async fn contains(&self, key: &ObjectKey) -> bool {
        self.state
            .lock()
            .await
            .cells
            .get(key)
            .is_some_and(|cell| cell.initialized())
    }

    /// Number of times the fetcher has been called.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    async fn load(&self, key: &ObjectKey, label: &str) -> Result<LabeledTable> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let content = self
            .fetcher
            .fetch(key)
            .await
            .map_err(|e| DashError::unavailable(key.as_str(), e))?;
        let table = read_table(key, &content, label)?;
        info!(%key, rows = table.len(), "dataset cached");
        Ok(table)
    }

    /// Drop the empty cell a failed load left behind, unless another caller
    /// has filled or replaced it since.
    async fn discard_unresolved(&self, key: &ObjectKey, cell: &Arc<OnceCell<Arc<LabeledTable>>>) {
        let mut state = self.state.lock().await;
        let stale = state
            .cells
            .get(key)
            .is_some_and(|c| Arc::ptr_eq(c, cell) && !c.initialized());
        if stale {
            state.cells.remove(key);
        }
    }

    async fn record_insert(&self, key: &ObjectKey, cell: &Arc<OnceCell<Arc<LabeledTable>>>) {
        let mut state = self.state.lock().await;

        // The entry may have been evicted and re-requested meanwhile; only the
        // cell we filled counts.
        let current = state.cells.get(key).is_some_and(|c| Arc::ptr_eq(c, cell));
        if !current || state.order.contains(key) {
            return;
        }
        state.order.push(key.clone());

        let victims = self.policy.evict(&state.order, key);
        if victims.is_empty() {
            return;
        }
        state.order.retain(|k| !victims.contains(k));
        for victim in &victims {
            state.cells.remove(victim);
            debug!(key = %victim, "dataset evicted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryObjectStore;
    use async_trait::async_trait;
    use dash_core::time_utils::TimezoneHandler;
    use std::time::Duration;

    const K1: &str = "test-data/output2024-01-01T10:00:00Z_2024-01-01T12:00:00Z";
    const K2: &str = "test-data/output2024-01-02T10:00:00Z_2024-01-02T12:00:00Z";
    const K3: &str = "test-data/output2024-01-03T10:00:00Z_2024-01-03T12:00:00Z";
    const CSV: &str = "Frequency,Voltage\n100,1.5\n200,2.5\n";

    fn codec() -> KeyCodec {
        KeyCodec::new("test-data", TimezoneHandler::default()).unwrap()
    }

    fn store_with(keys: &[&str]) -> Arc<MemoryObjectStore> {
        let store = Arc::new(MemoryObjectStore::new());
        for key in keys {
            store.insert(*key, CSV);
        }
        store
    }

    #[tokio::test]
    async fn test_get_labels_rows() {
        let cache = DatasetCache::new(store_with(&[K1]), codec());
        let table = cache.get(&ObjectKey::from(K1)).await.unwrap();

        assert_eq!(table.len(), 2);
        let expected = "2024 Jan 01(Mon), 10:00.00AM <=> 2024 Jan 01(Mon), 12:00.00PM";
        assert_eq!(&*table.label, expected);
        assert!(table.rows.iter().all(|r| &*r.label == expected));
    }

    #[tokio::test]
    async fn test_second_get_does_not_fetch() {
        let store = store_with(&[K1]);
        let cache = DatasetCache::new(store.clone(), codec());
        let key = ObjectKey::from(K1);

        let first = cache.get(&key).await.unwrap();
        let second = cache.get(&key).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.fetch_count(), 1);
        assert_eq!(cache.fetch_count(), 1);
        assert!(cache.contains(&key).await);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let store = Arc::new(MemoryObjectStore::new());
        let cache = DatasetCache::new(store.clone(), codec());
        let key = ObjectKey::from(K1);

        let err = cache.get(&key).await.unwrap_err();
        assert!(matches!(err, DashError::DataUnavailable { .. }));
        assert!(!cache.contains(&key).await);
        assert!(cache.is_empty().await);

        // Upload arrives; the retry succeeds.
        store.insert(K1, CSV);
        assert_eq!(cache.get(&key).await.unwrap().len(), 2);
        assert_eq!(store.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_keys_leave_no_cells_behind() {
        let store = Arc::new(MemoryObjectStore::new());
        let cache = DatasetCache::with_policy(store.clone(), codec(), Box::new(MaxEntries(1)));

        for day in 1..=9 {
            let key = ObjectKey::from(format!(
                "test-data/output2024-01-0{d}T10:00:00Z_2024-01-0{d}T12:00:00Z",
                d = day
            ));
            assert!(cache.get(&key).await.is_err());
        }

        assert_eq!(cache.len().await, 0);
        assert!(cache.state.lock().await.cells.is_empty());
        assert_eq!(store.fetch_count(), 9);
    }

    #[tokio::test]
    async fn test_parse_failure_is_data_unavailable() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert(K1, "Frequency,Voltage\n1,2,3\n");
        let cache = DatasetCache::new(store, codec());

        let err = cache.get(&ObjectKey::from(K1)).await.unwrap_err();
        assert!(matches!(err, DashError::DataUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_malformed_key_is_not_fetched() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("test-data/readme.txt", CSV);
        let cache = DatasetCache::new(store.clone(), codec());

        let err = cache.get(&ObjectKey::from("test-data/readme.txt")).await.unwrap_err();
        assert!(matches!(err, DashError::MalformedKey { .. }));
        assert_eq!(store.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_isolated_instances() {
        let store = store_with(&[K1]);
        let a = DatasetCache::new(store.clone(), codec());
        let b = DatasetCache::new(store.clone(), codec());

        a.get(&ObjectKey::from(K1)).await.unwrap();
        b.get(&ObjectKey::from(K1)).await.unwrap();
        assert_eq!(store.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_max_entries_evicts_oldest() {
        let store = store_with(&[K1, K2, K3]);
        let cache = DatasetCache::with_policy(store.clone(), codec(), Box::new(MaxEntries(2)));

        for key in [K1, K2, K3] {
            cache.get(&ObjectKey::from(key)).await.unwrap();
        }

        assert_eq!(cache.len().await, 2);
        assert!(!cache.contains(&ObjectKey::from(K1)).await);
        assert!(cache.contains(&ObjectKey::from(K3)).await);

        // Evicted entry is fetched again.
        cache.get(&ObjectKey::from(K1)).await.unwrap();
        assert_eq!(store.fetch_count(), 4);
    }

    #[test]
    fn test_max_entries_never_drops_inserted() {
        let resident = vec![ObjectKey::from("a"), ObjectKey::from("b")];
        let victims = MaxEntries(0).evict(&resident, &ObjectKey::from("b"));
        assert_eq!(victims, vec![ObjectKey::from("a")]);
    }

    #[test]
    fn test_never_evict() {
        let resident = vec![ObjectKey::from("a"); 1000];
        assert!(NeverEvict.evict(&resident, &ObjectKey::from("a")).is_empty());
    }

    /// Fetcher that takes a while, so concurrent callers overlap.
    struct SlowFetcher {
        inner: MemoryObjectStore,
    }

    #[async_trait]
    impl ObjectFetcher for SlowFetcher {
        async fn fetch(&self, key: &ObjectKey) -> Result<Vec<u8>> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.inner.fetch(key).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_gets_share_one_fetch() {
        let inner = MemoryObjectStore::new();
        inner.insert(K1, CSV);
        let fetcher = Arc::new(SlowFetcher { inner });
        let cache = Arc::new(DatasetCache::new(fetcher.clone(), codec()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get(&ObjectKey::from(K1)).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().len(), 2);
        }
        assert_eq!(fetcher.inner.fetch_count(), 1);
        assert_eq!(cache.len().await, 1);
    }
}

//! End-to-end behavior of the read and write paths over in-process backends:
//! single-flight refreshes, partial batch failures, bounded write concurrency
//! and name resolution.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use catalog_sync::cache::{CacheError, MemoryCache, NameCache};
use catalog_sync::config::{BatchConfig, Config};
use catalog_sync::core::RefreshState;
use catalog_sync::store::{CatalogStore, MemoryStore, SqliteStore, StoreError};
use catalog_sync::{
    BatchWriter, CatalogEntry, CatalogOrigin, CatalogService, FetchError, NameIndex,
    SearchResolver, SyncCoordinator, SyncError,
};

/// Origin that sleeps before answering and counts every fetch
struct SlowOrigin {
    delay: Duration,
    result: Result<Vec<CatalogEntry>, FetchError>,
    calls: AtomicUsize,
}

impl SlowOrigin {
    fn ok(delay: Duration, entries: Vec<CatalogEntry>) -> Arc<Self> {
        Arc::new(Self {
            delay,
            result: Ok(entries),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(delay: Duration, err: FetchError) -> Arc<Self> {
        Arc::new(Self {
            delay,
            result: Err(err),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogOrigin for SlowOrigin {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.result.clone()
    }
}

/// Store wrapper that counts calls, tracks in-flight upserts and can fail
/// any batch containing a chosen id
#[derive(Default)]
struct InstrumentedStore {
    inner: MemoryStore,
    upsert_delay: Duration,
    fail_on_id: Option<i64>,
    upserts: AtomicUsize,
    name_queries: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[async_trait]
impl CatalogStore for InstrumentedStore {
    async fn upsert_batch(&self, batch: &[CatalogEntry]) -> Result<(), StoreError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.upsert_delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(bad) = self.fail_on_id {
            if batch.iter().any(|e| e.id == bad) {
                return Err(StoreError::Backend(format!("constraint violation on {bad}")));
            }
        }
        self.inner.upsert_batch(batch).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<CatalogEntry>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_lower_names(
        &self,
        lower_names: &[String],
    ) -> Result<Vec<CatalogEntry>, StoreError> {
        self.name_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_lower_names(lower_names).await
    }

    async fn load_all(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        self.inner.load_all().await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.inner.count().await
    }
}

/// Cache that counts calls and optionally fails every command
#[derive(Default)]
struct InstrumentedCache {
    inner: MemoryCache,
    broken: bool,
    calls: AtomicUsize,
}

impl InstrumentedCache {
    fn check(&self) -> Result<(), CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.broken {
            return Err(CacheError::Connection("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl NameCache for InstrumentedCache {
    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>, CacheError> {
        self.check()?;
        self.inner.hash_get_all(key).await
    }

    async fn hash_get_many(
        &self,
        key: &str,
        fields: &[String],
    ) -> Result<Vec<Option<String>>, CacheError> {
        self.check()?;
        self.inner.hash_get_many(key, fields).await
    }

    async fn hash_set_all(
        &self,
        key: &str,
        fields: Vec<(String, String)>,
    ) -> Result<(), CacheError> {
        self.check()?;
        self.inner.hash_set_all(key, fields).await
    }
}

fn apps(count: i64) -> Vec<CatalogEntry> {
    (1..=count)
        .map(|i| CatalogEntry::new(i, format!("App {i}")))
        .collect()
}

fn service(
    origin: Arc<SlowOrigin>,
    cache: Arc<dyn NameCache>,
    store: Arc<dyn CatalogStore>,
) -> CatalogService {
    CatalogService::from_parts(Config::default(), origin, cache, store)
}

#[tokio::test]
async fn test_concurrent_cold_reads_share_one_fetch() {
    let origin = SlowOrigin::ok(Duration::from_millis(100), apps(5));
    let service = service(
        origin.clone(),
        Arc::new(MemoryCache::new()),
        Arc::new(MemoryStore::new()),
    );

    let mut handles = Vec::new();
    for i in 0..20 {
        let lookup = service.lookup.clone();
        handles.push(tokio::spawn(async move { lookup.get(i % 5 + 1).await }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().starts_with("App "));
    }

    assert_eq!(origin.calls(), 1);
}

#[tokio::test]
async fn test_failed_refresh_reaches_every_waiter() {
    let err = FetchError::Status {
        target: "http://origin/apps".to_string(),
        status: 403,
    };
    let origin = SlowOrigin::failing(Duration::from_millis(100), err.clone());
    let service = service(
        origin.clone(),
        Arc::new(MemoryCache::new()),
        Arc::new(MemoryStore::new()),
    );

    let mut handles = Vec::new();
    for _ in 0..10 {
        let coordinator = service.coordinator.clone();
        handles.push(tokio::spawn(async move { coordinator.refresh().await }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap_err(), SyncError::Fetch(err.clone()));
    }

    assert_eq!(origin.calls(), 1);
    assert!(service.coordinator.snapshot().is_empty());

    // A later call starts a fresh cycle
    assert!(service.coordinator.refresh().await.is_err());
    assert_eq!(origin.calls(), 2);
}

#[tokio::test]
async fn test_cancelled_waiter_does_not_cancel_refresh() {
    let origin = SlowOrigin::ok(Duration::from_millis(200), apps(3));
    let store = Arc::new(MemoryStore::new());
    let service = service(origin.clone(), Arc::new(MemoryCache::new()), store.clone());

    let coordinator = service.coordinator.clone();
    let impatient = tokio::spawn(async move { coordinator.refresh().await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    impatient.abort();

    let index = service.coordinator.refresh().await.unwrap();

    assert_eq!(index.len(), 3);
    assert_eq!(store.rows().len(), 3);
    assert_eq!(origin.calls(), 1);
}

#[tokio::test]
async fn test_failing_batch_leaves_others_committed() {
    let store = Arc::new(InstrumentedStore {
        fail_on_id: Some(5),
        ..InstrumentedStore::default()
    });
    let writer = BatchWriter::new(
        Arc::new(MemoryCache::new()),
        store.clone(),
        "apps",
        &BatchConfig {
            size: 2,
            concurrency: 2,
        },
    );

    let err = writer.persist_to_store(&apps(10)).await.unwrap_err();

    match err {
        StoreError::BatchesFailed {
            failed,
            total_batches,
            entries_failed,
        } => {
            assert_eq!(total_batches, 5);
            assert_eq!(entries_failed, 2);
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].batch_number, 3);
            assert_eq!(failed[0].ids, vec![5, 6]);
        }
        other => panic!("expected BatchesFailed, got {other:?}"),
    }

    let committed: Vec<i64> = store.inner.rows().iter().map(|e| e.id).collect();
    assert_eq!(committed, vec![1, 2, 3, 4, 7, 8, 9, 10]);
    assert_eq!(store.upserts.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_store_failure_fails_cycle_and_keeps_snapshot() {
    let origin = SlowOrigin::ok(Duration::ZERO, apps(4));
    let store = Arc::new(InstrumentedStore {
        fail_on_id: Some(2),
        ..InstrumentedStore::default()
    });
    let service = service(origin, Arc::new(MemoryCache::new()), store);

    let err = service.coordinator.refresh().await.unwrap_err();

    assert!(matches!(err, SyncError::Store(StoreError::BatchesFailed { .. })));
    assert!(service.coordinator.snapshot().is_empty());
    assert!(!service.coordinator.last_outcome().unwrap().succeeded);
}

#[tokio::test]
async fn test_batch_concurrency_is_bounded() {
    let store = Arc::new(InstrumentedStore {
        upsert_delay: Duration::from_millis(20),
        ..InstrumentedStore::default()
    });
    let writer = BatchWriter::new(
        Arc::new(MemoryCache::new()),
        store.clone(),
        "apps",
        &BatchConfig {
            size: 1,
            concurrency: 3,
        },
    );

    let report = writer.persist_to_store(&apps(12)).await.unwrap();

    assert_eq!(report.batches, 12);
    let max = store.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 3, "saw {max} concurrent upserts");
    assert!(max >= 2, "batches never overlapped");
}

#[tokio::test]
async fn test_empty_inputs_touch_no_backend() {
    let cache = Arc::new(InstrumentedCache::default());
    let store = Arc::new(InstrumentedStore::default());
    let writer = BatchWriter::new(cache.clone(), store.clone(), "apps", &BatchConfig::default());
    let resolver = SearchResolver::new(cache.clone(), "apps", store.clone());

    writer.persist_to_store(&[]).await.unwrap();
    writer.persist_to_cache(&NameIndex::new()).await.unwrap();
    assert!(resolver.resolve(&[]).await.unwrap().is_empty());

    assert_eq!(cache.calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.upserts.load(Ordering::SeqCst), 0);
    assert_eq!(store.name_queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_case_variants_resolve_with_one_store_query() {
    let cache = Arc::new(MemoryCache::new());
    let store = Arc::new(InstrumentedStore::default());
    let writer = BatchWriter::new(cache.clone(), store.clone(), "apps", &BatchConfig::default());
    writer
        .persist_to_store(&[
            CatalogEntry::new(5, "Dedicated Server"),
            CatalogEntry::new(10, "Alpha"),
            CatalogEntry::new(10, "Alpha Remastered"),
        ])
        .await
        .unwrap();

    let resolver = SearchResolver::new(cache, "apps", store.clone());
    let names = vec!["Alpha".to_string(), "alpha".to_string(), "ALPHA".to_string()];
    let found = resolver.resolve(&names).await.unwrap();

    assert_eq!(found.len(), 3);
    assert!(found.values().all(|&id| id == 10));
    assert_eq!(store.name_queries.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_resolve_prefers_cache_then_store() {
    let cache = Arc::new(InstrumentedCache::default());
    cache
        .inner
        .hash_set_all("apps", vec![("Dota 2".to_string(), "570".to_string())])
        .await
        .unwrap();
    let store = Arc::new(InstrumentedStore::default());
    store
        .inner
        .upsert_batch(&[CatalogEntry::new(730, "Counter-Strike 2")])
        .await
        .unwrap();
    let resolver = SearchResolver::new(cache.clone(), "apps", store.clone());

    let all_cached = resolver.resolve(&["Dota 2".to_string()]).await.unwrap();
    assert_eq!(all_cached["Dota 2"], 570);
    assert_eq!(store.name_queries.load(Ordering::SeqCst), 0);

    let names = vec![
        "Dota 2".to_string(),
        "COUNTER-STRIKE 2".to_string(),
        "Unknown".to_string(),
    ];
    let found = resolver.resolve(&names).await.unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found["COUNTER-STRIKE 2"], 730);
    assert_eq!(store.name_queries.load(Ordering::SeqCst), 1);
    assert_eq!(cache.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_broken_cache_does_not_fail_reads_or_refreshes() {
    let origin = SlowOrigin::ok(Duration::ZERO, apps(3));
    let cache = Arc::new(InstrumentedCache {
        broken: true,
        ..InstrumentedCache::default()
    });
    let store = Arc::new(InstrumentedStore::default());
    let service = service(origin.clone(), cache, store.clone());

    // Cold read escalates past the broken cache and refreshes
    assert_eq!(service.lookup.get(2).await.unwrap(), "App 2");
    assert_eq!(origin.calls(), 1);
    assert_eq!(store.inner.rows().len(), 3);

    // Resolve falls back to the store for every name
    let found = service
        .resolver
        .resolve(&["app 3".to_string()])
        .await
        .unwrap();
    assert_eq!(found["app 3"], 3);
}

#[tokio::test]
async fn test_rebuild_from_store_after_snapshot_cleared() {
    let origin = SlowOrigin::ok(Duration::ZERO, apps(3));
    let cache = Arc::new(MemoryCache::new());
    let store = Arc::new(MemoryStore::new());
    let writer = BatchWriter::new(cache.clone(), store.clone(), "apps", &BatchConfig::default());
    let coordinator = SyncCoordinator::new(origin.clone(), writer, Arc::new(RefreshState::new()));
    let lookup = catalog_sync::TieredLookup::new(cache.clone(), "apps", store.clone(), coordinator.clone());

    coordinator.refresh().await.unwrap();
    coordinator.clear_snapshot();
    let served = lookup.get_all().await.unwrap();

    assert_eq!(served.len(), 3);
    assert_eq!(origin.calls(), 1);
}

#[tokio::test]
async fn test_repeated_persist_to_sqlite_is_idempotent() {
    let store = Arc::new(SqliteStore::connect("sqlite::memory:", 1).await.unwrap());
    let writer = BatchWriter::new(
        Arc::new(MemoryCache::new()),
        store.clone(),
        "apps",
        &BatchConfig {
            size: 3,
            concurrency: 2,
        },
    );
    let mut entries = apps(10);
    entries.push(CatalogEntry::new(4, "App 4 Deluxe"));

    let first_report = writer.persist_to_store(&entries).await.unwrap();
    let first = store.load_all().await.unwrap();
    let second_report = writer.persist_to_store(&entries).await.unwrap();
    let second = store.load_all().await.unwrap();

    assert_eq!(first, apps(10));
    assert_eq!(first, second);
    assert_eq!(first_report.entries, second_report.entries);
    assert_eq!(store.count().await.unwrap(), 10);
}

#[tokio::test]
async fn test_resolve_large_input_against_sqlite() {
    let store = Arc::new(SqliteStore::connect("sqlite::memory:", 1).await.unwrap());
    let cache = Arc::new(MemoryCache::new());
    let writer = BatchWriter::new(cache.clone(), store.clone(), "apps", &BatchConfig::default());
    writer.persist_to_store(&apps(40_000)).await.unwrap();

    let resolver = SearchResolver::new(cache, "apps", store);
    let names: Vec<String> = (1..=40_000).map(|i| format!("app {i}")).collect();
    let found = resolver.resolve(&names).await.unwrap();

    assert_eq!(found.len(), 40_000);
    assert_eq!(found["app 1"], 1);
    assert_eq!(found["app 40000"], 40_000);
}

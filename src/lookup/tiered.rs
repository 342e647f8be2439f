use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{LookupError, Tier};
use crate::cache::{decode_index, NameCache};
use crate::core::index::NameIndex;
use crate::core::snapshot::RefreshState;
use crate::store::CatalogStore;
use crate::sync::SyncCoordinator;

/// Read-through lookup over snapshot, cache, store and origin.
///
/// Each tier is consulted only when every tier before it is empty. Cache
/// failures count as empty; store failures propagate because the store is
/// the system of record. When every tier is empty the read blocks on a full
/// refresh, which concurrent readers share.
#[derive(Clone)]
pub struct TieredLookup {
    snapshot: Arc<RefreshState>,
    cache: Arc<dyn NameCache>,
    cache_key: String,
    store: Arc<dyn CatalogStore>,
    coordinator: SyncCoordinator,
}

impl TieredLookup {
    pub fn new(
        cache: Arc<dyn NameCache>,
        cache_key: impl Into<String>,
        store: Arc<dyn CatalogStore>,
        coordinator: SyncCoordinator,
    ) -> Self {
        Self {
            snapshot: Arc::clone(coordinator.snapshot()),
            cache,
            cache_key: cache_key.into(),
            store,
            coordinator,
        }
    }

    /// Name of the entry with `id`.
    ///
    /// # Errors
    ///
    /// `LookupError::NotFound` when a populated tier has no such id, or the
    /// store or refresh error when those tiers fail.
    pub async fn get(&self, id: i64) -> Result<String, LookupError> {
        self.get_with_tier(id).await.map(|(name, _)| name)
    }

    /// Like [`get`](Self::get), also reporting which tier answered
    pub async fn get_with_tier(&self, id: i64) -> Result<(String, Tier), LookupError> {
        if let Some(index) = self.populated_snapshot() {
            debug!("Serving id {id} from in-process snapshot");
            return index
                .name_of(id)
                .map(|name| (name.to_string(), Tier::Snapshot))
                .ok_or(LookupError::NotFound(id));
        }

        if let Some(index) = self.cached_index().await {
            if let Some(name) = index.name_of(id) {
                debug!("Serving id {id} from cache");
                return Ok((name.to_string(), Tier::Cache));
            }
            // The hash only keeps one id per name, so a miss here is not final
            debug!("Id {id} not in cache hash; checking store");
        }

        if let Some(entry) = self.store.find_by_id(id).await? {
            return Ok((entry.name, Tier::Store));
        }
        if self.store.count().await? > 0 {
            return Err(LookupError::NotFound(id));
        }

        info!("All tiers empty; refreshing catalog from origin");
        let index = self.coordinator.refresh().await?;
        index
            .name_of(id)
            .map(|name| (name.to_string(), Tier::Origin))
            .ok_or(LookupError::NotFound(id))
    }

    /// The full name index.
    ///
    /// # Errors
    ///
    /// Propagates store read errors and refresh errors.
    pub async fn get_all(&self) -> Result<Arc<NameIndex>, LookupError> {
        self.get_all_with_tier().await.map(|(index, _)| index)
    }

    /// Like [`get_all`](Self::get_all), also reporting which tier answered
    pub async fn get_all_with_tier(&self) -> Result<(Arc<NameIndex>, Tier), LookupError> {
        if let Some(index) = self.populated_snapshot() {
            debug!("Serving {} names from in-process snapshot", index.len());
            return Ok((index, Tier::Snapshot));
        }

        if let Some(index) = self.cached_index().await {
            debug!("Serving {} names from cache", index.len());
            return Ok((Arc::new(index), Tier::Cache));
        }

        let rows = self.store.load_all().await?;
        if !rows.is_empty() {
            let index = NameIndex::from_entries(&rows);
            info!("Loaded {} names from store; re-warming cache", index.len());
            self.coordinator.warm_cache(&index).await;
            return Ok((Arc::new(index), Tier::Store));
        }

        info!("All tiers empty; refreshing catalog from origin");
        let index = self.coordinator.refresh().await?;
        Ok((index, Tier::Origin))
    }

    fn populated_snapshot(&self) -> Option<Arc<NameIndex>> {
        self.snapshot.index().filter(|index| !index.is_empty())
    }

    async fn cached_index(&self) -> Option<NameIndex> {
        match self.cache.hash_get_all(&self.cache_key).await {
            Ok(pairs) if pairs.is_empty() => None,
            Ok(pairs) => Some(decode_index(pairs)).filter(|index| !index.is_empty()),
            Err(err) => {
                warn!("Cache read failed, falling through to store: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::BatchConfig;
    use crate::core::entry::CatalogEntry;
    use crate::origin::{CatalogOrigin, FetchError};
    use crate::store::MemoryStore;
    use crate::sync::BatchWriter;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingOrigin {
        entries: Vec<CatalogEntry>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CatalogOrigin for CountingOrigin {
        async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.entries.clone())
        }
    }

    struct Fixture {
        lookup: TieredLookup,
        cache: Arc<MemoryCache>,
        store: Arc<MemoryStore>,
        origin: Arc<CountingOrigin>,
    }

    fn fixture(entries: Vec<CatalogEntry>) -> Fixture {
        let cache = Arc::new(MemoryCache::new());
        let store = Arc::new(MemoryStore::new());
        let origin = Arc::new(CountingOrigin {
            entries,
            calls: AtomicUsize::new(0),
        });
        let writer = BatchWriter::new(cache.clone(), store.clone(), "apps", &BatchConfig::default());
        let coordinator =
            SyncCoordinator::new(origin.clone(), writer, Arc::new(RefreshState::new()));
        let lookup = TieredLookup::new(cache.clone(), "apps", store.clone(), coordinator);
        Fixture {
            lookup,
            cache,
            store,
            origin,
        }
    }

    #[tokio::test]
    async fn test_cold_start_refreshes_from_origin() {
        let f = fixture(vec![CatalogEntry::new(570, "Dota 2")]);

        let (name, tier) = f.lookup.get_with_tier(570).await.unwrap();

        assert_eq!(name, "Dota 2");
        assert_eq!(tier, Tier::Origin);
        assert_eq!(f.origin.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.cache.field_count("apps"), 1);

        // Second read comes from the snapshot
        let (_, tier) = f.lookup.get_with_tier(570).await.unwrap();
        assert_eq!(tier, Tier::Snapshot);
        assert_eq!(f.origin.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_tier_serves_when_snapshot_empty() {
        let f = fixture(Vec::new());
        f.cache
            .hash_set_all("apps", vec![("Dota 2".to_string(), "570".to_string())])
            .await
            .unwrap();

        let (index, tier) = f.lookup.get_all_with_tier().await.unwrap();

        assert_eq!(tier, Tier::Cache);
        assert_eq!(index.id_of("Dota 2"), Some(570));
        assert_eq!(f.origin.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_tier_rewarms_cache() {
        let f = fixture(Vec::new());
        f.store
            .upsert_batch(&[CatalogEntry::new(1, "One"), CatalogEntry::new(2, "Two")])
            .await
            .unwrap();

        let (index, tier) = f.lookup.get_all_with_tier().await.unwrap();

        assert_eq!(tier, Tier::Store);
        assert_eq!(index.len(), 2);
        assert_eq!(f.cache.field_count("apps"), 2);
        assert_eq!(f.origin.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_id_in_populated_store_is_not_found() {
        let f = fixture(vec![CatalogEntry::new(1, "One")]);
        f.store.upsert_batch(&[CatalogEntry::new(1, "One")]).await.unwrap();

        let err = f.lookup.get(99).await.unwrap_err();

        assert_eq!(err, LookupError::NotFound(99));
        assert_eq!(f.origin.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_id_shadowed_in_cache_falls_through_to_store() {
        let f = fixture(Vec::new());
        f.cache
            .hash_set_all("apps", vec![("Alpha".to_string(), "10".to_string())])
            .await
            .unwrap();
        f.store
            .upsert_batch(&[CatalogEntry::new(10, "Alpha"), CatalogEntry::new(11, "Alpha")])
            .await
            .unwrap();

        let (name, tier) = f.lookup.get_with_tier(11).await.unwrap();

        assert_eq!(name, "Alpha");
        assert_eq!(tier, Tier::Store);
    }

    #[tokio::test]
    async fn test_malformed_cache_counts_as_empty() {
        let f = fixture(vec![CatalogEntry::new(1, "One")]);
        f.cache
            .hash_set_all("apps", vec![("One".to_string(), "not-a-number".to_string())])
            .await
            .unwrap();

        let (_, tier) = f.lookup.get_all_with_tier().await.unwrap();

        assert_eq!(tier, Tier::Origin);
    }
}

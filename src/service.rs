//! Wires the components together from a [`Config`].

use anyhow::Context;
use std::sync::Arc;
use tracing::info;

use crate::cache::{MemoryCache, NameCache, RedisCache};
use crate::config::Config;
use crate::core::snapshot::RefreshState;
use crate::lookup::{SearchResolver, TieredLookup};
use crate::origin::{CatalogOrigin, HttpOrigin};
use crate::store::{CatalogStore, SqliteStore};
use crate::sync::{BatchWriter, Scheduler, SyncCoordinator};

/// One process-wide set of catalog components sharing a single snapshot,
/// cache connection and store pool.
#[derive(Clone)]
pub struct CatalogService {
    pub coordinator: SyncCoordinator,
    pub lookup: TieredLookup,
    pub resolver: SearchResolver,
    config: Arc<Config>,
}

impl CatalogService {
    /// Build every component from configuration.
    ///
    /// Uses Redis when `cache.url` is set and an in-process cache otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a backend cannot
    /// be reached.
    pub async fn connect(config: Config) -> anyhow::Result<Self> {
        config.validate().context("Invalid configuration")?;

        let origin = HttpOrigin::new(&config.origin).context("Failed to build origin client")?;
        info!("Catalog origin: {}", origin.target());

        let cache: Arc<dyn NameCache> = match &config.cache.url {
            Some(url) => Arc::new(
                RedisCache::connect(url)
                    .await
                    .context("Failed to connect to cache")?,
            ),
            None => {
                info!("No cache URL configured; using in-process cache");
                Arc::new(MemoryCache::new())
            }
        };

        let store = SqliteStore::connect(&config.store.url, config.store.max_connections)
            .await
            .context("Failed to open catalog store")?;

        Ok(Self::from_parts(config, Arc::new(origin), cache, Arc::new(store)))
    }

    /// Build the service around already-constructed backends
    pub fn from_parts(
        config: Config,
        origin: Arc<dyn CatalogOrigin>,
        cache: Arc<dyn NameCache>,
        store: Arc<dyn CatalogStore>,
    ) -> Self {
        let key = config.cache.key.clone();
        let writer = BatchWriter::new(Arc::clone(&cache), Arc::clone(&store), &key, &config.batch);
        let coordinator = SyncCoordinator::new(origin, writer, Arc::new(RefreshState::new()));
        let lookup = TieredLookup::new(
            Arc::clone(&cache),
            &key,
            Arc::clone(&store),
            coordinator.clone(),
        );
        let resolver = SearchResolver::new(cache, &key, store);

        Self {
            coordinator,
            lookup,
            resolver,
            config: Arc::new(config),
        }
    }

    /// Scheduler configured from the `[scheduler]` section
    pub fn scheduler(&self) -> Scheduler {
        Scheduler::from_config(self.coordinator.clone(), &self.config.scheduler)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::cache::{CacheError, NameCache};
use crate::config::BatchConfig;
use crate::core::entry::{dedup_by_id, CatalogEntry};
use crate::core::index::NameIndex;
use crate::store::{CatalogStore, FailedBatch, StoreError};

/// Summary of a successful store write
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistReport {
    /// Entries written after dropping duplicate ids
    pub entries: usize,
    pub batches: usize,
    /// Entries skipped because their id appeared earlier in the input
    pub duplicates_dropped: usize,
    pub elapsed_ms: u64,
}

/// The only component that mutates the cache hash and the store table.
///
/// Store writes are split into fixed-size batches; at most `concurrency`
/// batches run at once, each on its own task. A failing batch never cancels
/// its siblings and nothing is rolled back.
pub struct BatchWriter {
    cache: Arc<dyn NameCache>,
    store: Arc<dyn CatalogStore>,
    cache_key: String,
    batch_size: usize,
    concurrency: usize,
}

impl BatchWriter {
    pub fn new(
        cache: Arc<dyn NameCache>,
        store: Arc<dyn CatalogStore>,
        cache_key: impl Into<String>,
        batch: &BatchConfig,
    ) -> Self {
        Self {
            cache,
            store,
            cache_key: cache_key.into(),
            batch_size: batch.size.max(1),
            concurrency: batch.concurrency.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Publish the whole index to the cache hash in one bulk write.
    ///
    /// # Errors
    ///
    /// Returns the cache error unchanged; callers treat it as non-fatal.
    pub async fn persist_to_cache(&self, index: &NameIndex) -> Result<(), CacheError> {
        if index.is_empty() {
            info!("Cache write skipped: index is empty");
            return Ok(());
        }

        info!("Cache write started for {} names", index.len());
        let fields = index.to_cache_fields();
        self.cache.hash_set_all(&self.cache_key, fields).await?;
        info!("Saved {} names to cache hash {}", index.len(), self.cache_key);
        Ok(())
    }

    /// Upsert every entry into the store in bounded-concurrency batches.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::BatchesFailed` listing every batch that failed;
    /// batches that succeeded stay committed.
    pub async fn persist_to_store(
        &self,
        entries: &[CatalogEntry],
    ) -> Result<PersistReport, StoreError> {
        if entries.is_empty() {
            info!("No entries to persist");
            return Ok(PersistReport::default());
        }

        let started = Instant::now();
        let (entries, duplicates_dropped) = dedup_by_id(entries);
        if duplicates_dropped > 0 {
            debug!("Dropped {duplicates_dropped} entries with duplicate ids");
        }

        let batches: Vec<Vec<CatalogEntry>> = entries
            .chunks(self.batch_size)
            .map(<[CatalogEntry]>::to_vec)
            .collect();
        let total_batches = batches.len();

        info!(
            "Starting bulk upsert of {} entries in {} batches (batch size={}, concurrency={})",
            entries.len(),
            total_batches,
            self.batch_size,
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut pending: HashMap<usize, Vec<i64>> = HashMap::with_capacity(total_batches);
        let mut tasks = JoinSet::new();

        for (i, batch) in batches.into_iter().enumerate() {
            let batch_number = i + 1;
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;

            pending.insert(batch_number, batch.iter().map(|e| e.id).collect());
            let store = Arc::clone(&self.store);
            tasks.spawn(async move {
                let _permit = permit;
                debug!("Executing batch {batch_number} ({} entries)", batch.len());
                let result = store.upsert_batch(&batch).await;
                (batch_number, result)
            });
        }

        let mut failed = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((batch_number, Ok(()))) => {
                    pending.remove(&batch_number);
                    debug!("Batch {batch_number} execution completed");
                }
                Ok((batch_number, Err(err))) => {
                    error!("Batch {batch_number} failed during execution: {err}");
                    let ids = pending.remove(&batch_number).unwrap_or_default();
                    failed.push(FailedBatch {
                        batch_number,
                        ids,
                        reason: err.to_string(),
                    });
                }
                Err(err) => error!("Batch task aborted: {err}"),
            }
        }

        // Anything left never reported back (panicked task)
        for (batch_number, ids) in pending {
            failed.push(FailedBatch {
                batch_number,
                ids,
                reason: "batch task aborted".to_string(),
            });
        }

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if failed.is_empty() {
            info!(
                "Bulk upsert completed for {} entries. Total time: {} ms",
                entries.len(),
                elapsed_ms
            );
            return Ok(PersistReport {
                entries: entries.len(),
                batches: total_batches,
                duplicates_dropped,
                elapsed_ms,
            });
        }

        failed.sort_by_key(|f| f.batch_number);
        let entries_failed = failed.iter().map(|f| f.ids.len()).sum();
        error!(
            "Bulk upsert FAILED for {} of {} batches ({} entries not persisted). Total time: {} ms",
            failed.len(),
            total_batches,
            entries_failed,
            elapsed_ms
        );
        Err(StoreError::BatchesFailed {
            failed,
            total_batches,
            entries_failed,
        })
    }
}

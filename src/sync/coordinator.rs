use chrono::Utc;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::writer::BatchWriter;
use crate::core::index::NameIndex;
use crate::core::snapshot::RefreshState;
use crate::core::types::{RefreshOutcome, SyncState};
use crate::origin::{CatalogOrigin, FetchError};
use crate::store::StoreError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Catalog fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Catalog store write failed: {0}")]
    Store(#[from] StoreError),

    #[error("Origin returned an empty catalog; keeping previous data")]
    EmptyCatalog,

    #[error("Refresh cycle aborted: {0}")]
    Aborted(String),
}

type RefreshResult = Result<Arc<NameIndex>, SyncError>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshResult>>;

struct Flight {
    state: SyncState,
    current: Option<SharedRefresh>,
    last: Option<RefreshOutcome>,
}

struct Inner {
    origin: Arc<dyn CatalogOrigin>,
    writer: BatchWriter,
    snapshot: Arc<RefreshState>,
    flight: Mutex<Flight>,
}

/// Runs full refresh cycles: origin fetch, then cache and store writes.
///
/// At most one cycle is active at a time. A `refresh()` call that arrives
/// while a cycle is running attaches to that cycle and receives its result.
/// The cycle itself runs on a spawned task, so a waiter that gives up never
/// cancels the work other waiters depend on.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

impl SyncCoordinator {
    pub fn new(
        origin: Arc<dyn CatalogOrigin>,
        writer: BatchWriter,
        snapshot: Arc<RefreshState>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                origin,
                writer,
                snapshot,
                flight: Mutex::new(Flight {
                    state: SyncState::Idle,
                    current: None,
                    last: None,
                }),
            }),
        }
    }

    /// Run a refresh cycle, or wait for the one already running.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Every waiter of a failed cycle receives the same `SyncError`.
    pub async fn refresh(&self) -> Result<Arc<NameIndex>, SyncError> {
        let flight = self.join_or_start();
        flight.await
    }

    fn join_or_start(&self) -> SharedRefresh {
        let mut flight = self.inner.flight.lock();
        if let Some(current) = &flight.current {
            debug!("Joining in-flight refresh cycle");
            return current.clone();
        }

        flight.state = SyncState::Fetching;
        let inner = Arc::clone(&self.inner);
        // The task needs the lock to finish, so it cannot clear `current`
        // before it has been stored below.
        let handle = tokio::spawn(async move {
            let result = match AssertUnwindSafe(inner.run_cycle()).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(SyncError::Aborted("refresh cycle panicked".to_string())),
            };
            inner.finish(&result);
            result
        });

        let shared = async move {
            handle
                .await
                .unwrap_or_else(|e| Err(SyncError::Aborted(e.to_string())))
        }
        .boxed()
        .shared();

        flight.current = Some(shared.clone());
        shared
    }

    /// Publish an index to the cache without failing the caller.
    ///
    /// Used to re-warm the cache from the store; goes through the writer so
    /// the writer stays the only mutator of the cache.
    pub async fn warm_cache(&self, index: &NameIndex) {
        if let Err(err) = self.inner.writer.persist_to_cache(index).await {
            warn!("Failed to re-warm cache: {err}");
        }
    }

    /// Current phase of the state machine
    pub fn state(&self) -> SyncState {
        self.inner.flight.lock().state
    }

    /// Outcome of the most recently finished cycle
    pub fn last_outcome(&self) -> Option<RefreshOutcome> {
        self.inner.flight.lock().last.clone()
    }

    pub fn snapshot(&self) -> &Arc<RefreshState> {
        &self.inner.snapshot
    }

    /// Drop the in-process snapshot; later reads fall through to the cache
    pub fn clear_snapshot(&self) {
        self.inner.snapshot.clear();
        debug!("In-process snapshot cleared");
    }
}

impl Inner {
    fn set_state(&self, state: SyncState) {
        self.flight.lock().state = state;
    }

    async fn run_cycle(&self) -> RefreshResult {
        info!("Refresh cycle started");
        let started = Instant::now();

        let entries = match self.origin.fetch_catalog().await {
            Ok(entries) => entries,
            Err(err) => {
                self.set_state(SyncState::Failed);
                error!("Refresh cycle failed while fetching: {err}");
                return Err(err.into());
            }
        };

        if entries.is_empty() {
            self.set_state(SyncState::Failed);
            warn!("Origin returned no entries; refresh abandoned");
            return Err(SyncError::EmptyCatalog);
        }

        self.set_state(SyncState::Persisting);
        let index = Arc::new(NameIndex::from_entries(&entries));

        let (cache_result, store_result) = tokio::join!(
            self.writer.persist_to_cache(&index),
            self.writer.persist_to_store(&entries)
        );

        if let Err(err) = cache_result {
            warn!("Cache write failed; store remains authoritative: {err}");
        }

        match store_result {
            Ok(report) => {
                self.snapshot.replace(Arc::clone(&index));
                info!(
                    "Refresh cycle completed: {} entries, {} names, {} batches in {} ms",
                    report.entries,
                    index.len(),
                    report.batches,
                    started.elapsed().as_millis()
                );
                Ok(index)
            }
            Err(err) => {
                self.set_state(SyncState::Failed);
                error!("Refresh cycle failed while persisting: {err}");
                Err(err.into())
            }
        }
    }

    fn finish(&self, result: &RefreshResult) {
        let mut flight = self.flight.lock();
        flight.current = None;
        flight.state = SyncState::Idle;
        flight.last = Some(RefreshOutcome {
            finished_at: Utc::now(),
            succeeded: result.is_ok(),
            names: result.as_ref().map_or(0, |index| index.len()),
            error: result.as_ref().err().map(ToString::to_string),
        });
    }
}

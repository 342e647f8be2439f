//! Persistent store boundary.
//!
//! The store is the system of record: one table keyed by id, written only
//! through idempotent upserts and read by id, in full, or by case-insensitive
//! name.
//!
//! - [`SqliteStore`]: production backend over an `sqlx` SQLite pool
//! - [`MemoryStore`]: in-process backend for tests and throwaway runs

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::core::entry::CatalogEntry;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A store batch that could not be upserted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedBatch {
    /// 1-based position of the batch within the write
    pub batch_number: usize,
    /// Ids of the entries that were not persisted
    pub ids: Vec<i64>,
    pub reason: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error(
        "{} of {total_batches} batches failed to upsert; {entries_failed} entries not persisted",
        failed.len()
    )]
    BatchesFailed {
        failed: Vec<FailedBatch>,
        total_batches: usize,
        entries_failed: usize,
    },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Operations required from the persistent store
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert or update every entry of the batch by id.
    ///
    /// The batch must not contain the same id twice.
    async fn upsert_batch(&self, batch: &[CatalogEntry]) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<CatalogEntry>, StoreError>;

    /// Entries whose lower-cased name is one of `lower_names`, ordered by id
    async fn find_by_lower_names(
        &self,
        lower_names: &[String],
    ) -> Result<Vec<CatalogEntry>, StoreError>;

    /// Every entry, ordered by id
    async fn load_all(&self) -> Result<Vec<CatalogEntry>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}

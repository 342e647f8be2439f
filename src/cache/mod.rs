//! Distributed cache boundary.
//!
//! The cache holds a single hash at a configured key whose fields are catalog
//! names and whose values are stringified ids. It is advisory: every reader
//! treats a failed or malformed cache read as a miss and moves on to the
//! store.
//!
//! - [`RedisCache`]: production backend over a Redis `ConnectionManager`
//! - [`MemoryCache`]: in-process backend used when no Redis URL is configured

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

use crate::core::index::NameIndex;

pub mod memory;
pub mod redis;

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Failed to connect to cache: {0}")]
    Connection(String),

    #[error("Cache command failed: {0}")]
    Command(String),

    #[error("Failed to serialize cache payload: {0}")]
    Serialize(String),
}

/// Hash operations required from the distributed cache
#[async_trait]
pub trait NameCache: Send + Sync {
    /// Every `(field, value)` pair of the hash; empty if the key is absent
    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>, CacheError>;

    /// Values for the given fields, positionally aligned with `fields`
    async fn hash_get_many(
        &self,
        key: &str,
        fields: &[String],
    ) -> Result<Vec<Option<String>>, CacheError>;

    /// Set every field in one command
    async fn hash_set_all(&self, key: &str, fields: Vec<(String, String)>)
        -> Result<(), CacheError>;
}

/// Decode a whole hash into an index, skipping fields whose value is not an id
pub fn decode_index(pairs: Vec<(String, String)>) -> NameIndex {
    let mut index = NameIndex::new();
    for (name, value) in pairs {
        match value.parse::<i64>() {
            Ok(id) => {
                index.insert(name, id);
            }
            Err(e) => warn!("Failed to parse cache entry for {name:?}: {e}"),
        }
    }
    index
}

/// Pair requested names with the values returned by a multi-get.
///
/// Missing values and values that are not ids are misses.
pub fn decode_hits(names: &[String], values: Vec<Option<String>>) -> HashMap<String, i64> {
    let mut hits = HashMap::new();
    for (name, value) in names.iter().zip(values) {
        let Some(value) = value else { continue };
        match value.parse::<i64>() {
            Ok(id) => {
                hits.insert(name.clone(), id);
            }
            Err(e) => warn!("Invalid id value in cache for {name:?}: {e}"),
        }
    }
    hits
}

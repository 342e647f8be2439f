use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{CacheError, NameCache};

/// In-process stand-in for the distributed cache.
///
/// Follows Redis hash semantics: setting fields never removes other fields,
/// and reading an absent key yields an empty hash.
#[derive(Debug, Default)]
pub struct MemoryCache {
    hashes: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields stored under `key`
    pub fn field_count(&self, key: &str) -> usize {
        self.hashes.read().get(key).map_or(0, HashMap::len)
    }
}

#[async_trait]
impl NameCache for MemoryCache {
    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>, CacheError> {
        Ok(self
            .hashes
            .read()
            .get(key)
            .map(|hash| {
                hash.iter()
                    .map(|(field, value)| (field.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn hash_get_many(
        &self,
        key: &str,
        fields: &[String],
    ) -> Result<Vec<Option<String>>, CacheError> {
        let hashes = self.hashes.read();
        let hash = hashes.get(key);
        Ok(fields
            .iter()
            .map(|field| hash.and_then(|h| h.get(field).cloned()))
            .collect())
    }

    async fn hash_set_all(
        &self,
        key: &str,
        fields: Vec<(String, String)>,
    ) -> Result<(), CacheError> {
        if fields.is_empty() {
            return Ok(());
        }
        self.hashes
            .write()
            .entry(key.to_string())
            .or_default()
            .extend(fields);
        Ok(())
    }
}

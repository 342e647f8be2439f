use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};

use super::{CatalogStore, StoreError};
use crate::core::entry::{fold_name, CatalogEntry};

/// In-process catalog table keyed by id
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<BTreeMap<i64, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all rows, ordered by id
    pub fn rows(&self) -> Vec<CatalogEntry> {
        self.rows
            .read()
            .iter()
            .map(|(&id, name)| CatalogEntry::new(id, name.clone()))
            .collect()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn upsert_batch(&self, batch: &[CatalogEntry]) -> Result<(), StoreError> {
        let mut rows = self.rows.write();
        for entry in batch {
            rows.insert(entry.id, entry.name.clone());
        }
        Ok(())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<CatalogEntry>, StoreError> {
        Ok(self
            .rows
            .read()
            .get(&id)
            .map(|name| CatalogEntry::new(id, name.clone())))
    }

    async fn find_by_lower_names(
        &self,
        lower_names: &[String],
    ) -> Result<Vec<CatalogEntry>, StoreError> {
        let wanted: HashSet<&str> = lower_names.iter().map(String::as_str).collect();
        Ok(self
            .rows
            .read()
            .iter()
            .filter(|(_, name)| wanted.contains(fold_name(name).as_str()))
            .map(|(&id, name)| CatalogEntry::new(id, name.clone()))
            .collect())
    }

    async fn load_all(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        Ok(self.rows())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.rows.read().len() as u64)
    }
}

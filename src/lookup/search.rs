use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use super::LookupError;
use crate::cache::{decode_hits, NameCache};
use crate::core::entry::fold_name;
use crate::store::CatalogStore;

/// Resolves batches of names to ids.
///
/// Each call makes at most one cache multi-get and at most one store query.
/// Names are first looked up verbatim in the cache; whatever misses is
/// matched case-insensitively against the store. When several stored
/// entries share a name, the lowest id wins. Names found nowhere are simply
/// absent from the result.
#[derive(Clone)]
pub struct SearchResolver {
    cache: Arc<dyn NameCache>,
    cache_key: String,
    store: Arc<dyn CatalogStore>,
}

impl SearchResolver {
    pub fn new(
        cache: Arc<dyn NameCache>,
        cache_key: impl Into<String>,
        store: Arc<dyn CatalogStore>,
    ) -> Self {
        Self {
            cache,
            cache_key: cache_key.into(),
            store,
        }
    }

    /// Map each resolvable name, exactly as given, to its id.
    ///
    /// # Errors
    ///
    /// Only store failures are reported; cache failures count as misses.
    pub async fn resolve(&self, names: &[String]) -> Result<HashMap<String, i64>, LookupError> {
        if names.is_empty() {
            return Ok(HashMap::new());
        }

        let mut found = match self.cache.hash_get_many(&self.cache_key, names).await {
            Ok(values) => decode_hits(names, values),
            Err(err) => {
                warn!("Cache multi-get failed; resolving every name from store: {err}");
                HashMap::new()
            }
        };
        debug!("Cache resolved {} of {} names", found.len(), names.len());

        let missing: Vec<&String> = names.iter().filter(|n| !found.contains_key(*n)).collect();
        if missing.is_empty() {
            return Ok(found);
        }

        let mut seen = HashSet::new();
        let folded: Vec<String> = missing
            .iter()
            .map(|name| fold_name(name))
            .filter(|key| seen.insert(key.clone()))
            .collect();

        let rows = self.store.find_by_lower_names(&folded).await?;
        let mut by_key: HashMap<String, i64> = HashMap::with_capacity(rows.len());
        for row in rows {
            by_key.entry(row.name_key()).or_insert(row.id);
        }

        for name in missing {
            if let Some(&id) = by_key.get(&fold_name(name)) {
                found.insert(name.clone(), id);
            }
        }
        debug!("Resolved {} of {} names", found.len(), names.len());
        Ok(found)
    }
}

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single catalog entry as published by the origin
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Numeric identifier, unique within a catalog
    pub id: i64,

    /// Display name; not guaranteed unique
    pub name: String,
}

impl CatalogEntry {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Lower-cased name used for case-insensitive matching
    #[must_use]
    pub fn name_key(&self) -> String {
        fold_name(&self.name)
    }
}

/// Fold a name for case-insensitive comparison.
///
/// Every case-insensitive path (store column, search input, reconciliation)
/// goes through this function so that they agree on non-ASCII names.
#[must_use]
pub fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

/// Drop entries whose id was already seen, keeping the first occurrence.
///
/// Returns the retained entries and the number of entries dropped.
#[must_use]
pub fn dedup_by_id(entries: &[CatalogEntry]) -> (Vec<CatalogEntry>, usize) {
    let mut seen: HashSet<i64> = HashSet::with_capacity(entries.len());
    let mut retained = Vec::with_capacity(entries.len());

    for entry in entries {
        if seen.insert(entry.id) {
            retained.push(entry.clone());
        }
    }

    let dropped = entries.len() - retained.len();
    (retained, dropped)
}

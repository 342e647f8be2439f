use serde::Serialize;
use std::collections::HashMap;

use super::entry::CatalogEntry;

/// Name to id mapping built from one catalog.
///
/// Doubles as the in-process snapshot and as the payload written to the
/// distributed cache hash. A reverse `id -> name` index is kept alongside
/// for point lookups by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NameIndex {
    by_name: HashMap<String, i64>,

    #[serde(skip)]
    by_id: HashMap<i64, String>,
}

impl NameIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from catalog entries.
    ///
    /// Duplicate names keep the first id encountered. Every id reaches the
    /// reverse index, keeping the first name it was published under, even
    /// when that name already belongs to another id.
    pub fn from_entries(entries: &[CatalogEntry]) -> Self {
        let mut index = Self {
            by_name: HashMap::with_capacity(entries.len()),
            by_id: HashMap::with_capacity(entries.len()),
        };
        for entry in entries {
            index.insert(entry.name.clone(), entry.id);
        }
        index
    }

    /// Build an index from already-decoded `(name, id)` pairs
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, i64)>,
    {
        let mut index = Self::new();
        for (name, id) in pairs {
            index.insert(name, id);
        }
        index
    }

    /// Record a pair; an existing name or id keeps its first mapping.
    ///
    /// Returns `true` if the name was new.
    pub fn insert(&mut self, name: String, id: i64) -> bool {
        self.by_id.entry(id).or_insert_with(|| name.clone());
        if self.by_name.contains_key(&name) {
            return false;
        }
        self.by_name.insert(name, id);
        true
    }

    /// Look up the id for an exact name
    pub fn id_of(&self, name: &str) -> Option<i64> {
        self.by_name.get(name).copied()
    }

    /// Look up the name recorded for an id
    pub fn name_of(&self, id: i64) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    /// Iterate over `(name, id)` pairs in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.by_name.iter().map(|(name, &id)| (name.as_str(), id))
    }

    /// Fields and values for the cache hash: `name -> stringified id`
    pub fn to_cache_fields(&self) -> Vec<(String, String)> {
        self.by_name
            .iter()
            .map(|(name, id)| (name.clone(), id.to_string()))
            .collect()
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

//! The read path.
//!
//! [`TieredLookup`] answers point and bulk reads by walking four tiers in
//! order, and [`SearchResolver`] maps a list of names to ids using the cache
//! first and one case-insensitive store query for whatever is left.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::store::StoreError;
use crate::sync::SyncError;

pub mod search;
pub mod tiered;

pub use search::SearchResolver;
pub use tiered::TieredLookup;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("No catalog entry with id {0}")]
    NotFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Which source answered a read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Snapshot,
    Cache,
    Store,
    Origin,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Snapshot => write!(f, "snapshot"),
            Tier::Cache => write!(f, "cache"),
            Tier::Store => write!(f, "store"),
            Tier::Origin => write!(f, "origin"),
        }
    }
}

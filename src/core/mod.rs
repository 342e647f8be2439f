//! Core data types for catalog synchronization.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`CatalogEntry`]: A single `(id, name)` pair as published by the origin
//! - [`NameIndex`]: The `name -> id` mapping built once per refresh cycle
//! - [`RefreshState`]: The process-wide snapshot of the last successful cycle
//! - [`SyncState`], [`RefreshOutcome`]: Coordinator state reporting
//!
//! ## Duplicate Names
//!
//! Upstream catalogs routinely publish the same name under several ids
//! (re-releases, soundtracks, regional editions). Every map built from a
//! catalog keeps the **first** id seen for a name, so rebuilding from the
//! same input order always yields the same index.

pub mod entry;
pub mod index;
pub mod snapshot;
pub mod types;

pub use entry::CatalogEntry;
pub use index::NameIndex;
pub use snapshot::RefreshState;
pub use types::{RefreshOutcome, SyncState};

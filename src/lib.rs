//! # catalog-sync
//!
//! Keeps a local copy of a remote application catalog (id and display name
//! pairs) in a distributed cache and a persistent store, and answers reads
//! from the cheapest tier that has data.
//!
//! ## Read path
//!
//! [`TieredLookup`] tries, in order, the in-process snapshot, the cache hash,
//! the store table and finally a full refresh from the origin. Concurrent
//! cold reads share one refresh. [`SearchResolver`] maps names to ids with
//! one cache multi-get and one case-insensitive store query.
//!
//! ## Write path
//!
//! [`SyncCoordinator`] runs at most one refresh cycle at a time: fetch with
//! retries, then publish to the cache and upsert into the store in
//! bounded-concurrency batches through [`BatchWriter`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use catalog_sync::{CatalogService, Config};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let service = CatalogService::connect(Config::default()).await?;
//! let name = service.lookup.get(570).await?;
//! println!("570 is {name}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`origin`]: HTTP client for the remote catalog
//! - [`cache`]: Distributed cache boundary
//! - [`store`]: Persistent store boundary
//! - [`sync`]: Refresh coordination, batch writes and scheduling
//! - [`lookup`]: Tiered reads and name resolution
//! - [`cli`]: Command-line interface implementation

pub mod cache;
pub mod cli;
pub mod config;
pub mod core;
pub mod lookup;
pub mod origin;
pub mod service;
pub mod store;
pub mod sync;
pub mod utils;

pub use config::Config;
pub use core::{CatalogEntry, NameIndex, RefreshOutcome, SyncState};
pub use lookup::{LookupError, SearchResolver, Tier, TieredLookup};
pub use origin::{CatalogOrigin, FetchError, HttpOrigin};
pub use service::CatalogService;
pub use sync::{BatchWriter, Scheduler, SyncCoordinator, SyncError};

//! Command-line interface for catalog-sync.
//!
//! Available commands:
//!
//! - **sync**: Run one full refresh from the origin
//! - **schedule**: Refresh on a fixed interval until interrupted
//! - **get**: Look up the name for an id
//! - **list**: Print the full name index
//! - **resolve**: Map names to ids
//!
//! ## Usage
//!
//! ```text
//! # One-off refresh with a config file
//! catalog-sync --config catalog.toml sync
//!
//! # Look up by id, reporting which tier answered
//! catalog-sync get 570 --verbose
//!
//! # Resolve several names as JSON
//! catalog-sync resolve "Dota 2" "counter-strike 2" --format json
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::service::CatalogService;

pub mod lookup;
pub mod sync;

#[derive(Parser)]
#[command(name = "catalog-sync")]
#[command(version)]
#[command(about = "Synchronize an application catalog into a cache and a store")]
#[command(
    long_about = "catalog-sync mirrors a remote application catalog into a distributed cache and a persistent store.\n\nReads walk an in-process snapshot, the cache, the store and finally the origin, so a cold process still answers."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the catalog once and persist it
    Sync(sync::SyncArgs),

    /// Refresh the catalog periodically until interrupted
    Schedule(sync::ScheduleArgs),

    /// Look up the name for an id
    Get(lookup::GetArgs),

    /// Print every name and id
    List(lookup::ListArgs),

    /// Resolve names to ids
    Resolve(lookup::ResolveArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Load the configuration file, or defaults when none was given
///
/// # Errors
///
/// Returns an error if the file cannot be read or is invalid.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Run an async command body on a fresh runtime with a connected service
pub(crate) fn with_service<F, Fut>(config: Config, body: F) -> anyhow::Result<()>
where
    F: FnOnce(CatalogService) -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<()>>,
{
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let service = CatalogService::connect(config).await?;
        body(service).await
    })
}

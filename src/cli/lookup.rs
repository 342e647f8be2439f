use anyhow::Context;
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;

use super::{with_service, OutputFormat};
use crate::config::Config;
use crate::lookup::Tier;
use crate::utils::validation::validate_names;

#[derive(Args)]
pub struct GetArgs {
    /// Catalog id to look up
    #[arg(required = true)]
    pub id: i64,
}

#[derive(Args)]
pub struct ListArgs {
    /// Print at most this many entries
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Names to resolve
    #[arg(required = true)]
    pub names: Vec<String>,
}

#[derive(Serialize)]
struct GetOutput {
    id: i64,
    name: String,
    tier: Tier,
}

#[derive(Serialize)]
struct ListOutput {
    tier: Tier,
    total: usize,
    entries: BTreeMap<i64, Vec<String>>,
}

#[derive(Serialize)]
struct ResolveOutput {
    resolved: BTreeMap<String, i64>,
    unresolved: Vec<String>,
}

/// Execute the get command
///
/// # Errors
///
/// Returns an error if the id is unknown or a tier fails.
pub fn run_get(args: GetArgs, config: Config, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    with_service(config, |service| async move {
        let (name, tier) = service
            .lookup
            .get_with_tier(args.id)
            .await
            .with_context(|| format!("Lookup of id {} failed", args.id))?;

        match format {
            OutputFormat::Json => {
                let output = GetOutput { id: args.id, name, tier };
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                if verbose {
                    println!("{}\t{name}\t(from {tier})", args.id);
                } else {
                    println!("{}\t{name}", args.id);
                }
            }
        }
        Ok(())
    })
}

/// Execute the list command
///
/// # Errors
///
/// Returns an error if every tier fails.
pub fn run_list(args: ListArgs, config: Config, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    with_service(config, |service| async move {
        let (index, tier) = service
            .lookup
            .get_all_with_tier()
            .await
            .context("Failed to load catalog")?;

        // Group by id so output order is stable
        let mut entries: BTreeMap<i64, Vec<String>> = BTreeMap::new();
        for (name, id) in index.iter() {
            entries.entry(id).or_default().push(name.to_string());
        }
        for names in entries.values_mut() {
            names.sort();
        }
        if let Some(limit) = args.limit {
            entries = entries.into_iter().take(limit).collect();
        }

        match format {
            OutputFormat::Json => {
                let output = ListOutput {
                    tier,
                    total: index.len(),
                    entries,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                for (id, names) in &entries {
                    for name in names {
                        println!("{id}\t{name}");
                    }
                }
                if verbose {
                    eprintln!("{} names served from {tier}", index.len());
                }
            }
        }
        Ok(())
    })
}

/// Execute the resolve command
///
/// # Errors
///
/// Returns an error if the names are invalid or the store query fails.
pub fn run_resolve(args: ResolveArgs, config: Config, format: OutputFormat) -> anyhow::Result<()> {
    validate_names(&args.names)?;

    with_service(config, |service| async move {
        let found = service
            .resolver
            .resolve(&args.names)
            .await
            .context("Failed to resolve names")?;

        let unresolved: Vec<String> = args
            .names
            .iter()
            .filter(|name| !found.contains_key(*name))
            .cloned()
            .collect();
        let resolved: BTreeMap<String, i64> = found.into_iter().collect();

        match format {
            OutputFormat::Json => {
                let output = ResolveOutput { resolved, unresolved };
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                for (name, id) in &resolved {
                    println!("{name}\t{id}");
                }
                for name in &unresolved {
                    println!("{name}\t-");
                }
            }
        }
        Ok(())
    })
}

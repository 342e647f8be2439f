use anyhow::Context;
use clap::Args;
use serde::Serialize;
use tracing::{info, warn};

use super::{with_service, OutputFormat};
use crate::config::Config;
use crate::core::types::RefreshOutcome;

#[derive(Args)]
pub struct SyncArgs {}

#[derive(Args)]
pub struct ScheduleArgs {
    /// Seconds between refreshes (overrides scheduler.interval_secs)
    #[arg(long)]
    pub interval_secs: Option<u64>,

    /// Refresh immediately instead of waiting one interval
    #[arg(long)]
    pub run_on_start: bool,
}

#[derive(Serialize)]
struct ScheduleOutput {
    succeeded_refreshes: u64,
    last_outcome: Option<RefreshOutcome>,
}

/// Execute the sync command
///
/// # Errors
///
/// Returns an error if the refresh cycle fails.
pub fn run(_args: SyncArgs, config: Config, format: OutputFormat) -> anyhow::Result<()> {
    with_service(config, |service| async move {
        let result = service.coordinator.refresh().await;
        let outcome = service.coordinator.last_outcome();

        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            }
            OutputFormat::Text => {
                if let Ok(index) = &result {
                    println!("Refreshed catalog: {} names", index.len());
                }
            }
        }

        result.map(|_| ()).context("Catalog refresh failed")
    })
}

/// Execute the schedule command; stops on Ctrl-C
///
/// # Errors
///
/// Returns an error if the service cannot be built.
pub fn run_schedule(
    args: ScheduleArgs,
    mut config: Config,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if let Some(secs) = args.interval_secs {
        config.scheduler.interval_secs = secs;
    }
    if args.run_on_start {
        config.scheduler.run_on_start = true;
    }

    with_service(config, |service| async move {
        let scheduler = service.scheduler();
        let succeeded = scheduler
            .run(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for shutdown signal: {e}");
                    std::future::pending::<()>().await;
                }
                info!("Shutdown signal received");
            })
            .await;
        match format {
            OutputFormat::Json => {
                let output = ScheduleOutput {
                    succeeded_refreshes: succeeded,
                    last_outcome: service.coordinator.last_outcome(),
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                println!("Scheduler stopped after {succeeded} successful refreshes");
            }
        }
        Ok(())
    })
}

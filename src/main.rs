use clap::Parser;
use tracing_subscriber::EnvFilter;

use catalog_sync::cli::{self, Commands};

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // RUST_LOG wins over the verbosity flag when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("catalog_sync=debug,info")
        } else {
            EnvFilter::new("catalog_sync=info,warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Sync(args) => cli::sync::run(args, config, cli.format)?,
        Commands::Schedule(args) => cli::sync::run_schedule(args, config, cli.format)?,
        Commands::Get(args) => cli::lookup::run_get(args, config, cli.format, cli.verbose)?,
        Commands::List(args) => cli::lookup::run_list(args, config, cli.format, cli.verbose)?,
        Commands::Resolve(args) => cli::lookup::run_resolve(args, config, cli.format)?,
    }

    Ok(())
}

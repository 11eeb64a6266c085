//! Lorebook - retrieval-augmented chat service
//!
//! Main entry point: tracing setup, configuration loading, and command
//! dispatch.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lorebook::cli::{Cli, Commands};
use lorebook::commands;
use lorebook::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);

    let config = Config::load(&cli.config)?;
    config.validate()?;

    match cli.command {
        Commands::Serve { host, port } => {
            tracing::info!("Starting HTTP API server");
            commands::serve::run_serve(config, host, port).await?;
            Ok(())
        }
        Commands::Ingest { paths } => {
            tracing::info!("Ingesting {} path(s)", paths.len());
            commands::ingest::run_ingest(config, paths).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "lorebook=debug" } else { "lorebook=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

mod cli;
mod commands;
mod config;
mod error;
mod output;
mod setup;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::CliConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Log to a daily file under the data directory so chat output stays clean.
fn init_logging(config: &CliConfig, verbose: bool) -> Result<WorkerGuard> {
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "mnemo.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();

    Ok(guard)
}

async fn run(cli: Cli, config: CliConfig) -> Result<()> {
    match cli.command {
        Commands::Setup(args) => commands::setup::run(&config, args, cli.format).await,
        Commands::Profile => commands::profile::run(&config).await,
        Commands::Chat => {
            let orchestrator = setup::prepare_orchestrator(&config).await?;
            commands::chat::run(orchestrator).await
        }
        Commands::Ask { message } => {
            let orchestrator = setup::prepare_orchestrator(&config).await?;
            commands::chat::ask(orchestrator, &message, cli.format).await
        }
    }
}

fn load_config(cli: &Cli) -> Result<CliConfig> {
    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(db_path) = &cli.db_path {
        config.directories.db_path = Some(db_path.clone());
    }
    config.apply_api_key_env();
    Ok(config)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => error::handle_error(err),
    };

    let guard = match init_logging(&config, cli.verbose) {
        Ok(guard) => guard,
        Err(err) => error::handle_error(err),
    };

    if let Err(err) = run(cli, config).await {
        tracing::error!(error = %format!("{err:#}"), "Command failed");
        // Flush the log file before exiting.
        drop(guard);
        error::handle_error(err);
    }
}

// ABOUTME: Entry point for the deckhand CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use deckhand::config::Config;
use deckhand::error::Result;
use deckhand::output::{Output, OutputMode};
use deckhand::semaphore::as_lock_owner;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise --verbose selects debug output
    let default_level = if cli.verbose {
        "deckhand=debug"
    } else {
        "deckhand=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose)
        .with_writer(std::io::stderr)
        .init();

    let mode = OutputMode::from_flags(cli.quiet, cli.json);
    // One invocation is one lock owner, so nested holds of a lock re-enter it
    let result = as_lock_owner(run(cli, Output::new(mode))).await;

    if let Err(e) = result {
        tracing::debug!(error = ?e, kind = ?e.kind(), "command failed");
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: Output) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::discover_or_default(&env::current_dir()?)?,
    };

    match cli.command {
        Commands::DeployPackage { package, variables } => {
            commands::deploy_package(&config, package, variables.as_deref(), output).await
        }
        Commands::RunScript {
            script,
            package,
            variables,
        } => commands::run_script(&config, script, package, variables.as_deref(), output).await,
        Commands::ApplyRetention {
            policy_set,
            days,
            releases,
            variables,
        } => {
            commands::apply_retention(
                &config,
                &policy_set,
                days,
                releases,
                variables.as_deref(),
                output,
            )
            .await
        }
    }
}

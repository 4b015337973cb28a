//! Waypoint CLI: the `waypoint` command.

mod cli;
mod commands;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use waypoint_core::RouterOptions;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    waypoint_core::init_logging_with(cli.log_level.as_deref());

    let options = match &cli.config {
        Some(path) => RouterOptions::load(path)
            .with_context(|| format!("Failed to load router config from {}", path.display()))?,
        None => {
            tracing::warn!("No --config given, starting with an empty route table");
            RouterOptions::default()
        }
    };

    match cli.command {
        Commands::Resolve { locations, from } => commands::resolve::run(options, locations, from).await,
        Commands::Navigate { steps, start } => commands::navigate::run(options, steps, start).await,
        Commands::Routes => commands::routes::run(options),
    }
}

//! Supervision engine CLI application.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use trailguard_monitor::{setup_logging, LogFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    setup_logging(cli.log_level.as_str(), format);

    // Execute command
    match cli.command {
        Commands::Allocate(args) => cli::commands::allocate::run(args, &cli.config).await,
        Commands::Execute(args) => cli::commands::execute::run(args, &cli.config).await,
        Commands::Run => cli::commands::run::run(&cli.config).await,
        Commands::CloseAll(args) => cli::commands::close_all::run(args, &cli.config).await,
        Commands::Venues => cli::commands::venues::run(&cli.config).await,
        Commands::ValidateConfig => cli::commands::validate::run(&cli.config).await,
    }
}

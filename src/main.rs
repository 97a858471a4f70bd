//! InsightFinance - Application entry point
//!
//! CLI-based entry point that dispatches to the commands.

use std::process::ExitCode;

use clap::Parser;

use insight_finance::{
    cli::{Cli, Commands},
    commands,
    config::Config,
    telemetry,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Dropped on return so the file writer flushes
    let _guard = telemetry::init(&config.log_level, config.log_file.as_deref(), cli.verbose);
    tracing::debug!(?config, "Configuration loaded");

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::execute(args, config).await,
        Commands::Migrate(args) => commands::migrate::execute(args, config).await,
        Commands::Setup(args) => commands::setup::execute(args, config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {}", e.report());
            ExitCode::FAILURE
        }
    }
}

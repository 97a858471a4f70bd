//! CLI argument definitions.
//!
//! Uses clap derive macros for type-safe argument parsing.

use clap::{Parser, Subcommand};

/// InsightFinance - market data, signals and portfolio analytics API
#[derive(Parser, Debug)]
#[command(name = "insight-finance")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),

    /// Run database migrations
    Migrate(MigrateArgs),

    /// Create the database if needed and apply migrations
    Setup(SetupArgs),
}

/// Arguments for the serve command. Unset values come from configuration.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Host to bind to
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Arguments for the migrate command
#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub action: MigrateAction,
}

/// Migration actions
#[derive(Subcommand, Debug)]
pub enum MigrateAction {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset and re-run all migrations
    Fresh,
}

/// Arguments for the setup command. Unset values come from DATABASE_URL.
#[derive(Parser, Debug)]
pub struct SetupArgs {
    /// Database server host
    #[arg(long)]
    pub host: Option<String>,

    /// Database server port
    #[arg(long)]
    pub port: Option<u16>,

    /// Name of the database to create
    #[arg(long)]
    pub database: Option<String>,

    /// Seconds to wait for the server to accept a connection
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

//! Setup command - Creates the database and applies migrations.

use std::time::Duration;

use crate::cli::args::SetupArgs;
use crate::config::{Config, DOCS_PATH};
use crate::errors::AppResult;
use crate::infra::{Bootstrapper, PostgresBootstrap, SetupReport, SetupTarget};

/// Execute the setup command
pub async fn execute(args: SetupArgs, config: Config) -> AppResult<()> {
    let target = target_from(&args, &config.database_url)?;
    tracing::info!(
        address = %target.address(),
        database = %target.database,
        "Bootstrapping database"
    );

    let backend = PostgresBootstrap::new(&config.database_url, &target)?;
    let report = Bootstrapper::new(backend, target).run().await?;

    print_next_steps(&report, &config);
    Ok(())
}

/// Start from DATABASE_URL and apply the command-line overrides.
fn target_from(args: &SetupArgs, database_url: &str) -> AppResult<SetupTarget> {
    let mut target = SetupTarget::from_database_url(database_url)?;
    if let Some(host) = &args.host {
        target.host = host.clone();
    }
    if let Some(port) = args.port {
        target.port = port;
    }
    if let Some(database) = &args.database {
        target.database = database.clone();
    }
    if let Some(secs) = args.timeout_secs {
        target.timeout = Duration::from_secs(secs);
    }
    Ok(target)
}

fn print_next_steps(report: &SetupReport, config: &Config) {
    let action = if report.created { "created" } else { "already present" };
    println!(
        "Database '{}' on {} {}; migrations applied.",
        report.database, report.address, action
    );
    println!();
    println!("Next steps:");
    println!("  1. Start the cache server:  redis-server");
    println!("  2. Start the API:           insight-finance serve");
    println!(
        "  3. Open the docs:           http://{}{}",
        config.server_addr(),
        DOCS_PATH
    );
}

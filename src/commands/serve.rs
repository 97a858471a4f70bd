//! Serve command - Starts the HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::api::{create_router, AppState};
use crate::cli::args::ServeArgs;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::{Cache, CacheStore, Database, MarketDataSources};
use crate::services::Services;

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: Config) -> AppResult<()> {
    tracing::info!(environment = config.environment.as_str(), "Starting server...");

    // Migrations run on connect
    let db = Database::connect(&config).await?;
    tracing::info!("Database connected");

    let cache: Arc<dyn CacheStore> = Arc::new(Cache::connect(&config).await?);
    tracing::info!("Redis cache connected");

    let sources = MarketDataSources::from_config(&config)?;
    let services = Services::build(db.get_connection(), cache.clone(), sources, config.clone());

    let host = args.host.unwrap_or_else(|| config.server_host.clone());
    let port = args.port.unwrap_or(config.server_port);
    let app_state = AppState::new(&services, cache, Arc::new(db), config);

    let app = create_router(app_state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!("Server running on http://{}", addr);

    // Peer addresses feed the rate limiter when no proxy header is present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    Ok(())
}

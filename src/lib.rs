//! InsightFinance - market data, technical signals and portfolio analytics
//!
//! An HTTP API over public market-data providers with JWT-authenticated
//! portfolios, indicator-based trading signals and a strategy screener.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Core entities (users, assets, quotes, portfolios, signals)
//! - **analytics**: Pure computations (indicators, signals, risk, screening)
//! - **services**: Application use cases
//! - **infra**: Postgres, Redis, market-data providers and bootstrap
//! - **api**: HTTP handlers, middleware, and routes
//! - **types**: Shared types (pagination, responses)
//! - **telemetry**: Tracing subscriber setup
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Create the database and apply migrations
//! insight-finance setup
//!
//! # Start the server
//! insight-finance serve --port 8000
//!
//! # Inspect migrations
//! insight-finance migrate status
//! ```

pub mod analytics;
pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod services;
pub mod telemetry;
pub mod types;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::Config;
pub use errors::{AppError, AppResult};

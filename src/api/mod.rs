//! API layer - HTTP handlers and middleware
//!
//! Routes for auth, prices, signals, portfolios and the screener, with
//! JWT authentication and Redis-backed rate limiting in front of them.

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use routes::create_router;
pub use state::AppState;

//! HTTP request handlers.

pub mod auth_handler;
pub mod portfolio_handler;
pub mod price_handler;
pub mod screener_handler;
pub mod signal_handler;

pub use auth_handler::auth_routes;
pub use portfolio_handler::portfolio_routes;
pub use price_handler::price_routes;
pub use screener_handler::screener_routes;
pub use signal_handler::signal_routes;

use crate::config::MAX_BATCH_SYMBOLS;
use crate::domain::Period;
use crate::errors::{AppError, AppResult};
use crate::services::market_service::normalize_symbol;

/// `?period=` value, defaulting to one month
fn parse_period(period: Option<&str>) -> AppResult<Period> {
    period.map_or(Ok(Period::default()), str::parse)
}

/// Normalize a batch of symbols in request order, dropping repeats.
/// Empty or oversized batches are rejected.
fn batch_symbols(symbols: &[String]) -> AppResult<Vec<String>> {
    if symbols.is_empty() || symbols.len() > MAX_BATCH_SYMBOLS {
        return Err(AppError::validation(format!(
            "Provide between 1 and {} symbols",
            MAX_BATCH_SYMBOLS
        )));
    }
    let mut unique: Vec<String> = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let symbol = normalize_symbol(symbol)?;
        if !unique.contains(&symbol) {
            unique.push(symbol);
        }
    }
    Ok(unique)
}

//! Price and market handlers.

use std::collections::BTreeMap;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{batch_symbols, parse_period};
use crate::api::extractors::{ParsedPath, ParsedQuery, ValidatedJson};
use crate::api::AppState;
use crate::config::DEFAULT_SEARCH_LIMIT;
use crate::domain::{AssetType, MarketStatus, Period, PriceBar, PriceQuote, PriceSnapshot};
use crate::errors::{AppError, AppResult};
use crate::services::market_service::{MarketSummary, SearchResult, SymbolValidation};

const MAX_QUERY_LENGTH: usize = 50;
const MAX_SEARCH_LIMIT: usize = 50;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PriceQuery {
    /// One of 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y
    pub period: Option<String>,
    #[serde(default)]
    pub include_history: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BatchPriceRequest {
    /// 1 to 20 symbols
    #[validate(length(min = 1, max = 20, message = "Provide between 1 and 20 symbols"))]
    pub symbols: Vec<String>,
    pub period: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PriceResponse {
    #[serde(flatten)]
    pub quote: PriceQuote,
    pub asset_type: AssetType,
    pub period: Period,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<PriceBar>>,
    pub market_status: MarketStatus,
}

impl PriceResponse {
    fn new(snapshot: PriceSnapshot, include_history: bool, market_status: MarketStatus) -> Self {
        Self {
            quote: snapshot.quote,
            asset_type: snapshot.asset_type,
            period: snapshot.period,
            history: include_history.then_some(snapshot.history),
            market_status,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchPriceResponse {
    pub timestamp: DateTime<Utc>,
    pub total_symbols: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub prices: BTreeMap<String, PriceResponse>,
    pub errors: BTreeMap<String, String>,
}

pub fn price_routes() -> Router<AppState> {
    Router::new()
        .route("/batch", post(batch_prices))
        .route("/search/:query", get(search))
        .route("/market/summary", get(market_summary))
        .route("/market/status", get(market_status))
        .route("/symbols/validate/:symbol", get(validate_symbol))
        .route("/:symbol", get(get_price))
}

/// Current price, optionally with history
#[utoipa::path(
    get,
    path = "/prices/{symbol}",
    tag = "Prices",
    security(("bearer_auth" = [])),
    params(("symbol" = String, Path, description = "Ticker, e.g. AAPL or BTC"), PriceQuery),
    responses(
        (status = 200, description = "Price data", body = PriceResponse),
        (status = 400, description = "Invalid symbol or period"),
        (status = 404, description = "No data for symbol"),
        (status = 502, description = "Every provider failed")
    )
)]
pub async fn get_price(
    State(state): State<AppState>,
    ParsedPath(symbol): ParsedPath<String>,
    ParsedQuery(query): ParsedQuery<PriceQuery>,
) -> AppResult<Json<PriceResponse>> {
    let period = parse_period(query.period.as_deref())?;
    let snapshot = state.market_service.get_price(&symbol, period).await?;

    Ok(Json(PriceResponse::new(
        snapshot,
        query.include_history,
        state.market_service.market_status(),
    )))
}

/// Prices for up to 20 symbols; failures are reported per symbol
#[utoipa::path(
    post,
    path = "/prices/batch",
    tag = "Prices",
    security(("bearer_auth" = [])),
    request_body = BatchPriceRequest,
    responses(
        (status = 200, description = "Batch result", body = BatchPriceResponse),
        (status = 400, description = "Invalid symbol list")
    )
)]
pub async fn batch_prices(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<BatchPriceRequest>,
) -> AppResult<Json<BatchPriceResponse>> {
    let symbols = batch_symbols(&payload.symbols)?;
    let period = parse_period(payload.period.as_deref())?;
    let total_symbols = symbols.len();

    let market_status = state.market_service.market_status();
    let mut prices = BTreeMap::new();
    let mut errors = BTreeMap::new();
    for (symbol, result) in state.market_service.get_prices(symbols, period).await {
        match result {
            Ok(snapshot) => {
                prices.insert(symbol, PriceResponse::new(snapshot, false, market_status.clone()));
            }
            Err(e) => {
                errors.insert(symbol, e.lookup_message());
            }
        }
    }

    Ok(Json(BatchPriceResponse {
        timestamp: Utc::now(),
        total_symbols,
        successful_requests: prices.len(),
        failed_requests: errors.len(),
        prices,
        errors,
    }))
}

/// Search the built-in asset catalogue by symbol or name
#[utoipa::path(
    get,
    path = "/prices/search/{query}",
    tag = "Prices",
    security(("bearer_auth" = [])),
    params(("query" = String, Path, description = "1 to 50 characters"), SearchQuery),
    responses(
        (status = 200, description = "Matches", body = Vec<SearchResult>),
        (status = 400, description = "Invalid query or limit")
    )
)]
pub async fn search(
    State(state): State<AppState>,
    ParsedPath(query): ParsedPath<String>,
    ParsedQuery(params): ParsedQuery<SearchQuery>,
) -> AppResult<Json<Vec<SearchResult>>> {
    let length = query.trim().chars().count();
    if length == 0 || length > MAX_QUERY_LENGTH {
        return Err(AppError::validation("Query must be 1 to 50 characters"));
    }
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    if !(1..=MAX_SEARCH_LIMIT).contains(&limit) {
        return Err(AppError::validation("Limit must be between 1 and 50"));
    }

    Ok(Json(state.market_service.search(&query, limit)))
}

#[utoipa::path(
    get,
    path = "/prices/market/summary",
    tag = "Prices",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Indices and movers", body = MarketSummary))
)]
pub async fn market_summary(State(state): State<AppState>) -> Json<MarketSummary> {
    Json(state.market_service.market_summary().await)
}

#[utoipa::path(
    get,
    path = "/prices/market/status",
    tag = "Prices",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Trading-hours status", body = MarketStatus))
)]
pub async fn market_status(State(state): State<AppState>) -> Json<MarketStatus> {
    Json(state.market_service.market_status())
}

/// Check whether a symbol has price data
#[utoipa::path(
    get,
    path = "/prices/symbols/validate/{symbol}",
    tag = "Prices",
    security(("bearer_auth" = [])),
    params(("symbol" = String, Path, description = "Ticker to check")),
    responses((status = 200, description = "Validation result", body = SymbolValidation))
)]
pub async fn validate_symbol(
    State(state): State<AppState>,
    ParsedPath(symbol): ParsedPath<String>,
) -> Json<SymbolValidation> {
    Json(state.market_service.validate_symbol(&symbol).await)
}

//! Trading signal handlers.

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
use crate::config::DEFAULT_OVERVIEW_SYMBOLS;
use crate::domain::{Period, SignalRecord};
use crate::errors::AppResult;
use crate::services::signal_service::{
    strength_levels, IndicatorReport, MarketOverview, SignalBundle, StrengthLevel,
};
use crate::types::{PaginationMeta, PaginationParams};

const DEFAULT_HISTORY_DAYS: u32 = 30;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PeriodQuery {
    /// One of 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y
    pub period: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OverviewQuery {
    /// Comma separated symbols
    pub symbols: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    pub days: Option<u32>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl HistoryQuery {
    fn pagination(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BatchSignalRequest {
    /// 1 to 20 symbols
    #[validate(length(min = 1, max = 20, message = "Provide between 1 and 20 symbols"))]
    pub symbols: Vec<String>,
    pub period: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchSignalResponse {
    pub timestamp: DateTime<Utc>,
    pub period: Period,
    pub total_symbols: usize,
    pub successful_analyses: usize,
    pub failed_analyses: usize,
    pub signals: BTreeMap<String, SignalBundle>,
    pub errors: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignalHistoryResponse {
    pub symbol: String,
    pub days: u32,
    pub signals: Vec<SignalRecord>,
    pub meta: PaginationMeta,
}

pub fn signal_routes() -> Router<AppState> {
    Router::new()
        .route("/batch", post(batch_signals))
        .route("/market/overview", get(market_overview))
        .route("/strength-levels", get(get_strength_levels))
        .route("/:symbol", get(get_signal))
        .route("/:symbol/history", get(signal_history))
        .route("/:symbol/indicators", get(get_indicators))
}

/// Full signal bundle for one symbol
#[utoipa::path(
    get,
    path = "/signals/{symbol}",
    tag = "Signals",
    security(("bearer_auth" = [])),
    params(("symbol" = String, Path, description = "Ticker"), PeriodQuery),
    responses(
        (status = 200, description = "Signal bundle", body = SignalBundle),
        (status = 400, description = "Invalid period or insufficient history"),
        (status = 404, description = "No data for symbol")
    )
)]
pub async fn get_signal(
    State(state): State<AppState>,
    ParsedPath(symbol): ParsedPath<String>,
    ParsedQuery(query): ParsedQuery<PeriodQuery>,
) -> AppResult<Json<SignalBundle>> {
    let period = parse_period(query.period.as_deref())?;
    Ok(Json(state.signal_service.signal(&symbol, period).await?))
}

#[utoipa::path(
    post,
    path = "/signals/batch",
    tag = "Signals",
    security(("bearer_auth" = [])),
    request_body = BatchSignalRequest,
    responses(
        (status = 200, description = "Batch result", body = BatchSignalResponse),
        (status = 400, description = "Invalid symbol list or period")
    )
)]
pub async fn batch_signals(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<BatchSignalRequest>,
) -> AppResult<Json<BatchSignalResponse>> {
    let symbols = batch_symbols(&payload.symbols)?;
    let period = parse_period(payload.period.as_deref())?;
    let total_symbols = symbols.len();

    let mut signals = BTreeMap::new();
    let mut errors = BTreeMap::new();
    for (symbol, result) in state.signal_service.batch(symbols, period).await {
        match result {
            Ok(bundle) => {
                signals.insert(symbol, bundle);
            }
            Err(e) => {
                errors.insert(symbol, e.lookup_message());
            }
        }
    }

    Ok(Json(BatchSignalResponse {
        timestamp: Utc::now(),
        period,
        total_symbols,
        successful_analyses: signals.len(),
        failed_analyses: errors.len(),
        signals,
        errors,
    }))
}

/// Signal counts and strong signals across a set of symbols
#[utoipa::path(
    get,
    path = "/signals/market/overview",
    tag = "Signals",
    security(("bearer_auth" = [])),
    params(OverviewQuery),
    responses((status = 200, description = "Market overview", body = MarketOverview))
)]
pub async fn market_overview(
    State(state): State<AppState>,
    ParsedQuery(query): ParsedQuery<OverviewQuery>,
) -> AppResult<Json<MarketOverview>> {
    let symbols = match query.symbols {
        Some(list) => {
            let requested: Vec<String> = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            batch_symbols(&requested)?
        }
        None => DEFAULT_OVERVIEW_SYMBOLS.iter().map(|s| s.to_string()).collect(),
    };

    Ok(Json(state.signal_service.market_overview(symbols).await))
}

/// Persisted signals for a symbol, newest first
#[utoipa::path(
    get,
    path = "/signals/{symbol}/history",
    tag = "Signals",
    security(("bearer_auth" = [])),
    params(("symbol" = String, Path, description = "Ticker"), HistoryQuery),
    responses(
        (status = 200, description = "Signal history", body = SignalHistoryResponse),
        (status = 400, description = "Days out of range")
    )
)]
pub async fn signal_history(
    State(state): State<AppState>,
    ParsedPath(symbol): ParsedPath<String>,
    ParsedQuery(query): ParsedQuery<HistoryQuery>,
) -> AppResult<Json<SignalHistoryResponse>> {
    let days = query.days.unwrap_or(DEFAULT_HISTORY_DAYS);
    let pagination = query.pagination();
    let (page, per_page) = (pagination.page(), pagination.limit());

    let (signals, total) = state
        .signal_service
        .history(&symbol, days, page, per_page)
        .await?;

    Ok(Json(SignalHistoryResponse {
        symbol: symbol.trim().to_uppercase(),
        days,
        signals,
        meta: PaginationMeta::new(page, per_page, total),
    }))
}

/// Indicator values without the voting details
#[utoipa::path(
    get,
    path = "/signals/{symbol}/indicators",
    tag = "Signals",
    security(("bearer_auth" = [])),
    params(("symbol" = String, Path, description = "Ticker"), PeriodQuery),
    responses(
        (status = 200, description = "Indicators", body = IndicatorReport),
        (status = 400, description = "Invalid period or insufficient history")
    )
)]
pub async fn get_indicators(
    State(state): State<AppState>,
    ParsedPath(symbol): ParsedPath<String>,
    ParsedQuery(query): ParsedQuery<PeriodQuery>,
) -> AppResult<Json<IndicatorReport>> {
    let period = parse_period(query.period.as_deref())?;
    Ok(Json(state.signal_service.indicators(&symbol, period).await?))
}

#[utoipa::path(
    get,
    path = "/signals/strength-levels",
    tag = "Signals",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Strength scale", body = Vec<StrengthLevel>))
)]
pub async fn get_strength_levels() -> Json<Vec<StrengthLevel>> {
    Json(strength_levels())
}

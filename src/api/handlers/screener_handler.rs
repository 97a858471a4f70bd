//! Screener handlers.

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};

use crate::api::extractors::ValidatedJson;
use crate::api::AppState;
use crate::services::screener_service::{
    BreadthReport, ScreeningRequest, ScreeningResult, SectorAnalysis, StrategyInfo,
};

pub fn screener_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(screen))
        .route("/strategies", get(strategies))
        .route("/sectors", get(sectors))
        .route("/breadth", get(market_breadth))
}

/// Screen the asset universe with an optional strategy and filters
#[utoipa::path(
    post,
    path = "/screener",
    tag = "Screener",
    security(("bearer_auth" = [])),
    request_body = ScreeningRequest,
    responses(
        (status = 200, description = "Ranked assets", body = ScreeningResult),
        (status = 400, description = "Validation error")
    )
)]
pub async fn screen(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ScreeningRequest>,
) -> Json<ScreeningResult> {
    Json(state.screener_service.screen(request).await)
}

#[utoipa::path(
    get,
    path = "/screener/strategies",
    tag = "Screener",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Available strategies", body = Vec<StrategyInfo>))
)]
pub async fn strategies(State(state): State<AppState>) -> Json<Vec<StrategyInfo>> {
    Json(state.screener_service.strategies())
}

/// Sector performance and rotation hints
#[utoipa::path(
    get,
    path = "/screener/sectors",
    tag = "Screener",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Sector analysis", body = SectorAnalysis))
)]
pub async fn sectors(State(state): State<AppState>) -> Json<SectorAnalysis> {
    Json(state.screener_service.sectors().await)
}

#[utoipa::path(
    get,
    path = "/screener/breadth",
    tag = "Screener",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Market breadth", body = BreadthReport))
)]
pub async fn market_breadth(State(state): State<AppState>) -> Json<BreadthReport> {
    Json(state.screener_service.breadth().await)
}

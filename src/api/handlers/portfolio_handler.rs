//! Portfolio handlers. Every route acts on the caller's own portfolios.

use axum::{
    extract::State,
    response::Json,
    routing::{get, post, put},
    Extension, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::{ParsedPath, ValidatedJson};
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::{Portfolio, Position};
use crate::errors::AppResult;
use crate::services::portfolio_service::{PortfolioAnalytics, PortfolioDetail, UserMetrics};
use crate::types::{Created, NoContent};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePortfolioRequest {
    /// Defaults to "Default"
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    #[schema(example = "Long term")]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePortfolioRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddPositionRequest {
    #[validate(length(min = 1, max = 10, message = "Symbol must be 1 to 10 characters"))]
    #[schema(example = "AAPL")]
    pub asset_symbol: String,
    #[validate(range(exclusive_min = 0.0, message = "Quantity must be positive"))]
    #[schema(example = 10.0)]
    pub quantity: f64,
    #[validate(range(exclusive_min = 0.0, message = "Average price must be positive"))]
    #[schema(example = 150.25)]
    pub average_price: f64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePositionRequest {
    #[validate(range(exclusive_min = 0.0, message = "Quantity must be positive"))]
    pub quantity: Option<f64>,
    #[validate(range(exclusive_min = 0.0, message = "Average price must be positive"))]
    pub average_price: Option<f64>,
}

pub fn portfolio_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_portfolios).post(create_portfolio))
        .route("/users/:user_id/metrics", get(user_metrics))
        .route(
            "/:id",
            get(get_portfolio).put(update_portfolio).delete(delete_portfolio),
        )
        .route("/:id/positions", post(add_position))
        .route(
            "/:id/positions/:position_id",
            put(update_position).delete(delete_position),
        )
        .route("/:id/analytics", get(portfolio_analytics))
}

#[utoipa::path(
    get,
    path = "/portfolio",
    tag = "Portfolio",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Caller's portfolios", body = Vec<Portfolio>))
)]
pub async fn list_portfolios(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<Vec<Portfolio>>> {
    Ok(Json(state.portfolio_service.list(user.id).await?))
}

#[utoipa::path(
    post,
    path = "/portfolio",
    tag = "Portfolio",
    security(("bearer_auth" = [])),
    request_body = CreatePortfolioRequest,
    responses(
        (status = 201, description = "Portfolio created", body = Portfolio),
        (status = 400, description = "Validation error")
    )
)]
pub async fn create_portfolio(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<CreatePortfolioRequest>,
) -> AppResult<Created<Portfolio>> {
    let portfolio = state
        .portfolio_service
        .create(user.id, payload.name, payload.description)
        .await?;
    Ok(Created(portfolio))
}

/// Portfolio with valued positions, summary, allocation and risk metrics
#[utoipa::path(
    get,
    path = "/portfolio/{id}",
    tag = "Portfolio",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Portfolio id")),
    responses(
        (status = 200, description = "Portfolio detail", body = PortfolioDetail),
        (status = 404, description = "Portfolio not found")
    )
)]
pub async fn get_portfolio(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ParsedPath(id): ParsedPath<Uuid>,
) -> AppResult<Json<PortfolioDetail>> {
    Ok(Json(state.portfolio_service.detail(user.id, id).await?))
}

#[utoipa::path(
    put,
    path = "/portfolio/{id}",
    tag = "Portfolio",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Portfolio id")),
    request_body = UpdatePortfolioRequest,
    responses(
        (status = 200, description = "Portfolio updated", body = Portfolio),
        (status = 404, description = "Portfolio not found")
    )
)]
pub async fn update_portfolio(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ParsedPath(id): ParsedPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdatePortfolioRequest>,
) -> AppResult<Json<Portfolio>> {
    let portfolio = state
        .portfolio_service
        .update(user.id, id, payload.name, payload.description)
        .await?;
    Ok(Json(portfolio))
}

#[utoipa::path(
    delete,
    path = "/portfolio/{id}",
    tag = "Portfolio",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Portfolio id")),
    responses(
        (status = 204, description = "Portfolio deleted"),
        (status = 404, description = "Portfolio not found")
    )
)]
pub async fn delete_portfolio(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ParsedPath(id): ParsedPath<Uuid>,
) -> AppResult<NoContent> {
    state.portfolio_service.delete(user.id, id).await?;
    Ok(NoContent)
}

/// Buy into a position; an existing position in the asset is merged
#[utoipa::path(
    post,
    path = "/portfolio/{id}/positions",
    tag = "Portfolio",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Portfolio id")),
    request_body = AddPositionRequest,
    responses(
        (status = 201, description = "Position stored", body = Position),
        (status = 400, description = "Validation error or portfolio full"),
        (status = 404, description = "Portfolio not found")
    )
)]
pub async fn add_position(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ParsedPath(id): ParsedPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<AddPositionRequest>,
) -> AppResult<Created<Position>> {
    let position = state
        .portfolio_service
        .add_position(
            user.id,
            id,
            &payload.asset_symbol,
            payload.quantity,
            payload.average_price,
        )
        .await?;
    Ok(Created(position))
}

#[utoipa::path(
    put,
    path = "/portfolio/{id}/positions/{position_id}",
    tag = "Portfolio",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Portfolio id"),
        ("position_id" = Uuid, Path, description = "Position id")
    ),
    request_body = UpdatePositionRequest,
    responses(
        (status = 200, description = "Position updated", body = Position),
        (status = 404, description = "Portfolio or position not found")
    )
)]
pub async fn update_position(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ParsedPath((id, position_id)): ParsedPath<(Uuid, Uuid)>,
    ValidatedJson(payload): ValidatedJson<UpdatePositionRequest>,
) -> AppResult<Json<Position>> {
    let position = state
        .portfolio_service
        .update_position(user.id, id, position_id, payload.quantity, payload.average_price)
        .await?;
    Ok(Json(position))
}

#[utoipa::path(
    delete,
    path = "/portfolio/{id}/positions/{position_id}",
    tag = "Portfolio",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Portfolio id"),
        ("position_id" = Uuid, Path, description = "Position id")
    ),
    responses(
        (status = 204, description = "Position deleted"),
        (status = 404, description = "Portfolio or position not found")
    )
)]
pub async fn delete_position(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ParsedPath((id, position_id)): ParsedPath<(Uuid, Uuid)>,
) -> AppResult<NoContent> {
    state
        .portfolio_service
        .delete_position(user.id, id, position_id)
        .await?;
    Ok(NoContent)
}

/// Performance, risk, allocation breakdown and recommendations
#[utoipa::path(
    get,
    path = "/portfolio/{id}/analytics",
    tag = "Portfolio",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Portfolio id")),
    responses(
        (status = 200, description = "Portfolio analytics", body = PortfolioAnalytics),
        (status = 404, description = "Portfolio not found")
    )
)]
pub async fn portfolio_analytics(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ParsedPath(id): ParsedPath<Uuid>,
) -> AppResult<Json<PortfolioAnalytics>> {
    Ok(Json(state.portfolio_service.analytics(user.id, id).await?))
}

/// Metrics over every position a user holds
#[utoipa::path(
    get,
    path = "/portfolio/users/{user_id}/metrics",
    tag = "Portfolio",
    security(("bearer_auth" = [])),
    params(("user_id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User metrics", body = UserMetrics),
        (status = 403, description = "Neither the user nor an admin")
    )
)]
pub async fn user_metrics(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ParsedPath(user_id): ParsedPath<Uuid>,
) -> AppResult<Json<UserMetrics>> {
    let metrics = state
        .portfolio_service
        .user_metrics(user.requester(), user_id)
        .await?;
    Ok(Json(metrics))
}

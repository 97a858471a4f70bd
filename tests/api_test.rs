//! Integration tests for API endpoints.
//!
//! These tests drive the full router with stub services, so no database,
//! Redis or market-data provider is needed.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use insight_finance::api::{create_router, AppState};
use insight_finance::config::Config;
use insight_finance::domain::{
    MarketStatus, Period, Portfolio, Position, PriceSnapshot, SignalRecord, User,
};
use insight_finance::errors::{AppError, AppResult};
use insight_finance::infra::{CacheStore, DatabaseHealth};
use insight_finance::services::market_service::{MarketSummary, SearchResult, SymbolValidation};
use insight_finance::services::portfolio_service::{
    PortfolioAnalytics, PortfolioDetail, UserMetrics,
};
use insight_finance::services::screener_service::{
    BreadthReport, ScreeningRequest, ScreeningResult, SectorAnalysis, StrategyInfo,
};
use insight_finance::services::signal_service::{IndicatorReport, MarketOverview, SignalBundle};
use insight_finance::services::{
    AuthService, Claims, MarketService, PortfolioService, Requester, ScreenerService,
    SignalService, TokenResponse,
};

const VALID_TOKEN: &str = "valid-test-token";
const USER_ID: Uuid = Uuid::from_u128(0x42);

// =============================================================================
// Stub Services
// =============================================================================

struct StubAuthService;

#[async_trait]
impl AuthService for StubAuthService {
    async fn register(&self, email: String, _password: String) -> AppResult<User> {
        if email == "taken@example.com" {
            return Err(AppError::conflict("User"));
        }
        Ok(User::new(Uuid::new_v4(), email, "hashed".to_string()))
    }

    async fn login(&self, _email: String, _password: String) -> AppResult<TokenResponse> {
        Err(AppError::InvalidCredentials)
    }

    async fn refresh(&self, _refresh_token: &str) -> AppResult<TokenResponse> {
        Err(AppError::Unauthorized)
    }

    async fn current_user(&self, user_id: Uuid) -> AppResult<User> {
        Ok(User::new(
            user_id,
            "test@example.com".to_string(),
            "hashed".to_string(),
        ))
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        if token != VALID_TOKEN {
            return Err(AppError::Unauthorized);
        }
        let now = Utc::now().timestamp();
        Ok(Claims {
            sub: USER_ID,
            email: "test@example.com".to_string(),
            role: "user".to_string(),
            kind: "access".to_string(),
            exp: now + 3600,
            iat: now,
        })
    }
}

/// Market data is never reached in these tests
struct StubMarketService;

#[async_trait]
impl MarketService for StubMarketService {
    async fn get_price(&self, _symbol: &str, _period: Period) -> AppResult<PriceSnapshot> {
        Err(AppError::NotFound)
    }

    async fn get_prices(
        &self,
        symbols: Vec<String>,
        _period: Period,
    ) -> Vec<(String, AppResult<PriceSnapshot>)> {
        symbols
            .into_iter()
            .map(|symbol| (symbol, Err(AppError::NotFound)))
            .collect()
    }

    fn search(&self, _query: &str, _limit: usize) -> Vec<SearchResult> {
        Vec::new()
    }

    async fn market_summary(&self) -> MarketSummary {
        unimplemented!()
    }

    fn market_status(&self) -> MarketStatus {
        MarketStatus::at(Utc::now())
    }

    async fn validate_symbol(&self, _symbol: &str) -> SymbolValidation {
        unimplemented!()
    }
}

struct StubSignalService;

#[async_trait]
impl SignalService for StubSignalService {
    async fn signal(&self, _symbol: &str, _period: Period) -> AppResult<SignalBundle> {
        Err(AppError::NotFound)
    }

    async fn batch(
        &self,
        _symbols: Vec<String>,
        _period: Period,
    ) -> Vec<(String, AppResult<SignalBundle>)> {
        Vec::new()
    }

    async fn market_overview(&self, _symbols: Vec<String>) -> MarketOverview {
        MarketOverview::from_results(Vec::new())
    }

    async fn history(
        &self,
        _symbol: &str,
        _days: u32,
        _page: u64,
        _per_page: u64,
    ) -> AppResult<(Vec<SignalRecord>, u64)> {
        Ok((Vec::new(), 0))
    }

    async fn indicators(&self, _symbol: &str, _period: Period) -> AppResult<IndicatorReport> {
        Err(AppError::NotFound)
    }
}

/// Each user owns a single portfolio named after nothing in particular
struct StubPortfolioService;

fn portfolio_of(user_id: Uuid) -> Portfolio {
    Portfolio {
        id: Uuid::from_u128(7),
        user_id,
        name: "Default".to_string(),
        description: String::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[async_trait]
impl PortfolioService for StubPortfolioService {
    async fn list(&self, user_id: Uuid) -> AppResult<Vec<Portfolio>> {
        Ok(vec![portfolio_of(user_id)])
    }

    async fn create(
        &self,
        user_id: Uuid,
        name: Option<String>,
        description: Option<String>,
    ) -> AppResult<Portfolio> {
        let mut portfolio = portfolio_of(user_id);
        portfolio.name = name.unwrap_or_else(|| "Default".to_string());
        portfolio.description = description.unwrap_or_default();
        Ok(portfolio)
    }

    async fn detail(&self, _user_id: Uuid, _portfolio_id: Uuid) -> AppResult<PortfolioDetail> {
        Err(AppError::NotFound)
    }

    async fn update(
        &self,
        _user_id: Uuid,
        _portfolio_id: Uuid,
        _name: Option<String>,
        _description: Option<String>,
    ) -> AppResult<Portfolio> {
        Err(AppError::NotFound)
    }

    async fn delete(&self, _user_id: Uuid, _portfolio_id: Uuid) -> AppResult<()> {
        Ok(())
    }

    async fn add_position(
        &self,
        _user_id: Uuid,
        _portfolio_id: Uuid,
        _symbol: &str,
        _quantity: f64,
        _price: f64,
    ) -> AppResult<Position> {
        Err(AppError::NotFound)
    }

    async fn update_position(
        &self,
        _user_id: Uuid,
        _portfolio_id: Uuid,
        _position_id: Uuid,
        _quantity: Option<f64>,
        _avg_cost: Option<f64>,
    ) -> AppResult<Position> {
        Err(AppError::NotFound)
    }

    async fn delete_position(
        &self,
        _user_id: Uuid,
        _portfolio_id: Uuid,
        _position_id: Uuid,
    ) -> AppResult<()> {
        Err(AppError::NotFound)
    }

    async fn analytics(
        &self,
        _user_id: Uuid,
        _portfolio_id: Uuid,
    ) -> AppResult<PortfolioAnalytics> {
        Err(AppError::NotFound)
    }

    async fn user_metrics(&self, requester: Requester, user_id: Uuid) -> AppResult<UserMetrics> {
        if requester.id != user_id && !requester.is_admin {
            return Err(AppError::Forbidden);
        }
        Err(AppError::NotFound)
    }
}

struct StubScreenerService;

#[async_trait]
impl ScreenerService for StubScreenerService {
    async fn screen(&self, _request: ScreeningRequest) -> ScreeningResult {
        unimplemented!()
    }

    fn strategies(&self) -> Vec<StrategyInfo> {
        Vec::new()
    }

    async fn sectors(&self) -> SectorAnalysis {
        unimplemented!()
    }

    async fn breadth(&self) -> BreadthReport {
        unimplemented!()
    }
}

/// Cache whose health and rate-limit verdict are fixed per test
struct StubCache {
    healthy: bool,
    allow: bool,
}

#[async_trait]
impl CacheStore for StubCache {
    async fn get_raw(&self, _key: &str) -> AppResult<Option<String>> {
        Ok(None)
    }

    async fn set_raw(&self, _key: &str, _value: String, _ttl_seconds: u64) -> AppResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> AppResult<()> {
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        if self.healthy {
            Ok(())
        } else {
            Err(AppError::ServiceUnavailable("redis down".to_string()))
        }
    }

    async fn check_rate_limit(
        &self,
        _identifier: &str,
        max_requests: u64,
        _window_seconds: u64,
    ) -> AppResult<(u64, bool)> {
        if self.allow {
            Ok((1, true))
        } else {
            Ok((max_requests + 1, false))
        }
    }
}

struct StubDatabase;

#[async_trait]
impl DatabaseHealth for StubDatabase {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

// =============================================================================
// Test Helpers
// =============================================================================

fn app_with(cache: StubCache) -> Router {
    let config = Config::from_lookup(|_| None).unwrap();
    let state = AppState {
        auth_service: Arc::new(StubAuthService),
        market_service: Arc::new(StubMarketService),
        signal_service: Arc::new(StubSignalService),
        portfolio_service: Arc::new(StubPortfolioService),
        screener_service: Arc::new(StubScreenerService),
        cache: Arc::new(cache),
        database: Arc::new(StubDatabase),
        config: Arc::new(config),
    };
    create_router(state)
}

fn app() -> Router {
    app_with(StubCache {
        healthy: true,
        allow: true,
    })
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Service Info and Health
// =============================================================================

#[tokio::test]
async fn test_root_lists_endpoints() {
    let response = app().oneshot(get("/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["name"], "InsightFinance API");
    assert_eq!(body["docs"], "/swagger-ui");
    assert_eq!(body["endpoints"]["portfolio"], "/portfolio");
}

#[tokio::test]
async fn test_health_reports_healthy_dependencies() {
    let response = app().oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["redis"]["status"], "healthy");
}

#[tokio::test]
async fn test_health_degrades_when_cache_is_down() {
    let app = app_with(StubCache {
        healthy: false,
        allow: true,
    });
    let response = app.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["services"]["database"]["status"], "healthy");
    assert_eq!(body["services"]["redis"]["status"], "unhealthy");
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_register_returns_created_user_without_hash() {
    let request = post_json(
        "/auth/register",
        None,
        json!({ "email": "new@example.com", "password": "SecurePass123!" }),
    );
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert_eq!(body["email"], "new@example.com");
    assert_eq!(body["role"], "user");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_rejects_malformed_email() {
    let request = post_json(
        "/auth/register",
        None,
        json!({ "email": "not-an-email", "password": "SecurePass123!" }),
    );
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_duplicate_is_conflict() {
    let request = post_json(
        "/auth/register",
        None,
        json!({ "email": "taken@example.com", "password": "SecurePass123!" }),
    );
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_login_with_bad_credentials_is_unauthorized() {
    let request = post_json(
        "/auth/login",
        None,
        json!({ "email": "test@example.com", "password": "wrong" }),
    );
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_returns_current_user() {
    let response = app()
        .oneshot(get("/auth/me", Some(VALID_TOKEN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["id"], USER_ID.to_string());
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let response = app().oneshot(get("/portfolio", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_rejects_invalid_token() {
    let response = app()
        .oneshot(get("/signals/strength-levels", Some("forged")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Rate Limiting
// =============================================================================

#[tokio::test]
async fn test_rate_limited_request_gets_retry_after() {
    let app = app_with(StubCache {
        healthy: true,
        allow: false,
    });
    let response = app
        .oneshot(get("/portfolio", Some(VALID_TOKEN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn test_health_is_not_rate_limited() {
    let app = app_with(StubCache {
        healthy: true,
        allow: false,
    });
    let response = app.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Protected Resources
// =============================================================================

#[tokio::test]
async fn test_list_portfolios_for_caller() {
    let response = app()
        .oneshot(get("/portfolio", Some(VALID_TOKEN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let portfolios = body.as_array().unwrap();
    assert_eq!(portfolios.len(), 1);
    assert_eq!(portfolios[0]["user_id"], USER_ID.to_string());
}

#[tokio::test]
async fn test_create_portfolio_defaults_name() {
    let response = app()
        .oneshot(post_json("/portfolio", Some(VALID_TOKEN), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert_eq!(body["name"], "Default");
}

#[tokio::test]
async fn test_other_users_metrics_are_forbidden() {
    let uri = format!("/portfolio/users/{}/metrics", Uuid::new_v4());
    let response = app().oneshot(get(&uri, Some(VALID_TOKEN))).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_batch_prices_rejects_oversized_list() {
    let symbols: Vec<String> = (0..21).map(|i| format!("SYM{}", i)).collect();
    let request = post_json(
        "/prices/batch",
        Some(VALID_TOKEN),
        json!({ "symbols": symbols }),
    );
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_batch_prices_reports_per_symbol_errors() {
    let request = post_json(
        "/prices/batch",
        Some(VALID_TOKEN),
        json!({ "symbols": ["aapl", "MSFT"] }),
    );
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["total_symbols"], 2);
    assert_eq!(body["failed_requests"], 2);
    assert_eq!(body["errors"]["AAPL"], "Price data unavailable");
}

#[tokio::test]
async fn test_price_rejects_unknown_period() {
    let response = app()
        .oneshot(get("/prices/AAPL?period=10y", Some(VALID_TOKEN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_batch_prices_without_symbols_is_json_bad_request() {
    let request = post_json("/prices/batch", Some(VALID_TOKEN), json!({ "period": "1mo" }));
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_batch_prices_collapses_repeated_symbols() {
    let request = post_json(
        "/prices/batch",
        Some(VALID_TOKEN),
        json!({ "symbols": ["aapl", "AAPL", " aapl "] }),
    );
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["total_symbols"], 1);
    assert_eq!(body["failed_requests"], 1);
}

#[tokio::test]
async fn test_malformed_query_is_json_bad_request() {
    let response = app()
        .oneshot(get("/prices/AAPL?include_history=maybe", Some(VALID_TOKEN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_malformed_path_id_is_json_bad_request() {
    let response = app()
        .oneshot(get("/portfolio/not-a-uuid", Some(VALID_TOKEN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_token_form_missing_password_is_json_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/auth/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=someone%40example.com"))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_signal_history_is_paginated() {
    let response = app()
        .oneshot(get(
            "/signals/AAPL/history?days=7&page=2&per_page=10",
            Some(VALID_TOKEN),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["symbol"], "AAPL");
    assert_eq!(body["meta"]["page"], 2);
    assert_eq!(body["meta"]["total"], 0);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let response = app()
        .oneshot(get("/api-docs/openapi.json", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["info"]["title"], "InsightFinance API");
}

//! Application route configuration.

use std::collections::BTreeMap;

use axum::{
    extract::State,
    http::{HeaderName, HeaderValue, Method, StatusCode},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    auth_routes, portfolio_routes, price_routes, screener_routes, signal_routes,
};
use super::middleware::{auth_middleware, rate_limit_auth_middleware, rate_limit_middleware};
use super::openapi::ApiDoc;
use super::AppState;
use crate::config::{CorsSettings, APP_NAME, DOCS_PATH, OPENAPI_PATH};

const WILDCARD: &str = "*";

/// Create the application router with all routes configured
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors);

    Router::new()
        // Service info and health (no rate limiting)
        .route("/", get(root))
        .route("/health", get(health))
        .merge(SwaggerUi::new(DOCS_PATH).url(OPENAPI_PATH, ApiDoc::openapi()))
        // Public authentication routes (stricter rate limiting)
        .nest(
            "/auth",
            auth_routes(state.clone()).route_layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit_auth_middleware,
            )),
        )
        .nest("/prices", protected(price_routes(), &state))
        .nest("/signals", protected(signal_routes(), &state))
        .nest("/portfolio", protected(portfolio_routes(), &state))
        .nest("/screener", protected(screener_routes(), &state))
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// JWT authentication plus the general rate limit. The limit is the outer
/// layer, so it also counts unauthenticated attempts.
fn protected(routes: Router<AppState>, state: &AppState) -> Router<AppState> {
    routes
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
}

fn cors_layer(settings: &CorsSettings) -> CorsLayer {
    let wildcard = |values: &[String]| values.iter().any(|v| v == WILDCARD);

    let origins = if wildcard(&settings.origins) {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            settings
                .origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        )
    };
    let methods = if wildcard(&settings.methods) {
        AllowMethods::any()
    } else {
        AllowMethods::list(
            settings
                .methods
                .iter()
                .filter_map(|method| Method::from_bytes(method.as_bytes()).ok()),
        )
    };
    let headers = if wildcard(&settings.headers) {
        AllowHeaders::any()
    } else {
        AllowHeaders::list(
            settings
                .headers
                .iter()
                .filter_map(|header| HeaderName::from_bytes(header.as_bytes()).ok()),
        )
    };

    // Credentials cannot be combined with wildcards.
    let any_wildcard =
        wildcard(&settings.origins) || wildcard(&settings.methods) || wildcard(&settings.headers);
    let credentials = settings.allow_credentials && !any_wildcard;
    if settings.allow_credentials && any_wildcard {
        tracing::warn!("CORS credentials disabled because a wildcard is configured");
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(credentials)
}

/// Service information
#[derive(Serialize)]
struct RootResponse {
    name: &'static str,
    version: &'static str,
    environment: &'static str,
    docs: &'static str,
    endpoints: BTreeMap<&'static str, &'static str>,
}

async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let endpoints = BTreeMap::from([
        ("auth", "/auth"),
        ("prices", "/prices"),
        ("signals", "/signals"),
        ("portfolio", "/portfolio"),
        ("screener", "/screener"),
        ("health", "/health"),
    ]);

    Json(RootResponse {
        name: APP_NAME,
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.as_str(),
        docs: DOCS_PATH,
        endpoints,
    })
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    services: ServiceHealth,
}

/// Individual service health status
#[derive(Serialize)]
struct ServiceHealth {
    database: ServiceStatus,
    redis: ServiceStatus,
}

#[derive(Serialize)]
struct ServiceStatus {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<E: std::fmt::Display> From<Result<(), E>> for ServiceStatus {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => ServiceStatus {
                status: "healthy",
                error: None,
            },
            Err(e) => ServiceStatus {
                status: "unhealthy",
                error: Some(e.to_string()),
            },
        }
    }
}

/// Database and Redis connectivity check
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (database, redis) = tokio::join!(state.database.ping(), state.cache.ping());
    let database = ServiceStatus::from(database);
    let redis = ServiceStatus::from(redis);

    let all_healthy = database.error.is_none() && redis.error.is_none();
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if all_healthy { "healthy" } else { "degraded" },
            services: ServiceHealth { database, redis },
        }),
    )
}

//! Fixed-window rate limiting backed by the Redis cache.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::net::SocketAddr;

use crate::api::AppState;
use crate::config::{RATE_LIMIT_AUTH_REQUESTS, RATE_LIMIT_AUTH_WINDOW_SECONDS};
use crate::infra::cache::rate_limit_key;

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Rate limit error response
#[derive(Debug)]
pub struct RateLimitError {
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "code": "RATE_LIMITED",
                "message": "Too many requests. Please try again later.",
            }
        }));
        let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
        let headers = response.headers_mut();
        headers.insert(RETRY_AFTER, HeaderValue::from(self.retry_after));
        headers.insert(REMAINING_HEADER, HeaderValue::from(0u64));
        response
    }
}

/// Client identity. Behind a trusted proxy this is the first
/// `X-Forwarded-For` hop, then `X-Real-IP`; otherwise, and as the fallback,
/// the peer address.
fn client_identifier(request: &Request, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        if let Some(ip) = forwarded_client(request) {
            return ip;
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_client(request: &Request) -> Option<String> {
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    header("x-forwarded-for")
        .and_then(|forwarded| forwarded.split(',').next().map(str::trim))
        .filter(|ip| !ip.is_empty())
        .or_else(|| header("x-real-ip"))
        .map(str::to_string)
}

/// Count the request against `scope` and reject it once over `max_requests`.
/// A cache failure rejects the request.
async fn limit(
    state: &AppState,
    scope: &str,
    max_requests: u64,
    window_seconds: u64,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    let client = client_identifier(&request, state.config.trust_proxy_headers);
    let key = rate_limit_key(scope, &client);

    let (count, allowed) = match state
        .cache
        .check_rate_limit(&key, max_requests, window_seconds)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, scope, "Rate limit check failed - denying request");
            return Err(RateLimitError {
                retry_after: window_seconds,
            });
        }
    };

    if !allowed {
        tracing::warn!(client = %client, scope, count, "Rate limit exceeded");
        return Err(RateLimitError {
            retry_after: window_seconds,
        });
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(LIMIT_HEADER, HeaderValue::from(max_requests));
    headers.insert(
        REMAINING_HEADER,
        HeaderValue::from(max_requests.saturating_sub(count)),
    );

    Ok(response)
}

/// General limit from configuration.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    let (max_requests, window) = (state.config.rate_limit_requests, state.config.rate_limit_window);
    limit(&state, "general", max_requests, window, request, next).await
}

/// Stricter limit for authentication endpoints.
pub async fn rate_limit_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    limit(
        &state,
        "auth",
        RATE_LIMIT_AUTH_REQUESTS,
        RATE_LIMIT_AUTH_WINDOW_SECONDS,
        request,
        next,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_rate_limit_error_response() {
        let response = RateLimitError { retry_after: 60 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "60");
    }

    fn forwarded() -> Request {
        Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header("x-real-ip", "10.0.0.2")
            .extension(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 5000))))
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_client_identifier_ignores_proxy_headers_by_default() {
        assert_eq!(client_identifier(&forwarded(), false), "192.0.2.1");

        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_identifier(&request, false), "unknown");
    }

    #[test]
    fn test_client_identifier_behind_trusted_proxy() {
        assert_eq!(client_identifier(&forwarded(), true), "203.0.113.7");

        let request = Request::builder()
            .header("x-real-ip", "10.0.0.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_identifier(&request, true), "10.0.0.2");

        let request = Request::builder()
            .header("x-forwarded-for", " ")
            .extension(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 5000))))
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_identifier(&request, true), "192.0.2.1");
    }
}

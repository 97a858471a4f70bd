//! Shared HTTP client for market-data providers.
//!
//! Every outbound request passes through one throttle, so providers
//! together never send more than one request per interval.

use std::{sync::Arc, time::Duration};

use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde_json::Value;
use tokio::{sync::Mutex, time::Instant};

use crate::config::{HTTP_TIMEOUT_SECS, MAX_HTTP_ATTEMPTS, MIN_REQUEST_INTERVAL_MS};
use crate::errors::{AppError, AppResult};

const USER_AGENT: &str = concat!("insight-finance/", env!("CARGO_PKG_VERSION"));

/// Spaces requests at least `interval` apart.
#[derive(Clone)]
struct Throttle {
    last: Arc<Mutex<Option<Instant>>>,
    interval: Duration,
}

impl Throttle {
    fn new(interval: Duration) -> Self {
        Self {
            last: Arc::new(Mutex::new(None)),
            interval,
        }
    }

    async fn acquire(&self) {
        // Lock is held across the sleep so waiters queue in order
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.interval;
            let now = Instant::now();
            if ready_at > now {
                tracing::debug!(
                    wait_ms = (ready_at - now).as_millis() as u64,
                    "Throttling market data request"
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    throttle: Throttle,
}

impl HttpClient {
    pub fn new() -> AppResult<Self> {
        Self::with_interval(Duration::from_millis(MIN_REQUEST_INTERVAL_MS))
    }

    pub fn with_interval(interval: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            throttle: Throttle::new(interval),
        })
    }

    /// GET `url` with query parameters and decode the JSON body.
    pub async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> AppResult<Value> {
        let response = self.send(self.client.get(url).query(query)).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::market_data(format!("{} returned HTTP {}", url, status)));
        }

        Ok(response.json().await.map_err(reqwest::Error::without_url)?)
    }

    /// Send with throttling, retrying on HTTP 429.
    async fn send(&self, builder: RequestBuilder) -> AppResult<reqwest::Response> {
        let request = builder.build()?;

        for attempt in 1..=MAX_HTTP_ATTEMPTS {
            self.throttle.acquire().await;
            let req = request
                .try_clone()
                .ok_or_else(|| AppError::internal("Request body cannot be cloned"))?;
            let response = self
                .client
                .execute(req)
                .await
                .map_err(reqwest::Error::without_url)?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            let endpoint = endpoint(request.url());
            match backoff(attempt) {
                Some(wait) => {
                    tracing::warn!(
                        endpoint = %endpoint,
                        attempt,
                        wait_secs = wait.as_secs(),
                        "Rate limited by provider"
                    );
                    tokio::time::sleep(wait).await;
                }
                None => {
                    tracing::warn!(endpoint = %endpoint, attempt, "Rate limited by provider, giving up");
                }
            }
        }

        Err(AppError::market_data(format!(
            "Rate limited by {} after {} attempts",
            request.url().host_str().unwrap_or("provider"),
            MAX_HTTP_ATTEMPTS
        )))
    }
}

/// Wait before retrying after `attempt` was rate limited; `None` once the
/// attempts are used up.
fn backoff(attempt: u32) -> Option<Duration> {
    (attempt < MAX_HTTP_ATTEMPTS).then(|| Duration::from_secs(2u64.pow(attempt)))
}

/// Host and path only. Query strings carry API keys.
fn endpoint(url: &Url) -> String {
    format!("{}{}", url.host_str().unwrap_or(""), url.path())
}

/// Read a JSON number that may be encoded as a string.
pub(crate) fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_throttle_spaces_requests() {
        let throttle = Throttle::new(Duration::from_secs(1));
        let start = Instant::now();

        throttle.acquire().await;
        throttle.acquire().await;
        throttle.acquire().await;

        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[test]
    fn test_backoff_doubles_then_stops() {
        assert_eq!(backoff(1), Some(Duration::from_secs(2)));
        assert_eq!(backoff(2), Some(Duration::from_secs(4)));
        assert_eq!(backoff(MAX_HTTP_ATTEMPTS), None);
    }

    #[test]
    fn test_endpoint_drops_query_string() {
        let url = Url::parse(
            "https://www.alphavantage.co/query?function=GLOBAL_QUOTE&symbol=IBM&apikey=SECRET",
        )
        .unwrap();

        let logged = endpoint(&url);
        assert_eq!(logged, "www.alphavantage.co/query");
        assert!(!logged.contains("SECRET"));
    }

    #[test]
    fn test_number_accepts_strings_and_percentages() {
        let value = json!({"a": "12.5", "b": 3, "c": "-1.25%", "d": "n/a"});
        assert_eq!(number(value.get("a")), Some(12.5));
        assert_eq!(number(value.get("b")), Some(3.0));
        assert_eq!(number(value.get("c")), Some(-1.25));
        assert_eq!(number(value.get("d")), None);
        assert_eq!(number(value.get("missing")), None);
    }
}

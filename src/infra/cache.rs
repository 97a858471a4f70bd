//! Redis cache.
//!
//! Services talk to [`CacheStore`] so they can run against a mock. Typed
//! JSON access and key naming live alongside it.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use crate::config::{
    Config, CACHE_PREFIX_ASSET_METADATA, CACHE_PREFIX_INDICATOR, CACHE_PREFIX_PRICE,
    CACHE_PREFIX_RATE_LIMIT,
};
use crate::domain::Period;
use crate::errors::AppResult;

/// Raw key/value operations against the cache backend.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get_raw(&self, key: &str) -> AppResult<Option<String>>;

    async fn set_raw(&self, key: &str, value: String, ttl_seconds: u64) -> AppResult<()>;

    async fn delete(&self, key: &str) -> AppResult<()>;

    async fn ping(&self) -> AppResult<()>;

    /// Fixed-window counter. Returns the count so far and whether it is
    /// within `max_requests`.
    async fn check_rate_limit(
        &self,
        identifier: &str,
        max_requests: u64,
        window_seconds: u64,
    ) -> AppResult<(u64, bool)>;
}

impl dyn CacheStore {
    /// Read and decode a JSON value. Backend and decoding failures are
    /// logged and reported as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.get_raw(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Encode and store a JSON value. Failures are logged only.
    pub async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T, ttl_seconds: u64) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache serialization failed");
                return;
            }
        };

        if let Err(e) = self.set_raw(key, json, ttl_seconds).await {
            tracing::warn!(key = %key, error = %e, "Cache write failed");
        }
    }
}

// =============================================================================
// Keys
// =============================================================================

pub fn price_key(symbol: &str, period: Period) -> String {
    format!("{}{}_{}", CACHE_PREFIX_PRICE, symbol, period.as_str())
}

pub fn indicator_key(symbol: &str, period: Period) -> String {
    format!(
        "{}{}:{}_{}",
        CACHE_PREFIX_INDICATOR,
        symbol,
        symbol,
        period.as_str()
    )
}

pub fn asset_metadata_key(symbol: &str) -> String {
    format!("{}{}", CACHE_PREFIX_ASSET_METADATA, symbol)
}

pub fn rate_limit_key(scope: &str, client: &str) -> String {
    format!("{}{}:{}", CACHE_PREFIX_RATE_LIMIT, scope, client)
}

// =============================================================================
// Redis
// =============================================================================

/// Redis cache over a multiplexed, auto-reconnecting connection.
#[derive(Clone)]
pub struct Cache {
    connection: ConnectionManager,
}

impl Cache {
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let client = Client::open(config.redis_url.as_str())?;
        let connection = ConnectionManager::new(client).await?;

        tracing::info!("Redis cache connected");

        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheStore for Cache {
    async fn get_raw(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_raw(&self, key: &str, value: String, ttl_seconds: u64) -> AppResult<()> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn check_rate_limit(
        &self,
        identifier: &str,
        max_requests: u64,
        window_seconds: u64,
    ) -> AppResult<(u64, bool)> {
        let mut conn = self.connection.clone();

        let count: u64 = conn.incr(identifier, 1).await?;
        if count == 1 {
            // First hit opens the window
            let _: () = conn.expire(identifier, window_seconds as i64).await?;
        }

        Ok((count, count <= max_requests))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::errors::AppError;

    #[test]
    fn test_key_formats() {
        assert_eq!(price_key("AAPL", Period::OneMonth), "market_data:price:AAPL_1mo");
        assert_eq!(
            indicator_key("BTC", Period::OneYear),
            "technical:indicator:BTC:BTC_1y"
        );
        assert_eq!(asset_metadata_key("MSFT"), "assets:asset_metadata:MSFT");
        assert_eq!(rate_limit_key("auth", "10.0.0.1"), "rate_limit:auth:10.0.0.1");
    }

    #[tokio::test]
    async fn test_get_json_treats_errors_as_miss() {
        let mut mock = MockCacheStore::new();
        mock.expect_get_raw()
            .returning(|_| Err(AppError::ServiceUnavailable("redis down".into())));
        let cache: Arc<dyn CacheStore> = Arc::new(mock);

        let value: Option<u32> = cache.get_json("k").await;
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_get_json_discards_bad_payload() {
        let mut mock = MockCacheStore::new();
        mock.expect_get_raw()
            .returning(|_| Ok(Some("not json".to_string())));
        let cache: Arc<dyn CacheStore> = Arc::new(mock);

        let value: Option<Vec<u32>> = cache.get_json("k").await;
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_set_json_writes_with_ttl() {
        let mut mock = MockCacheStore::new();
        mock.expect_set_raw()
            .withf(|key, value, ttl| key == "k" && value == "[1,2]" && *ttl == 60)
            .times(1)
            .returning(|_, _, _| Ok(()));
        let cache: Arc<dyn CacheStore> = Arc::new(mock);

        cache.set_json("k", &vec![1, 2], 60).await;
    }
}

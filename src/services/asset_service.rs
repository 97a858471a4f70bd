//! Asset metadata: cache, then the fundamentals provider, then the
//! built-in catalogue and defaults.

use std::sync::Arc;

use async_trait::async_trait;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use crate::config::ASSET_METADATA_TTL_SECONDS;
use crate::domain::AssetMetadata;
use crate::infra::cache::asset_metadata_key;
use crate::infra::{CacheStore, MetadataProvider};

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AssetService: Send + Sync {
    /// Always answers; fields nobody reported fall back to defaults.
    async fn metadata(&self, symbol: &str) -> AssetMetadata;
}

pub struct AssetCatalog {
    cache: Arc<dyn CacheStore>,
    provider: Option<Arc<dyn MetadataProvider>>,
}

impl AssetCatalog {
    pub fn new(cache: Arc<dyn CacheStore>, provider: Option<Arc<dyn MetadataProvider>>) -> Self {
        Self { cache, provider }
    }
}

#[async_trait]
impl AssetService for AssetCatalog {
    async fn metadata(&self, symbol: &str) -> AssetMetadata {
        let symbol = symbol.trim().to_uppercase();
        let key = asset_metadata_key(&symbol);

        if let Some(metadata) = self.cache.get_json::<AssetMetadata>(&key).await {
            return metadata;
        }

        let reported = match &self.provider {
            Some(provider) => match provider.overview(&symbol).await {
                Ok(reported) => reported,
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "Metadata lookup failed");
                    None
                }
            },
            None => None,
        };

        let metadata = AssetMetadata::resolve(&symbol, reported);
        self.cache
            .set_json(&key, &metadata, ASSET_METADATA_TTL_SECONDS)
            .await;
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetType, ProviderMetadata};
    use crate::errors::AppError;
    use crate::infra::{MockCacheStore, MockMetadataProvider};

    fn empty_cache() -> MockCacheStore {
        let mut cache = MockCacheStore::new();
        cache.expect_get_raw().returning(|_| Ok(None));
        cache.expect_set_raw().returning(|_, _, _| Ok(()));
        cache
    }

    #[tokio::test]
    async fn test_provider_fields_win() {
        let mut provider = MockMetadataProvider::new();
        provider.expect_overview().returning(|_| {
            Ok(Some(ProviderMetadata {
                name: Some("Apple Inc".to_string()),
                sector: Some("TECHNOLOGY".to_string()),
                beta: Some(1.25),
                ..Default::default()
            }))
        });
        let catalog = AssetCatalog::new(Arc::new(empty_cache()), Some(Arc::new(provider)));

        let metadata = catalog.metadata("aapl").await;
        assert_eq!(metadata.symbol, "AAPL");
        assert_eq!(metadata.name, "Apple Inc");
        assert_eq!(metadata.sector, "TECHNOLOGY");
        assert_eq!(metadata.beta, 1.25);
    }

    #[tokio::test]
    async fn test_provider_failure_uses_defaults() {
        let mut provider = MockMetadataProvider::new();
        provider
            .expect_overview()
            .returning(|_| Err(AppError::market_data("rate limited")));
        let catalog = AssetCatalog::new(Arc::new(empty_cache()), Some(Arc::new(provider)));

        let metadata = catalog.metadata("ZZZZ").await;
        assert_eq!(metadata.name, "ZZZZ Corporation");
        assert_eq!(metadata.sector, "Other");
        assert_eq!(metadata.industry, "General");
        assert_eq!(metadata.exchange, "NASDAQ");
        assert_eq!(metadata.beta, 1.0);
        assert_eq!(metadata.asset_type, AssetType::Stock);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_provider() {
        let cached = AssetMetadata::resolve("BTC", None);
        let raw = serde_json::to_string(&cached).unwrap();

        let mut cache = MockCacheStore::new();
        cache
            .expect_get_raw()
            .withf(|key| key == "assets:asset_metadata:BTC")
            .returning(move |_| Ok(Some(raw.clone())));
        let mut provider = MockMetadataProvider::new();
        provider.expect_overview().never();

        let catalog = AssetCatalog::new(Arc::new(cache), Some(Arc::new(provider)));
        assert_eq!(catalog.metadata("btc").await, cached);
    }
}

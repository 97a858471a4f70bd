//! Market-data providers.
//!
//! Each upstream API is a [`PriceProvider`]; the market service walks them
//! in order until one answers. Alpha Vantage also serves company
//! fundamentals through [`MetadataProvider`].

use std::sync::Arc;

use async_trait::async_trait;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use crate::config::Config;
use crate::domain::{AssetType, Period, PriceBar, PriceQuote, ProviderMetadata};
use crate::errors::AppResult;

mod alpha_vantage;
mod client;
mod coingecko;
mod yahoo;

pub use alpha_vantage::AlphaVantage;
pub use client::HttpClient;
pub use coingecko::CoinGecko;
pub use yahoo::YahooFinance;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Source label stamped on quotes
    fn name(&self) -> &'static str;

    fn supports(&self, asset_type: AssetType) -> bool;

    /// Latest quote, `None` when the provider has no data for the symbol.
    async fn quote(&self, symbol: &str) -> AppResult<Option<PriceQuote>>;

    /// Bars for `period`, oldest first. Empty when unavailable.
    async fn history(&self, symbol: &str, period: Period) -> AppResult<Vec<PriceBar>>;
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn overview(&self, symbol: &str) -> AppResult<Option<ProviderMetadata>>;
}

/// Providers enabled by configuration, in fallback order
pub struct MarketDataSources {
    pub prices: Vec<Arc<dyn PriceProvider>>,
    pub metadata: Option<Arc<dyn MetadataProvider>>,
}

impl MarketDataSources {
    /// CoinGecko (crypto), then Alpha Vantage (non-demo key), then Yahoo.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let http = HttpClient::new()?;
        let mut prices: Vec<Arc<dyn PriceProvider>> = Vec::new();
        let mut metadata: Option<Arc<dyn MetadataProvider>> = None;

        if config.coingecko_enabled {
            prices.push(Arc::new(CoinGecko::new(http.clone())));
        }
        if let Some(key) = config.alpha_vantage_key() {
            let alpha_vantage = Arc::new(AlphaVantage::new(http.clone(), key.to_string()));
            prices.push(alpha_vantage.clone());
            metadata = Some(alpha_vantage);
        }
        if config.yahoo_finance_enabled {
            prices.push(Arc::new(YahooFinance::new(http)));
        }

        tracing::info!(
            providers = ?prices.iter().map(|p| p.name()).collect::<Vec<_>>(),
            fundamentals = metadata.is_some(),
            "Market data providers configured"
        );

        Ok(Self { prices, metadata })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned()).unwrap()
    }

    #[test]
    fn test_demo_key_disables_alpha_vantage() {
        let sources = MarketDataSources::from_config(&config_with(&[])).unwrap();
        let names: Vec<_> = sources.prices.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["coingecko", "yahoo_finance"]);
        assert!(sources.metadata.is_none());
    }

    #[test]
    fn test_provider_order_with_real_key() {
        let config = config_with(&[
            ("ALPHA_VANTAGE_API_KEY", "ABC123"),
            ("YAHOO_FINANCE_ENABLED", "false"),
        ]);
        let sources = MarketDataSources::from_config(&config).unwrap();
        let names: Vec<_> = sources.prices.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["coingecko", "alpha_vantage"]);
        assert!(sources.metadata.is_some());
    }
}

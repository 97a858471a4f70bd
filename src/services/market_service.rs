//! Market data service - quotes with history behind a cache and an
//! ordered list of providers.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use super::AssetService;
use crate::analytics::screening::{INDEX_SYMBOLS, MARKET_UNIVERSE};
use crate::config::{MAX_CONCURRENT_LOOKUPS, MAX_SYMBOL_LENGTH};
use crate::domain::asset::KNOWN_ASSETS;
use crate::domain::{AssetType, MarketStatus, Period, PriceBar, PriceQuote, PriceSnapshot};
use crate::errors::{AppError, AppResult};
use crate::infra::cache::price_key;
use crate::infra::{CacheStore, PriceProvider};

/// Movers listed per category in the market summary
const SUMMARY_MOVERS: usize = 10;

/// Catalogue entry matched by symbol search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SearchResult {
    pub symbol: String,
    pub name: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub exchange: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MarketMover {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
}

impl From<&PriceQuote> for MarketMover {
    fn from(quote: &PriceQuote) -> Self {
        Self {
            symbol: quote.symbol.clone(),
            price: quote.current_price,
            change: quote.change,
            change_percent: quote.change_percent,
            volume: quote.volume,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MarketSummary {
    pub timestamp: DateTime<Utc>,
    pub market_status: MarketStatus,
    pub indices: Vec<MarketMover>,
    pub top_gainers: Vec<MarketMover>,
    pub top_losers: Vec<MarketMover>,
    pub most_active: Vec<MarketMover>,
}

/// Result of checking whether a symbol has data behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SymbolValidation {
    pub symbol: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<AssetType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Upper-case and bound-check a user supplied symbol.
pub fn normalize_symbol(symbol: &str) -> AppResult<String> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() || symbol.chars().count() > MAX_SYMBOL_LENGTH {
        return Err(AppError::validation(format!(
            "Symbol must be 1 to {} characters",
            MAX_SYMBOL_LENGTH
        )));
    }
    Ok(symbol)
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait MarketService: Send + Sync {
    /// Quote plus history for `period`, served from cache when fresh.
    async fn get_price(&self, symbol: &str, period: Period) -> AppResult<PriceSnapshot>;

    /// Concurrent lookups; one result per input symbol, in input order.
    async fn get_prices(
        &self,
        symbols: Vec<String>,
        period: Period,
    ) -> Vec<(String, AppResult<PriceSnapshot>)>;

    fn search(&self, query: &str, limit: usize) -> Vec<SearchResult>;

    async fn market_summary(&self) -> MarketSummary;

    fn market_status(&self) -> MarketStatus;

    async fn validate_symbol(&self, symbol: &str) -> SymbolValidation;
}

/// [`MarketService`] over a [`CacheStore`] and provider fallback chain.
pub struct MarketData {
    cache: Arc<dyn CacheStore>,
    providers: Vec<Arc<dyn PriceProvider>>,
    assets: Arc<dyn AssetService>,
    cache_ttl: u64,
}

impl MarketData {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        providers: Vec<Arc<dyn PriceProvider>>,
        assets: Arc<dyn AssetService>,
        cache_ttl: u64,
    ) -> Self {
        Self {
            cache,
            providers,
            assets,
            cache_ttl,
        }
    }

    fn supporting(&self, asset_type: AssetType) -> impl Iterator<Item = &Arc<dyn PriceProvider>> {
        self.providers
            .iter()
            .filter(move |provider| provider.supports(asset_type))
    }

    /// Walk the providers in order; the first quote wins.
    ///
    /// Misses are `NotFound` as soon as one provider answered without data;
    /// `MarketData` means every provider that was asked failed.
    async fn fetch(&self, symbol: &str, period: Period) -> AppResult<PriceSnapshot> {
        let asset_type = AssetType::classify(symbol);
        let mut failures = Vec::new();
        let mut answered = false;

        for provider in self.supporting(asset_type) {
            match provider.quote(symbol).await {
                Ok(Some(quote)) => {
                    let history = self.history(symbol, period, asset_type, provider.name()).await;
                    tracing::debug!(
                        symbol = %symbol,
                        source = provider.name(),
                        bars = history.len(),
                        "Price fetched"
                    );
                    return Ok(PriceSnapshot {
                        quote,
                        history,
                        asset_type,
                        period,
                    });
                }
                Ok(None) => {
                    tracing::debug!(symbol = %symbol, source = provider.name(), "No quote");
                    answered = true;
                }
                Err(e) => {
                    tracing::warn!(symbol = %symbol, source = provider.name(), error = %e, "Provider failed");
                    failures.push(provider.name());
                }
            }
        }

        if answered || failures.is_empty() {
            Err(AppError::NotFound)
        } else {
            Err(AppError::market_data(format!(
                "No price for {} (failed: {})",
                symbol,
                failures.join(", ")
            )))
        }
    }

    /// History from the quoting provider first, then any other provider
    /// that supports the asset type.
    async fn history(
        &self,
        symbol: &str,
        period: Period,
        asset_type: AssetType,
        quoted_by: &str,
    ) -> Vec<PriceBar> {
        let mut ordered: Vec<&Arc<dyn PriceProvider>> = self.supporting(asset_type).collect();
        ordered.sort_by_key(|provider| provider.name() != quoted_by);

        for provider in ordered {
            match provider.history(symbol, period).await {
                Ok(bars) if !bars.is_empty() => return bars,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(symbol = %symbol, source = provider.name(), error = %e, "History fetch failed");
                }
            }
        }
        Vec::new()
    }

    async fn quotes(&self, symbols: &[&str]) -> Vec<PriceQuote> {
        let symbols: Vec<String> = symbols.iter().map(|s| s.to_string()).collect();
        self.get_prices(symbols, Period::OneDay)
            .await
            .into_iter()
            .filter_map(|(_, result)| result.ok().map(|snapshot| snapshot.quote))
            .collect()
    }
}

#[async_trait]
impl MarketService for MarketData {
    async fn get_price(&self, symbol: &str, period: Period) -> AppResult<PriceSnapshot> {
        let symbol = normalize_symbol(symbol)?;
        let key = price_key(&symbol, period);

        if let Some(snapshot) = self.cache.get_json::<PriceSnapshot>(&key).await {
            tracing::debug!(symbol = %symbol, "Price cache hit");
            return Ok(snapshot);
        }

        let snapshot = self.fetch(&symbol, period).await?;
        self.cache.set_json(&key, &snapshot, self.cache_ttl).await;
        Ok(snapshot)
    }

    async fn get_prices(
        &self,
        symbols: Vec<String>,
        period: Period,
    ) -> Vec<(String, AppResult<PriceSnapshot>)> {
        stream::iter(symbols)
            .map(|symbol| async move {
                let result = self.get_price(&symbol, period).await;
                (symbol.to_uppercase(), result)
            })
            .buffered(MAX_CONCURRENT_LOOKUPS)
            .collect()
            .await
    }

    fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        let needle = query.trim().to_lowercase();

        KNOWN_ASSETS
            .iter()
            .filter(|asset| {
                asset.symbol.to_lowercase().contains(&needle)
                    || asset.name.to_lowercase().contains(&needle)
            })
            .take(limit)
            .map(|asset| SearchResult {
                symbol: asset.symbol.to_string(),
                name: asset.name.to_string(),
                asset_type: asset.asset_type,
                exchange: asset.exchange.to_string(),
            })
            .collect()
    }

    async fn market_summary(&self) -> MarketSummary {
        let indices = self.quotes(INDEX_SYMBOLS).await;
        let mut universe = self.quotes(MARKET_UNIVERSE).await;

        universe.sort_by(|a, b| b.change_percent.total_cmp(&a.change_percent));
        let top_gainers = universe
            .iter()
            .filter(|q| q.change_percent > 0.0)
            .take(SUMMARY_MOVERS)
            .map(MarketMover::from)
            .collect();
        let top_losers = universe
            .iter()
            .rev()
            .filter(|q| q.change_percent < 0.0)
            .take(SUMMARY_MOVERS)
            .map(MarketMover::from)
            .collect();

        universe.sort_by(|a, b| b.volume.cmp(&a.volume));
        let most_active = universe
            .iter()
            .take(SUMMARY_MOVERS)
            .map(MarketMover::from)
            .collect();

        MarketSummary {
            timestamp: Utc::now(),
            market_status: self.market_status(),
            indices: indices.iter().map(MarketMover::from).collect(),
            top_gainers,
            top_losers,
            most_active,
        }
    }

    fn market_status(&self) -> MarketStatus {
        MarketStatus::at(Utc::now())
    }

    async fn validate_symbol(&self, symbol: &str) -> SymbolValidation {
        let invalid = |symbol: String, error: String| SymbolValidation {
            symbol,
            valid: false,
            asset_type: None,
            name: None,
            exchange: None,
            currency: None,
            error: Some(error),
        };

        let normalized = match normalize_symbol(symbol) {
            Ok(symbol) => symbol,
            Err(e) => return invalid(symbol.to_string(), e.to_string()),
        };

        match self.get_price(&normalized, Period::default()).await {
            Ok(snapshot) => {
                let metadata = self.assets.metadata(&normalized).await;
                SymbolValidation {
                    symbol: normalized,
                    valid: true,
                    asset_type: Some(snapshot.asset_type),
                    name: Some(metadata.name),
                    exchange: Some(metadata.exchange),
                    currency: Some(metadata.currency),
                    error: None,
                }
            }
            Err(AppError::NotFound) => invalid(normalized, "Symbol not found".to_string()),
            Err(e) => invalid(normalized, e.to_string()),
        }
    }
}

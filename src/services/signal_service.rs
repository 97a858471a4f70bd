//! Signal service - technical analysis bundles, their cache and their
//! persisted history.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use super::market_service::normalize_symbol;
use super::{AssetService, MarketService};
use crate::analytics::indicators::{BollingerBands, Macd, Stochastic};
use crate::analytics::{generate_signals, IndicatorSnapshot, IndicatorValues};
use crate::config::{
    ANALYSIS_WINDOW, MAX_CONCURRENT_LOOKUPS, MIN_ANALYSIS_POINTS, SIGNAL_CACHE_TTL_SECONDS,
};
use crate::domain::signal::strength;
use crate::domain::{
    IndicatorVote, NewSignal, Period, PriceSnapshot, RiskLevel, SignalDecision, SignalRecord,
    TrendDirection,
};
use crate::errors::{AppError, AppResult};
use crate::infra::cache::indicator_key;
use crate::infra::{CacheStore, NewAsset, UnitOfWork};
use crate::with_transaction;

/// Everything computed for one symbol and period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SignalBundle {
    pub symbol: String,
    pub current_price: f64,
    pub timestamp: DateTime<Utc>,
    pub period: Period,
    pub signal: SignalDecision,
    pub signal_strength: u8,
    pub confidence: f64,
    pub trend_direction: TrendDirection,
    pub risk_level: RiskLevel,
    pub reasoning: Vec<String>,
    pub indicators: IndicatorValues,
    pub macd: Option<Macd>,
    pub bollinger_bands: Option<BollingerBands>,
    pub stochastic: Option<Stochastic>,
    pub individual_signals: BTreeMap<String, IndicatorVote>,
}

impl SignalBundle {
    /// Analyse the most recent closes of a snapshot.
    pub fn from_snapshot(snapshot: &PriceSnapshot) -> AppResult<Self> {
        let closes = snapshot.closes();
        if closes.len() < MIN_ANALYSIS_POINTS {
            return Err(AppError::validation("Insufficient price history"));
        }
        let window = &closes[closes.len().saturating_sub(ANALYSIS_WINDOW)..];

        let indicators = IndicatorSnapshot::from_closes(window);
        let price = snapshot.quote.current_price;
        let analysis = generate_signals(price, &indicators);

        Ok(Self {
            symbol: snapshot.quote.symbol.clone(),
            current_price: price,
            timestamp: Utc::now(),
            period: snapshot.period,
            signal: analysis.signal,
            signal_strength: analysis.signal_strength,
            confidence: analysis.confidence,
            trend_direction: analysis.trend_direction,
            risk_level: analysis.risk_level,
            reasoning: analysis.reasoning,
            indicators: indicators.values,
            macd: indicators.macd,
            bollinger_bands: indicators.bollinger,
            stochastic: indicators.stochastic,
            individual_signals: analysis.individual_signals,
        })
    }

    fn record(&self, asset_id: Uuid) -> NewSignal {
        NewSignal {
            asset_id,
            timeframe: self.period.as_str().to_string(),
            as_of: self.timestamp,
            rsi: self.indicators.rsi,
            ema_fast: self.indicators.ema_20,
            ema_slow: self.indicators.ema_50,
            macd: self.macd.map(|m| m.macd),
            macd_signal: self.macd.map(|m| m.signal),
            bb_upper: self.bollinger_bands.map(|b| b.upper),
            bb_middle: self.bollinger_bands.map(|b| b.middle),
            bb_lower: self.bollinger_bands.map(|b| b.lower),
            decision: self.signal,
            confidence: self.confidence,
        }
    }
}

/// Indicator values without the vote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IndicatorReport {
    pub symbol: String,
    pub period: Period,
    pub timestamp: DateTime<Utc>,
    pub current_price: f64,
    pub indicators: IndicatorValues,
    pub macd: Option<Macd>,
    pub bollinger_bands: Option<BollingerBands>,
    pub stochastic: Option<Stochastic>,
}

impl From<SignalBundle> for IndicatorReport {
    fn from(bundle: SignalBundle) -> Self {
        Self {
            symbol: bundle.symbol,
            period: bundle.period,
            timestamp: bundle.timestamp,
            current_price: bundle.current_price,
            indicators: bundle.indicators,
            macd: bundle.macd,
            bollinger_bands: bundle.bollinger_bands,
            stochastic: bundle.stochastic,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SignalsSummary {
    pub buy: u32,
    pub sell: u32,
    pub hold: u32,
    pub total_analyzed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StrongSignal {
    pub symbol: String,
    pub signal: SignalDecision,
    pub signal_strength: u8,
    pub confidence: f64,
}

/// Per-symbol line of the overview; `error` is set instead of the rest
/// when analysis failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OverviewEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<SignalDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_strength: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend_direction: Option<TrendDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MarketOverview {
    pub timestamp: DateTime<Utc>,
    pub signals_summary: SignalsSummary,
    pub strong_signals: Vec<StrongSignal>,
    pub symbols: BTreeMap<String, OverviewEntry>,
}

impl MarketOverview {
    pub fn from_results(results: Vec<(String, AppResult<SignalBundle>)>) -> Self {
        let mut summary = SignalsSummary::default();
        let mut strong_signals = Vec::new();
        let mut symbols = BTreeMap::new();

        for (symbol, result) in results {
            let entry = match result {
                Ok(bundle) => {
                    summary.total_analyzed += 1;
                    match bundle.signal {
                        SignalDecision::Buy => summary.buy += 1,
                        SignalDecision::Sell => summary.sell += 1,
                        SignalDecision::Hold => summary.hold += 1,
                    }
                    if bundle.signal_strength >= strength::STRONG {
                        strong_signals.push(StrongSignal {
                            symbol: symbol.clone(),
                            signal: bundle.signal,
                            signal_strength: bundle.signal_strength,
                            confidence: bundle.confidence,
                        });
                    }
                    OverviewEntry {
                        signal: Some(bundle.signal),
                        signal_strength: Some(bundle.signal_strength),
                        confidence: Some(bundle.confidence),
                        current_price: Some(bundle.current_price),
                        trend_direction: Some(bundle.trend_direction),
                        error: None,
                    }
                }
                Err(e) => OverviewEntry {
                    error: Some(e.lookup_message()),
                    ..Default::default()
                },
            };
            symbols.insert(symbol, entry);
        }

        Self {
            timestamp: Utc::now(),
            signals_summary: summary,
            strong_signals,
            symbols,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StrengthLevel {
    pub level: u8,
    pub name: String,
    pub description: String,
}

pub fn strength_levels() -> Vec<StrengthLevel> {
    strength::LEVELS
        .iter()
        .map(|(level, name, description)| StrengthLevel {
            level: *level,
            name: name.to_string(),
            description: description.to_string(),
        })
        .collect()
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SignalService: Send + Sync {
    async fn signal(&self, symbol: &str, period: Period) -> AppResult<SignalBundle>;

    /// One result per input symbol, in input order.
    async fn batch(
        &self,
        symbols: Vec<String>,
        period: Period,
    ) -> Vec<(String, AppResult<SignalBundle>)>;

    async fn market_overview(&self, symbols: Vec<String>) -> MarketOverview;

    /// Persisted signals of the last `days` days, newest first, with the
    /// total count.
    async fn history(
        &self,
        symbol: &str,
        days: u32,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<SignalRecord>, u64)>;

    async fn indicators(&self, symbol: &str, period: Period) -> AppResult<IndicatorReport>;
}

pub struct SignalEngine<U: UnitOfWork> {
    uow: Arc<U>,
    market: Arc<dyn MarketService>,
    assets: Arc<dyn AssetService>,
    cache: Arc<dyn CacheStore>,
    max_historical_days: u32,
}

impl<U: UnitOfWork> SignalEngine<U> {
    pub fn new(
        uow: Arc<U>,
        market: Arc<dyn MarketService>,
        assets: Arc<dyn AssetService>,
        cache: Arc<dyn CacheStore>,
        max_historical_days: u32,
    ) -> Self {
        Self {
            uow,
            market,
            assets,
            cache,
            max_historical_days,
        }
    }

    /// Store the bundle with its asset row. Failures are logged only.
    async fn persist(&self, bundle: &SignalBundle) {
        let metadata = self.assets.metadata(&bundle.symbol).await;
        let new_asset = NewAsset {
            symbol: bundle.symbol.clone(),
            name: metadata.name,
            asset_type: metadata.asset_type,
            exchange: metadata.exchange,
            currency: metadata.currency,
        };
        let bundle = bundle.clone();

        let stored = with_transaction!(self.uow, |ctx| {
            let asset = ctx.assets().upsert(new_asset).await?;
            ctx.signals()
                .create(&bundle.symbol, bundle.record(asset.id))
                .await
        });

        if let Err(e) = stored {
            tracing::warn!(error = %e, "Failed to persist signal");
        }
    }
}

#[async_trait]
impl<U: UnitOfWork> SignalService for SignalEngine<U> {
    async fn signal(&self, symbol: &str, period: Period) -> AppResult<SignalBundle> {
        let symbol = normalize_symbol(symbol)?;
        let key = indicator_key(&symbol, period);

        if let Some(bundle) = self.cache.get_json::<SignalBundle>(&key).await {
            tracing::debug!(symbol = %symbol, "Signal cache hit");
            return Ok(bundle);
        }

        let snapshot = self.market.get_price(&symbol, period).await?;
        let bundle = SignalBundle::from_snapshot(&snapshot)?;

        tracing::info!(
            symbol = %symbol,
            signal = %bundle.signal,
            confidence = bundle.confidence,
            "Signal computed"
        );

        self.cache
            .set_json(&key, &bundle, SIGNAL_CACHE_TTL_SECONDS)
            .await;
        self.persist(&bundle).await;
        Ok(bundle)
    }

    async fn batch(
        &self,
        symbols: Vec<String>,
        period: Period,
    ) -> Vec<(String, AppResult<SignalBundle>)> {
        stream::iter(symbols)
            .map(|symbol| async move {
                let result = self.signal(&symbol, period).await;
                (symbol.to_uppercase(), result)
            })
            .buffered(MAX_CONCURRENT_LOOKUPS)
            .collect()
            .await
    }

    async fn market_overview(&self, symbols: Vec<String>) -> MarketOverview {
        MarketOverview::from_results(self.batch(symbols, Period::default()).await)
    }

    async fn history(
        &self,
        symbol: &str,
        days: u32,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<SignalRecord>, u64)> {
        if days == 0 || days > self.max_historical_days {
            return Err(AppError::validation(format!(
                "days must be between 1 and {}",
                self.max_historical_days
            )));
        }
        let symbol = normalize_symbol(symbol)?;
        let since = Utc::now() - Duration::days(i64::from(days));

        self.uow
            .signals()
            .history(&symbol, since, page.max(1), per_page)
            .await
    }

    async fn indicators(&self, symbol: &str, period: Period) -> AppResult<IndicatorReport> {
        self.signal(symbol, period).await.map(IndicatorReport::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetMetadata, AssetType, PriceBar, PriceQuote};
    use crate::infra::{MockCacheStore, MockSignalRepository, StubUnitOfWork};
    use crate::services::{MockAssetService, MockMarketService};

    fn snapshot(closes: &[f64]) -> PriceSnapshot {
        let last = closes.last().copied().unwrap_or(0.0);
        PriceSnapshot {
            quote: PriceQuote {
                symbol: "AAPL".to_string(),
                current_price: last,
                change: 0.0,
                change_percent: 0.0,
                volume: 0,
                high: last,
                low: last,
                open: last,
                previous_close: last,
                source: "test".to_string(),
                timestamp: Utc::now(),
            },
            history: closes
                .iter()
                .enumerate()
                .map(|(i, close)| PriceBar {
                    date: format!("2024-01-{:02}", i + 1),
                    open: *close,
                    high: *close,
                    low: *close,
                    close: *close,
                    volume: 0,
                })
                .collect(),
            asset_type: AssetType::Stock,
            period: Period::OneMonth,
        }
    }

    #[test]
    fn test_short_history_rejected() {
        let closes: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let err = SignalBundle::from_snapshot(&snapshot(&closes)).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "Insufficient price history"));
    }

    #[test]
    fn test_bundle_from_full_history() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let bundle = SignalBundle::from_snapshot(&snapshot(&closes)).unwrap();

        assert_eq!(bundle.symbol, "AAPL");
        assert_eq!(bundle.current_price, 159.0);
        assert!(bundle.indicators.rsi.is_some());
        assert!(bundle.macd.is_some());
        assert_eq!(bundle.period, Period::OneMonth);
    }

    #[test]
    fn test_record_maps_indicator_columns() {
        let closes: Vec<f64> = (0..40).map(|i| 50.0 + (i % 7) as f64).collect();
        let bundle = SignalBundle::from_snapshot(&snapshot(&closes)).unwrap();
        let asset_id = Uuid::new_v4();
        let record = bundle.record(asset_id);

        assert_eq!(record.asset_id, asset_id);
        assert_eq!(record.timeframe, "1mo");
        assert_eq!(record.rsi, bundle.indicators.rsi);
        assert_eq!(record.bb_middle, bundle.bollinger_bands.map(|b| b.middle));
        assert_eq!(record.decision, bundle.signal);
    }

    #[test]
    fn test_overview_counts_and_strong_signals() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let mut strong = SignalBundle::from_snapshot(&snapshot(&closes)).unwrap();
        strong.signal = SignalDecision::Buy;
        strong.signal_strength = 4;
        let mut weak = strong.clone();
        weak.signal = SignalDecision::Hold;
        weak.signal_strength = 2;

        let overview = MarketOverview::from_results(vec![
            ("AAPL".to_string(), Ok(strong)),
            ("MSFT".to_string(), Ok(weak)),
            ("NOPE".to_string(), Err(AppError::NotFound)),
            (
                "ZZZZ".to_string(),
                Err(AppError::market_data("yahoo_finance: timeout")),
            ),
        ]);

        assert_eq!(overview.signals_summary.buy, 1);
        assert_eq!(overview.signals_summary.hold, 1);
        assert_eq!(overview.signals_summary.total_analyzed, 2);
        assert_eq!(overview.strong_signals.len(), 1);
        assert_eq!(overview.strong_signals[0].symbol, "AAPL");
        assert_eq!(
            overview.symbols["NOPE"].error.as_deref(),
            Some("Price data unavailable")
        );
        assert_eq!(
            overview.symbols["ZZZZ"].error.as_deref(),
            Some("Market data temporarily unavailable")
        );
    }

    #[test]
    fn test_strength_levels() {
        let levels = strength_levels();
        assert_eq!(levels.len(), 5);
        assert_eq!(levels[0].name, "Very Weak");
        assert_eq!(levels[4].level, 5);
    }

    fn engine(
        cache: MockCacheStore,
        market: MockMarketService,
        assets: MockAssetService,
    ) -> SignalEngine<StubUnitOfWork> {
        SignalEngine::new(
            Arc::new(StubUnitOfWork::default()),
            Arc::new(market),
            Arc::new(assets),
            Arc::new(cache),
            365,
        )
    }

    #[tokio::test]
    async fn test_cached_signal_skips_market_data() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let cached = SignalBundle::from_snapshot(&snapshot(&closes)).unwrap();
        let raw = serde_json::to_string(&cached).unwrap();

        let mut cache = MockCacheStore::new();
        cache
            .expect_get_raw()
            .withf(|key| key == indicator_key("AAPL", Period::OneMonth))
            .returning(move |_| Ok(Some(raw.clone())));
        cache.expect_set_raw().never();
        let mut market = MockMarketService::new();
        market.expect_get_price().never();

        let engine = engine(cache, market, MockAssetService::new());
        let bundle = engine.signal("aapl", Period::OneMonth).await.unwrap();
        assert_eq!(bundle.symbol, "AAPL");
        assert_eq!(bundle.signal, cached.signal);
    }

    #[tokio::test]
    async fn test_failed_persistence_still_returns_signal() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let priced = snapshot(&closes);

        let mut cache = MockCacheStore::new();
        cache.expect_get_raw().returning(|_| Ok(None));
        cache.expect_set_raw().times(1).returning(|_, _, _| Ok(()));
        let mut market = MockMarketService::new();
        market
            .expect_get_price()
            .times(1)
            .returning(move |_, _| Ok(priced.clone()));
        let mut assets = MockAssetService::new();
        assets
            .expect_metadata()
            .returning(|symbol| AssetMetadata::resolve(symbol, None));

        let engine = engine(cache, market, assets);
        let bundle = engine.signal("AAPL", Period::OneMonth).await.unwrap();
        assert_eq!(bundle.current_price, 159.0);
    }

    #[tokio::test]
    async fn test_history_days_bounded() {
        let mut signals = MockSignalRepository::new();
        signals.expect_history().never();
        let uow = StubUnitOfWork {
            signals: Arc::new(signals),
            ..Default::default()
        };
        let engine = SignalEngine::new(
            Arc::new(uow),
            Arc::new(MockMarketService::new()),
            Arc::new(MockAssetService::new()),
            Arc::new(MockCacheStore::new()),
            365,
        );

        let result = engine.history("AAPL", 366, 1, 20).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}

//! Screener service - strategy screening, sector rotation and market breadth
//! over fixed symbol universes.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use super::signal_service::SignalBundle;
use super::{AssetService, MarketService, SignalService};
use crate::analytics::screening::{
    breadth, rotation, score, sector_breakdown, MarketBreadth, SectorPerformance, SectorRotation,
    StrategyDefinition, MARKET_UNIVERSE, SCREEN_UNIVERSE, SECTORS,
};
use crate::analytics::{Candidate, Criteria, ScreeningStrategy};
use crate::config::{DEFAULT_SCREEN_LIMIT, MAX_CONCURRENT_LOOKUPS};
use crate::domain::{AssetMetadata, Period, PriceSnapshot, SignalDecision};

fn default_limit() -> usize {
    DEFAULT_SCREEN_LIMIT
}

#[derive(Debug, Clone, PartialEq, Deserialize, Validate, ToSchema)]
pub struct ScreeningRequest {
    /// Predefined strategy; plain filtering when absent
    pub strategy: Option<ScreeningStrategy>,
    /// Sectors to keep, matched case-insensitively; empty keeps all
    #[serde(default)]
    pub sectors: Vec<String>,
    #[validate(range(min = 0.0))]
    pub market_cap_min: Option<f64>,
    #[validate(range(min = 0.0))]
    pub market_cap_max: Option<f64>,
    pub volume_min: Option<u64>,
    #[validate(range(min = 0.0))]
    pub price_min: Option<f64>,
    #[validate(range(min = 0.0))]
    pub price_max: Option<f64>,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 200, message = "Limit must be between 1 and 200"))]
    pub limit: usize,
}

impl Default for ScreeningRequest {
    fn default() -> Self {
        Self {
            strategy: None,
            sectors: Vec::new(),
            market_cap_min: None,
            market_cap_max: None,
            volume_min: None,
            price_min: None,
            price_max: None,
            limit: DEFAULT_SCREEN_LIMIT,
        }
    }
}

impl ScreeningRequest {
    /// Bounds given directly on the request
    fn filters(&self) -> Criteria {
        Criteria {
            market_cap_min: self.market_cap_min,
            market_cap_max: self.market_cap_max,
            volume_min: self.volume_min,
            price_min: self.price_min,
            price_max: self.price_max,
            ..Default::default()
        }
    }

    fn wants_sector(&self, sector: &str) -> bool {
        self.sectors.is_empty() || self.sectors.iter().any(|s| s.eq_ignore_ascii_case(sector))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScreenedAsset {
    /// 1 is the best score
    pub rank: usize,
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub industry: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub beta: Option<f64>,
    pub rsi: Option<f64>,
    pub signal: Option<SignalDecision>,
    pub confidence: Option<f64>,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PerformanceSummary {
    pub average_score: f64,
    pub average_change: f64,
    pub buy_signals: usize,
    pub sell_signals: usize,
    pub hold_signals: usize,
}

impl PerformanceSummary {
    fn of(assets: &[ScreenedAsset]) -> Self {
        if assets.is_empty() {
            return Self::default();
        }
        let n = assets.len() as f64;
        let count = |wanted| assets.iter().filter(|a| a.signal == Some(wanted)).count();

        Self {
            average_score: assets.iter().map(|a| a.score).sum::<f64>() / n,
            average_change: assets.iter().map(|a| a.change_percent).sum::<f64>() / n,
            buy_signals: count(SignalDecision::Buy),
            sell_signals: count(SignalDecision::Sell),
            hold_signals: count(SignalDecision::Hold),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScreeningResult {
    /// Strategy id, or `custom`
    pub strategy: String,
    pub timestamp: DateTime<Utc>,
    pub total_assets_screened: usize,
    /// Matches before truncation to the limit
    pub total_results: usize,
    pub filters_applied: Vec<String>,
    pub assets: Vec<ScreenedAsset>,
    pub sector_breakdown: BTreeMap<String, u32>,
    pub performance_summary: PerformanceSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StrategyInfo {
    pub id: ScreeningStrategy,
    #[serde(flatten)]
    pub definition: StrategyDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SectorAnalysis {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub rotation: SectorRotation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BreadthReport {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub breadth: MarketBreadth,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ScreenerService: Send + Sync {
    async fn screen(&self, request: ScreeningRequest) -> ScreeningResult;

    fn strategies(&self) -> Vec<StrategyInfo>;

    async fn sectors(&self) -> SectorAnalysis;

    async fn breadth(&self) -> BreadthReport;
}

/// Everything known about one universe member
struct Screened {
    snapshot: PriceSnapshot,
    bundle: Option<SignalBundle>,
    metadata: AssetMetadata,
}

impl Screened {
    fn candidate(&self) -> Candidate {
        let quote = &self.snapshot.quote;
        Candidate {
            symbol: quote.symbol.clone(),
            price: quote.current_price,
            change_percent: quote.change_percent,
            volume: quote.volume,
            market_cap: self.metadata.market_cap,
            pe_ratio: self.metadata.pe_ratio,
            pb_ratio: self.metadata.pb_ratio,
            dividend_yield: self.metadata.dividend_yield,
            beta: Some(self.metadata.beta),
            rsi: self.bundle.as_ref().and_then(|b| b.indicators.rsi),
            signal: self.bundle.as_ref().map(|b| b.signal),
            confidence: self.bundle.as_ref().map(|b| b.confidence),
        }
    }

    fn asset(&self, candidate: Candidate, score: f64) -> ScreenedAsset {
        ScreenedAsset {
            rank: 0,
            symbol: candidate.symbol,
            name: self.metadata.name.clone(),
            sector: self.metadata.sector.clone(),
            industry: self.metadata.industry.clone(),
            price: candidate.price,
            change: self.snapshot.quote.change,
            change_percent: candidate.change_percent,
            volume: candidate.volume,
            market_cap: candidate.market_cap,
            pe_ratio: candidate.pe_ratio,
            pb_ratio: candidate.pb_ratio,
            dividend_yield: candidate.dividend_yield,
            beta: candidate.beta,
            rsi: candidate.rsi,
            signal: candidate.signal,
            confidence: candidate.confidence,
            score,
        }
    }
}

/// Apply strategy and request bounds, then score, rank and truncate.
fn rank(screened: &[Screened], request: &ScreeningRequest) -> (Vec<ScreenedAsset>, usize) {
    let strategy = request.strategy.map(|s| s.definition().criteria);
    let filters = request.filters();

    let mut matched: Vec<ScreenedAsset> = screened
        .iter()
        .filter(|s| request.wants_sector(&s.metadata.sector))
        .filter_map(|s| {
            let candidate = s.candidate();
            let keep = filters.matches(&candidate)
                && strategy.as_ref().map_or(true, |c| c.matches(&candidate));
            keep.then(|| {
                let points = score(&candidate, request.strategy);
                s.asset(candidate, points)
            })
        })
        .collect();

    matched.sort_by(|a, b| b.score.total_cmp(&a.score));
    let total = matched.len();
    matched.truncate(request.limit);
    for (i, asset) in matched.iter_mut().enumerate() {
        asset.rank = i + 1;
    }
    (matched, total)
}

pub struct Screener {
    market: Arc<dyn MarketService>,
    signals: Arc<dyn SignalService>,
    assets: Arc<dyn AssetService>,
}

impl Screener {
    pub fn new(
        market: Arc<dyn MarketService>,
        signals: Arc<dyn SignalService>,
        assets: Arc<dyn AssetService>,
    ) -> Self {
        Self {
            market,
            signals,
            assets,
        }
    }

    /// Price, signal and metadata for each symbol; symbols without a price
    /// are dropped.
    async fn gather(&self, symbols: &[&str]) -> Vec<Screened> {
        let owned: Vec<String> = symbols.iter().map(|s| s.to_string()).collect();
        stream::iter(owned)
            .map(|symbol| async move {
                let symbol = symbol.as_str();
                let snapshot = match self.market.get_price(symbol, Period::default()).await {
                    Ok(snapshot) => snapshot,
                    Err(e) => {
                        tracing::debug!(symbol = %symbol, error = %e, "Skipping unpriced symbol");
                        return None;
                    }
                };
                let bundle = SignalBundle::from_snapshot(&snapshot).ok();
                let metadata = self.assets.metadata(symbol).await;
                Some(Screened {
                    snapshot,
                    bundle,
                    metadata,
                })
            })
            .buffered(MAX_CONCURRENT_LOOKUPS)
            .filter_map(|screened| async move { screened })
            .collect()
            .await
    }

    async fn decisions(&self, symbols: &[&str]) -> Vec<SignalDecision> {
        let symbols = symbols.iter().map(|s| s.to_string()).collect();
        self.signals
            .batch(symbols, Period::default())
            .await
            .into_iter()
            .filter_map(|(_, result)| result.ok().map(|bundle| bundle.signal))
            .collect()
    }
}

#[async_trait]
impl ScreenerService for Screener {
    async fn screen(&self, request: ScreeningRequest) -> ScreeningResult {
        let screened = self.gather(SCREEN_UNIVERSE).await;
        let (assets, total_results) = rank(&screened, &request);

        let mut filters_applied = request
            .strategy
            .map(|s| s.definition().criteria.describe())
            .unwrap_or_default();
        filters_applied.extend(request.filters().describe());
        if !request.sectors.is_empty() {
            filters_applied.push(format!("sector in [{}]", request.sectors.join(", ")));
        }

        tracing::info!(
            strategy = ?request.strategy,
            screened = screened.len(),
            matched = total_results,
            "Screening complete"
        );

        ScreeningResult {
            strategy: request
                .strategy
                .map_or_else(|| "custom".to_string(), |s| s.as_str().to_string()),
            timestamp: Utc::now(),
            total_assets_screened: SCREEN_UNIVERSE.len(),
            total_results,
            filters_applied,
            sector_breakdown: sector_breakdown(assets.iter().map(|a| a.sector.as_str())),
            performance_summary: PerformanceSummary::of(&assets),
            assets,
        }
    }

    fn strategies(&self) -> Vec<StrategyInfo> {
        ScreeningStrategy::ALL
            .iter()
            .map(|&id| StrategyInfo {
                id,
                definition: id.definition(),
            })
            .collect()
    }

    async fn sectors(&self) -> SectorAnalysis {
        let mut sectors = Vec::with_capacity(SECTORS.len());
        for (sector, symbols) in SECTORS {
            let prices: Vec<f64> = self
                .market
                .get_prices(symbols.iter().map(|s| s.to_string()).collect(), Period::default())
                .await
                .into_iter()
                .filter_map(|(_, result)| result.ok().map(|s| s.quote.current_price))
                .collect();
            let decisions = self.decisions(symbols).await;
            sectors.push(SectorPerformance::new(sector, &prices, &decisions));
        }

        SectorAnalysis {
            timestamp: Utc::now(),
            rotation: rotation(sectors),
        }
    }

    async fn breadth(&self) -> BreadthReport {
        let decisions = self.decisions(MARKET_UNIVERSE).await;
        BreadthReport {
            timestamp: Utc::now(),
            breadth: breadth(&decisions),
        }
    }
}

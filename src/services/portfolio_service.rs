//! Portfolio service - CRUD, positions, valuation and analytics.
//!
//! Every operation is scoped to the requesting user; a portfolio owned by
//! someone else behaves as if it did not exist.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use super::market_service::normalize_symbol;
use super::{AssetService, MarketService};
use crate::analytics::portfolio::{recommendations, risk_figures};
use crate::analytics::{compute_metrics, Holding, PortfolioMetrics, RiskFigures};
use crate::config::{DEFAULT_PORTFOLIO_NAME, MAX_CONCURRENT_LOOKUPS};
use crate::domain::portfolio::merge_lot;
use crate::domain::{AssetMetadata, AssetType, Period, Portfolio, Position, PriceBar};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{NewAsset, UnitOfWork};
use crate::with_transaction;

/// Position valued at the latest known price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PositionView {
    pub id: Uuid,
    pub symbol: String,
    pub asset_name: String,
    pub asset_type: AssetType,
    pub quantity: f64,
    pub avg_cost: f64,
    /// Latest price, or the average cost when no quote was available
    pub current_price: f64,
    pub market_value: f64,
    pub cost_basis: f64,
    pub unrealized_pnl: f64,
    pub unrealized_pnl_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PortfolioSummary {
    pub total_value: f64,
    pub total_cost: f64,
    pub total_pnl: f64,
    pub total_pnl_percent: f64,
    pub positions_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AllocationEntry {
    pub symbol: String,
    /// Share of total market value, in percent
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PortfolioDetail {
    #[serde(flatten)]
    pub portfolio: Portfolio,
    pub positions: Vec<PositionView>,
    pub summary: PortfolioSummary,
    pub allocation: Vec<AllocationEntry>,
    pub risk_metrics: PortfolioMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Performance {
    pub total_value: f64,
    pub total_cost: f64,
    /// Gain over cost, in percent
    pub total_return: f64,
    /// Return of the value series, in percent
    pub period_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub volatility: f64,
    pub max_drawdown: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AllocationBreakdown {
    pub by_sector: BTreeMap<String, f64>,
    pub by_asset_type: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PortfolioAnalytics {
    pub portfolio_id: Uuid,
    pub performance: Performance,
    pub risk: RiskFigures,
    pub allocation: AllocationBreakdown,
    pub diversification_score: f64,
    pub recommendations: Vec<String>,
    pub calculated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserMetrics {
    pub user_id: Uuid,
    pub metrics: PortfolioMetrics,
    pub positions_count: usize,
    pub total_value: f64,
    pub calculated_at: DateTime<Utc>,
}

/// Who is asking, for ownership checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub id: Uuid,
    pub is_admin: bool,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait PortfolioService: Send + Sync {
    async fn list(&self, user_id: Uuid) -> AppResult<Vec<Portfolio>>;

    async fn create(
        &self,
        user_id: Uuid,
        name: Option<String>,
        description: Option<String>,
    ) -> AppResult<Portfolio>;

    async fn detail(&self, user_id: Uuid, portfolio_id: Uuid) -> AppResult<PortfolioDetail>;

    async fn update(
        &self,
        user_id: Uuid,
        portfolio_id: Uuid,
        name: Option<String>,
        description: Option<String>,
    ) -> AppResult<Portfolio>;

    async fn delete(&self, user_id: Uuid, portfolio_id: Uuid) -> AppResult<()>;

    /// Buy into a position, merging with an existing one for the same asset.
    async fn add_position(
        &self,
        user_id: Uuid,
        portfolio_id: Uuid,
        symbol: &str,
        quantity: f64,
        price: f64,
    ) -> AppResult<Position>;

    async fn update_position(
        &self,
        user_id: Uuid,
        portfolio_id: Uuid,
        position_id: Uuid,
        quantity: Option<f64>,
        avg_cost: Option<f64>,
    ) -> AppResult<Position>;

    async fn delete_position(
        &self,
        user_id: Uuid,
        portfolio_id: Uuid,
        position_id: Uuid,
    ) -> AppResult<()>;

    async fn analytics(&self, user_id: Uuid, portfolio_id: Uuid) -> AppResult<PortfolioAnalytics>;

    /// Metrics across every position of `user_id`; own user or admin only.
    async fn user_metrics(&self, requester: Requester, user_id: Uuid) -> AppResult<UserMetrics>;
}

/// A position together with what valuation learned about it
struct Valued {
    position: Position,
    price: Option<f64>,
    history: Vec<PriceBar>,
    metadata: AssetMetadata,
}

impl Valued {
    fn current_price(&self) -> f64 {
        self.price.unwrap_or(self.position.avg_cost)
    }

    fn market_value(&self) -> f64 {
        self.position.quantity * self.current_price()
    }

    fn holding(&self) -> Holding {
        Holding {
            symbol: self.position.symbol.clone(),
            quantity: self.position.quantity,
            avg_cost: self.position.avg_cost,
            current_price: self.current_price(),
            beta: self.metadata.beta,
        }
    }

    fn view(&self) -> PositionView {
        let market_value = self.market_value();
        let cost_basis = self.position.cost_basis();
        let pnl = market_value - cost_basis;

        PositionView {
            id: self.position.id,
            symbol: self.position.symbol.clone(),
            asset_name: self.position.asset_name.clone(),
            asset_type: self.position.asset_type,
            quantity: self.position.quantity,
            avg_cost: self.position.avg_cost,
            current_price: self.current_price(),
            market_value,
            cost_basis,
            unrealized_pnl: pnl,
            unrealized_pnl_percent: percent(pnl, cost_basis),
        }
    }
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

fn summarize(valued: &[Valued]) -> PortfolioSummary {
    let total_value: f64 = valued.iter().map(Valued::market_value).sum();
    let total_cost: f64 = valued.iter().map(|v| v.position.cost_basis()).sum();
    let total_pnl = total_value - total_cost;

    PortfolioSummary {
        total_value,
        total_cost,
        total_pnl,
        total_pnl_percent: percent(total_pnl, total_cost),
        positions_count: valued.len(),
    }
}

/// Share of total value per key, in percent
fn weights<'a>(valued: &'a [Valued], key: impl Fn(&'a Valued) -> String) -> BTreeMap<String, f64> {
    let total: f64 = valued.iter().map(Valued::market_value).sum();
    let mut weights = BTreeMap::new();
    for item in valued {
        *weights.entry(key(item)).or_insert(0.0) += percent(item.market_value(), total);
    }
    weights
}

fn metrics_of(valued: &[Valued]) -> PortfolioMetrics {
    let holdings: Vec<Holding> = valued.iter().map(Valued::holding).collect();
    let history: HashMap<String, Vec<PriceBar>> = valued
        .iter()
        .filter(|v| !v.history.is_empty())
        .map(|v| (v.position.symbol.clone(), v.history.clone()))
        .collect();
    compute_metrics(&holdings, &history)
}

/// Where a new lot goes
#[derive(Debug, PartialEq)]
enum Lot {
    /// Fold into the position already holding the asset
    Merge {
        position_id: Uuid,
        quantity: f64,
        avg_cost: f64,
    },
    /// New position row
    Open,
}

/// A lot for an asset already held merges at the weighted cost. A new asset
/// needs room under `max_positions`.
fn place_lot(
    existing: Option<&Position>,
    held: u64,
    max_positions: u64,
    quantity: f64,
    price: f64,
) -> AppResult<Lot> {
    match existing {
        Some(position) => {
            let (quantity, avg_cost) =
                merge_lot(position.quantity, position.avg_cost, quantity, price);
            Ok(Lot::Merge {
                position_id: position.id,
                quantity,
                avg_cost,
            })
        }
        None if held >= max_positions => Err(AppError::validation(format!(
            "Portfolio cannot hold more than {} positions",
            max_positions
        ))),
        None => Ok(Lot::Open),
    }
}

pub struct PortfolioManager<U: UnitOfWork> {
    uow: Arc<U>,
    market: Arc<dyn MarketService>,
    assets: Arc<dyn AssetService>,
    max_positions: u64,
}

impl<U: UnitOfWork> PortfolioManager<U> {
    pub fn new(
        uow: Arc<U>,
        market: Arc<dyn MarketService>,
        assets: Arc<dyn AssetService>,
        max_positions: u64,
    ) -> Self {
        Self {
            uow,
            market,
            assets,
            max_positions,
        }
    }

    async fn owned(&self, user_id: Uuid, portfolio_id: Uuid) -> AppResult<Portfolio> {
        self.uow
            .portfolios()
            .find_by_id(portfolio_id)
            .await?
            .filter(|portfolio| portfolio.user_id == user_id)
            .ok_or_not_found()
    }

    /// Price every position concurrently. A failed quote leaves the
    /// position valued at cost.
    async fn value(&self, positions: Vec<Position>) -> Vec<Valued> {
        stream::iter(positions)
            .map(|position| async move {
                let (price, history) =
                    match self.market.get_price(&position.symbol, Period::default()).await {
                        Ok(snapshot) => (Some(snapshot.quote.current_price), snapshot.history),
                        Err(e) => {
                            tracing::warn!(symbol = %position.symbol, error = %e, "Valuing position at cost");
                            (None, Vec::new())
                        }
                    };
                let metadata = self.assets.metadata(&position.symbol).await;
                Valued {
                    position,
                    price,
                    history,
                    metadata,
                }
            })
            .buffered(MAX_CONCURRENT_LOOKUPS)
            .collect()
            .await
    }
}

#[async_trait]
impl<U: UnitOfWork> PortfolioService for PortfolioManager<U> {
    async fn list(&self, user_id: Uuid) -> AppResult<Vec<Portfolio>> {
        self.uow.portfolios().list_by_user(user_id).await
    }

    async fn create(
        &self,
        user_id: Uuid,
        name: Option<String>,
        description: Option<String>,
    ) -> AppResult<Portfolio> {
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_PORTFOLIO_NAME.to_string());

        let portfolio = self
            .uow
            .portfolios()
            .create(user_id, name, description.unwrap_or_default())
            .await?;

        tracing::info!(portfolio_id = %portfolio.id, user_id = %user_id, "Portfolio created");
        Ok(portfolio)
    }

    async fn detail(&self, user_id: Uuid, portfolio_id: Uuid) -> AppResult<PortfolioDetail> {
        let portfolio = self.owned(user_id, portfolio_id).await?;
        let positions = self.uow.portfolios().positions(portfolio_id).await?;
        let valued = self.value(positions).await;

        let allocation = weights(&valued, |v| v.position.symbol.clone())
            .into_iter()
            .map(|(symbol, weight)| AllocationEntry { symbol, weight })
            .collect();

        Ok(PortfolioDetail {
            portfolio,
            positions: valued.iter().map(Valued::view).collect(),
            summary: summarize(&valued),
            allocation,
            risk_metrics: metrics_of(&valued),
        })
    }

    async fn update(
        &self,
        user_id: Uuid,
        portfolio_id: Uuid,
        name: Option<String>,
        description: Option<String>,
    ) -> AppResult<Portfolio> {
        self.owned(user_id, portfolio_id).await?;
        self.uow
            .portfolios()
            .update(portfolio_id, name, description)
            .await
    }

    async fn delete(&self, user_id: Uuid, portfolio_id: Uuid) -> AppResult<()> {
        self.owned(user_id, portfolio_id).await?;
        self.uow.portfolios().delete(portfolio_id).await?;

        tracing::info!(portfolio_id = %portfolio_id, "Portfolio deleted");
        Ok(())
    }

    async fn add_position(
        &self,
        user_id: Uuid,
        portfolio_id: Uuid,
        symbol: &str,
        quantity: f64,
        price: f64,
    ) -> AppResult<Position> {
        if quantity <= 0.0 || price <= 0.0 {
            return Err(AppError::validation("Quantity and price must be positive"));
        }
        self.owned(user_id, portfolio_id).await?;

        let symbol = normalize_symbol(symbol)?;
        let metadata = self.assets.metadata(&symbol).await;
        let new_asset = NewAsset {
            symbol,
            name: metadata.name,
            asset_type: metadata.asset_type,
            exchange: metadata.exchange,
            currency: metadata.currency,
        };
        let max_positions = self.max_positions;

        let position = with_transaction!(self.uow, |ctx| {
            let asset = ctx.assets().upsert(new_asset).await?;
            let positions = ctx.portfolios();

            let existing = positions.find_position_by_asset(portfolio_id, asset.id).await?;
            let held = match existing {
                Some(_) => 0,
                None => positions.count_positions(portfolio_id).await?,
            };

            match place_lot(existing.as_ref(), held, max_positions, quantity, price)? {
                Lot::Merge {
                    position_id,
                    quantity,
                    avg_cost,
                } => positions.set_position(position_id, quantity, avg_cost).await,
                Lot::Open => {
                    positions
                        .insert_position(portfolio_id, asset.id, quantity, price)
                        .await
                }
            }
        })?;

        tracing::info!(
            portfolio_id = %portfolio_id,
            symbol = %position.symbol,
            quantity = position.quantity,
            "Position added"
        );
        Ok(position)
    }

    async fn update_position(
        &self,
        user_id: Uuid,
        portfolio_id: Uuid,
        position_id: Uuid,
        quantity: Option<f64>,
        avg_cost: Option<f64>,
    ) -> AppResult<Position> {
        if quantity.is_some_and(|q| q <= 0.0) || avg_cost.is_some_and(|c| c <= 0.0) {
            return Err(AppError::validation("Quantity and price must be positive"));
        }
        self.owned(user_id, portfolio_id).await?;
        self.uow
            .portfolios()
            .find_position(portfolio_id, position_id)
            .await?
            .ok_or_not_found()?;

        self.uow
            .portfolios()
            .update_position(position_id, quantity, avg_cost)
            .await
    }

    async fn delete_position(
        &self,
        user_id: Uuid,
        portfolio_id: Uuid,
        position_id: Uuid,
    ) -> AppResult<()> {
        self.owned(user_id, portfolio_id).await?;
        self.uow
            .portfolios()
            .find_position(portfolio_id, position_id)
            .await?
            .ok_or_not_found()?;

        self.uow.portfolios().delete_position(position_id).await
    }

    async fn analytics(&self, user_id: Uuid, portfolio_id: Uuid) -> AppResult<PortfolioAnalytics> {
        self.owned(user_id, portfolio_id).await?;
        let positions = self.uow.portfolios().positions(portfolio_id).await?;
        let valued = self.value(positions).await;

        let summary = summarize(&valued);
        let metrics = metrics_of(&valued);

        Ok(PortfolioAnalytics {
            portfolio_id,
            performance: Performance {
                total_value: summary.total_value,
                total_cost: summary.total_cost,
                total_return: summary.total_pnl_percent,
                period_return: metrics.total_return * 100.0,
                annualized_return: metrics.annualized_return * 100.0,
                sharpe_ratio: metrics.sharpe_ratio,
                volatility: metrics.volatility * 100.0,
                max_drawdown: metrics.max_drawdown * 100.0,
            },
            risk: risk_figures(&metrics),
            allocation: AllocationBreakdown {
                by_sector: weights(&valued, |v| v.metadata.sector.clone()),
                by_asset_type: weights(&valued, |v| v.position.asset_type.as_str().to_string()),
            },
            diversification_score: metrics.diversification_score,
            recommendations: recommendations(&metrics),
            calculated_at: Utc::now(),
        })
    }

    async fn user_metrics(&self, requester: Requester, user_id: Uuid) -> AppResult<UserMetrics> {
        if requester.id != user_id && !requester.is_admin {
            return Err(AppError::Forbidden);
        }

        let positions = self.uow.portfolios().positions_for_user(user_id).await?;
        let valued = self.value(positions).await;

        Ok(UserMetrics {
            user_id,
            metrics: metrics_of(&valued),
            positions_count: valued.len(),
            total_value: valued.iter().map(Valued::market_value).sum(),
            calculated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{MockPortfolioRepository, StubUnitOfWork};
    use crate::services::{MockAssetService, MockMarketService};

    fn valued(symbol: &str, quantity: f64, avg_cost: f64, price: Option<f64>, sector: &str) -> Valued {
        let now = Utc::now();
        let mut metadata = AssetMetadata::resolve(symbol, None);
        metadata.sector = sector.to_string();
        Valued {
            position: Position {
                id: Uuid::new_v4(),
                portfolio_id: Uuid::new_v4(),
                asset_id: Uuid::new_v4(),
                symbol: symbol.to_string(),
                asset_name: symbol.to_string(),
                asset_type: AssetType::Stock,
                quantity,
                avg_cost,
                created_at: now,
                updated_at: now,
            },
            price,
            history: Vec::new(),
            metadata,
        }
    }

    #[test]
    fn test_missing_price_falls_back_to_cost() {
        let item = valued("AAPL", 10.0, 150.0, None, "Technology");
        let view = item.view();

        assert_eq!(view.current_price, 150.0);
        assert_eq!(view.unrealized_pnl, 0.0);
    }

    #[test]
    fn test_summary_totals() {
        let items = vec![
            valued("AAPL", 10.0, 100.0, Some(120.0), "Technology"),
            valued("JPM", 5.0, 200.0, Some(180.0), "Financial"),
        ];
        let summary = summarize(&items);

        assert_eq!(summary.total_value, 2100.0);
        assert_eq!(summary.total_cost, 2000.0);
        assert_eq!(summary.total_pnl, 100.0);
        assert!((summary.total_pnl_percent - 5.0).abs() < 1e-9);
        assert_eq!(summary.positions_count, 2);
    }

    #[test]
    fn test_sector_weights_sum_to_hundred() {
        let items = vec![
            valued("AAPL", 1.0, 100.0, Some(300.0), "Technology"),
            valued("MSFT", 1.0, 100.0, Some(100.0), "Technology"),
            valued("JPM", 1.0, 100.0, Some(100.0), "Financial"),
        ];
        let by_sector = weights(&items, |v| v.metadata.sector.clone());

        assert!((by_sector["Technology"] - 80.0).abs() < 1e-9);
        assert!((by_sector["Financial"] - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_portfolio_metrics_are_zero() {
        assert_eq!(metrics_of(&[]), PortfolioMetrics::default());
        assert_eq!(summarize(&[]), PortfolioSummary::default());
    }

    fn portfolio_of(user_id: Uuid) -> Portfolio {
        let now = Utc::now();
        Portfolio {
            id: Uuid::new_v4(),
            user_id,
            name: DEFAULT_PORTFOLIO_NAME.to_string(),
            description: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn manager(portfolios: MockPortfolioRepository) -> PortfolioManager<StubUnitOfWork> {
        let uow = StubUnitOfWork {
            portfolios: Arc::new(portfolios),
            ..Default::default()
        };
        PortfolioManager::new(
            Arc::new(uow),
            Arc::new(MockMarketService::new()),
            Arc::new(MockAssetService::new()),
            50,
        )
    }

    #[tokio::test]
    async fn test_foreign_portfolio_is_not_found() {
        let foreign = portfolio_of(Uuid::new_v4());
        let portfolio_id = foreign.id;
        let mut portfolios = MockPortfolioRepository::new();
        portfolios
            .expect_find_by_id()
            .returning(move |_| Ok(Some(foreign.clone())));
        portfolios.expect_delete().never();

        let manager = manager(portfolios);
        let result = manager.delete(Uuid::new_v4(), portfolio_id).await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_create_defaults_blank_name() {
        let user_id = Uuid::new_v4();
        let mut portfolios = MockPortfolioRepository::new();
        portfolios
            .expect_create()
            .withf(|_, name, _| name == DEFAULT_PORTFOLIO_NAME)
            .returning(|user_id, _, _| Ok(portfolio_of(user_id)));

        let manager = manager(portfolios);
        let portfolio = manager
            .create(user_id, Some("   ".to_string()), None)
            .await
            .unwrap();
        assert_eq!(portfolio.user_id, user_id);
    }

    #[tokio::test]
    async fn test_non_positive_lot_rejected_before_lookup() {
        let mut portfolios = MockPortfolioRepository::new();
        portfolios.expect_find_by_id().never();

        let manager = manager(portfolios);
        let result = manager
            .add_position(Uuid::new_v4(), Uuid::new_v4(), "AAPL", 0.0, 10.0)
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_lot_for_held_asset_merges() {
        let held = valued("AAPL", 10.0, 100.0, None, "Technology").position;

        let lot = place_lot(Some(&held), 50, 50, 30.0, 200.0).unwrap();
        assert_eq!(
            lot,
            Lot::Merge {
                position_id: held.id,
                quantity: 40.0,
                avg_cost: 175.0,
            }
        );
    }

    #[test]
    fn test_lot_for_new_asset_needs_room() {
        assert_eq!(place_lot(None, 49, 50, 1.0, 10.0).unwrap(), Lot::Open);
        assert!(matches!(
            place_lot(None, 50, 50, 1.0, 10.0),
            Err(AppError::Validation(_))
        ));
    }
}

//! Portfolio risk and return metrics.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::{
    DEFAULT_VOLATILITY, MARKET_RETURN, METRICS_LOOKBACK_POINTS, RISK_FREE_RATE,
    TRADING_DAYS_PER_YEAR,
};
use crate::domain::PriceBar;

/// A position valued at its current price
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub symbol: String,
    pub quantity: f64,
    pub avg_cost: f64,
    pub current_price: f64,
    /// Market beta of the asset (1.0 when unknown)
    pub beta: f64,
}

impl Holding {
    pub fn market_value(&self) -> f64 {
        self.quantity * self.current_price
    }

    pub fn cost(&self) -> f64 {
        self.quantity * self.avg_cost
    }
}

/// Ratios are fractions (0.15 = 15%); diversification is on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct PortfolioMetrics {
    pub sharpe_ratio: f64,
    pub beta: f64,
    pub volatility: f64,
    pub max_drawdown: f64,
    pub diversification_score: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub risk_free_rate: f64,
}

/// Derived risk figures reported by portfolio analytics, in percent
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct RiskFigures {
    pub beta: f64,
    pub alpha: f64,
    pub var_95: f64,
    pub expected_shortfall: f64,
}

/// Compute metrics from holdings and, when available, close history per symbol.
///
/// With at least two points in the combined value series the metrics come
/// from daily returns; otherwise they are estimated from cost basis.
pub fn compute_metrics(holdings: &[Holding], history: &HashMap<String, Vec<PriceBar>>) -> PortfolioMetrics {
    if holdings.is_empty() {
        return PortfolioMetrics::default();
    }

    let values = value_series(holdings, history);
    let returns = daily_returns(&values);
    if values.len() < 2 || returns.is_empty() {
        return estimate_metrics(holdings);
    }

    let volatility = annualized_volatility(&returns);
    let annualized_return = mean(&returns) * TRADING_DAYS_PER_YEAR;
    let sharpe_ratio = if volatility > 0.0 {
        (annualized_return - RISK_FREE_RATE) / volatility
    } else {
        0.0
    };

    PortfolioMetrics {
        sharpe_ratio: round_to(sharpe_ratio, 4),
        beta: round_to(weighted_beta(holdings), 4),
        volatility: round_to(volatility, 4),
        max_drawdown: round_to(max_drawdown(&values), 4),
        diversification_score: round_to(diversification_score(holdings), 2),
        total_return: round_to(total_return(&values), 4),
        annualized_return: round_to(annualized_return, 4),
        risk_free_rate: RISK_FREE_RATE,
    }
}

/// Portfolio value on each date every priced holding has a close for,
/// limited to the most recent dates.
pub fn value_series(holdings: &[Holding], history: &HashMap<String, Vec<PriceBar>>) -> Vec<f64> {
    let priced: Vec<(&Holding, HashMap<&str, f64>)> = holdings
        .iter()
        .filter_map(|holding| {
            let bars = history.get(&holding.symbol).filter(|bars| !bars.is_empty())?;
            let closes = bars.iter().map(|bar| (bar.date.as_str(), bar.close)).collect();
            Some((holding, closes))
        })
        .collect();

    let Some((_, first)) = priced.first() else {
        return Vec::new();
    };

    let common: BTreeSet<&str> = first
        .keys()
        .copied()
        .filter(|date| priced.iter().all(|(_, closes)| closes.contains_key(date)))
        .collect();

    let dates: Vec<&str> = common.into_iter().collect();
    let start = dates.len().saturating_sub(METRICS_LOOKBACK_POINTS);

    dates[start..]
        .iter()
        .map(|date| {
            priced
                .iter()
                .map(|(holding, closes)| holding.quantity * closes.get(date).copied().unwrap_or(0.0))
                .sum()
        })
        .collect()
}

pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Sample standard deviation of daily returns scaled to a year.
pub fn annualized_volatility(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let avg = mean(returns);
    let variance =
        returns.iter().map(|r| (r - avg).powi(2)).sum::<f64>() / (returns.len() as f64 - 1.0);
    variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Largest peak-to-trough decline, as a non-positive fraction.
pub fn max_drawdown(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mut peak = values[0];
    let mut worst = 0.0_f64;
    for value in values {
        peak = peak.max(*value);
        if peak > 0.0 {
            worst = worst.max((peak - value) / peak);
        }
    }
    -worst
}

/// `(1 - HHI) * 100` over market-value weights.
pub fn diversification_score(holdings: &[Holding]) -> f64 {
    let total: f64 = holdings.iter().map(Holding::market_value).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let hhi: f64 = holdings
        .iter()
        .map(|h| (h.market_value() / total).powi(2))
        .sum();
    (1.0 - hhi) * 100.0
}

/// Market-value weighted beta.
pub fn weighted_beta(holdings: &[Holding]) -> f64 {
    let total: f64 = holdings.iter().map(Holding::market_value).sum();
    if total <= 0.0 {
        return 0.0;
    }
    holdings.iter().map(|h| h.market_value() * h.beta).sum::<f64>() / total
}

pub fn total_return(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) if values.len() >= 2 && *first != 0.0 => (last - first) / first,
        _ => 0.0,
    }
}

/// Metrics without history: cost-basis return and a fixed volatility estimate.
fn estimate_metrics(holdings: &[Holding]) -> PortfolioMetrics {
    let value: f64 = holdings.iter().map(Holding::market_value).sum();
    let cost: f64 = holdings.iter().map(Holding::cost).sum();
    let total_return = if cost > 0.0 { (value - cost) / cost } else { 0.0 };
    let volatility = DEFAULT_VOLATILITY;

    PortfolioMetrics {
        sharpe_ratio: round_to((total_return - RISK_FREE_RATE) / volatility, 4),
        beta: round_to(weighted_beta(holdings), 4),
        volatility,
        max_drawdown: 0.0,
        diversification_score: round_to(diversification_score(holdings), 2),
        total_return: round_to(total_return, 4),
        annualized_return: round_to(total_return, 4),
        risk_free_rate: RISK_FREE_RATE,
    }
}

/// Alpha against the assumed market return, VaR(95%) as -2σ and expected
/// shortfall as 1.5 × VaR. Alpha is reported in percent.
pub fn risk_figures(metrics: &PortfolioMetrics) -> RiskFigures {
    let expected = metrics.risk_free_rate + metrics.beta * (MARKET_RETURN - metrics.risk_free_rate);
    let alpha = metrics.annualized_return - expected;
    let var_95 = if metrics.volatility > 0.0 {
        -2.0 * metrics.volatility
    } else {
        0.0
    };

    RiskFigures {
        beta: metrics.beta,
        alpha: alpha * 100.0,
        var_95,
        expected_shortfall: var_95 * 1.5,
    }
}

/// Threshold-based advice for a computed metric set.
pub fn recommendations(metrics: &PortfolioMetrics) -> Vec<String> {
    let mut advice = Vec::new();
    if metrics.diversification_score < 30.0 {
        advice.push("Portfolio is highly concentrated. Consider diversifying across more assets.");
    }
    if metrics.beta > 1.3 {
        advice.push(
            "Portfolio has high market sensitivity. Consider reducing exposure to high-beta assets.",
        );
    }
    if metrics.sharpe_ratio < 0.5 {
        advice.push(
            "Risk-adjusted returns are low. Consider rebalancing for better risk-return profile.",
        );
    }
    if metrics.volatility > 0.25 {
        advice.push(
            "Portfolio volatility is high. Consider adding defensive positions to reduce risk.",
        );
    }
    if advice.is_empty() {
        advice.push("Portfolio metrics are within acceptable ranges. Continue monitoring performance.");
    }
    advice.into_iter().map(str::to_string).collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(symbol: &str, quantity: f64, avg_cost: f64, current_price: f64) -> Holding {
        Holding {
            symbol: symbol.to_string(),
            quantity,
            avg_cost,
            current_price,
            beta: 1.0,
        }
    }

    fn bars(closes: &[(&str, f64)]) -> Vec<PriceBar> {
        closes
            .iter()
            .map(|(date, close)| PriceBar {
                date: date.to_string(),
                open: *close,
                high: *close,
                low: *close,
                close: *close,
                volume: 0,
            })
            .collect()
    }

    #[test]
    fn test_empty_portfolio_is_all_zero() {
        assert_eq!(compute_metrics(&[], &HashMap::new()), PortfolioMetrics::default());
    }

    #[test]
    fn test_estimate_without_history() {
        let holdings = vec![holding("AAPL", 10.0, 100.0, 110.0)];
        let metrics = compute_metrics(&holdings, &HashMap::new());

        assert_eq!(metrics.volatility, 0.15);
        assert_eq!(metrics.total_return, 0.1);
        assert_eq!(metrics.annualized_return, 0.1);
        assert_eq!(metrics.sharpe_ratio, round_to((0.1 - 0.02) / 0.15, 4));
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.beta, 1.0);
        assert_eq!(metrics.diversification_score, 0.0);
    }

    #[test]
    fn test_series_uses_common_dates_only() {
        let holdings = vec![holding("A", 1.0, 1.0, 1.0), holding("B", 2.0, 1.0, 1.0)];
        let mut history = HashMap::new();
        history.insert("A".to_string(), bars(&[("d1", 10.0), ("d2", 11.0), ("d3", 12.0)]));
        history.insert("B".to_string(), bars(&[("d2", 5.0), ("d3", 6.0)]));

        assert_eq!(value_series(&holdings, &history), vec![21.0, 24.0]);
    }

    #[test]
    fn test_metrics_from_history() {
        let holdings = vec![holding("A", 1.0, 100.0, 100.0)];
        let mut history = HashMap::new();
        history.insert(
            "A".to_string(),
            bars(&[("d1", 100.0), ("d2", 110.0), ("d3", 99.0), ("d4", 120.0)]),
        );

        let metrics = compute_metrics(&holdings, &history);
        assert_eq!(metrics.total_return, 0.2);
        assert_eq!(metrics.max_drawdown, -0.1);
        assert!(metrics.volatility > 0.0);
        assert_eq!(metrics.risk_free_rate, RISK_FREE_RATE);
    }

    #[test]
    fn test_max_drawdown_is_non_positive() {
        assert_eq!(max_drawdown(&[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(max_drawdown(&[100.0, 50.0, 75.0]), -0.5);
    }

    #[test]
    fn test_diversification_equal_weights() {
        let holdings = vec![
            holding("A", 1.0, 1.0, 10.0),
            holding("B", 1.0, 1.0, 10.0),
            holding("C", 1.0, 1.0, 10.0),
            holding("D", 1.0, 1.0, 10.0),
        ];
        assert!((diversification_score(&holdings) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_beta() {
        let mut high = holding("A", 1.0, 1.0, 30.0);
        high.beta = 2.0;
        let low = holding("B", 1.0, 1.0, 10.0);
        assert!((weighted_beta(&[high, low]) - 1.75).abs() < 1e-9);
    }

    #[test]
    fn test_risk_figures() {
        let metrics = PortfolioMetrics {
            beta: 1.0,
            volatility: 0.2,
            annualized_return: 0.15,
            risk_free_rate: 0.02,
            ..Default::default()
        };
        let figures = risk_figures(&metrics);
        assert!((figures.alpha - 5.0).abs() < 1e-9);
        assert!((figures.var_95 + 0.4).abs() < 1e-9);
        assert!((figures.expected_shortfall + 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_recommendations() {
        let healthy = PortfolioMetrics {
            diversification_score: 60.0,
            beta: 1.0,
            sharpe_ratio: 1.2,
            volatility: 0.1,
            ..Default::default()
        };
        assert_eq!(
            recommendations(&healthy),
            vec!["Portfolio metrics are within acceptable ranges. Continue monitoring performance."]
        );

        let risky = PortfolioMetrics {
            diversification_score: 10.0,
            beta: 1.5,
            sharpe_ratio: 0.1,
            volatility: 0.4,
            ..Default::default()
        };
        assert_eq!(recommendations(&risky).len(), 4);
    }
}

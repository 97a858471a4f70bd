//! Screening strategies, scoring, sector rotation and market breadth.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::SignalDecision;

/// Symbols screened by `POST /screener`
pub const SCREEN_UNIVERSE: &[&str] = &[
    "AAPL", "GOOGL", "MSFT", "AMZN", "TSLA", "NVDA", "META", "NFLX", "ADBE", "CRM", "ORCL",
    "INTC", "AMD", "QCOM", "AVGO", "TXN", "JPM", "BAC", "WFC", "GS", "MS", "C", "AXP", "V", "MA",
    "JNJ", "PFE", "UNH", "ABBV", "MRK", "TMO", "ABT", "DHR", "KO", "PEP", "WMT", "PG", "HD",
    "DIS", "NKE",
];

/// Symbols used for market summary and breadth
pub const MARKET_UNIVERSE: &[&str] = &[
    "AAPL", "GOOGL", "MSFT", "AMZN", "TSLA", "NVDA", "META", "NFLX", "JPM", "BAC", "WFC", "GS",
    "MS", "C", "AXP", "V", "MA", "JNJ", "PFE", "UNH", "ABBV", "MRK", "TMO", "ABT", "DHR", "KO",
    "PEP", "WMT", "PG", "HD", "DIS", "NKE", "BA", "CAT",
];

pub const INDEX_SYMBOLS: &[&str] = &["SPY", "QQQ", "IWM", "DIA"];

/// Fixed sector baskets for rotation analysis
pub const SECTORS: &[(&str, [&str; 5])] = &[
    ("Technology", ["AAPL", "GOOGL", "MSFT", "NVDA", "META"]),
    ("Healthcare", ["JNJ", "PFE", "UNH", "ABBV", "MRK"]),
    ("Financial", ["JPM", "BAC", "WFC", "GS", "MS"]),
    ("Consumer", ["KO", "PEP", "WMT", "PG", "HD"]),
    ("Industrial", ["BA", "CAT", "GE", "MMM", "HON"]),
    ("Energy", ["XOM", "CVX", "COP", "EOG", "SLB"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningStrategy {
    Momentum,
    Value,
    Growth,
    Quality,
    Dividend,
    LowVolatility,
    HighBeta,
    Technical,
    SectorRotation,
}

impl ScreeningStrategy {
    pub const ALL: [ScreeningStrategy; 9] = [
        ScreeningStrategy::Momentum,
        ScreeningStrategy::Value,
        ScreeningStrategy::Growth,
        ScreeningStrategy::Quality,
        ScreeningStrategy::Dividend,
        ScreeningStrategy::LowVolatility,
        ScreeningStrategy::HighBeta,
        ScreeningStrategy::Technical,
        ScreeningStrategy::SectorRotation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScreeningStrategy::Momentum => "momentum",
            ScreeningStrategy::Value => "value",
            ScreeningStrategy::Growth => "growth",
            ScreeningStrategy::Quality => "quality",
            ScreeningStrategy::Dividend => "dividend",
            ScreeningStrategy::LowVolatility => "low_volatility",
            ScreeningStrategy::HighBeta => "high_beta",
            ScreeningStrategy::Technical => "technical",
            ScreeningStrategy::SectorRotation => "sector_rotation",
        }
    }

    pub fn definition(&self) -> StrategyDefinition {
        let (name, description, criteria) = match self {
            ScreeningStrategy::Momentum => (
                "Momentum Strategy",
                "Stocks with strong price momentum and volume",
                Criteria {
                    change_percent_min: Some(5.0),
                    volume_min: Some(1_000_000),
                    rsi_min: Some(30.0),
                    rsi_max: Some(70.0),
                    ..Criteria::default()
                },
            ),
            ScreeningStrategy::Value => (
                "Value Strategy",
                "Undervalued stocks with strong fundamentals",
                Criteria {
                    pe_ratio_max: Some(15.0),
                    pb_ratio_max: Some(2.0),
                    dividend_yield_min: Some(2.0),
                    price_min: Some(5.0),
                    ..Criteria::default()
                },
            ),
            ScreeningStrategy::Growth => (
                "Growth Strategy",
                "High-growth stocks with strong earnings",
                Criteria {
                    change_percent_min: Some(10.0),
                    volume_min: Some(500_000),
                    market_cap_min: Some(1_000_000_000.0),
                    price_min: Some(10.0),
                    ..Criteria::default()
                },
            ),
            ScreeningStrategy::Quality => (
                "Quality Strategy",
                "High-quality stocks with strong balance sheets",
                Criteria {
                    pe_ratio_min: Some(10.0),
                    pe_ratio_max: Some(25.0),
                    dividend_yield_min: Some(1.0),
                    beta_max: Some(1.2),
                    ..Criteria::default()
                },
            ),
            ScreeningStrategy::Dividend => (
                "Dividend Strategy",
                "High dividend yield stocks",
                Criteria {
                    dividend_yield_min: Some(3.0),
                    pe_ratio_max: Some(20.0),
                    price_min: Some(5.0),
                    volume_min: Some(100_000),
                    ..Criteria::default()
                },
            ),
            ScreeningStrategy::LowVolatility => (
                "Low Volatility Strategy",
                "Stable, low-risk stocks",
                Criteria {
                    beta_max: Some(0.8),
                    change_percent_max: Some(3.0),
                    price_min: Some(10.0),
                    market_cap_min: Some(500_000_000.0),
                    ..Criteria::default()
                },
            ),
            ScreeningStrategy::HighBeta => (
                "High Beta Strategy",
                "High-beta stocks for aggressive growth",
                Criteria {
                    beta_min: Some(1.5),
                    change_percent_min: Some(2.0),
                    volume_min: Some(500_000),
                    price_min: Some(5.0),
                    ..Criteria::default()
                },
            ),
            ScreeningStrategy::Technical => (
                "Technical Strategy",
                "Stocks with strong technical signals",
                Criteria {
                    rsi_min: Some(40.0),
                    rsi_max: Some(60.0),
                    signal: Some(SignalDecision::Buy),
                    confidence_min: Some(70.0),
                    ..Criteria::default()
                },
            ),
            ScreeningStrategy::SectorRotation => (
                "Sector Rotation Strategy",
                "Sectors gaining relative strength",
                Criteria::default(),
            ),
        };

        StrategyDefinition {
            name: name.to_string(),
            description: description.to_string(),
            criteria,
        }
    }
}

impl fmt::Display for ScreeningStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StrategyDefinition {
    pub name: String,
    pub description: String,
    pub criteria: Criteria,
}

/// Bounds an asset must satisfy. `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Criteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_percent_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_percent_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_min: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe_ratio_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe_ratio_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pb_ratio_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_yield_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<SignalDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_min: Option<f64>,
}

/// What is known about an asset at screening time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub symbol: String,
    pub price: f64,
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
}

fn at_least(value: Option<f64>, bound: Option<f64>) -> bool {
    match (value, bound) {
        (Some(value), Some(bound)) => value >= bound,
        _ => true,
    }
}

fn at_most(value: Option<f64>, bound: Option<f64>) -> bool {
    match (value, bound) {
        (Some(value), Some(bound)) => value <= bound,
        _ => true,
    }
}

impl Criteria {
    /// Checks every bound whose input is known; unknown inputs are skipped.
    pub fn matches(&self, candidate: &Candidate) -> bool {
        let price = Some(candidate.price);
        let change = Some(candidate.change_percent);
        let volume_ok = self.volume_min.map_or(true, |min| candidate.volume >= min);
        let signal_ok = match (self.signal, candidate.signal) {
            (Some(wanted), Some(actual)) => wanted == actual,
            _ => true,
        };

        volume_ok
            && signal_ok
            && at_least(change, self.change_percent_min)
            && at_most(change, self.change_percent_max)
            && at_least(price, self.price_min)
            && at_most(price, self.price_max)
            && at_least(candidate.market_cap, self.market_cap_min)
            && at_most(candidate.market_cap, self.market_cap_max)
            && at_least(candidate.pe_ratio, self.pe_ratio_min)
            && at_most(candidate.pe_ratio, self.pe_ratio_max)
            && at_most(candidate.pb_ratio, self.pb_ratio_max)
            && at_least(candidate.dividend_yield, self.dividend_yield_min)
            && at_least(candidate.beta, self.beta_min)
            && at_most(candidate.beta, self.beta_max)
            && at_least(candidate.rsi, self.rsi_min)
            && at_most(candidate.rsi, self.rsi_max)
            && at_least(candidate.confidence, self.confidence_min)
    }

    /// Human readable list of the active bounds, e.g. `price_min >= 5`.
    pub fn describe(&self) -> Vec<String> {
        let mut active = Vec::new();
        let mut push = |name: &str, op: &str, value: Option<String>| {
            if let Some(value) = value {
                active.push(format!("{} {} {}", name, op, value));
            }
        };
        push("change_percent", ">=", self.change_percent_min.map(|v| v.to_string()));
        push("change_percent", "<=", self.change_percent_max.map(|v| v.to_string()));
        push("volume", ">=", self.volume_min.map(|v| v.to_string()));
        push("price", ">=", self.price_min.map(|v| v.to_string()));
        push("price", "<=", self.price_max.map(|v| v.to_string()));
        push("market_cap", ">=", self.market_cap_min.map(|v| v.to_string()));
        push("market_cap", "<=", self.market_cap_max.map(|v| v.to_string()));
        push("pe_ratio", ">=", self.pe_ratio_min.map(|v| v.to_string()));
        push("pe_ratio", "<=", self.pe_ratio_max.map(|v| v.to_string()));
        push("pb_ratio", "<=", self.pb_ratio_max.map(|v| v.to_string()));
        push("dividend_yield", ">=", self.dividend_yield_min.map(|v| v.to_string()));
        push("beta", ">=", self.beta_min.map(|v| v.to_string()));
        push("beta", "<=", self.beta_max.map(|v| v.to_string()));
        push("rsi", ">=", self.rsi_min.map(|v| v.to_string()));
        push("rsi", "<=", self.rsi_max.map(|v| v.to_string()));
        push("signal", "==", self.signal.map(|v| v.to_string()));
        push("confidence", ">=", self.confidence_min.map(|v| v.to_string()));
        active
    }
}

/// Strategy score in `[0, 100]`. Without signal data the base score of 50 stands.
pub fn score(candidate: &Candidate, strategy: Option<ScreeningStrategy>) -> f64 {
    const BASE: f64 = 50.0;

    let (Some(signal), Some(confidence)) = (candidate.signal, candidate.confidence) else {
        return BASE;
    };
    let change = candidate.change_percent;

    let adjustment = match strategy {
        Some(ScreeningStrategy::Momentum) => {
            let bonus = if signal == SignalDecision::Buy { 20.0 } else { 0.0 };
            change * 2.0 + confidence.min(100.0) * 0.3 + bonus
        }
        Some(ScreeningStrategy::Value) => {
            if change < 5.0 {
                30.0
            } else {
                10.0
            }
        }
        Some(ScreeningStrategy::Growth) => change * 1.5 + confidence * 0.2,
        Some(ScreeningStrategy::Technical) => {
            let bonus = match signal {
                SignalDecision::Buy => 30.0,
                SignalDecision::Sell => -20.0,
                SignalDecision::Hold => 0.0,
            };
            confidence * 0.5 + bonus
        }
        _ => 0.0,
    };

    (BASE + adjustment).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SectorPerformance {
    pub sector: String,
    /// Average price across the sector's symbols with data
    pub performance: f64,
    pub buy_signals: u32,
    pub total_signals: u32,
    pub signal_ratio: f64,
    pub trend: String,
}

impl SectorPerformance {
    pub fn new(sector: &str, prices: &[f64], signals: &[SignalDecision]) -> Self {
        let performance = if prices.is_empty() {
            0.0
        } else {
            prices.iter().sum::<f64>() / prices.len() as f64
        };
        let buy_signals = signals.iter().filter(|s| **s == SignalDecision::Buy).count() as u32;
        let total_signals = signals.len() as u32;
        let signal_ratio = if total_signals > 0 {
            f64::from(buy_signals) / f64::from(total_signals)
        } else {
            0.0
        };
        let trend = if f64::from(buy_signals) > f64::from(total_signals) / 2.0 {
            "bullish"
        } else {
            "bearish"
        };

        Self {
            sector: sector.to_string(),
            performance,
            buy_signals,
            total_signals,
            signal_ratio,
            trend: trend.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RotationSignals {
    pub in_favor: Vec<String>,
    pub out_of_favor: Vec<String>,
    pub rotation_signal: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SectorRotation {
    pub sectors: Vec<SectorPerformance>,
    pub sector_rotation_signals: RotationSignals,
    pub top_performing_sectors: Vec<String>,
    pub bottom_performing_sectors: Vec<String>,
}

/// Rank sectors by buy-signal ratio and name the two strongest and weakest.
pub fn rotation(mut sectors: Vec<SectorPerformance>) -> SectorRotation {
    sectors.sort_by(|a, b| b.signal_ratio.total_cmp(&a.signal_ratio));

    let top: Vec<String> = sectors.iter().take(2).map(|s| s.sector.clone()).collect();
    let bottom: Vec<String> = sectors
        .iter()
        .skip(sectors.len().saturating_sub(2))
        .map(|s| s.sector.clone())
        .collect();

    let rotation_signal = if top.iter().any(|s| s == "Technology") {
        "Technology to Healthcare"
    } else {
        "No clear rotation"
    };

    SectorRotation {
        sector_rotation_signals: RotationSignals {
            in_favor: top.clone(),
            out_of_favor: bottom.clone(),
            rotation_signal: rotation_signal.to_string(),
        },
        top_performing_sectors: top,
        bottom_performing_sectors: bottom,
        sectors,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MarketBreadth {
    pub advancing_stocks: u32,
    pub declining_stocks: u32,
    pub unchanged_stocks: u32,
    /// `None` when nothing declined
    pub advance_decline_ratio: Option<f64>,
    pub market_sentiment: String,
    pub breadth_indicator: f64,
}

/// BUY counts as advancing, SELL as declining, HOLD as unchanged.
pub fn breadth(signals: &[SignalDecision]) -> MarketBreadth {
    let count = |wanted: SignalDecision| signals.iter().filter(|s| **s == wanted).count() as u32;
    let advancing = count(SignalDecision::Buy);
    let declining = count(SignalDecision::Sell);
    let unchanged = count(SignalDecision::Hold);
    let total = advancing + declining + unchanged;

    let indicator = if total > 0 {
        (f64::from(advancing) - f64::from(declining)) / f64::from(total)
    } else {
        0.0
    };
    let ratio = (declining > 0).then(|| f64::from(advancing) / f64::from(declining));

    MarketBreadth {
        advancing_stocks: advancing,
        declining_stocks: declining,
        unchanged_stocks: unchanged,
        advance_decline_ratio: ratio,
        market_sentiment: sentiment(indicator).to_string(),
        breadth_indicator: indicator,
    }
}

pub fn sentiment(indicator: f64) -> &'static str {
    if indicator > 0.3 {
        "Very Bullish"
    } else if indicator > 0.1 {
        "Bullish"
    } else if indicator > -0.1 {
        "Neutral"
    } else if indicator > -0.3 {
        "Bearish"
    } else {
        "Very Bearish"
    }
}

/// Count of assets per sector
pub fn sector_breakdown<'a>(sectors: impl IntoIterator<Item = &'a str>) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for sector in sectors {
        *counts.entry(sector.to_string()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(change_percent: f64, signal: Option<SignalDecision>, confidence: Option<f64>) -> Candidate {
        Candidate {
            symbol: "AAPL".to_string(),
            price: 100.0,
            change_percent,
            volume: 2_000_000,
            signal,
            confidence,
            ..Default::default()
        }
    }

    #[test]
    fn test_universe_has_no_duplicates() {
        let mut symbols = SCREEN_UNIVERSE.to_vec();
        symbols.sort_unstable();
        symbols.dedup();
        assert_eq!(symbols.len(), SCREEN_UNIVERSE.len());
    }

    #[test]
    fn test_strategy_wire_names() {
        assert_eq!(
            serde_json::to_string(&ScreeningStrategy::LowVolatility).unwrap(),
            "\"low_volatility\""
        );
        for strategy in ScreeningStrategy::ALL {
            let json = serde_json::to_string(&strategy).unwrap();
            assert_eq!(json, format!("\"{}\"", strategy.as_str()));
        }
    }

    #[test]
    fn test_unknown_fundamentals_are_skipped() {
        let criteria = ScreeningStrategy::Value.definition().criteria;
        assert!(criteria.matches(&candidate(1.0, None, None)));

        let expensive = Candidate {
            pe_ratio: Some(40.0),
            ..candidate(1.0, None, None)
        };
        assert!(!criteria.matches(&expensive));
    }

    #[test]
    fn test_momentum_criteria() {
        let criteria = ScreeningStrategy::Momentum.definition().criteria;
        assert!(criteria.matches(&candidate(6.0, None, None)));
        assert!(!criteria.matches(&candidate(2.0, None, None)));

        let overbought = Candidate {
            rsi: Some(80.0),
            ..candidate(6.0, None, None)
        };
        assert!(!criteria.matches(&overbought));
    }

    #[test]
    fn test_technical_requires_buy_signal() {
        let criteria = ScreeningStrategy::Technical.definition().criteria;
        assert!(criteria.matches(&candidate(0.0, Some(SignalDecision::Buy), Some(80.0))));
        assert!(!criteria.matches(&candidate(0.0, Some(SignalDecision::Sell), Some(80.0))));
        assert!(!criteria.matches(&candidate(0.0, Some(SignalDecision::Buy), Some(50.0))));
    }

    #[test]
    fn test_describe_lists_active_bounds() {
        let described = ScreeningStrategy::Dividend.definition().criteria.describe();
        assert_eq!(described.len(), 4);
        assert!(described.contains(&"dividend_yield >= 3".to_string()));
        assert!(Criteria::default().describe().is_empty());
    }

    #[test]
    fn test_score_without_signal_is_base() {
        let c = candidate(8.0, None, None);
        assert_eq!(score(&c, Some(ScreeningStrategy::Momentum)), 50.0);
    }

    #[test]
    fn test_score_per_strategy() {
        let c = candidate(5.0, Some(SignalDecision::Buy), Some(50.0));
        // 50 + 10 + 15 + 20
        assert_eq!(score(&c, Some(ScreeningStrategy::Momentum)), 95.0);
        assert_eq!(score(&c, Some(ScreeningStrategy::Value)), 60.0);
        // 50 + 7.5 + 10
        assert_eq!(score(&c, Some(ScreeningStrategy::Growth)), 67.5);
        // 50 + 25 + 30, clamped
        assert_eq!(score(&c, Some(ScreeningStrategy::Technical)), 100.0);
        assert_eq!(score(&c, None), 50.0);

        let sell = candidate(-40.0, Some(SignalDecision::Sell), Some(10.0));
        assert_eq!(score(&sell, Some(ScreeningStrategy::Momentum)), 0.0);
    }

    #[test]
    fn test_sector_performance() {
        let sector = SectorPerformance::new(
            "Technology",
            &[100.0, 200.0],
            &[SignalDecision::Buy, SignalDecision::Buy, SignalDecision::Hold],
        );
        assert_eq!(sector.performance, 150.0);
        assert_eq!(sector.buy_signals, 2);
        assert_eq!(sector.trend, "bullish");

        let empty = SectorPerformance::new("Energy", &[], &[]);
        assert_eq!(empty.signal_ratio, 0.0);
        assert_eq!(empty.trend, "bearish");
    }

    #[test]
    fn test_rotation_ranks_by_signal_ratio() {
        let sectors = vec![
            SectorPerformance::new("Energy", &[], &[SignalDecision::Sell]),
            SectorPerformance::new("Technology", &[], &[SignalDecision::Buy]),
            SectorPerformance::new("Healthcare", &[], &[SignalDecision::Buy, SignalDecision::Hold]),
            SectorPerformance::new("Financial", &[], &[SignalDecision::Hold]),
        ];
        let result = rotation(sectors);

        assert_eq!(result.top_performing_sectors, vec!["Technology", "Healthcare"]);
        assert_eq!(result.bottom_performing_sectors.len(), 2);
        assert_eq!(
            result.sector_rotation_signals.rotation_signal,
            "Technology to Healthcare"
        );
    }

    #[test]
    fn test_breadth() {
        use SignalDecision::*;
        let result = breadth(&[Buy, Buy, Buy, Sell, Hold]);
        assert_eq!(result.advancing_stocks, 3);
        assert_eq!(result.advance_decline_ratio, Some(3.0));
        assert!((result.breadth_indicator - 0.4).abs() < 1e-9);
        assert_eq!(result.market_sentiment, "Very Bullish");

        let no_decliners = breadth(&[Buy, Hold]);
        assert_eq!(no_decliners.advance_decline_ratio, None);

        let empty = breadth(&[]);
        assert_eq!(empty.breadth_indicator, 0.0);
        assert_eq!(empty.market_sentiment, "Neutral");
    }

    #[test]
    fn test_sentiment_thresholds() {
        assert_eq!(sentiment(0.2), "Bullish");
        assert_eq!(sentiment(-0.2), "Bearish");
        assert_eq!(sentiment(-0.5), "Very Bearish");
    }

    #[test]
    fn test_sector_breakdown() {
        let counts = sector_breakdown(["Technology", "Financial", "Technology"]);
        assert_eq!(counts.get("Technology"), Some(&2));
        assert_eq!(counts.get("Financial"), Some(&1));
    }
}

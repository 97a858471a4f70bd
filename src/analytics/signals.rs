//! Indicator voting: turns an indicator snapshot into a BUY/SELL/HOLD call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::indicators::{self, BollingerBands, Macd, Stochastic};
use crate::config::{
    ATR_PERIOD, BOLLINGER_PERIOD, BOLLINGER_STD_DEVS, EMA_LONG_PERIOD, EMA_SHORT_PERIOD,
    MACD_FAST_PERIOD, MACD_SIGNAL_PERIOD, MACD_SLOW_PERIOD, RSI_PERIOD, SMA_PERIOD,
    STOCHASTIC_PERIOD, STOCHASTIC_SMOOTHING, WILLIAMS_PERIOD,
};
use crate::domain::signal::strength;
use crate::domain::{IndicatorVote, RiskLevel, SignalDecision, TrendDirection};

/// Scalar indicators reported alongside a signal
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct IndicatorValues {
    pub rsi: Option<f64>,
    pub ema_20: Option<f64>,
    pub ema_50: Option<f64>,
    pub sma_20: Option<f64>,
    pub atr: Option<f64>,
    pub williams_r: Option<f64>,
}

/// Full indicator set computed from one close series
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct IndicatorSnapshot {
    pub values: IndicatorValues,
    pub macd: Option<Macd>,
    pub bollinger: Option<BollingerBands>,
    pub stochastic: Option<Stochastic>,
}

impl IndicatorSnapshot {
    pub fn from_closes(closes: &[f64]) -> Self {
        Self {
            values: IndicatorValues {
                rsi: indicators::rsi(closes, RSI_PERIOD),
                ema_20: indicators::ema(closes, EMA_SHORT_PERIOD),
                ema_50: indicators::ema(closes, EMA_LONG_PERIOD),
                sma_20: indicators::sma(closes, SMA_PERIOD),
                atr: indicators::atr(closes, ATR_PERIOD),
                williams_r: indicators::williams_r(closes, WILLIAMS_PERIOD),
            },
            macd: indicators::macd(closes, MACD_FAST_PERIOD, MACD_SLOW_PERIOD, MACD_SIGNAL_PERIOD),
            bollinger: indicators::bollinger(closes, BOLLINGER_PERIOD, BOLLINGER_STD_DEVS),
            stochastic: indicators::stochastic(closes, STOCHASTIC_PERIOD, STOCHASTIC_SMOOTHING),
        }
    }
}

/// Outcome of the vote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SignalAnalysis {
    pub signal: SignalDecision,
    pub signal_strength: u8,
    pub confidence: f64,
    pub trend_direction: TrendDirection,
    pub risk_level: RiskLevel,
    pub reasoning: Vec<String>,
    pub individual_signals: BTreeMap<String, IndicatorVote>,
}

#[derive(Default)]
struct Tally {
    buy: f64,
    sell: f64,
    total: u32,
    votes: BTreeMap<String, IndicatorVote>,
    reasoning: Vec<String>,
}

impl Tally {
    /// Record one indicator's vote; `weight` is added to the side it favours.
    fn cast(&mut self, indicator: &str, vote: IndicatorVote, weight: f64, reason: Option<String>) {
        self.total += 1;
        match vote {
            IndicatorVote::StrongBuy | IndicatorVote::Buy => self.buy += weight,
            IndicatorVote::StrongSell | IndicatorVote::Sell => self.sell += weight,
            IndicatorVote::Neutral => {}
        }
        self.votes.insert(indicator.to_string(), vote);
        if let Some(reason) = reason {
            self.reasoning.push(reason);
        }
    }
}

/// Vote every available indicator and derive the overall signal.
///
/// Each indicator present counts once towards the total. The decision is
/// BUY (or SELL) when its weighted share exceeds 0.6, with strength
/// STRONG above 0.8 and MODERATE otherwise; HOLD is WEAK.
pub fn generate_signals(price: f64, snapshot: &IndicatorSnapshot) -> SignalAnalysis {
    let mut tally = Tally::default();
    let mut trend = TrendDirection::Sideways;
    let values = &snapshot.values;

    if let Some(rsi) = values.rsi {
        let (vote, weight, reason) = if rsi < 30.0 {
            (IndicatorVote::StrongBuy, 1.0, Some(format!("RSI oversold at {:.1}", rsi)))
        } else if rsi < 40.0 {
            (IndicatorVote::Buy, 0.5, Some(format!("RSI approaching oversold at {:.1}", rsi)))
        } else if rsi > 70.0 {
            (IndicatorVote::StrongSell, 1.0, Some(format!("RSI overbought at {:.1}", rsi)))
        } else if rsi > 60.0 {
            (IndicatorVote::Sell, 0.5, Some(format!("RSI approaching overbought at {:.1}", rsi)))
        } else {
            (IndicatorVote::Neutral, 0.0, None)
        };
        tally.cast("rsi", vote, weight, reason);
    }

    if let Some(macd) = snapshot.macd {
        let (vote, reason) = if macd.macd > macd.signal && macd.histogram > 0.0 {
            (IndicatorVote::Buy, Some("MACD bullish crossover".to_string()))
        } else if macd.macd < macd.signal && macd.histogram < 0.0 {
            (IndicatorVote::Sell, Some("MACD bearish crossover".to_string()))
        } else {
            (IndicatorVote::Neutral, None)
        };
        tally.cast("macd", vote, 1.0, reason);
    }

    if let Some(bands) = snapshot.bollinger {
        let (vote, weight, reason) = if price <= bands.lower {
            (
                IndicatorVote::StrongBuy,
                1.0,
                Some(format!("Price at lower Bollinger Band ({:.1}%)", bands.percent_b)),
            )
        } else if price >= bands.upper {
            (
                IndicatorVote::StrongSell,
                1.0,
                Some(format!("Price at upper Bollinger Band ({:.1}%)", bands.percent_b)),
            )
        } else if price < bands.middle {
            (IndicatorVote::Buy, 0.5, None)
        } else if price > bands.middle {
            (IndicatorVote::Sell, 0.5, None)
        } else {
            (IndicatorVote::Neutral, 0.0, None)
        };
        tally.cast("bollinger", vote, weight, reason);
    }

    if let Some(stochastic) = snapshot.stochastic {
        let k = stochastic.k_percent;
        let (vote, reason) = if k < 20.0 {
            (IndicatorVote::Buy, Some(format!("Stochastic oversold at {:.1}%", k)))
        } else if k > 80.0 {
            (IndicatorVote::Sell, Some(format!("Stochastic overbought at {:.1}%", k)))
        } else {
            (IndicatorVote::Neutral, None)
        };
        tally.cast("stochastic", vote, 0.5, reason);
    }

    if let Some(williams) = values.williams_r {
        let (vote, reason) = if williams < -80.0 {
            (IndicatorVote::Buy, Some(format!("Williams %R oversold at {:.1}", williams)))
        } else if williams > -20.0 {
            (IndicatorVote::Sell, Some(format!("Williams %R overbought at {:.1}", williams)))
        } else {
            (IndicatorVote::Neutral, None)
        };
        tally.cast("williams_r", vote, 0.5, reason);
    }

    if let (Some(short), Some(long)) = (values.ema_20, values.ema_50) {
        let (vote, reason) = if short > long && price > short {
            trend = TrendDirection::Bullish;
            (
                IndicatorVote::Buy,
                Some("Price above rising EMAs (bullish trend)".to_string()),
            )
        } else if short < long && price < short {
            trend = TrendDirection::Bearish;
            (
                IndicatorVote::Sell,
                Some("Price below falling EMAs (bearish trend)".to_string()),
            )
        } else {
            (IndicatorVote::Neutral, None)
        };
        tally.cast("ema_trend", vote, 1.0, reason);
    }

    decide(tally, trend)
}

fn decide(tally: Tally, trend: TrendDirection) -> SignalAnalysis {
    if tally.total == 0 {
        return SignalAnalysis {
            signal: SignalDecision::Hold,
            signal_strength: strength::WEAK,
            confidence: 0.0,
            trend_direction: trend,
            risk_level: RiskLevel::Medium,
            reasoning: tally.reasoning,
            individual_signals: tally.votes,
        };
    }

    let total = f64::from(tally.total);
    let buy_ratio = tally.buy / total;
    let sell_ratio = tally.sell / total;

    let (signal, signal_strength) = if buy_ratio > 0.6 {
        (SignalDecision::Buy, graded(buy_ratio))
    } else if sell_ratio > 0.6 {
        (SignalDecision::Sell, graded(sell_ratio))
    } else {
        (SignalDecision::Hold, strength::WEAK)
    };

    let confidence = buy_ratio.max(sell_ratio) * 100.0;
    let risk_level = if confidence > 80.0 {
        RiskLevel::Low
    } else if confidence > 60.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    };

    SignalAnalysis {
        signal,
        signal_strength,
        confidence,
        trend_direction: trend,
        risk_level,
        reasoning: tally.reasoning,
        individual_signals: tally.votes,
    }
}

fn graded(ratio: f64) -> u8 {
    if ratio > 0.8 {
        strength::STRONG
    } else {
        strength::MODERATE
    }
}

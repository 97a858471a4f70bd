//! Trading signal vocabulary and persisted signal records.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

/// Overall recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalDecision {
    Buy,
    Sell,
    Hold,
}

impl SignalDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalDecision::Buy => "BUY",
            SignalDecision::Sell => "SELL",
            SignalDecision::Hold => "HOLD",
        }
    }
}

impl fmt::Display for SignalDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalDecision {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BUY" => Ok(SignalDecision::Buy),
            "SELL" => Ok(SignalDecision::Sell),
            "HOLD" => Ok(SignalDecision::Hold),
            other => Err(AppError::validation(format!("Unknown signal '{}'", other))),
        }
    }
}

/// Vote cast by a single indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndicatorVote {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Sideways,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Signal strength scale, 1 (very weak) to 5 (very strong)
pub mod strength {
    pub const VERY_WEAK: u8 = 1;
    pub const WEAK: u8 = 2;
    pub const MODERATE: u8 = 3;
    pub const STRONG: u8 = 4;
    pub const VERY_STRONG: u8 = 5;

    /// (level, name, description)
    pub const LEVELS: [(u8, &str, &str); 5] = [
        (VERY_WEAK, "Very Weak", "Minimal signal strength"),
        (WEAK, "Weak", "Low signal strength"),
        (MODERATE, "Moderate", "Medium signal strength"),
        (STRONG, "Strong", "High signal strength"),
        (VERY_STRONG, "Very Strong", "Maximum signal strength"),
    ];
}

/// Signal row as stored for history queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SignalRecord {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub symbol: String,
    pub timeframe: String,
    pub as_of: DateTime<Utc>,
    pub rsi: Option<f64>,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub decision: SignalDecision,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

/// Values needed to persist a freshly computed signal
#[derive(Debug, Clone, PartialEq)]
pub struct NewSignal {
    pub asset_id: Uuid,
    pub timeframe: String,
    pub as_of: DateTime<Utc>,
    pub rsi: Option<f64>,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub decision: SignalDecision,
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_wire_format() {
        assert_eq!(serde_json::to_string(&SignalDecision::Buy).unwrap(), "\"BUY\"");
        assert_eq!("hold".parse::<SignalDecision>().unwrap(), SignalDecision::Hold);
    }

    #[test]
    fn test_vote_wire_format() {
        assert_eq!(
            serde_json::to_string(&IndicatorVote::StrongSell).unwrap(),
            "\"STRONG_SELL\""
        );
    }
}

//! Quotes, price history and market-hours rules.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::asset::AssetType;
use crate::errors::AppError;

/// Hour (UTC) trading opens on weekdays
pub const MARKET_OPEN_HOUR_UTC: u32 = 9;

/// Hour (UTC) trading closes on weekdays
pub const MARKET_CLOSE_HOUR_UTC: u32 = 16;

/// Historical range requested from providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Period {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
}

impl Period {
    pub const ALL: [Period; 8] = [
        Period::OneDay,
        Period::FiveDays,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
        }
    }
}

impl Default for Period {
    fn default() -> Self {
        Period::OneMonth
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .iter()
            .copied()
            .find(|period| period.as_str() == s.trim())
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Invalid period '{}'. Use one of: 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y",
                    s
                ))
            })
    }
}

/// Latest quote for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceQuote {
    pub symbol: String,
    pub current_price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub previous_close: f64,
    /// Provider that served the quote
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

/// One bar of price history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceBar {
    /// Provider date label (`YYYY-MM-DD`, or with time for intraday bars)
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Quote plus history, as cached and served
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceSnapshot {
    #[serde(flatten)]
    pub quote: PriceQuote,
    pub history: Vec<PriceBar>,
    pub asset_type: AssetType,
    pub period: Period,
}

impl PriceSnapshot {
    pub fn closes(&self) -> Vec<f64> {
        self.history.iter().map(|bar| bar.close).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MarketState {
    Open,
    Closed,
}

/// Trading-hours status at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MarketStatus {
    pub status: MarketState,
    pub timestamp: DateTime<Utc>,
    pub next_open: String,
    pub next_close: String,
}

impl MarketStatus {
    /// Weekdays between 09:00 and 16:00 UTC are open.
    pub fn at(now: DateTime<Utc>) -> Self {
        let weekday = !matches!(now.weekday(), Weekday::Sat | Weekday::Sun);
        let trading_hours = (MARKET_OPEN_HOUR_UTC..MARKET_CLOSE_HOUR_UTC).contains(&now.hour());

        let status = if weekday && trading_hours {
            MarketState::Open
        } else {
            MarketState::Closed
        };
        let next_close = if status == MarketState::Open {
            "Today at 4:00 PM UTC"
        } else {
            "Next trading day at 4:00 PM UTC"
        };

        Self {
            status,
            timestamp: now,
            next_open: "Next trading day at 9:00 AM UTC".to_string(),
            next_close: next_close.to_string(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == MarketState::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_period_parsing() {
        assert_eq!("1mo".parse::<Period>().unwrap(), Period::OneMonth);
        assert_eq!("5y".parse::<Period>().unwrap(), Period::FiveYears);
        assert!("1w".parse::<Period>().is_err());
        assert!("".parse::<Period>().is_err());
    }

    #[test]
    fn test_period_serializes_as_label() {
        assert_eq!(serde_json::to_string(&Period::ThreeMonths).unwrap(), "\"3mo\"");
    }

    #[test]
    fn test_market_open_on_weekday_hours() {
        // 2024-03-06 is a Wednesday
        let now = Utc.with_ymd_and_hms(2024, 3, 6, 14, 30, 0).unwrap();
        let status = MarketStatus::at(now);
        assert!(status.is_open());
        assert_eq!(status.next_close, "Today at 4:00 PM UTC");
    }

    #[test]
    fn test_market_closed_after_hours_and_weekends() {
        let evening = Utc.with_ymd_and_hms(2024, 3, 6, 16, 0, 0).unwrap();
        assert!(!MarketStatus::at(evening).is_open());

        let saturday = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let status = MarketStatus::at(saturday);
        assert!(!status.is_open());
        assert_eq!(status.next_close, "Next trading day at 4:00 PM UTC");
    }

    #[test]
    fn test_snapshot_flattens_quote() {
        let snapshot = PriceSnapshot {
            quote: PriceQuote {
                symbol: "AAPL".into(),
                current_price: 10.0,
                change: 0.5,
                change_percent: 5.0,
                volume: 100,
                high: 11.0,
                low: 9.0,
                open: 9.5,
                previous_close: 9.5,
                source: "yahoo_finance".into(),
                timestamp: Utc::now(),
            },
            history: vec![],
            asset_type: AssetType::Stock,
            period: Period::OneMonth,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["current_price"], 10.0);
        assert_eq!(json["period"], "1mo");

        let back: PriceSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }
}

//! CoinGecko: crypto quotes and market-chart history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::client::{number, HttpClient};
use super::PriceProvider;
use crate::config::COINGECKO_BASE_URL;
use crate::domain::{AssetType, Period, PriceBar, PriceQuote};
use crate::errors::AppResult;

/// Day range is approximated as ±5% of the current price.
const DAY_RANGE_FRACTION: f64 = 0.05;

const COIN_IDS: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("ADA", "cardano"),
    ("DOT", "polkadot"),
    ("LINK", "chainlink"),
    ("UNI", "uniswap"),
    ("AAVE", "aave"),
    ("SOL", "solana"),
    ("MATIC", "matic-network"),
    ("AVAX", "avalanche-2"),
];

pub fn coin_id(symbol: &str) -> Option<&'static str> {
    let upper = symbol.to_uppercase();
    COIN_IDS
        .iter()
        .find(|(ticker, _)| *ticker == upper)
        .map(|(_, id)| *id)
}

pub struct CoinGecko {
    http: HttpClient,
    base_url: String,
}

impl CoinGecko {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            base_url: COINGECKO_BASE_URL.to_string(),
        }
    }
}

#[async_trait]
impl PriceProvider for CoinGecko {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    fn supports(&self, asset_type: AssetType) -> bool {
        asset_type == AssetType::Crypto
    }

    async fn quote(&self, symbol: &str) -> AppResult<Option<PriceQuote>> {
        let Some(id) = coin_id(symbol) else {
            return Ok(None);
        };

        let url = format!("{}/simple/price", self.base_url);
        let body = self
            .http
            .get_json(
                &url,
                &[
                    ("ids", id),
                    ("vs_currencies", "usd"),
                    ("include_24hr_change", "true"),
                    ("include_24hr_vol", "true"),
                    ("include_last_updated_at", "true"),
                ],
            )
            .await?;

        Ok(parse_quote(symbol, id, &body, Utc::now()))
    }

    async fn history(&self, symbol: &str, period: Period) -> AppResult<Vec<PriceBar>> {
        let Some(id) = coin_id(symbol) else {
            return Ok(Vec::new());
        };

        let url = format!("{}/coins/{}/market_chart", self.base_url, id);
        let days = chart_days(period).to_string();
        let body = self
            .http
            .get_json(&url, &[("vs_currency", "usd"), ("days", &days)])
            .await?;

        Ok(parse_market_chart(&body))
    }
}

fn chart_days(period: Period) -> u32 {
    match period {
        Period::OneDay => 1,
        Period::FiveDays => 5,
        Period::OneMonth => 30,
        Period::ThreeMonths => 90,
        Period::SixMonths => 180,
        Period::OneYear => 365,
        Period::TwoYears => 730,
        Period::FiveYears => 1825,
    }
}

fn parse_quote(symbol: &str, id: &str, body: &Value, now: DateTime<Utc>) -> Option<PriceQuote> {
    let coin = body.get(id)?;
    let price = number(coin.get("usd"))?;
    let change_percent = number(coin.get("usd_24h_change")).unwrap_or(0.0);
    let volume = number(coin.get("usd_24h_vol")).unwrap_or(0.0);
    let change = price * change_percent / 100.0;

    Some(PriceQuote {
        symbol: symbol.to_uppercase(),
        current_price: price,
        change,
        change_percent,
        volume: volume.max(0.0) as u64,
        high: price * (1.0 + DAY_RANGE_FRACTION),
        low: price * (1.0 - DAY_RANGE_FRACTION),
        open: price - change,
        previous_close: price - change,
        source: "coingecko".to_string(),
        timestamp: now,
    })
}

/// `prices` is `[[millis, price], ...]`; volumes are matched by position.
fn parse_market_chart(body: &Value) -> Vec<PriceBar> {
    let Some(prices) = body.get("prices").and_then(Value::as_array) else {
        return Vec::new();
    };
    let volumes = body.get("total_volumes").and_then(Value::as_array);

    prices
        .iter()
        .enumerate()
        .filter_map(|(i, point)| {
            let millis = point.get(0)?.as_f64()? as i64;
            let close = point.get(1)?.as_f64()?;
            let date = DateTime::<Utc>::from_timestamp_millis(millis)?;
            let volume = volumes
                .and_then(|v| v.get(i))
                .and_then(|p| p.get(1))
                .and_then(Value::as_f64)
                .unwrap_or(0.0);

            Some(PriceBar {
                date: date.format("%Y-%m-%d %H:%M:%S").to_string(),
                open: close,
                high: close,
                low: close,
                close,
                volume: volume.max(0.0) as u64,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coin_ids() {
        assert_eq!(coin_id("btc"), Some("bitcoin"));
        assert_eq!(coin_id("MATIC"), Some("matic-network"));
        assert_eq!(coin_id("DOGE"), None);
    }

    #[test]
    fn test_parse_quote_derives_change_and_range() {
        let body = json!({
            "bitcoin": {"usd": 50000.0, "usd_24h_change": 2.0, "usd_24h_vol": 1.5e9}
        });
        let quote = parse_quote("btc", "bitcoin", &body, Utc::now()).unwrap();

        assert_eq!(quote.symbol, "BTC");
        assert_eq!(quote.change, 1000.0);
        assert_eq!(quote.previous_close, 49000.0);
        assert_eq!(quote.high, 52500.0);
        assert_eq!(quote.low, 47500.0);
        assert_eq!(quote.volume, 1_500_000_000);
        assert_eq!(quote.source, "coingecko");
    }

    #[test]
    fn test_parse_quote_missing_coin() {
        assert!(parse_quote("BTC", "bitcoin", &json!({}), Utc::now()).is_none());
    }

    #[test]
    fn test_parse_market_chart() {
        let body = json!({
            "prices": [[1_700_000_000_000_i64, 100.0], [1_700_086_400_000_i64, 101.5]],
            "total_volumes": [[1_700_000_000_000_i64, 10.0], [1_700_086_400_000_i64, 20.0]]
        });
        let bars = parse_market_chart(&body);

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].close, 101.5);
        assert_eq!(bars[1].volume, 20);
        assert!(bars[0].date.starts_with("2023-11-14"));
    }
}

//! Yahoo Finance chart API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::client::{number, HttpClient};
use super::PriceProvider;
use crate::config::YAHOO_CHART_BASE_URL;
use crate::domain::{AssetType, Period, PriceBar, PriceQuote};
use crate::errors::AppResult;

pub struct YahooFinance {
    http: HttpClient,
    base_url: String,
}

impl YahooFinance {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            base_url: YAHOO_CHART_BASE_URL.to_string(),
        }
    }

    async fn chart(&self, symbol: &str, range: &str, interval: &str) -> AppResult<Value> {
        let url = format!("{}/{}", self.base_url, symbol);
        self.http
            .get_json(&url, &[("range", range), ("interval", interval)])
            .await
    }
}

/// Bar interval requested for each range
fn chart_interval(period: Period) -> &'static str {
    match period {
        Period::OneDay => "5m",
        Period::FiveDays => "1h",
        Period::TwoYears | Period::FiveYears => "1wk",
        _ => "1d",
    }
}

#[async_trait]
impl PriceProvider for YahooFinance {
    fn name(&self) -> &'static str {
        "yahoo_finance"
    }

    fn supports(&self, _asset_type: AssetType) -> bool {
        true
    }

    async fn quote(&self, symbol: &str) -> AppResult<Option<PriceQuote>> {
        let body = self.chart(symbol, "1d", "1m").await?;
        Ok(parse_quote(symbol, &body, Utc::now()))
    }

    async fn history(&self, symbol: &str, period: Period) -> AppResult<Vec<PriceBar>> {
        let body = self
            .chart(symbol, period.as_str(), chart_interval(period))
            .await?;
        Ok(parse_history(&body))
    }
}

fn first_result(body: &Value) -> Option<&Value> {
    body.get("chart")?.get("result")?.as_array()?.first()
}

fn parse_quote(symbol: &str, body: &Value, now: DateTime<Utc>) -> Option<PriceQuote> {
    let meta = first_result(body)?.get("meta")?;
    let price = number(meta.get("regularMarketPrice")).filter(|p| *p != 0.0)?;
    let previous_close = number(meta.get("previousClose"))
        .or_else(|| number(meta.get("chartPreviousClose")))
        .unwrap_or(price);
    let change = price - previous_close;
    let change_percent = if previous_close != 0.0 {
        change / previous_close * 100.0
    } else {
        0.0
    };

    Some(PriceQuote {
        symbol: symbol.to_uppercase(),
        current_price: price,
        change,
        change_percent,
        volume: number(meta.get("regularMarketVolume")).unwrap_or(0.0).max(0.0) as u64,
        high: number(meta.get("regularMarketDayHigh")).unwrap_or(price),
        low: number(meta.get("regularMarketDayLow")).unwrap_or(price),
        open: number(meta.get("regularMarketOpen")).unwrap_or(price),
        previous_close,
        source: "yahoo_finance".to_string(),
        timestamp: now,
    })
}

/// Zip `timestamp` with `indicators.quote[0]`, skipping null closes.
fn parse_history(body: &Value) -> Vec<PriceBar> {
    let Some(result) = first_result(body) else {
        return Vec::new();
    };
    let Some(timestamps) = result.get("timestamp").and_then(Value::as_array) else {
        return Vec::new();
    };
    let Some(quote) = result
        .get("indicators")
        .and_then(|i| i.get("quote"))
        .and_then(Value::as_array)
        .and_then(|q| q.first())
    else {
        return Vec::new();
    };

    let series = |name: &str, i: usize| -> Option<f64> {
        quote.get(name)?.as_array()?.get(i)?.as_f64()
    };

    timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let date = DateTime::<Utc>::from_timestamp(ts.as_i64()?, 0)?;
            let close = series("close", i)?;

            Some(PriceBar {
                date: date.format("%Y-%m-%d %H:%M:%S").to_string(),
                open: series("open", i).unwrap_or(close),
                high: series("high", i).unwrap_or(close),
                low: series("low", i).unwrap_or(close),
                close,
                volume: series("volume", i).unwrap_or(0.0).max(0.0) as u64,
            })
        })
        .collect()
}

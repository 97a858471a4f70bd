//! Alpha Vantage: quotes, time series and company overviews.
//!
//! Only constructed with a real API key; the `demo` key disables it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::client::{number, HttpClient};
use super::{MetadataProvider, PriceProvider};
use crate::config::{ALPHA_VANTAGE_BASE_URL, HISTORY_BARS};
use crate::domain::{AssetType, Period, PriceBar, PriceQuote, ProviderMetadata};
use crate::errors::{AppError, AppResult};

pub struct AlphaVantage {
    http: HttpClient,
    api_key: String,
    base_url: String,
}

impl AlphaVantage {
    pub fn new(http: HttpClient, api_key: String) -> Self {
        Self {
            http,
            api_key,
            base_url: ALPHA_VANTAGE_BASE_URL.to_string(),
        }
    }

    async fn call(&self, params: &[(&str, &str)]) -> AppResult<Value> {
        let mut query = params.to_vec();
        query.push(("apikey", self.api_key.as_str()));

        let body = self.http.get_json(&self.base_url, &query).await?;
        check_payload(&body)?;
        Ok(body)
    }
}

/// Error and throttling notices arrive with HTTP 200.
fn check_payload(body: &Value) -> AppResult<()> {
    for key in ["Error Message", "Note", "Information"] {
        if let Some(message) = body.get(key).and_then(Value::as_str) {
            return Err(AppError::market_data(format!("Alpha Vantage: {}", message)));
        }
    }
    Ok(())
}

/// Time series function (and intraday interval) for a period
fn series_function(period: Period) -> (&'static str, Option<&'static str>) {
    match period {
        Period::OneDay => ("TIME_SERIES_INTRADAY", Some("5min")),
        Period::OneYear | Period::TwoYears | Period::FiveYears => ("TIME_SERIES_MONTHLY", None),
        _ => ("TIME_SERIES_DAILY", None),
    }
}

#[async_trait]
impl PriceProvider for AlphaVantage {
    fn name(&self) -> &'static str {
        "alpha_vantage"
    }

    fn supports(&self, asset_type: AssetType) -> bool {
        asset_type != AssetType::Crypto
    }

    async fn quote(&self, symbol: &str) -> AppResult<Option<PriceQuote>> {
        let body = self
            .call(&[("function", "GLOBAL_QUOTE"), ("symbol", symbol)])
            .await?;
        Ok(parse_global_quote(symbol, &body, Utc::now()))
    }

    async fn history(&self, symbol: &str, period: Period) -> AppResult<Vec<PriceBar>> {
        let (function, interval) = series_function(period);
        let mut params = vec![("function", function), ("symbol", symbol)];
        if let Some(interval) = interval {
            params.push(("interval", interval));
        }

        let body = self.call(&params).await?;
        Ok(parse_time_series(&body))
    }
}

#[async_trait]
impl MetadataProvider for AlphaVantage {
    async fn overview(&self, symbol: &str) -> AppResult<Option<ProviderMetadata>> {
        let body = self
            .call(&[("function", "OVERVIEW"), ("symbol", symbol)])
            .await?;
        Ok(parse_overview(&body))
    }
}

fn parse_global_quote(symbol: &str, body: &Value, now: DateTime<Utc>) -> Option<PriceQuote> {
    let quote = body.get("Global Quote")?;
    let price = number(quote.get("05. price"))?;

    Some(PriceQuote {
        symbol: symbol.to_uppercase(),
        current_price: price,
        change: number(quote.get("09. change")).unwrap_or(0.0),
        change_percent: number(quote.get("10. change percent")).unwrap_or(0.0),
        volume: number(quote.get("06. volume")).unwrap_or(0.0).max(0.0) as u64,
        high: number(quote.get("03. high")).unwrap_or(price),
        low: number(quote.get("04. low")).unwrap_or(price),
        open: number(quote.get("02. open")).unwrap_or(price),
        previous_close: number(quote.get("08. previous close")).unwrap_or(price),
        source: "alpha_vantage".to_string(),
        timestamp: now,
    })
}

/// Bars from whichever `... Time Series ...` key is present, sorted by
/// date and limited to the most recent ones.
fn parse_time_series(body: &Value) -> Vec<PriceBar> {
    let Some(series) = body
        .as_object()
        .and_then(|obj| obj.iter().find(|(key, _)| key.contains("Time Series")))
        .and_then(|(_, series)| series.as_object())
    else {
        return Vec::new();
    };

    let mut bars: Vec<PriceBar> = series
        .iter()
        .filter_map(|(date, values)| {
            Some(PriceBar {
                date: date.clone(),
                open: number(values.get("1. open"))?,
                high: number(values.get("2. high"))?,
                low: number(values.get("3. low"))?,
                close: number(values.get("4. close"))?,
                volume: number(values.get("5. volume")).unwrap_or(0.0).max(0.0) as u64,
            })
        })
        .collect();

    bars.sort_by(|a, b| a.date.cmp(&b.date));
    let start = bars.len().saturating_sub(HISTORY_BARS);
    bars.split_off(start)
}

fn text(body: &Value, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "None" && *s != "-")
        .map(str::to_string)
}

fn parse_overview(body: &Value) -> Option<ProviderMetadata> {
    text(body, "Symbol")?;

    Some(ProviderMetadata {
        name: text(body, "Name"),
        asset_type: Some(AssetType::Stock),
        exchange: text(body, "Exchange"),
        currency: text(body, "Currency"),
        sector: text(body, "Sector"),
        industry: text(body, "Industry"),
        pe_ratio: number(body.get("PERatio")),
        pb_ratio: number(body.get("PriceToBookRatio")),
        // Reported as a fraction; screening thresholds are in percent
        dividend_yield: number(body.get("DividendYield")).map(|y| y * 100.0),
        market_cap: number(body.get("MarketCapitalization")),
        beta: number(body.get("Beta")),
        week_52_high: number(body.get("52WeekHigh")),
        week_52_low: number(body.get("52WeekLow")),
        eps: number(body.get("EPS")),
        revenue: number(body.get("RevenueTTM")),
        profit_margin: number(body.get("ProfitMargin")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_payloads_are_failures() {
        assert!(check_payload(&json!({"Note": "Thank you for using Alpha Vantage"})).is_err());
        assert!(check_payload(&json!({"Error Message": "Invalid API call"})).is_err());
        assert!(check_payload(&json!({"Global Quote": {}})).is_ok());
    }

    #[test]
    fn test_series_function_by_period() {
        assert_eq!(
            series_function(Period::OneDay),
            ("TIME_SERIES_INTRADAY", Some("5min"))
        );
        assert_eq!(series_function(Period::OneMonth).0, "TIME_SERIES_DAILY");
        assert_eq!(series_function(Period::FiveYears).0, "TIME_SERIES_MONTHLY");
    }

    #[test]
    fn test_parse_global_quote() {
        let body = json!({
            "Global Quote": {
                "01. symbol": "IBM",
                "02. open": "180.00",
                "03. high": "182.50",
                "04. low": "179.10",
                "05. price": "181.25",
                "06. volume": "3200000",
                "08. previous close": "179.75",
                "09. change": "1.50",
                "10. change percent": "0.8345%"
            }
        });
        let quote = parse_global_quote("ibm", &body, Utc::now()).unwrap();

        assert_eq!(quote.symbol, "IBM");
        assert_eq!(quote.current_price, 181.25);
        assert_eq!(quote.change_percent, 0.8345);
        assert_eq!(quote.volume, 3_200_000);
        assert_eq!(quote.previous_close, 179.75);
        assert_eq!(quote.source, "alpha_vantage");
    }

    #[test]
    fn test_empty_global_quote_is_none() {
        assert!(parse_global_quote("XYZ", &json!({"Global Quote": {}}), Utc::now()).is_none());
    }

    #[test]
    fn test_parse_time_series_sorts_and_truncates() {
        let mut series = serde_json::Map::new();
        for day in (0..40).rev() {
            series.insert(
                format!("2024-{:02}-{:02}", 1 + day / 28, 1 + day % 28),
                json!({
                    "1. open": "1", "2. high": "2", "3. low": "0.5",
                    "4. close": day.to_string(), "5. volume": "100"
                }),
            );
        }
        let body = json!({"Meta Data": {}, "Time Series (Daily)": series});
        let bars = parse_time_series(&body);

        assert_eq!(bars.len(), HISTORY_BARS);
        assert!(bars.windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[test]
    fn test_parse_time_series_without_series_key() {
        assert!(parse_time_series(&json!({"Meta Data": {}})).is_empty());
    }

    #[test]
    fn test_parse_overview() {
        let body = json!({
            "Symbol": "IBM",
            "Name": "International Business Machines",
            "Exchange": "NYSE",
            "Currency": "USD",
            "Sector": "TECHNOLOGY",
            "Industry": "COMPUTER & OFFICE EQUIPMENT",
            "PERatio": "22.5",
            "DividendYield": "0.0365",
            "Beta": "0.7",
            "EPS": "None"
        });
        let meta = parse_overview(&body).unwrap();

        assert_eq!(meta.name.as_deref(), Some("International Business Machines"));
        assert_eq!(meta.pe_ratio, Some(22.5));
        assert!((meta.dividend_yield.unwrap() - 3.65).abs() < 1e-9);
        assert_eq!(meta.eps, None);
        assert!(parse_overview(&json!({})).is_none());
    }
}

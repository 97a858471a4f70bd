//! Tradable assets: classification, metadata and the built-in catalogue.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

const CRYPTO_MARKERS: &[&str] = &[
    "BTC", "ETH", "ADA", "DOT", "LINK", "UNI", "AAVE", "SOL", "MATIC", "AVAX",
];

const CURRENCY_CODES: &[&str] = &["USD", "EUR", "GBP", "JPY", "CHF", "CAD", "AUD", "NZD"];

/// Kind of instrument a symbol refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Stock,
    Crypto,
    Forex,
    Etf,
}

impl AssetType {
    /// Classify a symbol by its shape.
    ///
    /// Crypto when it contains a known coin ticker, forex when it is a
    /// six-letter pair containing a currency code, stock otherwise.
    pub fn classify(symbol: &str) -> Self {
        let upper = symbol.to_uppercase();
        if CRYPTO_MARKERS.iter().any(|marker| upper.contains(marker)) {
            return AssetType::Crypto;
        }
        if upper.len() == 6 && CURRENCY_CODES.iter().any(|code| upper.contains(code)) {
            return AssetType::Forex;
        }
        AssetType::Stock
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Stock => "stock",
            AssetType::Crypto => "crypto",
            AssetType::Forex => "forex",
            AssetType::Etf => "etf",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stock" => Ok(AssetType::Stock),
            "crypto" => Ok(AssetType::Crypto),
            "forex" => Ok(AssetType::Forex),
            "etf" => Ok(AssetType::Etf),
            other => Err(AppError::internal(format!("Unknown asset type '{}'", other))),
        }
    }
}

/// Persisted asset row
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Asset {
    pub id: Uuid,
    pub symbol: String,
    pub name: String,
    pub asset_type: AssetType,
    pub exchange: String,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Descriptive and fundamental data about a symbol.
///
/// Fundamentals stay `None` when no provider reported them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AssetMetadata {
    pub symbol: String,
    pub name: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub exchange: String,
    pub currency: String,
    pub sector: String,
    pub industry: String,
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub market_cap: Option<f64>,
    pub beta: f64,
    #[serde(rename = "52_week_high")]
    pub week_52_high: Option<f64>,
    #[serde(rename = "52_week_low")]
    pub week_52_low: Option<f64>,
    pub eps: Option<f64>,
    pub revenue: Option<f64>,
    pub profit_margin: Option<f64>,
}

/// Partial metadata as reported by a provider, before defaults apply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderMetadata {
    pub name: Option<String>,
    pub asset_type: Option<AssetType>,
    pub exchange: Option<String>,
    pub currency: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub market_cap: Option<f64>,
    pub beta: Option<f64>,
    pub week_52_high: Option<f64>,
    pub week_52_low: Option<f64>,
    pub eps: Option<f64>,
    pub revenue: Option<f64>,
    pub profit_margin: Option<f64>,
}

/// Entry of the built-in symbol catalogue
#[derive(Debug, Clone, Copy)]
pub struct KnownAsset {
    pub symbol: &'static str,
    pub name: &'static str,
    pub asset_type: AssetType,
    pub sector: &'static str,
    pub industry: &'static str,
    pub exchange: &'static str,
}

const fn stock(
    symbol: &'static str,
    name: &'static str,
    sector: &'static str,
    industry: &'static str,
    exchange: &'static str,
) -> KnownAsset {
    KnownAsset {
        symbol,
        name,
        asset_type: AssetType::Stock,
        sector,
        industry,
        exchange,
    }
}

const fn coin(symbol: &'static str, name: &'static str) -> KnownAsset {
    KnownAsset {
        symbol,
        name,
        asset_type: AssetType::Crypto,
        sector: "Cryptocurrency",
        industry: "Digital Currency",
        exchange: "Crypto",
    }
}

pub const KNOWN_ASSETS: &[KnownAsset] = &[
    stock("AAPL", "Apple Inc.", "Technology", "Consumer Electronics", "NASDAQ"),
    stock("GOOGL", "Alphabet Inc.", "Technology", "Internet Services", "NASDAQ"),
    stock("MSFT", "Microsoft Corporation", "Technology", "Software", "NASDAQ"),
    stock("AMZN", "Amazon.com Inc.", "Consumer", "E-commerce", "NASDAQ"),
    stock("TSLA", "Tesla Inc.", "Consumer", "Automotive", "NASDAQ"),
    stock("NVDA", "NVIDIA Corporation", "Technology", "Semiconductors", "NASDAQ"),
    stock("META", "Meta Platforms Inc.", "Technology", "Social Media", "NASDAQ"),
    stock("JPM", "JPMorgan Chase & Co.", "Financial", "Banking", "NYSE"),
    stock("BAC", "Bank of America Corp.", "Financial", "Banking", "NYSE"),
    stock("WFC", "Wells Fargo & Company", "Financial", "Banking", "NYSE"),
    stock("JNJ", "Johnson & Johnson", "Healthcare", "Pharmaceuticals", "NYSE"),
    stock("PFE", "Pfizer Inc.", "Healthcare", "Pharmaceuticals", "NYSE"),
    stock("KO", "The Coca-Cola Company", "Consumer", "Beverages", "NYSE"),
    stock("PEP", "PepsiCo Inc.", "Consumer", "Beverages", "NASDAQ"),
    coin("BTC", "Bitcoin"),
    coin("ETH", "Ethereum"),
    coin("ADA", "Cardano"),
];

pub fn known_asset(symbol: &str) -> Option<&'static KnownAsset> {
    let upper = symbol.to_uppercase();
    KNOWN_ASSETS.iter().find(|asset| asset.symbol == upper)
}

impl AssetMetadata {
    /// Merge provider data with the catalogue and generic defaults.
    ///
    /// Precedence per field: provider, catalogue, default (`<SYM> Corporation`,
    /// classified type, NASDAQ, USD, Other, General, beta 1.0).
    pub fn resolve(symbol: &str, reported: Option<ProviderMetadata>) -> Self {
        let symbol = symbol.to_uppercase();
        let reported = reported.unwrap_or_default();
        let known = known_asset(&symbol);

        Self {
            name: reported
                .name
                .or_else(|| known.map(|k| k.name.to_string()))
                .unwrap_or_else(|| format!("{} Corporation", symbol)),
            asset_type: reported
                .asset_type
                .or_else(|| known.map(|k| k.asset_type))
                .unwrap_or_else(|| AssetType::classify(&symbol)),
            exchange: reported
                .exchange
                .or_else(|| known.map(|k| k.exchange.to_string()))
                .unwrap_or_else(|| "NASDAQ".to_string()),
            currency: reported.currency.unwrap_or_else(|| "USD".to_string()),
            sector: reported
                .sector
                .or_else(|| known.map(|k| k.sector.to_string()))
                .unwrap_or_else(|| "Other".to_string()),
            industry: reported
                .industry
                .or_else(|| known.map(|k| k.industry.to_string()))
                .unwrap_or_else(|| "General".to_string()),
            pe_ratio: reported.pe_ratio,
            pb_ratio: reported.pb_ratio,
            dividend_yield: reported.dividend_yield,
            market_cap: reported.market_cap,
            beta: reported.beta.filter(|b| *b != 0.0).unwrap_or(1.0),
            week_52_high: reported.week_52_high,
            week_52_low: reported.week_52_low,
            eps: reported.eps,
            revenue: reported.revenue,
            profit_margin: reported.profit_margin,
            symbol,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_crypto() {
        assert_eq!(AssetType::classify("BTC"), AssetType::Crypto);
        assert_eq!(AssetType::classify("ethusd"), AssetType::Crypto);
        assert_eq!(AssetType::classify("SOL"), AssetType::Crypto);
    }

    #[test]
    fn test_classify_forex() {
        assert_eq!(AssetType::classify("EURUSD"), AssetType::Forex);
        assert_eq!(AssetType::classify("GBPJPY"), AssetType::Forex);
    }

    #[test]
    fn test_classify_stock() {
        assert_eq!(AssetType::classify("AAPL"), AssetType::Stock);
        // Seven letters is never a currency pair
        assert_eq!(AssetType::classify("USDABCD"), AssetType::Stock);
    }

    #[test]
    fn test_resolve_uses_catalogue() {
        let metadata = AssetMetadata::resolve("jpm", None);
        assert_eq!(metadata.symbol, "JPM");
        assert_eq!(metadata.name, "JPMorgan Chase & Co.");
        assert_eq!(metadata.sector, "Financial");
        assert_eq!(metadata.exchange, "NYSE");
        assert_eq!(metadata.beta, 1.0);
    }

    #[test]
    fn test_resolve_generic_defaults() {
        let metadata = AssetMetadata::resolve("XYZ", None);
        assert_eq!(metadata.name, "XYZ Corporation");
        assert_eq!(metadata.asset_type, AssetType::Stock);
        assert_eq!(metadata.exchange, "NASDAQ");
        assert_eq!(metadata.currency, "USD");
        assert_eq!(metadata.sector, "Other");
        assert_eq!(metadata.industry, "General");
        assert!(metadata.pe_ratio.is_none());
    }

    #[test]
    fn test_resolve_prefers_provider_values() {
        let reported = ProviderMetadata {
            name: Some("Apple Incorporated".into()),
            sector: Some("TECHNOLOGY".into()),
            pe_ratio: Some(28.5),
            beta: Some(1.2),
            ..Default::default()
        };
        let metadata = AssetMetadata::resolve("AAPL", Some(reported));
        assert_eq!(metadata.name, "Apple Incorporated");
        assert_eq!(metadata.sector, "TECHNOLOGY");
        assert_eq!(metadata.industry, "Consumer Electronics");
        assert_eq!(metadata.pe_ratio, Some(28.5));
        assert_eq!(metadata.beta, 1.2);
    }

    #[test]
    fn test_metadata_serializes_week_range_names() {
        let json = serde_json::to_value(AssetMetadata::resolve("BTC", None)).unwrap();
        assert_eq!(json["type"], "crypto");
        assert!(json.get("52_week_high").is_some());
    }
}

//! Domain layer - Core business entities and logic
//!
//! Entities and value objects independent of infrastructure concerns.

pub mod asset;
pub mod market;
pub mod password;
pub mod portfolio;
pub mod signal;
pub mod user;

pub use asset::{Asset, AssetMetadata, AssetType, ProviderMetadata};
pub use market::{MarketState, MarketStatus, Period, PriceBar, PriceQuote, PriceSnapshot};
pub use password::Password;
pub use portfolio::{Portfolio, Position};
pub use signal::{
    IndicatorVote, NewSignal, RiskLevel, SignalDecision, SignalRecord, TrendDirection,
};
pub use user::{User, UserResponse, UserRole};

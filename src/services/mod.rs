//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate the analytics and infrastructure layers. They
//! depend on traits, so each one can be replaced by a mock in tests.
//!
//! Writes that must be atomic go through the Unit of Work.

mod asset_service;
mod auth_service;
pub mod container;
pub mod market_service;
pub mod portfolio_service;
pub mod screener_service;
pub mod signal_service;

// Service Container
pub use container::{ServiceContainer, Services};

// Service traits and implementations
pub use asset_service::{AssetCatalog, AssetService};
pub use auth_service::{AuthService, Authenticator, Claims, TokenResponse};
pub use market_service::{MarketData, MarketService};
pub use portfolio_service::{PortfolioManager, PortfolioService, Requester};
pub use screener_service::{Screener, ScreenerService, ScreeningRequest};
pub use signal_service::{SignalEngine, SignalService};

#[cfg(any(test, feature = "test-utils"))]
pub use asset_service::MockAssetService;
#[cfg(any(test, feature = "test-utils"))]
pub use container::MockServiceContainer;
#[cfg(any(test, feature = "test-utils"))]
pub use market_service::MockMarketService;
#[cfg(any(test, feature = "test-utils"))]
pub use portfolio_service::MockPortfolioService;
#[cfg(any(test, feature = "test-utils"))]
pub use screener_service::MockScreenerService;
#[cfg(any(test, feature = "test-utils"))]
pub use signal_service::MockSignalService;

//! Service Container - builds every service once and hands out shared
//! trait objects.

use std::sync::Arc;

use super::{
    AssetCatalog, AssetService, AuthService, Authenticator, MarketData, MarketService,
    PortfolioManager, PortfolioService, Screener, ScreenerService, SignalEngine, SignalService,
};
use crate::config::Config;
use crate::infra::{CacheStore, MarketDataSources, Persistence};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Centralized access to all application services.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait ServiceContainer: Send + Sync {
    fn auth(&self) -> Arc<dyn AuthService>;

    fn market(&self) -> Arc<dyn MarketService>;

    fn assets(&self) -> Arc<dyn AssetService>;

    fn signals(&self) -> Arc<dyn SignalService>;

    fn portfolios(&self) -> Arc<dyn PortfolioService>;

    fn screener(&self) -> Arc<dyn ScreenerService>;
}

/// Concrete implementation of ServiceContainer
#[derive(Clone)]
pub struct Services {
    auth: Arc<dyn AuthService>,
    market: Arc<dyn MarketService>,
    assets: Arc<dyn AssetService>,
    signals: Arc<dyn SignalService>,
    portfolios: Arc<dyn PortfolioService>,
    screener: Arc<dyn ScreenerService>,
}

impl Services {
    /// Wire the services over one database connection, the shared cache and
    /// the configured market data providers.
    pub fn build(
        db: sea_orm::DatabaseConnection,
        cache: Arc<dyn CacheStore>,
        sources: MarketDataSources,
        config: Config,
    ) -> Self {
        let uow = Arc::new(Persistence::new(db));

        let assets: Arc<dyn AssetService> =
            Arc::new(AssetCatalog::new(cache.clone(), sources.metadata));
        let market: Arc<dyn MarketService> = Arc::new(MarketData::new(
            cache.clone(),
            sources.prices,
            assets.clone(),
            config.cache_ttl,
        ));
        let signals: Arc<dyn SignalService> = Arc::new(SignalEngine::new(
            uow.clone(),
            market.clone(),
            assets.clone(),
            cache,
            config.max_historical_days,
        ));
        let portfolios: Arc<dyn PortfolioService> = Arc::new(PortfolioManager::new(
            uow.clone(),
            market.clone(),
            assets.clone(),
            config.max_portfolio_size,
        ));
        let screener: Arc<dyn ScreenerService> = Arc::new(Screener::new(
            market.clone(),
            signals.clone(),
            assets.clone(),
        ));
        let auth: Arc<dyn AuthService> = Arc::new(Authenticator::new(uow, config));

        Self {
            auth,
            market,
            assets,
            signals,
            portfolios,
            screener,
        }
    }
}

impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth.clone()
    }

    fn market(&self) -> Arc<dyn MarketService> {
        self.market.clone()
    }

    fn assets(&self) -> Arc<dyn AssetService> {
        self.assets.clone()
    }

    fn signals(&self) -> Arc<dyn SignalService> {
        self.signals.clone()
    }

    fn portfolios(&self) -> Arc<dyn PortfolioService> {
        self.portfolios.clone()
    }

    fn screener(&self) -> Arc<dyn ScreenerService> {
        self.screener.clone()
    }
}

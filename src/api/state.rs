//! Application state - Dependency injection container.
//!
//! Handlers reach every service and infrastructure probe through here.

use std::sync::Arc;

use crate::config::Config;
use crate::infra::{CacheStore, DatabaseHealth};
use crate::services::{
    AuthService, MarketService, PortfolioService, ScreenerService, ServiceContainer, SignalService,
};

/// Application state containing all services (DI container).
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthService>,
    pub market_service: Arc<dyn MarketService>,
    pub signal_service: Arc<dyn SignalService>,
    pub portfolio_service: Arc<dyn PortfolioService>,
    pub screener_service: Arc<dyn ScreenerService>,
    /// Redis cache, also backing the rate limiter
    pub cache: Arc<dyn CacheStore>,
    pub database: Arc<dyn DatabaseHealth>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Pull every service out of a container.
    pub fn new(
        services: &dyn ServiceContainer,
        cache: Arc<dyn CacheStore>,
        database: Arc<dyn DatabaseHealth>,
        config: Config,
    ) -> Self {
        Self {
            auth_service: services.auth(),
            market_service: services.market(),
            signal_service: services.signals(),
            portfolio_service: services.portfolios(),
            screener_service: services.screener(),
            cache,
            database,
            config: Arc::new(config),
        }
    }
}

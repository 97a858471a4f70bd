//! Infrastructure layer - External systems integration
//!
//! - Postgres connections, migrations and repositories
//! - Unit of Work for transaction management
//! - Redis cache
//! - Market-data HTTP providers
//! - Database bootstrap for the `setup` command

pub mod bootstrap;
pub mod cache;
pub mod db;
pub mod market_data;
pub mod repositories;
pub mod unit_of_work;

pub use bootstrap::{Bootstrapper, PostgresBootstrap, SetupBackend, SetupReport, SetupTarget};
pub use cache::{Cache, CacheStore};
pub use db::{Database, DatabaseHealth, Migrator};
pub use market_data::{MarketDataSources, MetadataProvider, PriceProvider};
pub use repositories::{
    AssetRepository, NewAsset, PortfolioRepository, SignalRepository, UserRepository,
};
pub use unit_of_work::{Persistence, TransactionContext, TxFuture, UnitOfWork};

#[cfg(any(test, feature = "test-utils"))]
pub use bootstrap::MockSetupBackend;
#[cfg(any(test, feature = "test-utils"))]
pub use cache::MockCacheStore;
#[cfg(any(test, feature = "test-utils"))]
pub use db::MockDatabaseHealth;
#[cfg(any(test, feature = "test-utils"))]
pub use market_data::{MockMetadataProvider, MockPriceProvider};
#[cfg(any(test, feature = "test-utils"))]
pub use repositories::{
    MockAssetRepository, MockPortfolioRepository, MockSignalRepository, MockUserRepository,
};
#[cfg(any(test, feature = "test-utils"))]
pub use unit_of_work::StubUnitOfWork;

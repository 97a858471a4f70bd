//! Unit of Work: repository access plus transaction management.
//!
//! Work that must be atomic (adding a position, persisting a signal with
//! its asset row) goes through [`UnitOfWork::transaction`], whose
//! [`TransactionContext`] hands out repositories bound to the open
//! transaction.

use async_trait::async_trait;
use sea_orm::{
    AccessMode, DatabaseConnection, DatabaseTransaction, IsolationLevel, TransactionTrait,
};
use std::{future::Future, pin::Pin, sync::Arc};
use uuid::Uuid;

use super::repositories::{
    count_positions, find_asset, find_position_by_asset, insert_position, insert_signal,
    set_position, upsert_asset, AssetRepository, AssetStore, NewAsset, PortfolioRepository,
    PortfolioStore, SignalRepository, SignalStore, UserRepository, UserStore,
};
use crate::domain::{Asset, NewSignal, Position, SignalRecord};
use crate::errors::AppResult;

/// Boxed future returned by transaction closures
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'a>>;

/// Centralized repository access and transactions.
///
/// Not mockable with `automock` because of the generic `transaction`
/// method; tests use [`StubUnitOfWork`].
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn users(&self) -> Arc<dyn UserRepository>;

    fn assets(&self) -> Arc<dyn AssetRepository>;

    fn portfolios(&self) -> Arc<dyn PortfolioRepository>;

    fn signals(&self) -> Arc<dyn SignalRepository>;

    /// Run `f` inside a ReadCommitted transaction, committing on `Ok` and
    /// rolling back on `Err`.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send;
}

/// Repository access scoped to one open transaction.
pub struct TransactionContext<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TransactionContext<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub fn assets(&self) -> TxAssetRepository<'_> {
        TxAssetRepository { txn: self.txn }
    }

    pub fn portfolios(&self) -> TxPortfolioRepository<'_> {
        TxPortfolioRepository { txn: self.txn }
    }

    pub fn signals(&self) -> TxSignalRepository<'_> {
        TxSignalRepository { txn: self.txn }
    }
}

/// sea-orm backed [`UnitOfWork`]
pub struct Persistence {
    db: DatabaseConnection,
    users: Arc<UserStore>,
    assets: Arc<AssetStore>,
    portfolios: Arc<PortfolioStore>,
    signals: Arc<SignalStore>,
}

impl Persistence {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            users: Arc::new(UserStore::new(db.clone())),
            assets: Arc::new(AssetStore::new(db.clone())),
            portfolios: Arc::new(PortfolioStore::new(db.clone())),
            signals: Arc::new(SignalStore::new(db.clone())),
            db,
        }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.users.clone()
    }

    fn assets(&self) -> Arc<dyn AssetRepository> {
        self.assets.clone()
    }

    fn portfolios(&self) -> Arc<dyn PortfolioRepository> {
        self.portfolios.clone()
    }

    fn signals(&self) -> Arc<dyn SignalRepository> {
        self.signals.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::ReadCommitted), Some(AccessMode::ReadWrite))
            .await?;

        let ctx = TransactionContext::new(&txn);

        match f(ctx).await {
            Ok(result) => {
                txn.commit().await?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

/// [`UnitOfWork`] over mocked repositories. There is no database behind
/// it, so every transaction fails with `ServiceUnavailable`.
#[cfg(any(test, feature = "test-utils"))]
pub struct StubUnitOfWork {
    pub users: Arc<dyn UserRepository>,
    pub assets: Arc<dyn AssetRepository>,
    pub portfolios: Arc<dyn PortfolioRepository>,
    pub signals: Arc<dyn SignalRepository>,
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for StubUnitOfWork {
    fn default() -> Self {
        use super::repositories::{
            MockAssetRepository, MockPortfolioRepository, MockSignalRepository,
            MockUserRepository,
        };

        Self {
            users: Arc::new(MockUserRepository::new()),
            assets: Arc::new(MockAssetRepository::new()),
            portfolios: Arc::new(MockPortfolioRepository::new()),
            signals: Arc::new(MockSignalRepository::new()),
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl UnitOfWork for StubUnitOfWork {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.users.clone()
    }

    fn assets(&self) -> Arc<dyn AssetRepository> {
        self.assets.clone()
    }

    fn portfolios(&self) -> Arc<dyn PortfolioRepository> {
        self.portfolios.clone()
    }

    fn signals(&self) -> Arc<dyn SignalRepository> {
        self.signals.clone()
    }

    async fn transaction<F, T>(&self, _f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        Err(crate::errors::AppError::ServiceUnavailable(
            "no database behind this unit of work".to_string(),
        ))
    }
}

/// Asset operations inside a transaction
pub struct TxAssetRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl TxAssetRepository<'_> {
    pub async fn find_by_symbol(&self, symbol: &str) -> AppResult<Option<Asset>> {
        find_asset(self.txn, symbol).await
    }

    pub async fn upsert(&self, asset: NewAsset) -> AppResult<Asset> {
        upsert_asset(self.txn, asset).await
    }
}

/// Position operations inside a transaction
pub struct TxPortfolioRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl TxPortfolioRepository<'_> {
    pub async fn count_positions(&self, portfolio_id: Uuid) -> AppResult<u64> {
        count_positions(self.txn, portfolio_id).await
    }

    pub async fn find_position_by_asset(
        &self,
        portfolio_id: Uuid,
        asset_id: Uuid,
    ) -> AppResult<Option<Position>> {
        find_position_by_asset(self.txn, portfolio_id, asset_id).await
    }

    pub async fn insert_position(
        &self,
        portfolio_id: Uuid,
        asset_id: Uuid,
        quantity: f64,
        avg_cost: f64,
    ) -> AppResult<Position> {
        insert_position(self.txn, portfolio_id, asset_id, quantity, avg_cost).await
    }

    pub async fn set_position(&self, position_id: Uuid, quantity: f64, avg_cost: f64) -> AppResult<Position> {
        set_position(self.txn, position_id, Some(quantity), Some(avg_cost)).await
    }
}

/// Signal persistence inside a transaction
pub struct TxSignalRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl TxSignalRepository<'_> {
    pub async fn create(&self, symbol: &str, signal: NewSignal) -> AppResult<SignalRecord> {
        insert_signal(self.txn, symbol, signal).await
    }
}

/// Run a block inside `$uow.transaction`, boxing the future.
#[macro_export]
macro_rules! with_transaction {
    ($uow:expr, |$ctx:ident| $body:expr) => {
        $uow.transaction(|$ctx| Box::pin(async move { $body })).await
    };
}

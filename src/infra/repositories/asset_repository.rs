//! Asset repository.

use async_trait::async_trait;
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

use super::entities::asset::{self, ActiveModel, Entity as AssetEntity};
use crate::domain::{Asset, AssetType};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Values for an asset row created on first use
#[derive(Debug, Clone, PartialEq)]
pub struct NewAsset {
    pub symbol: String,
    pub name: String,
    pub asset_type: AssetType,
    pub exchange: String,
    pub currency: String,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AssetRepository: Send + Sync {
    async fn find_by_symbol(&self, symbol: &str) -> AppResult<Option<Asset>>;

    /// Return the row for `asset.symbol`, inserting it when missing.
    async fn upsert(&self, asset: NewAsset) -> AppResult<Asset>;
}

pub struct AssetStore {
    db: DatabaseConnection,
}

impl AssetStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

pub(crate) async fn find_asset<C: ConnectionTrait>(conn: &C, symbol: &str) -> AppResult<Option<Asset>> {
    let result = AssetEntity::find()
        .filter(asset::Column::Symbol.eq(symbol))
        .one(conn)
        .await?;

    Ok(result.map(Asset::from))
}

pub(crate) async fn upsert_asset<C: ConnectionTrait>(conn: &C, new: NewAsset) -> AppResult<Asset> {
    let symbol = new.symbol.to_uppercase();
    let now = chrono::Utc::now();
    let active_model = ActiveModel {
        id: Set(Uuid::new_v4()),
        symbol: Set(symbol.clone()),
        name: Set(new.name),
        asset_type: Set(new.asset_type.as_str().to_string()),
        exchange: Set(new.exchange),
        currency: Set(new.currency),
        created_at: Set(now),
        updated_at: Set(now),
    };

    AssetEntity::insert(active_model)
        .on_conflict(OnConflict::column(asset::Column::Symbol).do_nothing().to_owned())
        .exec_without_returning(conn)
        .await?;

    find_asset(conn, &symbol)
        .await?
        .ok_or_else(|| AppError::internal(format!("Asset {} vanished after upsert", symbol)))
}

#[async_trait]
impl AssetRepository for AssetStore {
    async fn find_by_symbol(&self, symbol: &str) -> AppResult<Option<Asset>> {
        find_asset(&self.db, symbol).await
    }

    async fn upsert(&self, asset: NewAsset) -> AppResult<Asset> {
        upsert_asset(&self.db, asset).await
    }
}

//! Portfolio and position repository.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::{
    asset::Entity as AssetEntity,
    portfolio::{self, ActiveModel as PortfolioActiveModel, Entity as PortfolioEntity},
    position::{self, into_position, ActiveModel as PositionActiveModel, Entity as PositionEntity},
};
use crate::domain::{Portfolio, Position};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait PortfolioRepository: Send + Sync {
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Portfolio>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Portfolio>>;

    async fn create(&self, user_id: Uuid, name: String, description: String) -> AppResult<Portfolio>;

    async fn update(
        &self,
        id: Uuid,
        name: Option<String>,
        description: Option<String>,
    ) -> AppResult<Portfolio>;

    /// Delete a portfolio; its positions go with it
    async fn delete(&self, id: Uuid) -> AppResult<()>;

    async fn positions(&self, portfolio_id: Uuid) -> AppResult<Vec<Position>>;

    /// Positions across every portfolio the user owns
    async fn positions_for_user(&self, user_id: Uuid) -> AppResult<Vec<Position>>;

    async fn find_position(&self, portfolio_id: Uuid, position_id: Uuid) -> AppResult<Option<Position>>;

    async fn update_position(
        &self,
        position_id: Uuid,
        quantity: Option<f64>,
        avg_cost: Option<f64>,
    ) -> AppResult<Position>;

    async fn delete_position(&self, position_id: Uuid) -> AppResult<()>;
}

pub struct PortfolioStore {
    db: DatabaseConnection,
}

impl PortfolioStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// =============================================================================
// Queries shared with the transactional repository
// =============================================================================

pub(crate) async fn load_position<C: ConnectionTrait>(conn: &C, position_id: Uuid) -> AppResult<Option<Position>> {
    let row = PositionEntity::find_by_id(position_id)
        .find_also_related(AssetEntity)
        .one(conn)
        .await?;

    row.map(into_position).transpose()
}

pub(crate) async fn load_positions<C: ConnectionTrait>(
    conn: &C,
    portfolio_ids: Vec<Uuid>,
) -> AppResult<Vec<Position>> {
    if portfolio_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = PositionEntity::find()
        .filter(position::Column::PortfolioId.is_in(portfolio_ids))
        .order_by_asc(position::Column::CreatedAt)
        .find_also_related(AssetEntity)
        .all(conn)
        .await?;

    rows.into_iter().map(into_position).collect()
}

pub(crate) async fn find_position_by_asset<C: ConnectionTrait>(
    conn: &C,
    portfolio_id: Uuid,
    asset_id: Uuid,
) -> AppResult<Option<Position>> {
    let row = PositionEntity::find()
        .filter(position::Column::PortfolioId.eq(portfolio_id))
        .filter(position::Column::AssetId.eq(asset_id))
        .find_also_related(AssetEntity)
        .one(conn)
        .await?;

    row.map(into_position).transpose()
}

pub(crate) async fn count_positions<C: ConnectionTrait>(conn: &C, portfolio_id: Uuid) -> AppResult<u64> {
    let count = PositionEntity::find()
        .filter(position::Column::PortfolioId.eq(portfolio_id))
        .count(conn)
        .await?;
    Ok(count)
}

pub(crate) async fn insert_position<C: ConnectionTrait>(
    conn: &C,
    portfolio_id: Uuid,
    asset_id: Uuid,
    quantity: f64,
    avg_cost: f64,
) -> AppResult<Position> {
    let now = chrono::Utc::now();
    let id = Uuid::new_v4();
    let active_model = PositionActiveModel {
        id: Set(id),
        portfolio_id: Set(portfolio_id),
        asset_id: Set(asset_id),
        quantity: Set(quantity),
        avg_cost: Set(avg_cost),
        created_at: Set(now),
        updated_at: Set(now),
    };
    active_model.insert(conn).await?;

    load_position(conn, id).await?.ok_or(AppError::NotFound)
}

pub(crate) async fn set_position<C: ConnectionTrait>(
    conn: &C,
    position_id: Uuid,
    quantity: Option<f64>,
    avg_cost: Option<f64>,
) -> AppResult<Position> {
    let model = PositionEntity::find_by_id(position_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: PositionActiveModel = model.into();
    if let Some(quantity) = quantity {
        active.quantity = Set(quantity);
    }
    if let Some(avg_cost) = avg_cost {
        active.avg_cost = Set(avg_cost);
    }
    active.updated_at = Set(chrono::Utc::now());
    active.update(conn).await?;

    load_position(conn, position_id).await?.ok_or(AppError::NotFound)
}

#[async_trait]
impl PortfolioRepository for PortfolioStore {
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Portfolio>> {
        let models = PortfolioEntity::find()
            .filter(portfolio::Column::UserId.eq(user_id))
            .order_by_asc(portfolio::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Portfolio::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Portfolio>> {
        let result = PortfolioEntity::find_by_id(id).one(&self.db).await?;
        Ok(result.map(Portfolio::from))
    }

    async fn create(&self, user_id: Uuid, name: String, description: String) -> AppResult<Portfolio> {
        let now = chrono::Utc::now();
        let active_model = PortfolioActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            name: Set(name),
            description: Set(description),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(&self.db).await?;
        Ok(Portfolio::from(model))
    }

    async fn update(
        &self,
        id: Uuid,
        name: Option<String>,
        description: Option<String>,
    ) -> AppResult<Portfolio> {
        let model = PortfolioEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: PortfolioActiveModel = model.into();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(description) = description {
            active.description = Set(description);
        }
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await?;
        Ok(Portfolio::from(model))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = PortfolioEntity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn positions(&self, portfolio_id: Uuid) -> AppResult<Vec<Position>> {
        load_positions(&self.db, vec![portfolio_id]).await
    }

    async fn positions_for_user(&self, user_id: Uuid) -> AppResult<Vec<Position>> {
        let ids: Vec<Uuid> = PortfolioEntity::find()
            .filter(portfolio::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        load_positions(&self.db, ids).await
    }

    async fn find_position(&self, portfolio_id: Uuid, position_id: Uuid) -> AppResult<Option<Position>> {
        let position = load_position(&self.db, position_id).await?;
        Ok(position.filter(|p| p.portfolio_id == portfolio_id))
    }

    async fn update_position(
        &self,
        position_id: Uuid,
        quantity: Option<f64>,
        avg_cost: Option<f64>,
    ) -> AppResult<Position> {
        set_position(&self.db, position_id, quantity, avg_cost).await
    }

    async fn delete_position(&self, position_id: Uuid) -> AppResult<()> {
        let result = PositionEntity::delete_by_id(position_id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

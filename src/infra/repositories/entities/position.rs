//! Portfolio position database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::{AssetType, Position};
use crate::errors::{AppError, AppResult};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "portfolio_positions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub portfolio_id: Uuid,
    pub asset_id: Uuid,
    #[sea_orm(column_type = "Double")]
    pub quantity: f64,
    #[sea_orm(column_type = "Double")]
    pub avg_cost: f64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::portfolio::Entity",
        from = "Column::PortfolioId",
        to = "super::portfolio::Column::Id",
        on_delete = "Cascade"
    )]
    Portfolio,
    #[sea_orm(
        belongs_to = "super::asset::Entity",
        from = "Column::AssetId",
        to = "super::asset::Column::Id",
        on_delete = "Restrict"
    )]
    Asset,
}

impl Related<super::portfolio::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Portfolio.def()
    }
}

impl Related<super::asset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Asset.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Join a position row with its asset row.
pub(crate) fn into_position(
    (model, asset): (Model, Option<super::asset::Model>),
) -> AppResult<Position> {
    let asset = asset.ok_or_else(|| {
        AppError::internal(format!("Position {} references a missing asset", model.id))
    })?;
    let asset_type: AssetType = super::asset::asset_type_of(&asset);

    Ok(Position {
        id: model.id,
        portfolio_id: model.portfolio_id,
        asset_id: model.asset_id,
        symbol: asset.symbol,
        asset_name: asset.name,
        asset_type,
        quantity: model.quantity,
        avg_cost: model.avg_cost,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

//! Asset database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::{Asset, AssetType};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "assets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub symbol: String,
    pub name: String,
    pub asset_type: String,
    pub exchange: String,
    pub currency: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::position::Entity")]
    Positions,
    #[sea_orm(has_many = "super::signal::Entity")]
    Signals,
}

impl Related<super::position::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Positions.def()
    }
}

impl Related<super::signal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Signals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Stored type, falling back to classifying the symbol for unknown values.
pub(crate) fn asset_type_of(model: &Model) -> AssetType {
    model
        .asset_type
        .parse()
        .unwrap_or_else(|_| AssetType::classify(&model.symbol))
}

impl From<Model> for Asset {
    fn from(model: Model) -> Self {
        let asset_type = asset_type_of(&model);
        Asset {
            id: model.id,
            symbol: model.symbol,
            name: model.name,
            asset_type,
            exchange: model.exchange,
            currency: model.currency,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

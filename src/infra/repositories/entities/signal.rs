//! Signal database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::{SignalDecision, SignalRecord};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "signals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub asset_id: Uuid,
    pub timeframe: String,
    pub as_of: DateTimeUtc,
    #[sea_orm(column_type = "Double", nullable)]
    pub rsi: Option<f64>,
    #[sea_orm(column_type = "Double", nullable)]
    pub ema_fast: Option<f64>,
    #[sea_orm(column_type = "Double", nullable)]
    pub ema_slow: Option<f64>,
    #[sea_orm(column_type = "Double", nullable)]
    pub macd: Option<f64>,
    #[sea_orm(column_type = "Double", nullable)]
    pub macd_signal: Option<f64>,
    #[sea_orm(column_type = "Double", nullable)]
    pub bb_upper: Option<f64>,
    #[sea_orm(column_type = "Double", nullable)]
    pub bb_middle: Option<f64>,
    #[sea_orm(column_type = "Double", nullable)]
    pub bb_lower: Option<f64>,
    pub decision: String,
    #[sea_orm(column_type = "Double")]
    pub confidence: f64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::asset::Entity",
        from = "Column::AssetId",
        to = "super::asset::Column::Id",
        on_delete = "Cascade"
    )]
    Asset,
}

impl Related<super::asset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Asset.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub(crate) fn into_record(self, symbol: &str) -> SignalRecord {
        SignalRecord {
            id: self.id,
            asset_id: self.asset_id,
            symbol: symbol.to_string(),
            timeframe: self.timeframe,
            as_of: self.as_of,
            rsi: self.rsi,
            ema_fast: self.ema_fast,
            ema_slow: self.ema_slow,
            macd: self.macd,
            macd_signal: self.macd_signal,
            bb_upper: self.bb_upper,
            bb_middle: self.bb_middle,
            bb_lower: self.bb_lower,
            decision: self.decision.parse().unwrap_or(SignalDecision::Hold),
            confidence: self.confidence,
            created_at: self.created_at,
        }
    }
}

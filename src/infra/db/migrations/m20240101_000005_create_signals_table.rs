//! Migration: Create signals table.

use sea_orm_migration::prelude::*;

use super::m20240101_000002_create_assets_table::Assets;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Signals::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Signals::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Signals::AssetId).uuid().not_null())
                    .col(ColumnDef::new(Signals::Timeframe).string_len(10).not_null())
                    .col(
                        ColumnDef::new(Signals::AsOf)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Signals::Rsi).double().null())
                    .col(ColumnDef::new(Signals::EmaFast).double().null())
                    .col(ColumnDef::new(Signals::EmaSlow).double().null())
                    .col(ColumnDef::new(Signals::Macd).double().null())
                    .col(ColumnDef::new(Signals::MacdSignal).double().null())
                    .col(ColumnDef::new(Signals::BbUpper).double().null())
                    .col(ColumnDef::new(Signals::BbMiddle).double().null())
                    .col(ColumnDef::new(Signals::BbLower).double().null())
                    .col(ColumnDef::new(Signals::Decision).string_len(10).not_null())
                    .col(ColumnDef::new(Signals::Confidence).double().not_null())
                    .col(
                        ColumnDef::new(Signals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Signals::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_signals_asset_id")
                            .from(Signals::Table, Signals::AssetId)
                            .to(Assets::Table, Assets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_signals_asset_as_of")
                    .table(Signals::Table)
                    .col(Signals::AssetId)
                    .col(Signals::AsOf)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Signals::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Signals {
    Table,
    Id,
    AssetId,
    Timeframe,
    AsOf,
    Rsi,
    EmaFast,
    EmaSlow,
    Macd,
    MacdSignal,
    BbUpper,
    BbMiddle,
    BbLower,
    Decision,
    Confidence,
    CreatedAt,
    UpdatedAt,
}

//! Migration: Create assets table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Assets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Assets::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Assets::Symbol)
                            .string_len(20)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Assets::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Assets::AssetType).string_len(20).not_null())
                    .col(ColumnDef::new(Assets::Exchange).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Assets::Currency)
                            .string_len(10)
                            .not_null()
                            .default("USD"),
                    )
                    .col(
                        ColumnDef::new(Assets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Assets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Assets::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Assets {
    Table,
    Id,
    Symbol,
    Name,
    AssetType,
    Exchange,
    Currency,
    CreatedAt,
    UpdatedAt,
}

//! Migration: Create portfolio_positions table.

use sea_orm_migration::prelude::*;

use super::m20240101_000002_create_assets_table::Assets;
use super::m20240101_000003_create_portfolios_table::Portfolios;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PortfolioPositions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PortfolioPositions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PortfolioPositions::PortfolioId).uuid().not_null())
                    .col(ColumnDef::new(PortfolioPositions::AssetId).uuid().not_null())
                    .col(ColumnDef::new(PortfolioPositions::Quantity).double().not_null())
                    .col(ColumnDef::new(PortfolioPositions::AvgCost).double().not_null())
                    .col(
                        ColumnDef::new(PortfolioPositions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PortfolioPositions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_positions_portfolio_id")
                            .from(PortfolioPositions::Table, PortfolioPositions::PortfolioId)
                            .to(Portfolios::Table, Portfolios::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_positions_asset_id")
                            .from(PortfolioPositions::Table, PortfolioPositions::AssetId)
                            .to(Assets::Table, Assets::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_positions_portfolio_asset")
                    .table(PortfolioPositions::Table)
                    .col(PortfolioPositions::PortfolioId)
                    .col(PortfolioPositions::AssetId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PortfolioPositions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PortfolioPositions {
    Table,
    Id,
    PortfolioId,
    AssetId,
    Quantity,
    AvgCost,
    CreatedAt,
    UpdatedAt,
}

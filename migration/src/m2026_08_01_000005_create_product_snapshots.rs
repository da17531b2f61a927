//! Migration to create the product_snapshots table.
//!
//! A snapshot holds the latest full upstream payload for a product, keyed by
//! product id. Re-applying the same detail replaces the payload in place.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProductSnapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductSnapshots::ProductId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProductSnapshots::Payload).json().not_null())
                    .col(
                        ColumnDef::new(ProductSnapshots::FetchedAt)
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
            .drop_table(Table::drop().table(ProductSnapshots::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ProductSnapshots {
    Table,
    ProductId,
    Payload,
    FetchedAt,
}

//! Migration to create the products table.
//!
//! One row per known product id, with denormalized fields filled in as details
//! are harvested. Rows are created with insert-ignore semantics so repeated
//! discovery of the same id is a no-op.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::ProductId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::Name).text().null())
                    .col(ColumnDef::new(Products::UnitPrice).double().null())
                    .col(ColumnDef::new(Products::Popularity).double().null())
                    .col(ColumnDef::new(Products::Upc).text().null())
                    .col(ColumnDef::new(Products::CanonicalUrl).text().null())
                    .col(
                        ColumnDef::new(Products::RemoteLastUpdateAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_products_remote_last_update_at")
                    .table(Products::Table)
                    .col(Products::RemoteLastUpdateAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Products {
    Table,
    ProductId,
    Name,
    UnitPrice,
    Popularity,
    Upc,
    CanonicalUrl,
    RemoteLastUpdateAt,
}

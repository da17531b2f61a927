//! Migration to create the departments table.
//!
//! Departments are upserted from the upstream catalog listing so a harvested
//! snapshot can be joined back to its place in the catalog tree.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Departments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Departments::DepartmentId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Departments::Name).text().null())
                    .col(ColumnDef::new(Departments::ParentId).big_integer().null())
                    .col(ColumnDef::new(Departments::ItemCount).big_integer().null())
                    .col(ColumnDef::new(Departments::Path).text().null())
                    .col(ColumnDef::new(Departments::CanonicalUrl).text().null())
                    .col(
                        ColumnDef::new(Departments::UpdatedAt)
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
            .drop_table(Table::drop().table(Departments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Departments {
    Table,
    DepartmentId,
    Name,
    ParentId,
    ItemCount,
    Path,
    CanonicalUrl,
    UpdatedAt,
}

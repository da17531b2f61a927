//! Migration to create the syncs table.
//!
//! A sync row tracks one end-to-end harvesting attempt: how many times it was
//! (re)started, its lifecycle status, and when it finished successfully.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Syncs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Syncs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Syncs::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Syncs::Status)
                            .string_len(16)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(Syncs::FinishedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Session lookup scans for the newest RUNNING row.
        manager
            .create_index(
                Index::create()
                    .name("idx_syncs_status")
                    .table(Syncs::Table)
                    .col(Syncs::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Syncs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Syncs {
    Table,
    Id,
    Attempts,
    Status,
    FinishedAt,
}

//! Migration to create the jobs table.
//!
//! A job row is one deduplicated unit of fetch work belonging to a sync. The
//! composite unique index on (sync_id, dedupe_key) is what makes repeated
//! batch inserts idempotent.

use sea_orm_migration::prelude::*;

use crate::m2026_08_01_000001_create_syncs::Syncs;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Jobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Jobs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Jobs::SyncId).integer().not_null())
                    .col(ColumnDef::new(Jobs::JobType).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Jobs::Status)
                            .string_len(16)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(Jobs::DedupeKey).string_len(40).not_null())
                    .col(
                        ColumnDef::new(Jobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Jobs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_jobs_sync_id")
                            .from(Jobs::Table, Jobs::SyncId)
                            .to(Syncs::Table, Syncs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_jobs_sync_dedupe")
                    .table(Jobs::Table)
                    .col(Jobs::SyncId)
                    .col(Jobs::DedupeKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Resume scans filter by (sync, type, status) and read back in id order.
        manager
            .create_index(
                Index::create()
                    .name("idx_jobs_sync_type_status")
                    .table(Jobs::Table)
                    .col(Jobs::SyncId)
                    .col(Jobs::JobType)
                    .col(Jobs::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Jobs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Jobs {
    Table,
    Id,
    SyncId,
    JobType,
    Status,
    DedupeKey,
    CreatedAt,
    UpdatedAt,
}

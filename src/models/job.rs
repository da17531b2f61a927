//! Job entity model
//!
//! A job is one deduplicated unit of fetch work scoped to a sync. The
//! `(sync_id, dedupe_key)` pair is unique, which is what lets the harvester
//! re-insert work batches idempotently when a run is resumed.

use sea_orm::entity::prelude::*;

use super::sync::Entity as Sync;

/// Job entity representing one unit of fetch work
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "jobs")]
pub struct Model {
    /// Unique identifier for the job (primary key)
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owning sync
    pub sync_id: i32,

    /// Kind of work this job tracks
    pub job_type: JobType,

    /// Current status of the job
    pub status: JobStatus,

    /// Deduplication key, unique within the owning sync (max 40 chars)
    pub dedupe_key: String,

    /// Timestamp when the job was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the job was last updated
    pub updated_at: DateTimeWithTimeZone,
}

/// Kind of fetch work a job tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum JobType {
    /// Singleton marker: the department list has been retrieved for this sync
    #[sea_orm(string_value = "FETCH_DEPARTMENTS")]
    FetchDepartments,
    /// One per department: list that department's products
    #[sea_orm(string_value = "FETCH_DEPARTMENT_PRODUCTS")]
    FetchDepartmentProducts,
    /// Reserved for per-item granularity
    #[sea_orm(string_value = "FETCH_PRODUCT")]
    FetchProduct,
}

/// Status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum JobStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "SUCCESS")]
    Success,
    #[sea_orm(string_value = "ERROR")]
    Error,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Sync",
        from = "Column::SyncId",
        to = "super::sync::Column::Id"
    )]
    Sync,
}

impl Related<Sync> for Entity {
    fn to() -> RelationDef {
        Relation::Sync.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

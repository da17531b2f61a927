//! Sync entity model
//!
//! A sync row represents one end-to-end harvesting attempt. Terminal states
//! are `Done` and `Dead`; `Retry` is re-enterable on the next invocation.

use sea_orm::entity::prelude::*;

/// Sync entity representing one harvesting attempt
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "syncs")]
pub struct Model {
    /// Unique identifier for the sync (primary key)
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Number of times this sync was (re)started
    pub attempts: i32,

    /// Current lifecycle status
    pub status: SyncStatus,

    /// Timestamp set only when the sync completes successfully
    pub finished_at: Option<DateTimeWithTimeZone>,
}

/// Lifecycle status of a sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum SyncStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "RUNNING")]
    Running,
    #[sea_orm(string_value = "DONE")]
    Done,
    #[sea_orm(string_value = "RETRY")]
    Retry,
    /// Operator-driven abandonment; never set by the harvester itself
    #[sea_orm(string_value = "DEAD")]
    Dead,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::job::Entity")]
    Job,
}

impl Related<super::job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Job.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

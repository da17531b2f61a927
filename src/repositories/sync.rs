//! Sync ledger repository
//!
//! Tracks harvesting attempt sessions. There should be at most one RUNNING
//! sync at a time, but the contract tolerates races by always picking the
//! highest-id running row.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::error::LedgerError;
use crate::models::sync::{self, Entity as Sync, SyncStatus};

/// Repository for sync session rows
#[derive(Debug, Clone)]
pub struct SyncRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl SyncRepository {
    /// Creates a new SyncRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Returns the most recent sync with status RUNNING, if any.
    pub async fn find_running(&self) -> Result<Option<sync::Model>, LedgerError> {
        Ok(Sync::find()
            .filter(sync::Column::Status.eq(SyncStatus::Running))
            .order_by_desc(sync::Column::Id)
            .one(&*self.db)
            .await?)
    }

    /// Inserts a fresh sync: zero attempts, PENDING, no finish time.
    pub async fn create(&self) -> Result<sync::Model, LedgerError> {
        let row = sync::ActiveModel {
            attempts: Set(0),
            status: Set(SyncStatus::Pending),
            finished_at: Set(None),
            ..Default::default()
        };
        Ok(row.insert(&*self.db).await?)
    }

    /// Full replace of the mutable fields (attempts, status, finished_at) by
    /// id. Fails if the row no longer exists.
    pub async fn save(&self, sync: sync::Model) -> Result<sync::Model, LedgerError> {
        let existing = Sync::find_by_id(sync.id)
            .one(&*self.db)
            .await?
            .ok_or(LedgerError::SyncNotFound { id: sync.id })?;

        let mut active: sync::ActiveModel = existing.into();
        active.attempts = Set(sync.attempts);
        active.status = Set(sync.status);
        active.finished_at = Set(sync.finished_at);
        Ok(active.update(&*self.db).await?)
    }
}

//! Job ledger repository
//!
//! Jobs are deduplicated units of fetch work scoped to a sync. Insertion is
//! idempotent on `(sync_id, dedupe_key)`: a batch can be re-sent on every
//! resume and only the rows that are genuinely new land, with existing rows'
//! status and timestamps left untouched.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};

use crate::error::{LedgerError, MAX_DEDUPE_KEY_LEN};
use crate::models::job::{self, Entity as Job, JobStatus, JobType};

/// A job to be inserted; ids and timestamps are assigned on insert.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub sync_id: i32,
    pub job_type: JobType,
    pub status: JobStatus,
    pub dedupe_key: String,
}

/// Repository for job rows
#[derive(Debug, Clone)]
pub struct JobRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl JobRepository {
    /// Creates a new JobRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Inserts every job whose `(sync_id, dedupe_key)` is not already
    /// present. The whole batch is validated before any row is written: an
    /// over-long dedupe key is a programmer error, not a runtime condition.
    pub async fn insert_if_not_exist(&self, jobs: Vec<NewJob>) -> Result<(), LedgerError> {
        for job in &jobs {
            if job.dedupe_key.chars().count() > MAX_DEDUPE_KEY_LEN {
                return Err(LedgerError::DedupeKeyTooLong {
                    key: job.dedupe_key.clone(),
                });
            }
        }
        if jobs.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let rows = jobs.into_iter().map(|new| job::ActiveModel {
            sync_id: Set(new.sync_id),
            job_type: Set(new.job_type),
            status: Set(new.status),
            dedupe_key: Set(new.dedupe_key),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        });

        Job::insert_many(rows)
            .on_conflict(
                OnConflict::columns([job::Column::SyncId, job::Column::DedupeKey])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;
        Ok(())
    }

    /// Returns the highest-id job matching the dedupe key, or none.
    pub async fn find_by_dedupe_key(
        &self,
        sync_id: i32,
        dedupe_key: &str,
    ) -> Result<Option<job::Model>, LedgerError> {
        Ok(Job::find()
            .filter(job::Column::SyncId.eq(sync_id))
            .filter(job::Column::DedupeKey.eq(dedupe_key))
            .order_by_desc(job::Column::Id)
            .one(&*self.db)
            .await?)
    }

    /// Jobs of the given type and status within a sync, id ascending.
    pub async fn find_by_type(
        &self,
        sync_id: i32,
        job_type: JobType,
        status: JobStatus,
    ) -> Result<Vec<job::Model>, LedgerError> {
        Ok(Job::find()
            .filter(job::Column::SyncId.eq(sync_id))
            .filter(job::Column::JobType.eq(job_type))
            .filter(job::Column::Status.eq(status))
            .order_by_asc(job::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// Moves one job to the given status.
    pub async fn update_status(&self, id: i32, status: JobStatus) -> Result<job::Model, LedgerError> {
        let existing = Job::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or(LedgerError::JobNotFound { id })?;

        let mut active: job::ActiveModel = existing.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now().into());
        Ok(active.update(&*self.db).await?)
    }

    /// Moves a batch of jobs to the given status, all-or-nothing: if any id
    /// is missing, nothing in the batch is applied.
    pub async fn update_status_bulk(
        &self,
        ids: &[i32],
        status: JobStatus,
    ) -> Result<(), LedgerError> {
        if ids.is_empty() {
            return Ok(());
        }
        let unique: Vec<i32> = {
            let mut seen = HashSet::new();
            ids.iter().copied().filter(|id| seen.insert(*id)).collect()
        };

        let txn = self.db.begin().await?;

        let found: Vec<i32> = Job::find()
            .select_only()
            .column(job::Column::Id)
            .filter(job::Column::Id.is_in(unique.clone()))
            .into_tuple::<i32>()
            .all(&txn)
            .await?;
        if found.len() != unique.len() {
            let found_set: HashSet<i32> = found.into_iter().collect();
            let missing = unique
                .into_iter()
                .filter(|id| !found_set.contains(id))
                .collect();
            // Dropping the transaction rolls back; nothing was applied.
            return Err(LedgerError::JobsMissing { missing });
        }

        Job::update_many()
            .col_expr(job::Column::Status, Expr::value(status))
            .col_expr(job::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(job::Column::Id.is_in(unique))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }
}

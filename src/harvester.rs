//! Harvest orchestration.
//!
//! Owns the sync session protocol, department resolution through the job
//! ledger, and the two-stage bounded-concurrency fetch pipeline. A run is
//! complete only after every department's every page has been listed and
//! every resulting item summary has been attempted; the sync is finalized
//! only once that join succeeds.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::{StreamExt, TryStreamExt};
use sea_orm::DatabaseConnection;
use tokio::sync::{Semaphore, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, instrument, warn};

use crate::config::{AppConfig, ResumeScan};
use crate::error::{HarvestError, LedgerError};
use crate::models::job::{JobStatus, JobType};
use crate::models::sync::{self, SyncStatus};
use crate::report::{Counters, FetchReport};
use crate::repositories::{
    DepartmentRepository, JobRepository, NewJob, SnapshotRepository, SyncRepository,
};
use crate::source::{GrocerySource, ItemSummary};

/// Dedupe key marking that the department list was retrieved for a sync.
pub const ALL_DEPARTMENTS_KEY: &str = "all_departments";

/// Dedupe key prefix for per-department product jobs.
pub const DEPT_KEY_PREFIX: &str = "dept:";

/// Capacity of the buffer between department listing and detail fetching.
/// This is the backpressure boundary: a slow detail stage suspends listing
/// once it fills, instead of queueing unboundedly.
const INTER_STAGE_BUFFER: usize = 200;

/// Per-run options, defaulted from configuration.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub dept_concurrency: usize,
    pub detail_concurrency: usize,
    pub resume: bool,
    /// Reserved incremental-filter date; logged but not consumed by the
    /// pipeline itself.
    pub since: Option<chrono::NaiveDate>,
    pub dry_run: bool,
    pub resume_scan: ResumeScan,
}

impl FetchOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            dept_concurrency: config.fetch.dept_concurrency,
            detail_concurrency: config.fetch.detail_concurrency,
            resume: config.fetch.resume,
            since: config.fetch.since,
            dry_run: config.fetch.dry_run,
            resume_scan: config.fetch.resume_scan,
        }
    }

    fn validate(&self) -> Result<(), HarvestError> {
        if self.dept_concurrency == 0 {
            return Err(HarvestError::InvalidOptions {
                reason: "dept_concurrency must be > 0".to_string(),
            });
        }
        if self.detail_concurrency == 0 {
            return Err(HarvestError::InvalidOptions {
                reason: "detail_concurrency must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Orchestrates one harvesting run end to end.
pub struct Harvester {
    source: Arc<dyn GrocerySource>,
    syncs: SyncRepository,
    jobs: JobRepository,
    snapshots: SnapshotRepository,
    departments: DepartmentRepository,
    store_id: i64,
}

impl Harvester {
    pub fn new(db: Arc<DatabaseConnection>, source: Arc<dyn GrocerySource>, store_id: i64) -> Self {
        Self {
            source,
            syncs: SyncRepository::new(Arc::clone(&db)),
            jobs: JobRepository::new(Arc::clone(&db)),
            snapshots: SnapshotRepository::new(Arc::clone(&db)),
            departments: DepartmentRepository::new(db),
            store_id,
        }
    }

    /// Runs a full harvest and returns the report.
    ///
    /// On any fatal error the sync is left in RETRY so the next invocation
    /// resumes it instead of restarting, and the original error propagates to
    /// the caller.
    #[instrument(skip(self, options), fields(store_id = self.store_id))]
    pub async fn run(&self, options: &FetchOptions) -> Result<FetchReport, HarvestError> {
        options.validate()?;
        let started = Instant::now();
        info!(
            resume = options.resume,
            since = ?options.since,
            dry_run = options.dry_run,
            "starting fetch"
        );

        let counters = Counters::default();
        let sync = self.prepare_session().await?;
        info!(sync_id = sync.id, attempts = sync.attempts, "sync session ready");

        match self.execute(sync.id, options, &counters).await {
            Ok(()) => {
                self.syncs
                    .save(sync::Model {
                        status: SyncStatus::Done,
                        finished_at: Some(Utc::now().into()),
                        ..sync
                    })
                    .await?;
                let report = counters.report(started.elapsed());
                info!(
                    departments = report.departments,
                    items = report.items,
                    details = report.details,
                    failed = report.failed,
                    duration_ms = report.duration_ms,
                    "fetch complete"
                );
                Ok(report)
            }
            Err(err) => {
                let partial = counters.report(started.elapsed());
                warn!(
                    departments = partial.departments,
                    items = partial.items,
                    details = partial.details,
                    failed = partial.failed,
                    error = %err,
                    "fetch failed, marking sync for retry"
                );
                if let Err(save_err) = self
                    .syncs
                    .save(sync::Model {
                        status: SyncStatus::Retry,
                        finished_at: None,
                        ..sync
                    })
                    .await
                {
                    warn!(error = %save_err, "failed to move sync to retry");
                }
                Err(err)
            }
        }
    }

    /// Opens the session: reuse the running sync if one exists, otherwise
    /// create a fresh one; then bump attempts and mark it RUNNING. This is
    /// the only place attempts is incremented.
    async fn prepare_session(&self) -> Result<sync::Model, HarvestError> {
        let sync = match self.syncs.find_running().await? {
            Some(existing) => existing,
            None => self.syncs.create().await?,
        };
        Ok(self
            .syncs
            .save(sync::Model {
                attempts: sync.attempts + 1,
                status: SyncStatus::Running,
                finished_at: None,
                ..sync
            })
            .await?)
    }

    async fn execute(
        &self,
        sync_id: i32,
        options: &FetchOptions,
        counters: &Counters,
    ) -> Result<(), HarvestError> {
        let dept_ids = self
            .ensure_department_jobs(sync_id, options.resume_scan)
            .await?;
        info!(departments = dept_ids.len(), "department set resolved");
        self.run_pipeline(sync_id, dept_ids, options, counters)
            .await
    }

    /// Resolves the department-id set for this sync.
    ///
    /// If the marker job exists the list is rebuilt from the ledger and the
    /// source is not called, so department listing happens at most once per
    /// sync. Otherwise the source is listed, the marker plus one job per
    /// department are inserted idempotently, and the ids are returned in the
    /// order the source produced them.
    async fn ensure_department_jobs(
        &self,
        sync_id: i32,
        scan: ResumeScan,
    ) -> Result<Vec<i64>, HarvestError> {
        if self
            .jobs
            .find_by_dedupe_key(sync_id, ALL_DEPARTMENTS_KEY)
            .await?
            .is_some()
        {
            let statuses: &[JobStatus] = match scan {
                ResumeScan::Active => &[JobStatus::Pending, JobStatus::InProgress],
                ResumeScan::All => &[
                    JobStatus::Pending,
                    JobStatus::InProgress,
                    JobStatus::Success,
                    JobStatus::Error,
                ],
            };
            let mut ids = Vec::new();
            for status in statuses {
                let jobs = self
                    .jobs
                    .find_by_type(sync_id, JobType::FetchDepartmentProducts, *status)
                    .await?;
                for job in jobs {
                    let Some(raw) = job.dedupe_key.strip_prefix(DEPT_KEY_PREFIX) else {
                        continue;
                    };
                    match raw.parse::<i64>() {
                        Ok(id) => ids.push(id),
                        Err(_) => {
                            debug!(key = %job.dedupe_key, "ignoring job with unparsable dedupe key")
                        }
                    }
                }
            }
            ids.sort_unstable();
            ids.dedup();
            debug!(departments = ids.len(), "department set rebuilt from ledger");
            return Ok(ids);
        }

        let listed = self.source.list_departments(self.store_id).await?;
        self.departments.upsert_departments(&listed).await?;

        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(listed.len());
        for dept in &listed {
            let id = dept
                .id
                .parse::<i64>()
                .map_err(|_| HarvestError::MalformedDepartmentId {
                    raw: dept.id.clone(),
                })?;
            if seen.insert(id) {
                ids.push(id);
            }
        }

        let mut batch = Vec::with_capacity(ids.len() + 1);
        batch.push(NewJob {
            sync_id,
            job_type: JobType::FetchDepartments,
            status: JobStatus::Pending,
            dedupe_key: ALL_DEPARTMENTS_KEY.to_string(),
        });
        for id in &ids {
            batch.push(NewJob {
                sync_id,
                job_type: JobType::FetchDepartmentProducts,
                status: JobStatus::Pending,
                dedupe_key: format!("{DEPT_KEY_PREFIX}{id}"),
            });
        }
        self.jobs.insert_if_not_exist(batch).await?;
        Ok(ids)
    }

    /// Stage A lists departments into a bounded buffer; stage B drains it
    /// into detail fetches. Completion is a join over both stages.
    async fn run_pipeline(
        &self,
        sync_id: i32,
        dept_ids: Vec<i64>,
        options: &FetchOptions,
        counters: &Counters,
    ) -> Result<(), HarvestError> {
        let (tx, rx) = mpsc::channel::<ItemSummary>(INTER_STAGE_BUFFER);
        let gate = Arc::new(Semaphore::new(options.detail_concurrency));

        let producer = {
            let tx = tx;
            async move {
                futures::stream::iter(dept_ids)
                    .map(|dept_id| self.list_department(sync_id, dept_id, tx.clone(), counters))
                    .buffer_unordered(options.dept_concurrency)
                    .try_for_each(|()| std::future::ready(Ok(())))
                    .await
            }
        };

        let consumer = {
            let gate = Arc::clone(&gate);
            async move {
                ReceiverStream::new(rx)
                    .for_each_concurrent(options.detail_concurrency, |item| {
                        let gate = Arc::clone(&gate);
                        async move {
                            match self.fetch_detail(&item, options.dry_run, gate).await {
                                Ok(()) => counters.detail_succeeded(),
                                Err(err) => {
                                    // One bad item never aborts the run.
                                    counters.detail_failed();
                                    warn!(item_id = %item.id, error = %err, "item detail failed");
                                }
                            }
                        }
                    })
                    .await;
                Ok::<(), HarvestError>(())
            }
        };

        tokio::try_join!(producer, consumer)?;
        Ok(())
    }

    /// Stage A body for one department: mark its job in progress, stream
    /// every summary from every page into the buffer, then mark it done.
    /// Failures here are fatal to the run.
    async fn list_department(
        &self,
        sync_id: i32,
        dept_id: i64,
        tx: mpsc::Sender<ItemSummary>,
        counters: &Counters,
    ) -> Result<(), HarvestError> {
        counters.department_visited();

        let key = format!("{DEPT_KEY_PREFIX}{dept_id}");
        let job = self
            .jobs
            .find_by_dedupe_key(sync_id, &key)
            .await?
            .ok_or_else(|| LedgerError::JobKeyNotFound { sync_id, key })?;
        self.jobs.update_status(job.id, JobStatus::InProgress).await?;

        let items = self.source.list_items_in_department(dept_id).await?;
        debug!(dept_id, items = items.len(), "department listed");
        for item in items {
            counters.item_seen();
            if tx.send(item).await.is_err() {
                // Consumer is gone; the join will surface whatever killed it.
                break;
            }
        }

        self.jobs.update_status(job.id, JobStatus::Success).await?;
        Ok(())
    }

    /// Stage B body for one item. The admission gate is acquired before the
    /// fetch so the in-flight bound holds even if the stage's own concurrency
    /// limit is misconfigured.
    async fn fetch_detail(
        &self,
        item: &ItemSummary,
        dry_run: bool,
        gate: Arc<Semaphore>,
    ) -> Result<(), HarvestError> {
        let _permit = gate
            .acquire_owned()
            .await
            .map_err(|_| HarvestError::GateClosed)?;

        let item_id: i64 = item
            .id
            .parse()
            .map_err(|_| HarvestError::MalformedItemId {
                raw: item.id.clone(),
            })?;
        let detail = self.source.fetch_item_detail(item_id).await?;

        if !dry_run {
            self.snapshots.upsert_item_snapshot(&detail).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> FetchOptions {
        FetchOptions {
            dept_concurrency: 2,
            detail_concurrency: 4,
            resume: false,
            since: None,
            dry_run: false,
            resume_scan: ResumeScan::Active,
        }
    }

    #[test]
    fn options_reject_zero_dept_concurrency() {
        let opts = FetchOptions {
            dept_concurrency: 0,
            ..options()
        };
        assert!(matches!(
            opts.validate(),
            Err(HarvestError::InvalidOptions { .. })
        ));
    }

    #[test]
    fn options_reject_zero_detail_concurrency() {
        let opts = FetchOptions {
            detail_concurrency: 0,
            ..options()
        };
        assert!(matches!(
            opts.validate(),
            Err(HarvestError::InvalidOptions { .. })
        ));
    }
}

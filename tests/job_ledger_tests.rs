//! Job ledger behavior: idempotent insertion, dedupe key validation, lookup
//! ordering, and all-or-nothing bulk status updates.

use std::sync::Arc;

use larder::error::LedgerError;
use larder::models::job::{JobStatus, JobType};
use larder::repositories::{JobRepository, NewJob, SyncRepository};

mod test_utils;
use test_utils::setup_test_db;

fn dept_job(sync_id: i32, key: &str) -> NewJob {
    NewJob {
        sync_id,
        job_type: JobType::FetchDepartmentProducts,
        status: JobStatus::Pending,
        dedupe_key: key.to_string(),
    }
}

async fn repos() -> (SyncRepository, JobRepository, i32) {
    let db = Arc::new(setup_test_db().await);
    let syncs = SyncRepository::new(Arc::clone(&db));
    let jobs = JobRepository::new(db);
    let sync = syncs.create().await.expect("create sync");
    (syncs, jobs, sync.id)
}

#[tokio::test]
async fn insert_same_dedupe_key_twice_keeps_original_row() {
    let (_syncs, jobs, sync_id) = repos().await;

    jobs.insert_if_not_exist(vec![dept_job(sync_id, "dept:42")])
        .await
        .unwrap();
    let original = jobs
        .find_by_dedupe_key(sync_id, "dept:42")
        .await
        .unwrap()
        .expect("job inserted");

    // Re-insert with different field values; the existing row must win.
    jobs.insert_if_not_exist(vec![NewJob {
        sync_id,
        job_type: JobType::FetchDepartmentProducts,
        status: JobStatus::Error,
        dedupe_key: "dept:42".to_string(),
    }])
    .await
    .unwrap();

    let after = jobs
        .find_by_dedupe_key(sync_id, "dept:42")
        .await
        .unwrap()
        .expect("job still present");
    assert_eq!(after.id, original.id);
    assert_eq!(after.status, JobStatus::Pending);
    assert_eq!(after.created_at, original.created_at);
    assert_eq!(after.updated_at, original.updated_at);

    let all = jobs
        .find_by_type(sync_id, JobType::FetchDepartmentProducts, JobStatus::Pending)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn over_long_dedupe_key_rejects_whole_batch() {
    let (_syncs, jobs, sync_id) = repos().await;

    let long_key = "k".repeat(41);
    let result = jobs
        .insert_if_not_exist(vec![dept_job(sync_id, "dept:1"), dept_job(sync_id, &long_key)])
        .await;
    assert!(matches!(
        result,
        Err(LedgerError::DedupeKeyTooLong { .. })
    ));

    // Validation happens before any row is written.
    let rows = jobs
        .find_by_type(sync_id, JobType::FetchDepartmentProducts, JobStatus::Pending)
        .await
        .unwrap();
    assert!(rows.is_empty());

    // A key of exactly 40 characters is fine.
    let max_key = "k".repeat(40);
    jobs.insert_if_not_exist(vec![dept_job(sync_id, &max_key)])
        .await
        .unwrap();
}

#[tokio::test]
async fn find_by_type_returns_jobs_in_id_order() {
    let (_syncs, jobs, sync_id) = repos().await;

    jobs.insert_if_not_exist(vec![
        dept_job(sync_id, "dept:9"),
        dept_job(sync_id, "dept:3"),
        dept_job(sync_id, "dept:5"),
    ])
    .await
    .unwrap();

    let rows = jobs
        .find_by_type(sync_id, JobType::FetchDepartmentProducts, JobStatus::Pending)
        .await
        .unwrap();
    let ids: Vec<i32> = rows.iter().map(|j| j.id).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);
    assert_eq!(
        rows.iter().map(|j| j.dedupe_key.as_str()).collect::<Vec<_>>(),
        vec!["dept:9", "dept:3", "dept:5"]
    );
}

#[tokio::test]
async fn dedupe_keys_are_scoped_per_sync() {
    let (syncs, jobs, first_sync) = repos().await;
    let second_sync = syncs.create().await.unwrap().id;

    jobs.insert_if_not_exist(vec![dept_job(first_sync, "dept:7")])
        .await
        .unwrap();
    jobs.insert_if_not_exist(vec![dept_job(second_sync, "dept:7")])
        .await
        .unwrap();

    assert!(jobs
        .find_by_dedupe_key(first_sync, "dept:7")
        .await
        .unwrap()
        .is_some());
    assert!(jobs
        .find_by_dedupe_key(second_sync, "dept:7")
        .await
        .unwrap()
        .is_some());
    assert!(jobs
        .find_by_dedupe_key(second_sync, "dept:8")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn update_status_moves_one_job() {
    let (_syncs, jobs, sync_id) = repos().await;

    jobs.insert_if_not_exist(vec![dept_job(sync_id, "dept:1")])
        .await
        .unwrap();
    let job = jobs
        .find_by_dedupe_key(sync_id, "dept:1")
        .await
        .unwrap()
        .unwrap();

    let updated = jobs
        .update_status(job.id, JobStatus::InProgress)
        .await
        .unwrap();
    assert_eq!(updated.status, JobStatus::InProgress);
    assert!(updated.updated_at >= job.updated_at);
}

#[tokio::test]
async fn update_status_of_missing_job_is_not_found() {
    let (_syncs, jobs, _sync_id) = repos().await;

    let result = jobs.update_status(9999, JobStatus::Success).await;
    assert!(matches!(
        result,
        Err(LedgerError::JobNotFound { id: 9999 })
    ));
}

#[tokio::test]
async fn bulk_update_is_all_or_nothing() {
    let (_syncs, jobs, sync_id) = repos().await;

    jobs.insert_if_not_exist(vec![dept_job(sync_id, "dept:1"), dept_job(sync_id, "dept:2")])
        .await
        .unwrap();
    let rows = jobs
        .find_by_type(sync_id, JobType::FetchDepartmentProducts, JobStatus::Pending)
        .await
        .unwrap();
    let mut ids: Vec<i32> = rows.iter().map(|j| j.id).collect();
    ids.push(424242);

    let result = jobs.update_status_bulk(&ids, JobStatus::Success).await;
    assert!(matches!(
        result,
        Err(LedgerError::JobsMissing { ref missing }) if missing == &vec![424242]
    ));

    // No status in the batch was applied.
    let still_pending = jobs
        .find_by_type(sync_id, JobType::FetchDepartmentProducts, JobStatus::Pending)
        .await
        .unwrap();
    assert_eq!(still_pending.len(), 2);
}

#[tokio::test]
async fn bulk_update_applies_when_all_ids_exist() {
    let (_syncs, jobs, sync_id) = repos().await;

    jobs.insert_if_not_exist(vec![dept_job(sync_id, "dept:1"), dept_job(sync_id, "dept:2")])
        .await
        .unwrap();
    let ids: Vec<i32> = jobs
        .find_by_type(sync_id, JobType::FetchDepartmentProducts, JobStatus::Pending)
        .await
        .unwrap()
        .iter()
        .map(|j| j.id)
        .collect();

    jobs.update_status_bulk(&ids, JobStatus::Success)
        .await
        .unwrap();

    let done = jobs
        .find_by_type(sync_id, JobType::FetchDepartmentProducts, JobStatus::Success)
        .await
        .unwrap();
    assert_eq!(done.len(), 2);
}

//! # Error Handling
//!
//! Typed errors for the harvester core. Ledger conflicts and validation
//! failures get their own variants because they are always fatal to the
//! enclosing operation. Per-item fetch failures never travel through these
//! types as fatal errors: they are caught at item scope and converted into
//! counters.

use thiserror::Error;

use crate::source::SourceError;

/// Maximum length of a job dedupe key.
pub const MAX_DEDUPE_KEY_LEN: usize = 40;

/// Errors raised by the sync/job ledgers.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("sync {id} not found")]
    SyncNotFound { id: i32 },

    #[error("job {id} not found")]
    JobNotFound { id: i32 },

    #[error("no job found for dedupe key '{key}' in sync {sync_id}")]
    JobKeyNotFound { sync_id: i32, key: String },

    #[error("jobs not found during bulk update: {missing:?}")]
    JobsMissing { missing: Vec<i32> },

    #[error("dedupe key '{key}' exceeds {MAX_DEDUPE_KEY_LEN} characters")]
    DedupeKeyTooLong { key: String },

    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}

/// Errors that abort a harvesting run.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("invalid fetch options: {reason}")]
    InvalidOptions { reason: String },

    #[error("department id '{raw}' is not numeric")]
    MalformedDepartmentId { raw: String },

    #[error("item id '{raw}' is not numeric")]
    MalformedItemId { raw: String },

    #[error("detail admission gate closed")]
    GateClosed,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

//! # Larder
//!
//! Resumable harvester for a rate-limited grocery catalog API. Walks the
//! catalog hierarchy (departments → items → item details) through a
//! bounded-concurrency pipeline, tracks progress in a sync/job ledger so a
//! re-run resumes instead of restarting, and persists results through
//! idempotent upserts.

pub mod config;
pub mod db;
pub mod error;
pub mod harvester;
pub mod logging;
pub mod models;
pub mod report;
pub mod repositories;
pub mod retry;
pub mod source;
pub use migration;

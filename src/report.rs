//! Fetch report and run counters.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Terminal output of one harvesting run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchReport {
    /// Departments visited by the listing stage
    pub departments: u32,
    /// Item summaries seen across all departments
    pub items: u32,
    /// Item details fetched successfully
    pub details: u32,
    /// Item details that failed to fetch or persist
    pub failed: u32,
    /// Wall-clock duration of the run
    pub duration_ms: u64,
}

/// Progress counters mutated from many concurrent pipeline tasks.
#[derive(Debug, Default)]
pub struct Counters {
    departments: AtomicU32,
    items: AtomicU32,
    details: AtomicU32,
    failed: AtomicU32,
}

impl Counters {
    pub fn department_visited(&self) {
        self.departments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn item_seen(&self) {
        self.items.fetch_add(1, Ordering::Relaxed);
    }

    pub fn detail_succeeded(&self) {
        self.details.fetch_add(1, Ordering::Relaxed);
    }

    pub fn detail_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of progress so far. Also used to report partial progress
    /// when a run dies mid-flight.
    pub fn report(&self, elapsed: Duration) -> FetchReport {
        FetchReport {
            departments: self.departments.load(Ordering::Relaxed),
            items: self.items.load(Ordering::Relaxed),
            details: self.details.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            duration_ms: elapsed.as_millis() as u64,
        }
    }
}

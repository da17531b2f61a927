//! Serializing pacing decorator for the grocery source.
//!
//! The strict pacing mode trades throughput for a hard ceiling on request
//! rate: at most one outbound call is in flight at any instant, with a
//! minimum fixed spacing between the start of one call and the start of the
//! next, regardless of which pipeline stage issues it. The lock must stay
//! held across the inner call; that is what serializes the requests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{Instant, sleep};

use super::{Department, GrocerySource, ItemDetail, ItemSummary, SourceError};

/// Wraps a source so all its calls are serialized and spaced apart.
pub struct PacedSource {
    inner: Arc<dyn GrocerySource>,
    min_spacing: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl PacedSource {
    pub fn new(inner: Arc<dyn GrocerySource>, min_spacing: Duration) -> Self {
        Self {
            inner,
            min_spacing,
            last_start: Mutex::new(None),
        }
    }

    /// Waits until the spacing window has elapsed, stamps the new call start,
    /// and returns the guard the caller must hold for the duration of the
    /// call.
    async fn reserve_slot(&self) -> MutexGuard<'_, Option<Instant>> {
        let mut slot = self.last_start.lock().await;
        if let Some(last) = *slot {
            let elapsed = last.elapsed();
            if elapsed < self.min_spacing {
                sleep(self.min_spacing - elapsed).await;
            }
        }
        *slot = Some(Instant::now());
        slot
    }
}

#[async_trait]
impl GrocerySource for PacedSource {
    async fn list_departments(&self, store_id: i64) -> Result<Vec<Department>, SourceError> {
        let _slot = self.reserve_slot().await;
        self.inner.list_departments(store_id).await
    }

    async fn list_items_in_department(
        &self,
        department_id: i64,
    ) -> Result<Vec<ItemSummary>, SourceError> {
        let _slot = self.reserve_slot().await;
        self.inner.list_items_in_department(department_id).await
    }

    async fn fetch_item_detail(&self, item_id: i64) -> Result<ItemDetail, SourceError> {
        let _slot = self.reserve_slot().await;
        self.inner.fetch_item_detail(item_id).await
    }
}

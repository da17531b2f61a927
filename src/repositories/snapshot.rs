//! Product snapshot repository

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, Set};

use crate::models::product_snapshot::{self, Entity as ProductSnapshot};
use crate::source::ItemDetail;

/// Repository for full-payload product snapshots
#[derive(Debug, Clone)]
pub struct SnapshotRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl SnapshotRepository {
    /// Creates a new SnapshotRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Idempotent upsert keyed by product id: re-applying the same detail
    /// replaces the payload rather than creating a duplicate row.
    pub async fn upsert_item_snapshot(&self, detail: &ItemDetail) -> Result<()> {
        let product_id: i64 = detail
            .id
            .parse()
            .with_context(|| format!("non-numeric product id '{}'", detail.id))?;
        let payload =
            serde_json::to_value(detail).context("failed to serialize item detail payload")?;

        let row = product_snapshot::ActiveModel {
            product_id: Set(product_id),
            payload: Set(payload),
            fetched_at: Set(Utc::now().into()),
        };

        ProductSnapshot::insert(row)
            .on_conflict(
                OnConflict::column(product_snapshot::Column::ProductId)
                    .update_columns([
                        product_snapshot::Column::Payload,
                        product_snapshot::Column::FetchedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;
        Ok(())
    }

    /// Fetches the stored snapshot for a product, if any.
    pub async fn find_by_id(&self, product_id: i64) -> Result<Option<product_snapshot::Model>> {
        Ok(ProductSnapshot::find_by_id(product_id)
            .one(&*self.db)
            .await?)
    }

    /// Number of stored snapshots.
    pub async fn count(&self) -> Result<u64> {
        Ok(ProductSnapshot::find().count(&*self.db).await?)
    }
}

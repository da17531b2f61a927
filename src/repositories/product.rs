//! Product repository
//!
//! Maintains the one-row-per-product table alongside the raw snapshots.
//! Discovery inserts are insert-ignore so re-seeing an id never disturbs an
//! existing row; enrichment updates are full replaces by id.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::models::product::{self, Entity as Product};

/// Repository for denormalized product rows
#[derive(Debug, Clone)]
pub struct ProductRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl ProductRepository {
    /// Creates a new ProductRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates empty rows for any ids not present yet. Duplicate and already
    /// known ids are ignored.
    pub async fn create_if_not_exist(&self, product_ids: &[i64]) -> Result<()> {
        let unique: Vec<i64> = {
            let mut seen = HashSet::new();
            product_ids
                .iter()
                .copied()
                .filter(|id| seen.insert(*id))
                .collect()
        };
        if unique.is_empty() {
            return Ok(());
        }

        let rows = unique.into_iter().map(|id| product::ActiveModel {
            product_id: Set(id),
            name: Set(None),
            unit_price: Set(None),
            popularity: Set(None),
            upc: Set(None),
            canonical_url: Set(None),
            remote_last_update_at: Set(None),
        });

        Product::insert_many(rows)
            .on_conflict(
                OnConflict::column(product::Column::ProductId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;
        Ok(())
    }

    /// Fetches a product row by id.
    pub async fn find_by_id(&self, product_id: i64) -> Result<Option<product::Model>> {
        Ok(Product::find_by_id(product_id).one(&*self.db).await?)
    }

    /// Full replace of a product row by id. Fails if the row does not exist
    /// or the payload's id disagrees with the argument.
    pub async fn update(&self, product_id: i64, row: product::Model) -> Result<product::Model> {
        if row.product_id != product_id {
            bail!(
                "product id mismatch: arg={} payload={}",
                product_id,
                row.product_id
            );
        }
        let existing = Product::find_by_id(product_id).one(&*self.db).await?;
        if existing.is_none() {
            bail!("product not found: {}", product_id);
        }

        let mut active: product::ActiveModel = row.into();
        active = active.reset_all();
        active.product_id = sea_orm::Unchanged(product_id);
        Ok(active.update(&*self.db).await?)
    }

    /// Products whose upstream update time is at or after `since`, newest
    /// first, then highest id first.
    pub async fn find_products_since(
        &self,
        since: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<product::Model>> {
        if limit == 0 {
            bail!("limit must be > 0");
        }
        Ok(Product::find()
            .filter(product::Column::RemoteLastUpdateAt.gte(since))
            .order_by_desc(product::Column::RemoteLastUpdateAt)
            .order_by_desc(product::Column::ProductId)
            .limit(limit)
            .all(&*self.db)
            .await?)
    }

    /// Products that still have no name, lowest id first.
    pub async fn find_products_name_empty(&self, limit: u64) -> Result<Vec<product::Model>> {
        if limit == 0 {
            bail!("limit must be > 0");
        }
        Ok(Product::find()
            .filter(
                Condition::any()
                    .add(product::Column::Name.is_null())
                    .add(product::Column::Name.eq("")),
            )
            .order_by_asc(product::Column::ProductId)
            .limit(limit)
            .all(&*self.db)
            .await?)
    }
}

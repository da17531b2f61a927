//! Department repository

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use tracing::warn;

use crate::models::department::{self, Entity as Department};
use crate::source;

/// Repository for catalog department rows
#[derive(Debug, Clone)]
pub struct DepartmentRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl DepartmentRepository {
    /// Creates a new DepartmentRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Upserts the department rows from an upstream listing, keyed by
    /// department id. Entries with a non-numeric id are skipped with a
    /// warning. Returns the number of rows written.
    pub async fn upsert_departments(&self, departments: &[source::Department]) -> Result<usize> {
        let now = Utc::now();
        let mut rows = Vec::with_capacity(departments.len());
        for dept in departments {
            let Ok(department_id) = dept.id.parse::<i64>() else {
                warn!(id = %dept.id, "skipping department with non-numeric id");
                continue;
            };
            let parent_id = dept.parent_id.as_deref().and_then(|p| p.parse().ok());
            rows.push(department::ActiveModel {
                department_id: Set(department_id),
                name: Set(dept.name.clone()),
                parent_id: Set(parent_id),
                item_count: Set(dept.count),
                path: Set(dept.path.clone()),
                canonical_url: Set(dept.canonical_url.clone()),
                updated_at: Set(now.into()),
            });
        }
        if rows.is_empty() {
            return Ok(0);
        }

        let written = rows.len();
        Department::insert_many(rows)
            .on_conflict(
                OnConflict::column(department::Column::DepartmentId)
                    .update_columns([
                        department::Column::Name,
                        department::Column::ParentId,
                        department::Column::ItemCount,
                        department::Column::Path,
                        department::Column::CanonicalUrl,
                        department::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;
        Ok(written)
    }

    /// Fetches a department row by id.
    pub async fn find_by_id(&self, department_id: i64) -> Result<Option<department::Model>> {
        Ok(Department::find_by_id(department_id).one(&*self.db).await?)
    }

    /// Number of stored departments.
    pub async fn count(&self) -> Result<u64> {
        Ok(Department::find().count(&*self.db).await?)
    }
}

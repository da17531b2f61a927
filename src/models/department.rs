//! Department entity model

use sea_orm::entity::prelude::*;

/// Department row upserted from the upstream catalog listing
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "departments")]
pub struct Model {
    /// Upstream department id (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub department_id: i64,

    pub name: Option<String>,

    pub parent_id: Option<i64>,

    /// Item count reported by the upstream listing
    pub item_count: Option<i64>,

    pub path: Option<String>,

    pub canonical_url: Option<String>,

    /// Timestamp of the last upsert
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

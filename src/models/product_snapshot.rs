//! Product snapshot entity model
//!
//! Latest full upstream payload per product. Upserts replace the payload in
//! place, so re-applying the same detail never creates a duplicate row.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "product_snapshots")]
pub struct Model {
    /// Upstream product id (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub product_id: i64,

    /// Full detail payload as returned by the upstream
    pub payload: JsonValue,

    /// When this payload was fetched
    pub fetched_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

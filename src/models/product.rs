//! Product entity model
//!
//! One row per known product id. Rows are created as soon as an id is seen
//! and denormalized fields are filled in as details get harvested.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Upstream product id (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub product_id: i64,

    pub name: Option<String>,

    pub unit_price: Option<f64>,

    pub popularity: Option<f64>,

    pub upc: Option<String>,

    pub canonical_url: Option<String>,

    /// Last update timestamp reported by the upstream, if any
    pub remote_last_update_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

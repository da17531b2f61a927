//! Database migrations for the larder harvester.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_08_01_000001_create_syncs;
mod m2026_08_01_000002_create_jobs;
mod m2026_08_01_000003_create_departments;
mod m2026_08_01_000004_create_products;
mod m2026_08_01_000005_create_product_snapshots;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_08_01_000001_create_syncs::Migration),
            Box::new(m2026_08_01_000002_create_jobs::Migration),
            Box::new(m2026_08_01_000003_create_departments::Migration),
            Box::new(m2026_08_01_000004_create_products::Migration),
            Box::new(m2026_08_01_000005_create_product_snapshots::Migration),
        ]
    }
}

//! # Data Models
//!
//! SeaORM entity models for the harvester's durable state: syncs, jobs,
//! departments, products, and product snapshots.

pub mod department;
pub mod job;
pub mod product;
pub mod product_snapshot;
pub mod sync;

pub use department::Entity as Department;
pub use job::Entity as Job;
pub use product::Entity as Product;
pub use product_snapshot::Entity as ProductSnapshot;
pub use sync::Entity as Sync;

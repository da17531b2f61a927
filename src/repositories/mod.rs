//! Repositories over the harvester's durable state.
//!
//! Each repository wraps the shared SeaORM connection pool. The sync and job
//! repositories form the resumability ledger and return typed ledger errors;
//! the rest are plain storage adapters.

pub mod department;
pub mod job;
pub mod product;
pub mod snapshot;
pub mod sync;

pub use department::DepartmentRepository;
pub use job::{JobRepository, NewJob};
pub use product::ProductRepository;
pub use snapshot::SnapshotRepository;
pub use sync::SyncRepository;

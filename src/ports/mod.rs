//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `RoleJobStore` - Durable, idempotent queue of role jobs

mod role_job_store;

pub use role_job_store::{EnqueueResult, JobStoreError, RoleJobStore};

//! In-memory adapters for tests and local development.

mod in_memory_role_job_store;

pub use in_memory_role_job_store::InMemoryRoleJobStore;

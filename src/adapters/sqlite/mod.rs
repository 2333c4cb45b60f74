//! SQLite adapters.

mod role_job_store;

pub use role_job_store::SqliteRoleJobStore;

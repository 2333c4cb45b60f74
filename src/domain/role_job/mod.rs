//! Role job domain module.
//!
//! The unit of work handed to the downstream role worker.

mod role_job;

pub use role_job::{NewRoleJob, RoleAction, RoleJob};

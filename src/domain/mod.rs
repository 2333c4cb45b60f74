//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `role_job` - The persisted unit of work and its actions
//! - `webhook` - Stripe signature verification and event classification

pub mod foundation;
pub mod role_job;
pub mod webhook;

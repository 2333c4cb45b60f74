//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `sqlite` - Durable role job queue
//! - `memory` - In-memory role job queue (tests, local development)
//! - `http` - axum routes for Stripe deliveries and liveness

pub mod http;
pub mod memory;
pub mod sqlite;

pub use memory::InMemoryRoleJobStore;
pub use sqlite::SqliteRoleJobStore;

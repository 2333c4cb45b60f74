//! Application layer - Command handlers.
//!
//! Orchestrates domain operations and coordinates between ports.

pub mod handlers;

pub use handlers::{IngestError, IngestOutcome, IngestWebhookCommand, IngestWebhookHandler};

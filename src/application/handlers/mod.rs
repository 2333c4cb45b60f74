//! Command handlers.

mod ingest_webhook;

pub use ingest_webhook::{IngestError, IngestOutcome, IngestWebhookCommand, IngestWebhookHandler};

//! HTTP adapters - axum routes and middleware.

pub mod health;
pub mod router;
pub mod webhook;

pub use health::health_handler;
pub use router::build_router;
pub use webhook::WebhookAppState;

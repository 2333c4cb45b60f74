//! HTTP adapter for Stripe webhook deliveries.
//!
//! - `POST /stripe/webhook` - Verify and record a Stripe event

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{AckResponse, ErrorResponse};
pub use handlers::{handle_stripe_webhook, WebhookApiError, WebhookAppState, STRIPE_SIGNATURE_HEADER};
pub use routes::webhook_routes;

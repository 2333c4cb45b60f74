//! Axum router configuration for the webhook endpoint.

use axum::{routing::post, Router};

use super::handlers::{handle_stripe_webhook, WebhookAppState};

/// Create the Stripe webhook router.
///
/// # Routes
/// - `POST /stripe/webhook` - Receive a Stripe event (no auth, signature verified)
pub fn webhook_routes() -> Router<WebhookAppState> {
    Router::new().route("/stripe/webhook", post(handle_stripe_webhook))
}

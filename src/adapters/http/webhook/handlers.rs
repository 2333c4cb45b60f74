//! HTTP handler for Stripe deliveries.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::application::handlers::{IngestError, IngestWebhookCommand, IngestWebhookHandler};

use super::dto::{AckResponse, ErrorResponse};

/// Header Stripe signs deliveries with.
pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for webhook routes.
#[derive(Clone)]
pub struct WebhookAppState {
    pub ingest: Arc<IngestWebhookHandler>,
}

impl WebhookAppState {
    pub fn new(ingest: IngestWebhookHandler) -> Self {
        Self {
            ingest: Arc::new(ingest),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /stripe/webhook - Verify, classify and record one Stripe event
///
/// The body is taken as raw bytes; the signature covers them exactly.
pub async fn handle_stripe_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    // A header that is not visible ASCII cannot be a valid signature
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .map(|v| v.to_str().unwrap_or_default().to_string());

    let cmd = IngestWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    state.ingest.handle(cmd).await?;

    Ok(Json(AckResponse::ok()))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts ingest errors to HTTP responses.
#[derive(Debug)]
pub struct WebhookApiError(IngestError);

impl From<IngestError> for WebhookApiError {
    fn from(err: IngestError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let status: StatusCode = self.0.status_code();
        let body = ErrorResponse::new(self.0.to_string());
        (status, Json(body)).into_response()
    }
}

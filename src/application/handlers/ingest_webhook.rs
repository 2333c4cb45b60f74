//! IngestWebhookHandler - Turns one Stripe delivery into at most one role job.
//!
//! Flow: verify signature → classify → enqueue or ignore. Only this handler
//! writes to the job store.

use std::sync::Arc;

use axum::http::StatusCode;

use crate::domain::role_job::{NewRoleJob, RoleJob};
use crate::domain::webhook::{classify, IgnoreReason, Intent, StripeWebhookVerifier, VerificationError};
use crate::ports::{EnqueueResult, RoleJobStore};

/// Command carrying one raw delivery.
#[derive(Debug, Clone)]
pub struct IngestWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header value, if present.
    pub signature: Option<String>,
}

/// What became of an authenticated delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new job was recorded.
    Enqueued(RoleJob),
    /// The event was delivered before; the prior job stands.
    Duplicate(RoleJob),
    /// Authentic, but nothing to do.
    Ignored {
        event_id: String,
        event_type: String,
        why: IgnoreReason,
    },
}

/// Failures that must not be acknowledged to Stripe.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error("job store unavailable: {0}")]
    StoreUnavailable(String),
}

impl IngestError {
    /// HTTP status for this error.
    ///
    /// Store failures answer 500 so Stripe redelivers.
    pub fn status_code(&self) -> StatusCode {
        match self {
            IngestError::Verification(e) => e.status_code(),
            IngestError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Handler for incoming Stripe deliveries.
pub struct IngestWebhookHandler {
    verifier: Arc<StripeWebhookVerifier>,
    store: Arc<dyn RoleJobStore>,
}

impl IngestWebhookHandler {
    pub fn new(verifier: Arc<StripeWebhookVerifier>, store: Arc<dyn RoleJobStore>) -> Self {
        Self { verifier, store }
    }

    pub async fn handle(&self, cmd: IngestWebhookCommand) -> Result<IngestOutcome, IngestError> {
        // 1. Authenticate
        let event = self
            .verifier
            .verify(&cmd.payload, cmd.signature.as_deref())
            .map_err(|e| {
                if e.is_misconfiguration() {
                    tracing::error!(error = %e, "Webhook rejected: signing secret not configured");
                } else {
                    tracing::warn!(error = %e, "Webhook verification failed");
                }
                e
            })?;

        // 2. Decide
        let (subject_id, action, reason) = match classify(&event) {
            Intent::Act {
                subject_id,
                action,
                reason,
            } => (subject_id, action, reason),
            Intent::Ignore { why } => {
                match &why {
                    IgnoreReason::SubjectMappingNotImplemented { customer } => tracing::info!(
                        event_id = %event.id,
                        event_type = %event.event_type,
                        customer = customer.as_deref().unwrap_or("-"),
                        reason = %why,
                        "Webhook ignored"
                    ),
                    _ => tracing::info!(
                        event_id = %event.id,
                        event_type = %event.event_type,
                        reason = %why,
                        "Webhook ignored"
                    ),
                }
                return Ok(IngestOutcome::Ignored {
                    event_id: event.id,
                    event_type: event.event_type,
                    why,
                });
            }
        };

        // 3. Record
        let job = NewRoleJob::new(subject_id, action, reason).for_event(event.id.clone());
        let result = self.store.enqueue(job).await.map_err(|e| {
            tracing::error!(
                event_id = %event.id,
                error = %e,
                retryable = e.is_retryable(),
                "Failed to enqueue role job"
            );
            IngestError::StoreUnavailable(e.to_string())
        })?;

        match result {
            EnqueueResult::Created(job) => {
                tracing::info!(
                    event_id = %event.id,
                    job_id = %job.id,
                    subject_id = %job.subject_id,
                    action = %job.action,
                    "Role job enqueued"
                );
                Ok(IngestOutcome::Enqueued(job))
            }
            EnqueueResult::Duplicate(job) => {
                tracing::info!(
                    event_id = %event.id,
                    job_id = %job.id,
                    "Duplicate delivery, role job already recorded"
                );
                Ok(IngestOutcome::Duplicate(job))
            }
        }
    }
}

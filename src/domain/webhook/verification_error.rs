//! Verification error types for Stripe webhook handling.
//!
//! Distinguishes a misconfigured service (no signing secret) from a forged,
//! replayed, or corrupted delivery, and maps each to an HTTP status.

use axum::http::StatusCode;
use thiserror::Error;

/// Reasons a delivery failed authentication.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureRejection {
    /// No `Stripe-Signature` header on the request.
    #[error("missing Stripe-Signature header")]
    MissingHeader,

    /// Header present but not `t=...,v1=...`.
    #[error("malformed signature header: {0}")]
    MalformedHeader(String),

    /// Signed timestamp is older than the tolerance window.
    #[error("timestamp outside the tolerance window")]
    TimestampOutOfRange,

    /// Signed timestamp is further in the future than the allowed clock skew.
    #[error("timestamp is in the future")]
    TimestampInFuture,

    /// No `v1` signature matches the payload.
    #[error("no signatures found matching the expected signature for payload")]
    Mismatch,
}

/// Errors that occur while authenticating and parsing a delivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The webhook signing secret is not configured.
    #[error("webhook signing secret is not configured")]
    MissingSecret,

    /// Signature verification failed.
    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] SignatureRejection),

    /// Authenticated body is not a Stripe event.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl VerificationError {
    /// Returns true if the failure is on our side rather than the sender's.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(self, VerificationError::MissingSecret)
    }

    /// Maps the error to an HTTP status code. All variants are client errors.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

//! Webhook domain module.
//!
//! Authenticates Stripe deliveries and decides what they mean for roles.
//!
//! # Module Structure
//!
//! - `stripe_event` - Parsed Stripe event and known event types
//! - `verification_error` - Verification failure taxonomy
//! - `webhook_verifier` - HMAC-SHA256 `Stripe-Signature` verification
//! - `classifier` - Pure mapping from event to `Intent`

mod classifier;
mod stripe_event;
mod verification_error;
mod webhook_verifier;

pub use classifier::{classify, IgnoreReason, Intent};
pub use stripe_event::{StripeEvent, StripeEventData, StripeEventType};
pub use verification_error::{SignatureRejection, VerificationError};
pub use webhook_verifier::{
    signature_header, verify, SignatureHeader, StripeWebhookVerifier, DEFAULT_TOLERANCE_SECS,
};

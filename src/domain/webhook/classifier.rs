//! Event classification - decides what, if anything, a verified event asks of us.
//!
//! Pure and deterministic: no I/O, no clock, no persistence.

use std::fmt;

use crate::domain::foundation::SubjectId;
use crate::domain::role_job::RoleAction;

use super::stripe_event::{StripeEvent, StripeEventType};

/// Checkout field carrying the subject identity supplied when the session was created.
const CLIENT_REFERENCE_FIELD: &str = "client_reference_id";

/// Field carrying Stripe's customer id on invoices and subscriptions.
const CUSTOMER_FIELD: &str = "customer";

/// The classifier's decision for a verified event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Record a role job.
    Act {
        subject_id: SubjectId,
        action: RoleAction,
        reason: String,
    },
    /// Acknowledge without acting.
    Ignore { why: IgnoreReason },
}

/// Why an authenticated event produced no job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Checkout completed without a usable `client_reference_id`.
    NoSubjectReference,
    /// The event names a Stripe customer, and nothing maps customers to subjects yet.
    SubjectMappingNotImplemented { customer: Option<String> },
    /// Recognized Stripe event type with no role consequence.
    UnhandledEventType,
    /// Event type this service does not know.
    UnknownEventType,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IgnoreReason::NoSubjectReference => "no subject reference",
            IgnoreReason::SubjectMappingNotImplemented { .. } => "subject mapping not implemented",
            IgnoreReason::UnhandledEventType => "unhandled event type",
            IgnoreReason::UnknownEventType => "unknown event type",
        };
        write!(f, "{}", s)
    }
}

impl Intent {
    fn ignore(why: IgnoreReason) -> Self {
        Intent::Ignore { why }
    }
}

/// Maps a verified event to at most one intended action.
pub fn classify(event: &StripeEvent) -> Intent {
    match event.parsed_type() {
        StripeEventType::CheckoutSessionCompleted => classify_checkout_completed(event),
        StripeEventType::InvoicePaymentFailed | StripeEventType::CustomerSubscriptionDeleted => {
            Intent::ignore(IgnoreReason::SubjectMappingNotImplemented {
                customer: event.object_str(CUSTOMER_FIELD).map(str::to_string),
            })
        }
        StripeEventType::Unknown => Intent::ignore(IgnoreReason::UnknownEventType),
        _ => Intent::ignore(IgnoreReason::UnhandledEventType),
    }
}

fn classify_checkout_completed(event: &StripeEvent) -> Intent {
    let subject = event
        .object_str(CLIENT_REFERENCE_FIELD)
        .and_then(|reference| SubjectId::new(reference).ok());

    match subject {
        Some(subject_id) => Intent::Act {
            subject_id,
            action: RoleAction::Grant,
            reason: event.event_type.clone(),
        },
        None => Intent::ignore(IgnoreReason::NoSubjectReference),
    }
}

//! Stripe webhook signature verification.
//!
//! Implements secure verification of Stripe webhook signatures using HMAC-SHA256.
//! Includes timestamp validation to prevent replay attacks. The payload is never
//! parsed before its signature has been checked.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::stripe_event::StripeEvent;
use super::verification_error::{SignatureRejection, VerificationError};

type HmacSha256 = Hmac<Sha256>;

/// Default maximum age for webhook events (5 minutes), matching Stripe's SDKs.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Maximum allowed clock skew for future events (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed components from the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// v1 signatures (HMAC-SHA256). Several are sent while a secret is being rolled.
    pub v1_signatures: Vec<Vec<u8>>,
    /// Optional v0 legacy signature.
    pub v0_signature: Option<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses a Stripe-Signature header string.
    ///
    /// Format: `t=<timestamp>,v1=<signature>[,v1=<signature>...][,v0=<legacy>]`
    ///
    /// # Errors
    ///
    /// Returns `SignatureRejection::MalformedHeader` if the header format is invalid.
    pub fn parse(header: &str) -> Result<Self, SignatureRejection> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures: Vec<Vec<u8>> = Vec::new();
        let mut v0_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| malformed("invalid header format"))?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| malformed("invalid timestamp"))?);
                }
                "v1" => {
                    v1_signatures
                        .push(hex::decode(value).map_err(|_| malformed("invalid v1 signature hex"))?);
                }
                "v0" => {
                    v0_signature =
                        Some(hex::decode(value).map_err(|_| malformed("invalid v0 signature hex"))?);
                }
                _ => {
                    // Ignore unknown fields for forward compatibility
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| malformed("missing timestamp"))?;
        if v1_signatures.is_empty() {
            return Err(malformed("missing v1 signature"));
        }

        Ok(SignatureHeader {
            timestamp,
            v1_signatures,
            v0_signature,
        })
    }
}

fn malformed(reason: &str) -> SignatureRejection {
    SignatureRejection::MalformedHeader(reason.to_string())
}

/// Verifier for Stripe webhook signatures.
///
/// The secret is optional so the service can start before it is configured;
/// until then every delivery fails with `MissingSecret`.
#[derive(Clone)]
pub struct StripeWebhookVerifier {
    /// The webhook signing secret from Stripe dashboard.
    secret: Option<SecretString>,
    /// Maximum accepted age of a signature, in seconds.
    tolerance_secs: i64,
}

impl StripeWebhookVerifier {
    /// Creates a new verifier with the given webhook secret.
    pub fn new(secret: Option<SecretString>) -> Self {
        Self {
            secret,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Overrides the replay window.
    pub fn with_tolerance_secs(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Returns true if a usable signing secret is configured.
    pub fn has_secret(&self) -> bool {
        self.usable_secret().is_some()
    }

    /// Verifies the webhook signature and parses the event.
    ///
    /// # Verification Steps
    ///
    /// 1. Require a configured secret
    /// 2. Parse the signature header
    /// 3. Validate timestamp is within acceptable range
    /// 4. Compute expected signature using HMAC-SHA256
    /// 5. Compare against every v1 signature in constant time
    /// 6. Parse the JSON payload into a StripeEvent
    ///
    /// # Errors
    ///
    /// - `MissingSecret` - No signing secret configured
    /// - `InvalidSignature` - Header absent or malformed, stale, or not matching
    /// - `MalformedPayload` - Authenticated body is not a Stripe event
    pub fn verify(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<StripeEvent, VerificationError> {
        self.verify_at(payload, signature_header, chrono::Utc::now().timestamp())
    }

    /// Same as [`verify`](Self::verify) with an explicit notion of "now".
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
        now: i64,
    ) -> Result<StripeEvent, VerificationError> {
        let secret = self.usable_secret().ok_or(VerificationError::MissingSecret)?;

        let header = signature_header.ok_or(SignatureRejection::MissingHeader)?;
        let header = SignatureHeader::parse(header)?;

        self.validate_timestamp(header.timestamp, now)?;

        let expected_signature = compute_signature(secret.as_bytes(), header.timestamp, payload);
        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected_signature, candidate));
        if !matched {
            return Err(SignatureRejection::Mismatch.into());
        }

        serde_json::from_slice(payload).map_err(|e| VerificationError::MalformedPayload(e.to_string()))
    }

    fn usable_secret(&self) -> Option<&str> {
        self.secret
            .as_ref()
            .map(|s| s.expose_secret().as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Validates that the timestamp is within acceptable bounds.
    fn validate_timestamp(&self, timestamp: i64, now: i64) -> Result<(), SignatureRejection> {
        // A timestamp too far in the past to subtract is certainly stale
        let age = now
            .checked_sub(timestamp)
            .ok_or(SignatureRejection::TimestampOutOfRange)?;

        if age > self.tolerance_secs {
            return Err(SignatureRejection::TimestampOutOfRange);
        }

        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(SignatureRejection::TimestampInFuture);
        }

        Ok(())
    }
}

/// Verifies a delivery against an optional secret.
///
/// Convenience wrapper over [`StripeWebhookVerifier`] with the default tolerance.
pub fn verify(
    payload: &[u8],
    signature_header: Option<&str>,
    secret: Option<&str>,
) -> Result<StripeEvent, VerificationError> {
    let verifier = StripeWebhookVerifier::new(secret.map(|s| SecretString::new(s.to_string())));
    verifier.verify(payload, signature_header)
}

/// Builds a `Stripe-Signature` header value for `payload` signed at `timestamp`.
///
/// Used to replay captured deliveries against a local instance and in tests.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let signature = compute_signature(secret.as_bytes(), timestamp, payload);
    format!("t={},v1={}", timestamp, hex::encode(signature))
}

/// Computes the HMAC-SHA256 signature over `"{timestamp}." ++ payload`.
fn compute_signature(secret: &[u8], timestamp: i64, payload: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

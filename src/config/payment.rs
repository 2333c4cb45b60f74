//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::webhook::DEFAULT_TOLERANCE_SECS;

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe API key. The service refuses to start without it.
    pub stripe_api_key: Option<SecretString>,

    /// Stripe webhook signing secret. May be absent at startup; every
    /// delivery then fails verification until it is configured.
    #[serde(default)]
    pub stripe_webhook_secret: Option<SecretString>,

    /// Maximum accepted age of a webhook signature, in seconds
    #[serde(default = "default_signature_tolerance")]
    pub signature_tolerance_secs: i64,
}

impl PaymentConfig {
    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.api_key().is_some_and(|k| k.contains("_live_"))
    }

    /// The webhook secret, if configured and non-empty.
    pub fn webhook_secret(&self) -> Option<SecretString> {
        self.stripe_webhook_secret
            .as_ref()
            .filter(|s| !s.expose_secret().trim().is_empty())
            .cloned()
    }

    fn api_key(&self) -> Option<&str> {
        self.stripe_api_key
            .as_ref()
            .map(|k| k.expose_secret().as_str())
            .filter(|k| !k.is_empty())
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let api_key = self
            .api_key()
            .ok_or(ValidationError::MissingRequired("STRIPE_API_KEY"))?;

        // Secret (sk_) or restricted (rk_) keys only; publishable keys are a mistake
        if !api_key.starts_with("sk_") && !api_key.starts_with("rk_") {
            return Err(ValidationError::InvalidStripeKey);
        }

        if let Some(secret) = self.webhook_secret() {
            if !secret.expose_secret().starts_with("whsec_") {
                return Err(ValidationError::InvalidStripeWebhookSecret);
            }
        }

        if self.signature_tolerance_secs <= 0 {
            return Err(ValidationError::InvalidSignatureTolerance);
        }

        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: None,
            stripe_webhook_secret: None,
            signature_tolerance_secs: default_signature_tolerance(),
        }
    }
}

fn default_signature_tolerance() -> i64 {
    DEFAULT_TOLERANCE_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(s: &str) -> Option<SecretString> {
        Some(SecretString::new(s.to_string()))
    }

    #[test]
    fn test_test_key_is_not_live_mode() {
        let config = PaymentConfig {
            stripe_api_key: secret("sk_test_xxx"),
            ..Default::default()
        };
        assert!(!config.is_live_mode());
    }

    #[test]
    fn test_is_live_mode() {
        let config = PaymentConfig {
            stripe_api_key: secret("sk_live_xxx"),
            ..Default::default()
        };
        assert!(config.is_live_mode());
    }

    #[test]
    fn test_validation_missing_api_key() {
        let config = PaymentConfig::default();
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("STRIPE_API_KEY"))
        );
    }

    #[test]
    fn test_validation_empty_api_key() {
        let config = PaymentConfig {
            stripe_api_key: secret(""),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_allows_missing_webhook_secret() {
        let config = PaymentConfig {
            stripe_api_key: secret("sk_test_xxx"),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert!(config.webhook_secret().is_none());
    }

    #[test]
    fn test_empty_webhook_secret_counts_as_missing() {
        let config = PaymentConfig {
            stripe_api_key: secret("sk_test_xxx"),
            stripe_webhook_secret: secret(""),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert!(config.webhook_secret().is_none());
    }

    #[test]
    fn test_validation_invalid_api_key_prefix() {
        let config = PaymentConfig {
            stripe_api_key: secret("pk_test_xxx"),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidStripeKey));
    }

    #[test]
    fn test_validation_accepts_restricted_key() {
        let config = PaymentConfig {
            stripe_api_key: secret("rk_live_xxx"),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_webhook_secret_prefix() {
        let config = PaymentConfig {
            stripe_api_key: secret("sk_test_xxx"),
            stripe_webhook_secret: secret("secret_xxx"),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidStripeWebhookSecret)
        );
    }

    #[test]
    fn test_validation_invalid_tolerance() {
        let config = PaymentConfig {
            stripe_api_key: secret("sk_test_xxx"),
            signature_tolerance_secs: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidSignatureTolerance)
        );
    }

    #[test]
    fn test_validation_valid_config() {
        let config = PaymentConfig {
            stripe_api_key: secret("sk_test_abcd1234"),
            stripe_webhook_secret: secret("whsec_xyz789"),
            signature_tolerance_secs: 300,
        };
        assert!(config.validate().is_ok());
        assert!(config.webhook_secret().is_some());
    }
}

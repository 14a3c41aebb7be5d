//! Billing configuration (Stripe)

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::entitlement::PlanCatalog;

/// Billing configuration (Stripe)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillingConfig {
    /// Stripe secret API key
    pub stripe_api_key: String,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,

    /// Stripe price ID for the basic plan
    pub basic_price_id: String,

    /// Stripe price ID for the premium plan
    pub premium_price_id: String,
}

impl BillingConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_live_")
    }

    /// Build the plan catalog from the configured price ids.
    pub fn plan_catalog(&self) -> PlanCatalog {
        PlanCatalog::new(&self.basic_price_id, &self.premium_price_id)
    }

    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_API_KEY"));
        }
        if self.stripe_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
        }

        // Verify key prefixes for safety
        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.stripe_webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }

        if self.basic_price_id.is_empty() || self.premium_price_id.is_empty() {
            return Err(ValidationError::MissingPriceId);
        }

        Ok(())
    }
}

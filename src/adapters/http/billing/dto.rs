//! HTTP DTOs for billing endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::entitlement::SubscriptionTier;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to start a hosted checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCheckoutRequest {
    /// Email for the provider customer record.
    pub email: String,
    /// The plan to subscribe to (basic or premium).
    pub plan: SubscriptionTier,
    /// URL to redirect after successful checkout.
    pub success_url: String,
    /// URL to redirect after cancelled checkout.
    pub cancel_url: String,
    /// Optional coupon code for a discount.
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// Query parameters for the billing portal.
#[derive(Debug, Clone, Deserialize)]
pub struct PortalParams {
    /// URL the portal returns to; defaults to the account page.
    #[serde(default = "default_return_url")]
    pub return_url: String,
}

fn default_return_url() -> String {
    "/account".to_string()
}

impl Default for PortalParams {
    fn default() -> Self {
        Self {
            return_url: default_return_url(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Response carrying a hosted checkout URL.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub url: String,
}

/// Response carrying a hosted billing-portal URL.
#[derive(Debug, Clone, Serialize)]
pub struct PortalResponse {
    pub success: bool,
    pub url: String,
}

//! HTTP DTOs for access-check endpoints.

use serde::Serialize;

use crate::application::handlers::access::CheckAccessResult;
use crate::domain::entitlement::SubscriptionTier;

/// Response for an access check.
#[derive(Debug, Clone, Serialize)]
pub struct AccessCheckResponse {
    pub allowed: bool,
    pub tier: SubscriptionTier,
}

impl From<CheckAccessResult> for AccessCheckResponse {
    fn from(result: CheckAccessResult) -> Self {
        Self {
            allowed: result.allowed,
            tier: result.tier,
        }
    }
}

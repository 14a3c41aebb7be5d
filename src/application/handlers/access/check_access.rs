//! CheckAccessHandler - Query handler for content access decisions.
//!
//! Called synchronously on every content-serving request path, so it
//! does nothing beyond one profile read and a rank comparison. Tier
//! freshness is the webhook sync's responsibility, not this handler's.

use std::sync::Arc;

use crate::domain::entitlement::{BillingError, SubscriptionTier};
use crate::domain::foundation::UserId;
use crate::ports::ProfileRepository;

/// Query to check whether a user may view content gated at a tier.
#[derive(Debug, Clone)]
pub struct CheckAccessQuery {
    pub user_id: UserId,
    pub required: SubscriptionTier,
}

/// Result of an access check.
#[derive(Debug, Clone, Copy)]
pub struct CheckAccessResult {
    /// Whether access is granted.
    pub allowed: bool,
    /// The user's effective tier that produced the decision.
    pub tier: SubscriptionTier,
}

/// Handler for access decisions.
pub struct CheckAccessHandler {
    profiles: Arc<dyn ProfileRepository>,
}

impl CheckAccessHandler {
    pub fn new(profiles: Arc<dyn ProfileRepository>) -> Self {
        Self { profiles }
    }

    pub async fn handle(&self, query: CheckAccessQuery) -> Result<CheckAccessResult, BillingError> {
        // A user with no profile row is a free-tier user; no row is
        // written for a plain read.
        let tier = self
            .profiles
            .find_by_user(&query.user_id)
            .await?
            .map(|profile| profile.subscription_tier)
            .unwrap_or(SubscriptionTier::Free);

        Ok(CheckAccessResult {
            allowed: tier.has_access(query.required),
            tier,
        })
    }
}

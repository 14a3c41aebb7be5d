//! Paid plan catalog.
//!
//! Maps paid subscription tiers to the billing provider's price
//! identifiers, in both directions: outbound when creating a checkout
//! session, inbound when a webhook reports which price a subscription
//! carries.

use super::SubscriptionTier;

/// Catalog of purchasable plans and their provider price ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanCatalog {
    basic_price_id: String,
    premium_price_id: String,
}

impl PlanCatalog {
    pub fn new(basic_price_id: impl Into<String>, premium_price_id: impl Into<String>) -> Self {
        Self {
            basic_price_id: basic_price_id.into(),
            premium_price_id: premium_price_id.into(),
        }
    }

    /// Returns the provider price id for a paid tier, `None` for Free.
    pub fn price_for_tier(&self, tier: SubscriptionTier) -> Option<&str> {
        match tier {
            SubscriptionTier::Free => None,
            SubscriptionTier::Basic => Some(&self.basic_price_id),
            SubscriptionTier::Premium => Some(&self.premium_price_id),
        }
    }

    /// Resolves a provider price id back to a tier.
    ///
    /// Unknown price ids return `None`; callers treat that as an
    /// unrecognized plan rather than guessing.
    pub fn tier_for_price(&self, price_id: &str) -> Option<SubscriptionTier> {
        if price_id == self.basic_price_id {
            Some(SubscriptionTier::Basic)
        } else if price_id == self.premium_price_id {
            Some(SubscriptionTier::Premium)
        } else {
            None
        }
    }
}

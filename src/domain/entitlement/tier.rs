//! Subscription tier definitions.
//!
//! Represents the content-gating subscription levels of Kickoff Club HQ.

use serde::{Deserialize, Serialize};

/// Content access subscription tier.
///
/// Tiers form a total order: `Free < Basic < Premium`. Every access
/// decision in the platform reduces to a comparison of two ranks, so the
/// order table below is the single source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    /// Free tier - open drills and intro lessons.
    Free,

    /// Basic monthly subscription - full course catalog.
    Basic,

    /// Premium subscription - everything, plus coaching content.
    Premium,
}

impl SubscriptionTier {
    /// Returns the numeric rank of this tier for comparison.
    ///
    /// Higher rank = more access. Any change here changes what every
    /// user in the system can see, so the mapping is exhaustive and fixed.
    pub fn rank(&self) -> u8 {
        match self {
            SubscriptionTier::Free => 0,
            SubscriptionTier::Basic => 1,
            SubscriptionTier::Premium => 2,
        }
    }

    /// Returns true if a user at this tier may view content gated at `required`.
    pub fn has_access(&self, required: SubscriptionTier) -> bool {
        self.rank() >= required.rank()
    }

    /// Returns true if this tier is a paid tier.
    pub fn is_paid(&self) -> bool {
        !matches!(self, SubscriptionTier::Free)
    }

    /// Returns the display name for this tier.
    pub fn display_name(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "Free",
            SubscriptionTier::Basic => "Basic",
            SubscriptionTier::Premium => "Premium",
        }
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

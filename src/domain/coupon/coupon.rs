//! Coupon entity and validation rules.
//!
//! A coupon is administered out of band (created, deactivated) and read
//! here; the only mutation this engine performs is the atomic redemption
//! counter increment in the store.

use serde::{Deserialize, Serialize};

use crate::domain::entitlement::SubscriptionTier;
use crate::domain::foundation::{CouponId, Timestamp};

use super::{CouponCode, Discount};

/// A discount coupon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    pub code: CouponCode,
    pub discount: Discount,

    /// Start of the validity window; `None` means no lower bound.
    pub valid_from: Option<Timestamp>,

    /// End of the validity window; `None` means no expiry.
    pub valid_until: Option<Timestamp>,

    /// Total redemption cap across all users; `None` means unlimited.
    pub max_redemptions: Option<u32>,

    /// Redemptions recorded so far. Only the store's atomic increment
    /// may raise this.
    pub current_redemptions: u32,

    /// Deactivated coupons stay in storage but never validate.
    pub active: bool,

    /// Restricts the coupon to checkouts of one tier; `None` applies to all.
    pub applies_to_tier: Option<SubscriptionTier>,
}

/// Result of validating a coupon. A plain value, not an error: callers
/// render invalid outcomes directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CouponValidation {
    Valid,
    Invalid { reason: CouponInvalidReason },
}

impl CouponValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, CouponValidation::Valid)
    }

    pub fn invalid(reason: CouponInvalidReason) -> Self {
        CouponValidation::Invalid { reason }
    }
}

/// Why a coupon failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponInvalidReason {
    /// No coupon with that code exists (produced by the lookup layer).
    NotFound,
    /// The coupon has been deactivated.
    Inactive,
    /// Current time is outside the validity window.
    Expired,
    /// The redemption cap has been reached.
    Exhausted,
    /// The coupon is scoped to a different tier than the checkout plan.
    NotApplicable,
}

impl CouponInvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponInvalidReason::NotFound => "NOT_FOUND",
            CouponInvalidReason::Inactive => "INACTIVE",
            CouponInvalidReason::Expired => "EXPIRED",
            CouponInvalidReason::Exhausted => "EXHAUSTED",
            CouponInvalidReason::NotApplicable => "NOT_APPLICABLE",
        }
    }
}

impl std::fmt::Display for CouponInvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Coupon {
    /// Validates this coupon at the given instant.
    ///
    /// Check order is fixed and observable in the returned reason:
    /// active flag, then time window, then exhaustion. (Existence is the
    /// lookup layer's check and precedes all of these.) Read-only.
    pub fn validate(&self, now: Timestamp) -> CouponValidation {
        if !self.active {
            return CouponValidation::invalid(CouponInvalidReason::Inactive);
        }

        if let Some(from) = &self.valid_from {
            if now.is_before(from) {
                return CouponValidation::invalid(CouponInvalidReason::Expired);
            }
        }
        if let Some(until) = &self.valid_until {
            if now.is_after(until) {
                return CouponValidation::invalid(CouponInvalidReason::Expired);
            }
        }

        if self.is_exhausted() {
            return CouponValidation::invalid(CouponInvalidReason::Exhausted);
        }

        CouponValidation::Valid
    }

    /// Returns true if the redemption cap has been reached.
    pub fn is_exhausted(&self) -> bool {
        match self.max_redemptions {
            Some(max) => self.current_redemptions >= max,
            None => false,
        }
    }

    /// Returns true if this coupon may be applied to a checkout of `tier`.
    ///
    /// Unscoped coupons apply to every tier.
    pub fn applies_to(&self, tier: SubscriptionTier) -> bool {
        match self.applies_to_tier {
            Some(scoped) => scoped == tier,
            None => true,
        }
    }
}

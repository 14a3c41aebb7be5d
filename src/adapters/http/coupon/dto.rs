//! HTTP DTOs for coupon endpoints.

use serde::{Deserialize, Serialize};

use crate::application::handlers::coupon::ValidateCouponResult;
use crate::domain::coupon::{Coupon, DiscountType};
use crate::domain::entitlement::SubscriptionTier;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to validate a coupon code.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateCouponRequest {
    pub code: String,
}

/// Request to redeem a coupon code.
#[derive(Debug, Clone, Deserialize)]
pub struct RedeemCouponRequest {
    pub code: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Public view of a coupon, shown only after successful validation.
#[derive(Debug, Clone, Serialize)]
pub struct CouponSummary {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applies_to_tier: Option<SubscriptionTier>,
}

impl From<&Coupon> for CouponSummary {
    fn from(coupon: &Coupon) -> Self {
        Self {
            code: coupon.code.as_str().to_string(),
            discount_type: coupon.discount.discount_type,
            discount_value: coupon.discount.value,
            applies_to_tier: coupon.applies_to_tier,
        }
    }
}

/// Response for coupon validation. Always 200; `valid` plus `reason`
/// carry the outcome, including the already-used case.
#[derive(Debug, Clone, Serialize)]
pub struct ValidateCouponResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<CouponSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<ValidateCouponResult> for ValidateCouponResponse {
    fn from(result: ValidateCouponResult) -> Self {
        match result {
            ValidateCouponResult::Valid { coupon } => Self {
                valid: true,
                coupon: Some(CouponSummary::from(&coupon)),
                reason: None,
            },
            ValidateCouponResult::AlreadyUsed { .. } => Self {
                valid: false,
                coupon: None,
                reason: Some("ALREADY_REDEEMED".to_string()),
            },
            ValidateCouponResult::Invalid { reason } => Self {
                valid: false,
                coupon: None,
                reason: Some(reason.as_str().to_string()),
            },
        }
    }
}

/// Response for a successful redemption.
#[derive(Debug, Clone, Serialize)]
pub struct RedeemCouponResponse {
    pub success: bool,
    pub coupon: CouponSummary,
}

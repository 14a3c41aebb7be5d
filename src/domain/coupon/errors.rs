//! Coupon redemption error types.
//!
//! Validation outcomes are NOT errors (see `CouponValidation`); this
//! enum covers the redemption path and infrastructure failures.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotRedeemable | 422 |
//! | AlreadyRedeemed | 409 |
//! | RaceLost | 409 |
//! | Infrastructure | 500 |

use thiserror::Error;

use crate::domain::foundation::DomainError;

use super::CouponInvalidReason;

/// Errors raised while redeeming a coupon.
#[derive(Debug, Clone, Error)]
pub enum CouponError {
    /// The coupon failed validation and cannot be redeemed.
    #[error("Coupon '{code}' is not redeemable: {reason}")]
    NotRedeemable {
        code: String,
        reason: CouponInvalidReason,
    },

    /// This user has already redeemed this coupon.
    #[error("Coupon '{code}' was already redeemed by this user")]
    AlreadyRedeemed { code: String },

    /// A concurrent redemption took the last available slot.
    ///
    /// Surfaced to the user as "coupon no longer available"; the
    /// pre-check passed but the atomic increment found the cap reached.
    #[error("Coupon '{code}' is no longer available")]
    RaceLost { code: String },

    /// Storage or other infrastructure failure.
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl CouponError {
    pub fn not_redeemable(code: impl Into<String>, reason: CouponInvalidReason) -> Self {
        CouponError::NotRedeemable {
            code: code.into(),
            reason,
        }
    }

    pub fn already_redeemed(code: impl Into<String>) -> Self {
        CouponError::AlreadyRedeemed { code: code.into() }
    }

    pub fn race_lost(code: impl Into<String>) -> Self {
        CouponError::RaceLost { code: code.into() }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        CouponError::Infrastructure(message.into())
    }
}

impl From<DomainError> for CouponError {
    fn from(err: DomainError) -> Self {
        CouponError::Infrastructure(err.to_string())
    }
}

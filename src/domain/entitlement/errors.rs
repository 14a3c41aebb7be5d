//! Billing and entitlement error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NoSubscription | 404 |
//! | PlanNotPurchasable | 400 |
//! | CouponRejected | 422 |
//! | CouponAlreadyUsed | 409 |
//! | CheckoutInProgress | 409 |
//! | Provider | 502 |
//! | InvalidWebhookSignature | 401 |
//! | Infrastructure | 500 |

use thiserror::Error;

use crate::domain::coupon::CouponInvalidReason;
use crate::domain::foundation::{DomainError, UserId};

/// Errors raised by the checkout and subscription flows.
#[derive(Debug, Clone, Error)]
pub enum BillingError {
    /// The user has no billing relationship to manage.
    #[error("No subscription on record for user {0}")]
    NoSubscription(UserId),

    /// The requested plan cannot be bought (only paid tiers have prices).
    #[error("Plan '{0}' is not purchasable")]
    PlanNotPurchasable(String),

    /// A coupon supplied at checkout failed validation or scope checks.
    #[error("Coupon '{code}' cannot be applied: {reason}")]
    CouponRejected {
        code: String,
        reason: CouponInvalidReason,
    },

    /// A coupon supplied at checkout was already redeemed by this user.
    #[error("Coupon '{code}' was already redeemed by this user")]
    CouponAlreadyUsed { code: String },

    /// The profile is in a state that does not allow starting checkout.
    #[error("Cannot start checkout from status '{current}'")]
    CheckoutInProgress { current: String },

    /// The billing provider rejected or failed the request.
    ///
    /// Never retried automatically; the user is told to try again.
    #[error("Billing provider error: {message}")]
    Provider { message: String },

    /// Webhook signature verification failed.
    #[error("Invalid webhook signature")]
    InvalidWebhookSignature,

    /// Storage or other infrastructure failure.
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl BillingError {
    pub fn provider(message: impl Into<String>) -> Self {
        BillingError::Provider {
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        BillingError::Infrastructure(err.to_string())
    }
}

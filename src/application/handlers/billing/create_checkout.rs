//! CreateCheckoutHandler - Command handler for starting a paid checkout.
//!
//! Creates (or reuses) the provider customer, moves the profile into the
//! checkout-pending state, and requests a hosted checkout session. Paid
//! access is never granted here; only a confirmed webhook event
//! activates the subscription.

use std::sync::Arc;

use crate::domain::coupon::{CouponCode, CouponInvalidReason, CouponValidation};
use crate::domain::entitlement::{BillingError, PlanCatalog, SubscriptionTier, UserProfile};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{
    CouponStore, CreateCheckoutRequest, CreateCustomerRequest, PaymentProvider, ProfileRepository,
};

/// Command to start a hosted checkout for a paid plan.
#[derive(Debug, Clone)]
pub struct CreateCheckoutCommand {
    pub user_id: UserId,
    pub email: String,
    pub plan: SubscriptionTier,
    pub success_url: String,
    pub cancel_url: String,
    pub coupon_code: Option<String>,
}

/// Result of successful checkout initiation.
#[derive(Debug, Clone)]
pub struct CreateCheckoutResult {
    /// Hosted URL the user completes payment on.
    pub checkout_url: String,
}

/// Handler for checkout initiation.
pub struct CreateCheckoutHandler {
    profiles: Arc<dyn ProfileRepository>,
    coupons: Arc<dyn CouponStore>,
    payment: Arc<dyn PaymentProvider>,
    plans: PlanCatalog,
}

impl CreateCheckoutHandler {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        coupons: Arc<dyn CouponStore>,
        payment: Arc<dyn PaymentProvider>,
        plans: PlanCatalog,
    ) -> Self {
        Self {
            profiles,
            coupons,
            payment,
            plans,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateCheckoutCommand,
    ) -> Result<CreateCheckoutResult, BillingError> {
        // 1. Only paid plans have a price.
        let price_id = self
            .plans
            .price_for_tier(cmd.plan)
            .ok_or_else(|| BillingError::PlanNotPurchasable(cmd.plan.to_string()))?
            .to_string();

        // 2. Check the coupon before touching any state.
        if let Some(raw_code) = &cmd.coupon_code {
            self.check_coupon(&cmd.user_id, raw_code, cmd.plan).await?;
        }

        // 3. Load or bootstrap the profile.
        let now = Timestamp::now();
        let mut profile = match self.profiles.find_by_user(&cmd.user_id).await? {
            Some(profile) => profile,
            None => UserProfile::new_free(cmd.user_id.clone(), now),
        };

        // 4. Ensure a provider customer exists.
        let customer_id = match &profile.stripe_customer_id {
            Some(id) => id.clone(),
            None => {
                let customer = self
                    .payment
                    .create_customer(CreateCustomerRequest {
                        user_id: cmd.user_id.clone(),
                        email: cmd.email.clone(),
                        idempotency_key: Some(format!("customer-{}", cmd.user_id)),
                    })
                    .await
                    .map_err(|e| {
                        tracing::error!(
                            user_id = %cmd.user_id,
                            error = %e,
                            "Provider customer creation failed"
                        );
                        BillingError::provider(e.message)
                    })?;
                customer.id
            }
        };

        // 5. Record the pending checkout before asking for a session, so
        //    a confirming webhook always finds a linked profile.
        profile
            .begin_checkout(customer_id.clone(), now)
            .map_err(|_| BillingError::CheckoutInProgress {
                current: format!("{:?}", profile.status),
            })?;
        self.profiles.upsert(&profile).await?;

        // 6. Request the hosted session. Failures surface to the user and
        //    are never retried here.
        let session = self
            .payment
            .create_checkout_session(CreateCheckoutRequest {
                user_id: cmd.user_id.clone(),
                customer_id,
                plan: cmd.plan,
                price_id,
                success_url: cmd.success_url,
                cancel_url: cmd.cancel_url,
                coupon_code: cmd.coupon_code.clone(),
            })
            .await
            .map_err(|e| {
                tracing::error!(
                    user_id = %cmd.user_id,
                    plan = %cmd.plan,
                    provider_code = ?e.provider_code,
                    error = %e,
                    "Checkout session creation failed"
                );
                BillingError::provider(e.message)
            })?;

        tracing::info!(
            user_id = %cmd.user_id,
            plan = %cmd.plan,
            session_id = %session.id,
            "Checkout session created"
        );

        Ok(CreateCheckoutResult {
            checkout_url: session.url,
        })
    }

    /// Validates an optional checkout coupon: format, coupon rules, tier
    /// scope, and this user's ledger.
    async fn check_coupon(
        &self,
        user_id: &UserId,
        raw_code: &str,
        plan: SubscriptionTier,
    ) -> Result<(), BillingError> {
        // A malformed code is indistinguishable from an unknown one.
        let Ok(code) = CouponCode::try_new(raw_code) else {
            return Err(BillingError::CouponRejected {
                code: raw_code.to_string(),
                reason: CouponInvalidReason::NotFound,
            });
        };

        let Some(coupon) = self.coupons.find_by_code(&code).await? else {
            return Err(BillingError::CouponRejected {
                code: code.as_str().to_string(),
                reason: CouponInvalidReason::NotFound,
            });
        };

        if let CouponValidation::Invalid { reason } = coupon.validate(Timestamp::now()) {
            return Err(BillingError::CouponRejected {
                code: code.as_str().to_string(),
                reason,
            });
        }

        if !coupon.applies_to(plan) {
            return Err(BillingError::CouponRejected {
                code: code.as_str().to_string(),
                reason: CouponInvalidReason::NotApplicable,
            });
        }

        if self.coupons.already_redeemed(user_id, coupon.id).await? {
            return Err(BillingError::CouponAlreadyUsed {
                code: code.as_str().to_string(),
            });
        }

        Ok(())
    }
}

//! RedeemCouponHandler - Command handler for redeeming a coupon.
//!
//! Evaluation order per request is fixed: validate, then the advisory
//! ledger pre-check, then the atomic redeem. The store's atomic unit is
//! what actually decides between concurrent requests; the pre-checks
//! exist only to give precise reasons on the common path.

use std::sync::Arc;

use crate::domain::coupon::{
    Coupon, CouponCode, CouponError, CouponInvalidReason, CouponValidation,
};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{CouponStore, RedeemOutcome};

/// Command to redeem a coupon for a user.
#[derive(Debug, Clone)]
pub struct RedeemCouponCommand {
    pub user_id: UserId,
    pub code: CouponCode,
}

/// Result of a successful redemption.
#[derive(Debug, Clone)]
pub struct RedeemCouponResult {
    /// The coupon as it was at redemption time (counter not yet bumped).
    pub coupon: Coupon,
}

/// Handler for coupon redemption.
pub struct RedeemCouponHandler {
    coupons: Arc<dyn CouponStore>,
}

impl RedeemCouponHandler {
    pub fn new(coupons: Arc<dyn CouponStore>) -> Self {
        Self { coupons }
    }

    pub async fn handle(
        &self,
        cmd: RedeemCouponCommand,
    ) -> Result<RedeemCouponResult, CouponError> {
        let Some(coupon) = self.coupons.find_by_code(&cmd.code).await? else {
            return Err(CouponError::not_redeemable(
                cmd.code.as_str(),
                CouponInvalidReason::NotFound,
            ));
        };

        if let CouponValidation::Invalid { reason } = coupon.validate(Timestamp::now()) {
            return Err(CouponError::not_redeemable(cmd.code.as_str(), reason));
        }

        if self
            .coupons
            .already_redeemed(&cmd.user_id, coupon.id)
            .await?
        {
            return Err(CouponError::already_redeemed(cmd.code.as_str()));
        }

        match self
            .coupons
            .redeem(&cmd.user_id, coupon.id, Timestamp::now())
            .await?
        {
            RedeemOutcome::Redeemed => {
                tracing::info!(
                    user_id = %cmd.user_id,
                    coupon_id = %coupon.id,
                    code = %coupon.code,
                    "Coupon redeemed"
                );
                Ok(RedeemCouponResult { coupon })
            }
            RedeemOutcome::AlreadyRedeemed => {
                // The unique constraint is authoritative; the pre-check
                // above merely lost a race with another request.
                Err(CouponError::already_redeemed(cmd.code.as_str()))
            }
            RedeemOutcome::RaceLost => {
                tracing::warn!(
                    user_id = %cmd.user_id,
                    coupon_id = %coupon.id,
                    code = %coupon.code,
                    "Redemption lost race for final slot"
                );
                Err(CouponError::race_lost(cmd.code.as_str()))
            }
        }
    }
}

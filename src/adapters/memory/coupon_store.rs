//! In-memory implementation of CouponStore.
//!
//! Backs tests and local development. A single mutex makes the
//! redemption check-and-insert one atomic unit, mirroring what the
//! Postgres implementation gets from its transaction plus constraints.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::coupon::{Coupon, CouponCode};
use crate::domain::foundation::{CouponId, DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{CouponStore, RedeemOutcome};

struct State {
    coupons: HashMap<CouponId, Coupon>,
    ledger: HashMap<(String, CouponId), Timestamp>,
}

/// In-memory coupon store.
pub struct InMemoryCouponStore {
    state: Mutex<State>,
}

impl InMemoryCouponStore {
    pub fn with_coupons(coupons: Vec<Coupon>) -> Self {
        Self {
            state: Mutex::new(State {
                coupons: coupons.into_iter().map(|c| (c.id, c)).collect(),
                ledger: HashMap::new(),
            }),
        }
    }

    /// Number of ledger rows (test inspection).
    pub fn ledger_len(&self) -> usize {
        self.state.lock().unwrap().ledger.len()
    }
}

#[async_trait]
impl CouponStore for InMemoryCouponStore {
    async fn find_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state.coupons.values().find(|c| &c.code == code).cloned())
    }

    async fn already_redeemed(
        &self,
        user_id: &UserId,
        coupon_id: CouponId,
    ) -> Result<bool, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .ledger
            .contains_key(&(user_id.to_string(), coupon_id)))
    }

    async fn redeem(
        &self,
        user_id: &UserId,
        coupon_id: CouponId,
        redeemed_at: Timestamp,
    ) -> Result<RedeemOutcome, DomainError> {
        let mut state = self.state.lock().unwrap();

        let ledger_key = (user_id.to_string(), coupon_id);
        if state.ledger.contains_key(&ledger_key) {
            return Ok(RedeemOutcome::AlreadyRedeemed);
        }

        let Some(coupon) = state.coupons.get_mut(&coupon_id) else {
            return Err(DomainError::new(
                ErrorCode::CouponNotFound,
                format!("No coupon with id {}", coupon_id),
            ));
        };

        // Cap and active flag re-checked inside the critical section,
        // same as the conditional UPDATE in Postgres.
        if !coupon.active || coupon.is_exhausted() {
            return Ok(RedeemOutcome::RaceLost);
        }

        coupon.current_redemptions += 1;
        state.ledger.insert(ledger_key, redeemed_at);
        Ok(RedeemOutcome::Redeemed)
    }
}

//! ValidateCouponHandler - Query handler for checking a coupon code.
//!
//! Read-only: looks the coupon up, runs the pure validation rules, and
//! consults the usage ledger. Never mutates anything.

use std::sync::Arc;

use crate::domain::coupon::{Coupon, CouponCode, CouponError, CouponInvalidReason};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::CouponStore;

/// Query to validate a coupon code for a specific user.
#[derive(Debug, Clone)]
pub struct ValidateCouponQuery {
    pub user_id: UserId,
    pub code: CouponCode,
}

/// Result of validating a coupon for a user.
///
/// All three outcomes are ordinary data rendered by the caller; only
/// infrastructure failures become errors.
#[derive(Debug, Clone)]
pub enum ValidateCouponResult {
    /// The coupon is valid and this user has not used it yet.
    Valid { coupon: Coupon },

    /// The coupon itself is valid but this user already redeemed it.
    AlreadyUsed { coupon: Coupon },

    /// The coupon failed validation.
    Invalid { reason: CouponInvalidReason },
}

/// Handler for coupon validation queries.
pub struct ValidateCouponHandler {
    coupons: Arc<dyn CouponStore>,
}

impl ValidateCouponHandler {
    pub fn new(coupons: Arc<dyn CouponStore>) -> Self {
        Self { coupons }
    }

    pub async fn handle(
        &self,
        query: ValidateCouponQuery,
    ) -> Result<ValidateCouponResult, CouponError> {
        // Check order is fixed: existence, then the coupon's own rules
        // (active, window, cap), then this user's ledger.
        let Some(coupon) = self.coupons.find_by_code(&query.code).await? else {
            return Ok(ValidateCouponResult::Invalid {
                reason: CouponInvalidReason::NotFound,
            });
        };

        if let crate::domain::coupon::CouponValidation::Invalid { reason } =
            coupon.validate(Timestamp::now())
        {
            return Ok(ValidateCouponResult::Invalid { reason });
        }

        if self
            .coupons
            .already_redeemed(&query.user_id, coupon.id)
            .await?
        {
            return Ok(ValidateCouponResult::AlreadyUsed { coupon });
        }

        Ok(ValidateCouponResult::Valid { coupon })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::coupon::Discount;
    use crate::domain::foundation::{CouponId, DomainError};
    use crate::ports::RedeemOutcome;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    // ════════════════════════════════════════════════════════════════════════════
    // Mock Implementation
    // ════════════════════════════════════════════════════════════════════════════

    struct MockCouponStore {
        coupons: Vec<Coupon>,
        ledger: Mutex<HashSet<(String, CouponId)>>,
    }

    impl MockCouponStore {
        fn with_coupon(coupon: Coupon) -> Self {
            Self {
                coupons: vec![coupon],
                ledger: Mutex::new(HashSet::new()),
            }
        }

        fn empty() -> Self {
            Self {
                coupons: vec![],
                ledger: Mutex::new(HashSet::new()),
            }
        }

        fn mark_redeemed(&self, user_id: &UserId, coupon_id: CouponId) {
            self.ledger
                .lock()
                .unwrap()
                .insert((user_id.to_string(), coupon_id));
        }
    }

    #[async_trait]
    impl CouponStore for MockCouponStore {
        async fn find_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, DomainError> {
            Ok(self.coupons.iter().find(|c| &c.code == code).cloned())
        }

        async fn already_redeemed(
            &self,
            user_id: &UserId,
            coupon_id: CouponId,
        ) -> Result<bool, DomainError> {
            Ok(self
                .ledger
                .lock()
                .unwrap()
                .contains(&(user_id.to_string(), coupon_id)))
        }

        async fn redeem(
            &self,
            _user_id: &UserId,
            _coupon_id: CouponId,
            _redeemed_at: Timestamp,
        ) -> Result<RedeemOutcome, DomainError> {
            unreachable!("validation never redeems")
        }
    }

    fn save20() -> Coupon {
        Coupon {
            id: CouponId::new(),
            code: CouponCode::try_new("SAVE20").unwrap(),
            discount: Discount::percentage(20),
            valid_from: None,
            valid_until: None,
            max_redemptions: Some(100),
            current_redemptions: 5,
            active: true,
            applies_to_tier: None,
        }
    }

    fn user() -> UserId {
        UserId::new("u1").unwrap()
    }

    fn query(code: &str) -> ValidateCouponQuery {
        ValidateCouponQuery {
            user_id: user(),
            code: CouponCode::try_new(code).unwrap(),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unknown_code_reports_not_found() {
        let handler = ValidateCouponHandler::new(Arc::new(MockCouponStore::empty()));
        let result = handler.handle(query("MISSING")).await.unwrap();
        assert!(matches!(
            result,
            ValidateCouponResult::Invalid {
                reason: CouponInvalidReason::NotFound
            }
        ));
    }

    #[tokio::test]
    async fn active_unused_coupon_is_valid() {
        let handler = ValidateCouponHandler::new(Arc::new(MockCouponStore::with_coupon(save20())));
        let result = handler.handle(query("SAVE20")).await.unwrap();
        match result {
            ValidateCouponResult::Valid { coupon } => {
                assert_eq!(coupon.code.as_str(), "SAVE20")
            }
            other => panic!("Expected Valid, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn lookup_is_case_insensitive() {
        let handler = ValidateCouponHandler::new(Arc::new(MockCouponStore::with_coupon(save20())));
        let result = handler.handle(query("save20")).await.unwrap();
        assert!(matches!(result, ValidateCouponResult::Valid { .. }));
    }

    #[tokio::test]
    async fn expired_coupon_reports_expired_regardless_of_other_fields() {
        let mut coupon = save20();
        coupon.code = CouponCode::try_new("EXPIRED10").unwrap();
        coupon.valid_until = Some(Timestamp::now().minus_days(1));
        let handler = ValidateCouponHandler::new(Arc::new(MockCouponStore::with_coupon(coupon)));

        let result = handler.handle(query("EXPIRED10")).await.unwrap();
        assert!(matches!(
            result,
            ValidateCouponResult::Invalid {
                reason: CouponInvalidReason::Expired
            }
        ));
    }

    #[tokio::test]
    async fn exhausted_coupon_reports_exhausted() {
        let mut coupon = save20();
        coupon.current_redemptions = 100;
        let handler = ValidateCouponHandler::new(Arc::new(MockCouponStore::with_coupon(coupon)));

        let result = handler.handle(query("SAVE20")).await.unwrap();
        assert!(matches!(
            result,
            ValidateCouponResult::Invalid {
                reason: CouponInvalidReason::Exhausted
            }
        ));
    }

    #[tokio::test]
    async fn used_coupon_reports_already_used() {
        let coupon = save20();
        let store = MockCouponStore::with_coupon(coupon.clone());
        store.mark_redeemed(&user(), coupon.id);
        let handler = ValidateCouponHandler::new(Arc::new(store));

        let result = handler.handle(query("SAVE20")).await.unwrap();
        assert!(matches!(result, ValidateCouponResult::AlreadyUsed { .. }));
    }

    #[tokio::test]
    async fn inactive_coupon_reports_inactive_before_ledger_check() {
        let mut coupon = save20();
        coupon.active = false;
        let store = MockCouponStore::with_coupon(coupon.clone());
        // Even a user who already redeemed sees INACTIVE first.
        store.mark_redeemed(&user(), coupon.id);
        let handler = ValidateCouponHandler::new(Arc::new(store));

        let result = handler.handle(query("SAVE20")).await.unwrap();
        assert!(matches!(
            result,
            ValidateCouponResult::Invalid {
                reason: CouponInvalidReason::Inactive
            }
        ));
    }
}

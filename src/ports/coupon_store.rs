//! Coupon store port.
//!
//! Defines the contract for coupon lookup and redemption against external
//! storage. Validation itself is pure (`Coupon::validate`); this port
//! covers the reads around it and the one concurrency-critical write.
//!
//! # Atomicity contract
//!
//! `redeem` must insert the `(user, coupon)` ledger row and increment the
//! redemption counter as a single atomic unit, re-checking the cap inside
//! that unit. Implementations rely on a storage-level uniqueness
//! constraint for the ledger and a conditional update for the counter,
//! never on a prior read: two requests that both passed the pre-checks
//! must still resolve to exactly one winner.

use async_trait::async_trait;

use crate::domain::coupon::{Coupon, CouponCode};
use crate::domain::foundation::{CouponId, DomainError, Timestamp, UserId};

/// Outcome of an atomic redemption attempt.
///
/// These are data, not errors: each maps to a distinct user-facing
/// message at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemOutcome {
    /// The ledger row was inserted and the counter incremented.
    Redeemed,

    /// The `(user, coupon)` ledger row already existed. The uniqueness
    /// constraint is the authoritative signal; any earlier existence
    /// check was advisory only.
    AlreadyRedeemed,

    /// The conditional counter increment matched zero rows: a concurrent
    /// redemption reached the cap first, or the coupon was deactivated
    /// between the pre-check and the write.
    RaceLost,
}

/// Port for coupon storage.
#[async_trait]
pub trait CouponStore: Send + Sync {
    /// Looks up a coupon by its normalized code.
    ///
    /// Returns `None` for unknown codes.
    async fn find_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, DomainError>;

    /// Checks the usage ledger for an existing `(user, coupon)` row.
    ///
    /// Advisory pre-check only; `redeem` re-verifies atomically.
    async fn already_redeemed(
        &self,
        user_id: &UserId,
        coupon_id: CouponId,
    ) -> Result<bool, DomainError>;

    /// Atomically records a redemption: ledger insert plus guarded
    /// counter increment, all-or-nothing.
    async fn redeem(
        &self,
        user_id: &UserId,
        coupon_id: CouponId,
        redeemed_at: Timestamp,
    ) -> Result<RedeemOutcome, DomainError>;
}

//! PostgreSQL implementation of CouponStore.
//!
//! The redemption write is the concurrency-critical piece of the whole
//! engine. It runs as one transaction:
//!
//! 1. `INSERT ... ON CONFLICT DO NOTHING` into the ledger - the primary
//!    key on `(user_id, coupon_id)` is the authoritative
//!    already-redeemed signal
//! 2. `UPDATE coupons SET current_redemptions = current_redemptions + 1
//!    WHERE ... current_redemptions < max_redemptions` - the row lock
//!    serializes concurrent increments and the predicate re-checks the
//!    cap after the lock is acquired
//!
//! Two requests racing for the final slot therefore resolve to exactly
//! one `Redeemed` and one `RaceLost`, with no application-level locks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::coupon::{Coupon, CouponCode, Discount, DiscountType};
use crate::domain::entitlement::SubscriptionTier;
use crate::domain::foundation::{CouponId, DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{CouponStore, RedeemOutcome};

/// PostgreSQL implementation of the CouponStore port.
pub struct PostgresCouponStore {
    pool: PgPool,
}

impl PostgresCouponStore {
    /// Creates a new PostgresCouponStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a coupon.
#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: Uuid,
    code: String,
    discount_type: String,
    discount_value: i64,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
    max_redemptions: Option<i32>,
    current_redemptions: i32,
    active: bool,
    applies_to_tier: Option<String>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = DomainError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        let code = CouponCode::try_new(&row.code).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid stored code: {}", e))
        })?;

        let applies_to_tier = row.applies_to_tier.as_deref().map(parse_tier).transpose()?;

        Ok(Coupon {
            id: CouponId::from_uuid(row.id),
            code,
            discount: Discount {
                discount_type: parse_discount_type(&row.discount_type)?,
                value: row.discount_value,
            },
            valid_from: row.valid_from.map(Timestamp::from_datetime),
            valid_until: row.valid_until.map(Timestamp::from_datetime),
            max_redemptions: row.max_redemptions.map(|n| n.max(0) as u32),
            current_redemptions: row.current_redemptions.max(0) as u32,
            active: row.active,
            applies_to_tier,
        })
    }
}

fn parse_discount_type(s: &str) -> Result<DiscountType, DomainError> {
    match s {
        "percentage" => Ok(DiscountType::Percentage),
        "fixed" => Ok(DiscountType::Fixed),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid discount_type value: {}", s),
        )),
    }
}

fn parse_tier(s: &str) -> Result<SubscriptionTier, DomainError> {
    match s.to_lowercase().as_str() {
        "free" => Ok(SubscriptionTier::Free),
        "basic" => Ok(SubscriptionTier::Basic),
        "premium" => Ok(SubscriptionTier::Premium),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid tier value: {}", s),
        )),
    }
}

#[async_trait]
impl CouponStore for PostgresCouponStore {
    async fn find_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, DomainError> {
        // Codes are stored normalized; the value object already
        // uppercased the input, so this is the case-insensitive lookup.
        let row: Option<CouponRow> = sqlx::query_as(
            r#"
            SELECT id, code, discount_type, discount_value, valid_from, valid_until,
                   max_redemptions, current_redemptions, active, applies_to_tier
            FROM coupons
            WHERE code = $1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to look up coupon: {}", e),
            )
        })?;

        row.map(Coupon::try_from).transpose()
    }

    async fn already_redeemed(
        &self,
        user_id: &UserId,
        coupon_id: CouponId,
    ) -> Result<bool, DomainError> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            SELECT 1 FROM coupon_redemptions
            WHERE user_id = $1 AND coupon_id = $2
            "#,
        )
        .bind(user_id.as_str())
        .bind(coupon_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to check redemption ledger: {}", e),
            )
        })?;

        Ok(row.is_some())
    }

    async fn redeem(
        &self,
        user_id: &UserId,
        coupon_id: CouponId,
        redeemed_at: Timestamp,
    ) -> Result<RedeemOutcome, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to begin transaction: {}", e),
            )
        })?;

        let ledger_insert = sqlx::query(
            r#"
            INSERT INTO coupon_redemptions (user_id, coupon_id, redeemed_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, coupon_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_str())
        .bind(coupon_id.as_uuid())
        .bind(redeemed_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to insert redemption: {}", e),
            )
        })?;

        if ledger_insert.rows_affected() == 0 {
            tx.rollback().await.ok();
            return Ok(RedeemOutcome::AlreadyRedeemed);
        }

        let counter_update = sqlx::query(
            r#"
            UPDATE coupons
            SET current_redemptions = current_redemptions + 1,
                updated_at = $2
            WHERE id = $1
              AND active
              AND (max_redemptions IS NULL OR current_redemptions < max_redemptions)
            "#,
        )
        .bind(coupon_id.as_uuid())
        .bind(redeemed_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to increment redemption counter: {}", e),
            )
        })?;

        if counter_update.rows_affected() == 0 {
            // Cap reached (or coupon deactivated) after the pre-check;
            // roll the ledger row back with the transaction.
            tx.rollback().await.map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to roll back redemption: {}", e),
                )
            })?;
            return Ok(RedeemOutcome::RaceLost);
        }

        tx.commit().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to commit redemption: {}", e),
            )
        })?;

        Ok(RedeemOutcome::Redeemed)
    }
}

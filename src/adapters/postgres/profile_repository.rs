//! PostgreSQL implementation of ProfileRepository.
//!
//! The billing-sync write carries its staleness condition in the UPDATE
//! predicate itself, so independent handlers on different machines
//! converge to the newest provider event without application locks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::entitlement::{SubscriptionStatus, SubscriptionTier, UserProfile};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{ProfileRepository, ProfileSyncResult};

/// PostgreSQL implementation of the ProfileRepository port.
pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    /// Creates a new PostgresProfileRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a profile.
#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    user_id: String,
    subscription_tier: String,
    subscription_status: String,
    stripe_customer_id: Option<String>,
    stripe_subscription_id: Option<String>,
    billing_synced_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for UserProfile {
    type Error = DomainError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(UserProfile {
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            subscription_tier: parse_tier(&row.subscription_tier)?,
            status: parse_status(&row.subscription_status)?,
            stripe_customer_id: row.stripe_customer_id,
            stripe_subscription_id: row.stripe_subscription_id,
            billing_synced_at: row.billing_synced_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
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

fn tier_to_string(tier: &SubscriptionTier) -> &'static str {
    match tier {
        SubscriptionTier::Free => "free",
        SubscriptionTier::Basic => "basic",
        SubscriptionTier::Premium => "premium",
    }
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    match s.to_lowercase().as_str() {
        "not_subscribed" => Ok(SubscriptionStatus::NotSubscribed),
        "checkout_pending" => Ok(SubscriptionStatus::CheckoutPending),
        "active" => Ok(SubscriptionStatus::Active),
        "past_due" => Ok(SubscriptionStatus::PastDue),
        "canceled" => Ok(SubscriptionStatus::Canceled),
        "expired" => Ok(SubscriptionStatus::Expired),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid status value: {}", s),
        )),
    }
}

fn status_to_string(status: &SubscriptionStatus) -> &'static str {
    match status {
        SubscriptionStatus::NotSubscribed => "not_subscribed",
        SubscriptionStatus::CheckoutPending => "checkout_pending",
        SubscriptionStatus::Active => "active",
        SubscriptionStatus::PastDue => "past_due",
        SubscriptionStatus::Canceled => "canceled",
        SubscriptionStatus::Expired => "expired",
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT user_id, subscription_tier, subscription_status, stripe_customer_id,
           stripe_subscription_id, billing_synced_at, created_at, updated_at
    FROM profiles
"#;

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<UserProfile>, DomainError> {
        let row: Option<ProfileRow> =
            sqlx::query_as(&format!("{} WHERE user_id = $1", SELECT_COLUMNS))
                .bind(user_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Failed to load profile: {}", e),
                    )
                })?;

        row.map(UserProfile::try_from).transpose()
    }

    async fn find_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<UserProfile>, DomainError> {
        let row: Option<ProfileRow> =
            sqlx::query_as(&format!("{} WHERE stripe_customer_id = $1", SELECT_COLUMNS))
                .bind(customer_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Failed to load profile by customer: {}", e),
                    )
                })?;

        row.map(UserProfile::try_from).transpose()
    }

    async fn upsert(&self, profile: &UserProfile) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (
                user_id, subscription_tier, subscription_status, stripe_customer_id,
                stripe_subscription_id, billing_synced_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id) DO UPDATE SET
                subscription_tier = EXCLUDED.subscription_tier,
                subscription_status = EXCLUDED.subscription_status,
                stripe_customer_id = EXCLUDED.stripe_customer_id,
                stripe_subscription_id = EXCLUDED.stripe_subscription_id,
                billing_synced_at = EXCLUDED.billing_synced_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(profile.user_id.as_str())
        .bind(tier_to_string(&profile.subscription_tier))
        .bind(status_to_string(&profile.status))
        .bind(&profile.stripe_customer_id)
        .bind(&profile.stripe_subscription_id)
        .bind(profile.billing_synced_at.map(|t| *t.as_datetime()))
        .bind(profile.created_at.as_datetime())
        .bind(profile.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to upsert profile: {}", e),
            )
        })?;

        Ok(())
    }

    async fn apply_billing_sync(
        &self,
        profile: &UserProfile,
    ) -> Result<ProfileSyncResult, DomainError> {
        let synced_at = profile.billing_synced_at.map(|t| *t.as_datetime());

        let updated = sqlx::query(
            r#"
            UPDATE profiles
            SET subscription_tier = $2,
                subscription_status = $3,
                stripe_customer_id = $4,
                stripe_subscription_id = $5,
                billing_synced_at = $6,
                updated_at = $7
            WHERE user_id = $1
              AND (billing_synced_at IS NULL OR billing_synced_at <= $6)
            "#,
        )
        .bind(profile.user_id.as_str())
        .bind(tier_to_string(&profile.subscription_tier))
        .bind(status_to_string(&profile.status))
        .bind(&profile.stripe_customer_id)
        .bind(&profile.stripe_subscription_id)
        .bind(synced_at)
        .bind(profile.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to sync billing state: {}", e),
            )
        })?;

        if updated.rows_affected() > 0 {
            return Ok(ProfileSyncResult::Applied);
        }

        // Zero rows: either the watermark was newer or the row is gone.
        if self.find_by_user(&profile.user_id).await?.is_some() {
            Ok(ProfileSyncResult::Stale)
        } else {
            Err(DomainError::new(
                ErrorCode::ProfileNotFound,
                format!("No profile for user {}", profile.user_id),
            ))
        }
    }
}

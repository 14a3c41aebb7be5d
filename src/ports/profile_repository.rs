//! Profile repository port.
//!
//! Storage contract for `UserProfile` rows. The billing-sync write is
//! conditional at the storage layer so that independent request handlers
//! on different machines converge to the newest provider event.

use async_trait::async_trait;

use crate::domain::entitlement::UserProfile;
use crate::domain::foundation::{DomainError, UserId};

/// Outcome of a conditional billing-sync write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSyncResult {
    /// The profile row was updated.
    Applied,
    /// The stored watermark was newer than this event; nothing changed.
    Stale,
}

/// Port for user profile storage.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Finds a profile by user id.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<UserProfile>, DomainError>;

    /// Finds a profile by the provider's customer id.
    ///
    /// Used by the webhook path, where events carry customer ids rather
    /// than our user ids.
    async fn find_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<UserProfile>, DomainError>;

    /// Inserts or fully replaces a profile row.
    async fn upsert(&self, profile: &UserProfile) -> Result<(), DomainError>;

    /// Writes the billing fields of `profile` only if the stored
    /// `billing_synced_at` watermark is absent or not newer than the
    /// profile's.
    ///
    /// Implementations must express the condition in the store itself
    /// (e.g. `UPDATE ... WHERE billing_synced_at IS NULL OR
    /// billing_synced_at <= $1`), not as a read-then-write pair.
    async fn apply_billing_sync(
        &self,
        profile: &UserProfile,
    ) -> Result<ProfileSyncResult, DomainError>;
}

//! In-memory implementation of ProfileRepository.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::entitlement::UserProfile;
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::{ProfileRepository, ProfileSyncResult};

/// In-memory profile repository.
pub struct InMemoryProfileRepository {
    profiles: Mutex<HashMap<String, UserProfile>>,
}

impl InMemoryProfileRepository {
    pub fn new() -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryProfileRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<UserProfile>, DomainError> {
        let profiles = self.profiles.lock().unwrap();
        Ok(profiles.get(user_id.as_str()).cloned())
    }

    async fn find_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<UserProfile>, DomainError> {
        let profiles = self.profiles.lock().unwrap();
        Ok(profiles
            .values()
            .find(|p| p.stripe_customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn upsert(&self, profile: &UserProfile) -> Result<(), DomainError> {
        let mut profiles = self.profiles.lock().unwrap();
        profiles.insert(profile.user_id.to_string(), profile.clone());
        Ok(())
    }

    async fn apply_billing_sync(
        &self,
        profile: &UserProfile,
    ) -> Result<ProfileSyncResult, DomainError> {
        let mut profiles = self.profiles.lock().unwrap();
        let Some(stored) = profiles.get_mut(profile.user_id.as_str()) else {
            return Err(DomainError::new(
                ErrorCode::ProfileNotFound,
                format!("No profile for user {}", profile.user_id),
            ));
        };

        // Watermark re-check inside the critical section: a newer event
        // already applied by another task wins.
        if let (Some(stored_at), Some(incoming_at)) =
            (&stored.billing_synced_at, &profile.billing_synced_at)
        {
            if incoming_at.is_before(stored_at) {
                return Ok(ProfileSyncResult::Stale);
            }
        }

        stored.subscription_tier = profile.subscription_tier;
        stored.status = profile.status;
        stored.stripe_customer_id = profile.stripe_customer_id.clone();
        stored.stripe_subscription_id = profile.stripe_subscription_id.clone();
        stored.billing_synced_at = profile.billing_synced_at;
        stored.updated_at = profile.updated_at;
        Ok(ProfileSyncResult::Applied)
    }
}

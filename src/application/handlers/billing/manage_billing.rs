//! ManageBillingHandler - Query handler for the hosted billing portal.

use std::sync::Arc;

use crate::domain::entitlement::BillingError;
use crate::domain::foundation::UserId;
use crate::ports::{PaymentProvider, ProfileRepository};

/// Query for a hosted billing-portal session.
#[derive(Debug, Clone)]
pub struct ManageBillingQuery {
    pub user_id: UserId,
    pub return_url: String,
}

/// Result carrying the hosted portal URL.
#[derive(Debug, Clone)]
pub struct ManageBillingResult {
    pub portal_url: String,
}

/// Handler for billing-portal session creation.
///
/// Requires an existing provider customer; a user who never started a
/// checkout has nothing to manage.
pub struct ManageBillingHandler {
    profiles: Arc<dyn ProfileRepository>,
    payment: Arc<dyn PaymentProvider>,
}

impl ManageBillingHandler {
    pub fn new(profiles: Arc<dyn ProfileRepository>, payment: Arc<dyn PaymentProvider>) -> Self {
        Self { profiles, payment }
    }

    pub async fn handle(
        &self,
        query: ManageBillingQuery,
    ) -> Result<ManageBillingResult, BillingError> {
        let profile = self
            .profiles
            .find_by_user(&query.user_id)
            .await?
            .ok_or_else(|| BillingError::NoSubscription(query.user_id.clone()))?;

        let customer_id = profile
            .stripe_customer_id
            .ok_or_else(|| BillingError::NoSubscription(query.user_id.clone()))?;

        let session = self
            .payment
            .create_portal_session(&customer_id, &query.return_url)
            .await
            .map_err(|e| {
                tracing::error!(
                    user_id = %query.user_id,
                    provider_code = ?e.provider_code,
                    error = %e,
                    "Portal session creation failed"
                );
                BillingError::provider(e.message)
            })?;

        Ok(ManageBillingResult {
            portal_url: session.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryProfileRepository;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::domain::entitlement::UserProfile;
    use crate::domain::foundation::Timestamp;

    fn user() -> UserId {
        UserId::new("u1").unwrap()
    }

    fn query() -> ManageBillingQuery {
        ManageBillingQuery {
            user_id: user(),
            return_url: "https://kickoffhq.test/account".to_string(),
        }
    }

    #[tokio::test]
    async fn returns_portal_url_for_known_customer() {
        let profiles = Arc::new(InMemoryProfileRepository::new());
        let mut profile = UserProfile::new_free(user(), Timestamp::now());
        profile.begin_checkout("cus_abc", Timestamp::now()).unwrap();
        profiles.upsert(&profile).await.unwrap();

        let handler = ManageBillingHandler::new(profiles, Arc::new(MockPaymentProvider::new()));
        let result = handler.handle(query()).await.unwrap();
        assert!(result.portal_url.starts_with("https://"));
    }

    #[tokio::test]
    async fn unknown_user_has_no_subscription() {
        let handler = ManageBillingHandler::new(
            Arc::new(InMemoryProfileRepository::new()),
            Arc::new(MockPaymentProvider::new()),
        );
        let result = handler.handle(query()).await;
        assert!(matches!(result, Err(BillingError::NoSubscription(_))));
    }

    #[tokio::test]
    async fn user_without_customer_id_has_no_subscription() {
        let profiles = Arc::new(InMemoryProfileRepository::new());
        profiles
            .upsert(&UserProfile::new_free(user(), Timestamp::now()))
            .await
            .unwrap();

        let handler = ManageBillingHandler::new(profiles, Arc::new(MockPaymentProvider::new()));
        let result = handler.handle(query()).await;
        assert!(matches!(result, Err(BillingError::NoSubscription(_))));
    }
}

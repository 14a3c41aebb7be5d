//! HandleBillingWebhookHandler - idempotent webhook-driven state sync.
//!
//! The provider delivers subscription lifecycle events asynchronously
//! and possibly more than once, out of order. This handler:
//!
//! 1. Verifies the signature (via the payment provider port)
//! 2. Skips events already recorded (dedupe by provider event id)
//! 3. Maps the event to a profile billing update, applied
//!    last-writer-wins by the provider's event timestamp
//! 4. Records the event with its outcome; the record's primary key
//!    resolves concurrent deliveries of the same event to one winner

use std::sync::Arc;

use crate::domain::entitlement::{
    BillingError, BillingUpdate, PlanCatalog, SubscriptionStatus, SubscriptionTier, UserProfile,
};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{
    PaymentErrorCode, PaymentProvider, ProfileRepository, ProviderSubscriptionStatus, SaveResult,
    WebhookEvent, WebhookEventData, WebhookEventRecord, WebhookEventRepository, WebhookEventType,
    WebhookResult,
};

/// Command carrying one raw webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleBillingWebhookCommand {
    pub payload: Vec<u8>,
    pub signature: String,
}

/// What applying an event did.
enum ApplyOutcome {
    Applied,
    Ignored(String),
}

/// Handler for provider webhook deliveries.
pub struct HandleBillingWebhookHandler {
    profiles: Arc<dyn ProfileRepository>,
    webhook_events: Arc<dyn WebhookEventRepository>,
    payment: Arc<dyn PaymentProvider>,
    plans: PlanCatalog,
}

impl HandleBillingWebhookHandler {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        webhook_events: Arc<dyn WebhookEventRepository>,
        payment: Arc<dyn PaymentProvider>,
        plans: PlanCatalog,
    ) -> Self {
        Self {
            profiles,
            webhook_events,
            payment,
            plans,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleBillingWebhookCommand,
    ) -> Result<WebhookResult, BillingError> {
        // 1. Verify before anything else; an unverified payload is noise.
        let event = self
            .payment
            .verify_webhook(&cmd.payload, &cmd.signature)
            .await
            .map_err(|e| match e.code {
                PaymentErrorCode::InvalidWebhook => {
                    tracing::warn!(error = %e, "Rejected webhook with invalid signature");
                    BillingError::InvalidWebhookSignature
                }
                _ => BillingError::provider(e.message),
            })?;

        // 2. Fast-path dedupe.
        if self
            .webhook_events
            .find_by_event_id(&event.id)
            .await?
            .is_some()
        {
            tracing::debug!(event_id = %event.id, "Webhook event already processed");
            return Ok(WebhookResult::AlreadyProcessed);
        }

        // 3. Apply.
        let applied = self.apply(&event).await;

        // 4. Record the outcome. The primary key on event_id decides
        //    races between concurrent deliveries: first save wins.
        let event_type = event_type_label(&event.event_type);
        let payload = serde_json::to_value(&event)
            .map_err(|e| BillingError::infrastructure(format!("Event not serializable: {}", e)))?;

        let record = match &applied {
            Ok(ApplyOutcome::Applied) => {
                WebhookEventRecord::success(&event.id, event_type, payload)
            }
            Ok(ApplyOutcome::Ignored(reason)) => {
                WebhookEventRecord::ignored(&event.id, event_type, reason.as_str(), payload)
            }
            Err(e) => WebhookEventRecord::failed(&event.id, event_type, e.to_string(), payload),
        };

        match self.webhook_events.save(record).await? {
            SaveResult::Inserted => match applied {
                Ok(ApplyOutcome::Applied) => {
                    tracing::info!(event_id = %event.id, event_type, "Webhook event applied");
                    Ok(WebhookResult::Processed)
                }
                Ok(ApplyOutcome::Ignored(reason)) => {
                    tracing::debug!(event_id = %event.id, event_type, %reason, "Webhook event ignored");
                    Ok(WebhookResult::Processed)
                }
                Err(e) => Err(e),
            },
            SaveResult::AlreadyExists => {
                // Lost the race; another delivery handled this event.
                Ok(WebhookResult::AlreadyProcessed)
            }
        }
    }

    async fn apply(&self, event: &WebhookEvent) -> Result<ApplyOutcome, BillingError> {
        let event_at = Timestamp::from_unix(event.created_at);

        match &event.data {
            WebhookEventData::Checkout {
                customer_id,
                subscription_id,
                user_id,
                plan,
                ..
            } => {
                self.apply_checkout_completed(
                    customer_id,
                    subscription_id.clone(),
                    user_id.as_deref(),
                    *plan,
                    event_at,
                )
                .await
            }

            WebhookEventData::Subscription {
                subscription_id,
                customer_id,
                status,
                price_id,
                ..
            } => {
                let domain_status = if event.event_type == WebhookEventType::SubscriptionDeleted {
                    SubscriptionStatus::Expired
                } else {
                    map_provider_status(*status)
                };
                self.apply_subscription_update(
                    customer_id,
                    subscription_id.clone(),
                    domain_status,
                    price_id.as_deref(),
                    event_at,
                )
                .await
            }

            WebhookEventData::Invoice { customer_id, .. } => {
                if event.event_type == WebhookEventType::InvoicePaymentFailed {
                    self.apply_payment_failed(customer_id, event_at).await
                } else {
                    Ok(ApplyOutcome::Ignored(format!(
                        "Unhandled invoice event: {:?}",
                        event.event_type
                    )))
                }
            }

            WebhookEventData::Raw { .. } => Ok(ApplyOutcome::Ignored(format!(
                "Unhandled event type: {:?}",
                event.event_type
            ))),
        }
    }

    /// checkout.session.completed: link provider ids to the user and
    /// activate the purchased plan.
    async fn apply_checkout_completed(
        &self,
        customer_id: &str,
        subscription_id: Option<String>,
        metadata_user_id: Option<&str>,
        plan: Option<SubscriptionTier>,
        event_at: Timestamp,
    ) -> Result<ApplyOutcome, BillingError> {
        let Some(plan) = plan else {
            // A session without plan metadata still gets synced by the
            // subscription.created event that follows it.
            return Ok(ApplyOutcome::Ignored(
                "Checkout session carries no plan metadata".to_string(),
            ));
        };

        let (profile, bootstrap) = self
            .resolve_profile(metadata_user_id, customer_id, event_at)
            .await?;
        let Some(mut profile) = profile else {
            return Err(BillingError::infrastructure(format!(
                "No profile resolvable for customer {}",
                customer_id
            )));
        };

        if profile.stripe_customer_id.is_none() {
            profile.stripe_customer_id = Some(customer_id.to_string());
        }

        let update = BillingUpdate {
            tier: plan,
            status: SubscriptionStatus::Active,
            stripe_subscription_id: subscription_id,
            event_at,
        };
        self.sync(profile, update, bootstrap).await
    }

    /// customer.subscription.*: sync status and price-derived tier.
    async fn apply_subscription_update(
        &self,
        customer_id: &str,
        subscription_id: String,
        status: SubscriptionStatus,
        price_id: Option<&str>,
        event_at: Timestamp,
    ) -> Result<ApplyOutcome, BillingError> {
        let Some(profile) = self.profiles.find_by_customer(customer_id).await? else {
            return Err(BillingError::infrastructure(format!(
                "No profile for customer {}",
                customer_id
            )));
        };

        // An unrecognized price keeps the previously synced tier rather
        // than guessing; the status alone still applies.
        let tier = price_id
            .and_then(|p| self.plans.tier_for_price(p))
            .unwrap_or(profile.subscription_tier);

        let update = BillingUpdate {
            tier,
            status,
            stripe_subscription_id: Some(subscription_id),
            event_at,
        };
        self.sync(profile, update, false).await
    }

    /// invoice.payment_failed: enter the past-due grace period.
    async fn apply_payment_failed(
        &self,
        customer_id: &str,
        event_at: Timestamp,
    ) -> Result<ApplyOutcome, BillingError> {
        let Some(profile) = self.profiles.find_by_customer(customer_id).await? else {
            return Err(BillingError::infrastructure(format!(
                "No profile for customer {}",
                customer_id
            )));
        };

        let update = BillingUpdate {
            tier: profile.subscription_tier,
            status: SubscriptionStatus::PastDue,
            stripe_subscription_id: profile.stripe_subscription_id.clone(),
            event_at,
        };
        self.sync(profile, update, false).await
    }

    /// Resolves the profile for a checkout event: metadata user id first,
    /// then the customer id. A known user id with no profile row is
    /// bootstrapped so the purchase is never dropped.
    async fn resolve_profile(
        &self,
        metadata_user_id: Option<&str>,
        customer_id: &str,
        now: Timestamp,
    ) -> Result<(Option<UserProfile>, bool), BillingError> {
        if let Some(raw) = metadata_user_id {
            if let Ok(user_id) = UserId::new(raw) {
                if let Some(profile) = self.profiles.find_by_user(&user_id).await? {
                    return Ok((Some(profile), false));
                }
                return Ok((Some(UserProfile::new_free(user_id, now)), true));
            }
        }
        Ok((self.profiles.find_by_customer(customer_id).await?, false))
    }

    async fn sync(
        &self,
        mut profile: UserProfile,
        update: BillingUpdate,
        bootstrap: bool,
    ) -> Result<ApplyOutcome, BillingError> {
        use crate::domain::entitlement::SyncOutcome;

        match profile.apply_billing_update(update, Timestamp::now()) {
            SyncOutcome::Stale => {
                return Ok(ApplyOutcome::Ignored(
                    "Event older than last applied billing event".to_string(),
                ))
            }
            SyncOutcome::Applied => {}
        }

        if bootstrap {
            self.profiles.upsert(&profile).await?;
        } else {
            // The store re-checks the watermark; a newer event applied by
            // another machine in the meantime wins.
            use crate::ports::ProfileSyncResult;
            if self.profiles.apply_billing_sync(&profile).await? == ProfileSyncResult::Stale {
                return Ok(ApplyOutcome::Ignored(
                    "A newer billing event was applied concurrently".to_string(),
                ));
            }
        }
        Ok(ApplyOutcome::Applied)
    }
}

fn map_provider_status(status: ProviderSubscriptionStatus) -> SubscriptionStatus {
    match status {
        ProviderSubscriptionStatus::Active | ProviderSubscriptionStatus::Trialing => {
            SubscriptionStatus::Active
        }
        ProviderSubscriptionStatus::PastDue => SubscriptionStatus::PastDue,
        ProviderSubscriptionStatus::Canceled => SubscriptionStatus::Canceled,
        ProviderSubscriptionStatus::Incomplete => SubscriptionStatus::CheckoutPending,
        ProviderSubscriptionStatus::IncompleteExpired
        | ProviderSubscriptionStatus::Paused
        | ProviderSubscriptionStatus::Unknown => SubscriptionStatus::Expired,
    }
}

fn event_type_label(event_type: &WebhookEventType) -> &'static str {
    match event_type {
        WebhookEventType::CheckoutSessionCompleted => "checkout.session.completed",
        WebhookEventType::SubscriptionCreated => "customer.subscription.created",
        WebhookEventType::SubscriptionUpdated => "customer.subscription.updated",
        WebhookEventType::SubscriptionDeleted => "customer.subscription.deleted",
        WebhookEventType::InvoicePaymentFailed => "invoice.payment_failed",
        WebhookEventType::Unknown(_) => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryProfileRepository, InMemoryWebhookEventRepository};
    use crate::adapters::stripe::MockPaymentProvider;

    fn plans() -> PlanCatalog {
        PlanCatalog::new("price_basic_999", "price_premium_1999")
    }

    struct Fixture {
        profiles: Arc<InMemoryProfileRepository>,
        events: Arc<InMemoryWebhookEventRepository>,
        payment: Arc<MockPaymentProvider>,
        handler: HandleBillingWebhookHandler,
    }

    fn fixture() -> Fixture {
        let profiles = Arc::new(InMemoryProfileRepository::new());
        let events = Arc::new(InMemoryWebhookEventRepository::new());
        let payment = Arc::new(MockPaymentProvider::new());
        let handler = HandleBillingWebhookHandler::new(
            profiles.clone(),
            events.clone(),
            payment.clone(),
            plans(),
        );
        Fixture {
            profiles,
            events,
            payment,
            handler,
        }
    }

    fn checkout_event(id: &str, created: i64) -> WebhookEvent {
        WebhookEvent {
            id: id.to_string(),
            event_type: WebhookEventType::CheckoutSessionCompleted,
            data: WebhookEventData::Checkout {
                session_id: "cs_1".to_string(),
                customer_id: "cus_1".to_string(),
                subscription_id: Some("sub_1".to_string()),
                user_id: Some("u1".to_string()),
                plan: Some(SubscriptionTier::Premium),
            },
            created_at: created,
        }
    }

    fn subscription_event(
        id: &str,
        created: i64,
        status: ProviderSubscriptionStatus,
        event_type: WebhookEventType,
    ) -> WebhookEvent {
        WebhookEvent {
            id: id.to_string(),
            event_type,
            data: WebhookEventData::Subscription {
                subscription_id: "sub_1".to_string(),
                customer_id: "cus_1".to_string(),
                status,
                price_id: Some("price_basic_999".to_string()),
                current_period_end: created + 30 * 86_400,
            },
            created_at: created,
        }
    }

    fn cmd_for(fx: &Fixture, event: &WebhookEvent) -> HandleBillingWebhookCommand {
        let payload = serde_json::to_vec(event).unwrap();
        let signature = fx.payment.sign(event);
        HandleBillingWebhookCommand { payload, signature }
    }

    async fn premium_user(fx: &Fixture) {
        fx.handler
            .handle(cmd_for(fx, &checkout_event("evt_1", 1_700_000_000)))
            .await
            .unwrap();
    }

    fn user() -> UserId {
        UserId::new("u1").unwrap()
    }

    #[tokio::test]
    async fn checkout_completed_activates_plan_for_metadata_user() {
        let fx = fixture();
        let result = fx
            .handler
            .handle(cmd_for(&fx, &checkout_event("evt_1", 1_700_000_000)))
            .await
            .unwrap();
        assert_eq!(result, WebhookResult::Processed);

        let profile = fx.profiles.find_by_user(&user()).await.unwrap().unwrap();
        assert_eq!(profile.subscription_tier, SubscriptionTier::Premium);
        assert_eq!(profile.status, SubscriptionStatus::Active);
        assert_eq!(profile.stripe_customer_id.as_deref(), Some("cus_1"));
        assert_eq!(profile.stripe_subscription_id.as_deref(), Some("sub_1"));
    }

    #[tokio::test]
    async fn replaying_the_same_event_applies_once() {
        let fx = fixture();
        let event = checkout_event("evt_1", 1_700_000_000);

        let first = fx.handler.handle(cmd_for(&fx, &event)).await.unwrap();
        let second = fx.handler.handle(cmd_for(&fx, &event)).await.unwrap();

        assert_eq!(first, WebhookResult::Processed);
        assert_eq!(second, WebhookResult::AlreadyProcessed);
        assert_eq!(fx.events.len(), 1);
    }

    #[tokio::test]
    async fn invalid_signature_is_rejected_before_any_state_change() {
        let fx = fixture();
        let event = checkout_event("evt_1", 1_700_000_000);
        let result = fx
            .handler
            .handle(HandleBillingWebhookCommand {
                payload: serde_json::to_vec(&event).unwrap(),
                signature: "t=0,v1=deadbeef".to_string(),
            })
            .await;

        assert!(matches!(result, Err(BillingError::InvalidWebhookSignature)));
        assert!(fx.profiles.find_by_user(&user()).await.unwrap().is_none());
        assert_eq!(fx.events.len(), 0);
    }

    #[tokio::test]
    async fn subscription_update_downgrades_tier_via_price() {
        let fx = fixture();
        premium_user(&fx).await;

        fx.handler
            .handle(cmd_for(
                &fx,
                &subscription_event(
                    "evt_2",
                    1_700_000_100,
                    ProviderSubscriptionStatus::Active,
                    WebhookEventType::SubscriptionUpdated,
                ),
            ))
            .await
            .unwrap();

        let profile = fx.profiles.find_by_user(&user()).await.unwrap().unwrap();
        assert_eq!(profile.subscription_tier, SubscriptionTier::Basic);
    }

    #[tokio::test]
    async fn out_of_order_older_event_does_not_clobber_newer_state() {
        let fx = fixture();
        premium_user(&fx).await; // created at 1_700_000_000

        // An older (pre-checkout) subscription event arrives late.
        let result = fx
            .handler
            .handle(cmd_for(
                &fx,
                &subscription_event(
                    "evt_0",
                    1_699_999_000,
                    ProviderSubscriptionStatus::Incomplete,
                    WebhookEventType::SubscriptionCreated,
                ),
            ))
            .await
            .unwrap();
        assert_eq!(result, WebhookResult::Processed);

        let profile = fx.profiles.find_by_user(&user()).await.unwrap().unwrap();
        assert_eq!(profile.subscription_tier, SubscriptionTier::Premium);
        assert_eq!(profile.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn subscription_deleted_expires_and_downgrades_to_free() {
        let fx = fixture();
        premium_user(&fx).await;

        fx.handler
            .handle(cmd_for(
                &fx,
                &subscription_event(
                    "evt_3",
                    1_700_000_200,
                    ProviderSubscriptionStatus::Canceled,
                    WebhookEventType::SubscriptionDeleted,
                ),
            ))
            .await
            .unwrap();

        let profile = fx.profiles.find_by_user(&user()).await.unwrap().unwrap();
        assert_eq!(profile.status, SubscriptionStatus::Expired);
        assert_eq!(profile.subscription_tier, SubscriptionTier::Free);
    }

    #[tokio::test]
    async fn payment_failed_enters_grace_keeping_tier() {
        let fx = fixture();
        premium_user(&fx).await;

        let event = WebhookEvent {
            id: "evt_4".to_string(),
            event_type: WebhookEventType::InvoicePaymentFailed,
            data: WebhookEventData::Invoice {
                invoice_id: "in_1".to_string(),
                customer_id: "cus_1".to_string(),
                subscription_id: Some("sub_1".to_string()),
            },
            created_at: 1_700_000_300,
        };
        fx.handler.handle(cmd_for(&fx, &event)).await.unwrap();

        let profile = fx.profiles.find_by_user(&user()).await.unwrap().unwrap();
        assert_eq!(profile.status, SubscriptionStatus::PastDue);
        assert_eq!(profile.subscription_tier, SubscriptionTier::Premium);
    }

    #[tokio::test]
    async fn unknown_event_type_is_acknowledged_and_recorded_as_ignored() {
        let fx = fixture();
        let event = WebhookEvent {
            id: "evt_5".to_string(),
            event_type: WebhookEventType::Unknown("charge.refunded".to_string()),
            data: WebhookEventData::Raw {
                json: "{}".to_string(),
            },
            created_at: 1_700_000_400,
        };

        let result = fx.handler.handle(cmd_for(&fx, &event)).await.unwrap();
        assert_eq!(result, WebhookResult::Processed);
        assert_eq!(fx.events.len(), 1);
    }
}

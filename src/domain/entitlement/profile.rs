//! User profile aggregate.
//!
//! Holds the effective subscription state for one user: the tier that
//! gates content, the billing lifecycle status, and the provider ids
//! needed to manage the subscription. The profile is mutated by the
//! checkout flow and by provider webhook events, never directly by the
//! user.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{StateMachine, Timestamp, UserId, ValidationError};

use super::{SubscriptionStatus, SubscriptionTier};

/// A user's subscription profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,

    /// Effective tier used for every access decision.
    pub subscription_tier: SubscriptionTier,

    /// Billing lifecycle status.
    pub status: SubscriptionStatus,

    /// Provider customer id, set once the first checkout is created.
    pub stripe_customer_id: Option<String>,

    /// Provider subscription id, set once the provider confirms.
    pub stripe_subscription_id: Option<String>,

    /// Provider timestamp of the last applied billing event.
    ///
    /// Webhook events may arrive out of order; an event older than this
    /// watermark is stale and must not be applied.
    pub billing_synced_at: Option<Timestamp>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A billing state change derived from one provider event.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingUpdate {
    /// Tier the provider's price maps to. Downgraded to Free when the
    /// status no longer retains paid access.
    pub tier: SubscriptionTier,
    pub status: SubscriptionStatus,
    pub stripe_subscription_id: Option<String>,
    /// Provider-side creation time of the event that produced this update.
    pub event_at: Timestamp,
}

/// Outcome of applying a billing update to the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The update was newer than the watermark and has been applied.
    Applied,
    /// The update was older than an already-applied event; nothing changed.
    Stale,
}

impl UserProfile {
    /// Creates a fresh free-tier profile for a user with no billing history.
    pub fn new_free(user_id: UserId, now: Timestamp) -> Self {
        Self {
            user_id,
            subscription_tier: SubscriptionTier::Free,
            status: SubscriptionStatus::NotSubscribed,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            billing_synced_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if this user may view content gated at `required`.
    pub fn can_access(&self, required: SubscriptionTier) -> bool {
        self.subscription_tier.has_access(required)
    }

    /// Moves the profile into the checkout-pending state and records the
    /// provider customer id.
    ///
    /// Paid access is NOT granted here; only a confirmed provider event
    /// activates the subscription.
    pub fn begin_checkout(
        &mut self,
        customer_id: impl Into<String>,
        now: Timestamp,
    ) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(SubscriptionStatus::CheckoutPending)?;
        self.stripe_customer_id = Some(customer_id.into());
        self.updated_at = now;
        Ok(())
    }

    /// Applies a provider-driven billing update, last-writer-wins by the
    /// provider's event timestamp.
    ///
    /// The provider is authoritative for lifecycle status, so no state
    /// machine validation happens here; stale events are the only thing
    /// rejected. When the new status does not retain paid access the
    /// effective tier falls back to Free in the same step.
    pub fn apply_billing_update(&mut self, update: BillingUpdate, now: Timestamp) -> SyncOutcome {
        if let Some(watermark) = &self.billing_synced_at {
            if update.event_at.is_before(watermark) {
                return SyncOutcome::Stale;
            }
        }

        self.subscription_tier = if update.status.retains_paid_access() {
            update.tier
        } else {
            SubscriptionTier::Free
        };
        self.status = update.status;
        if update.stripe_subscription_id.is_some() {
            self.stripe_subscription_id = update.stripe_subscription_id;
        }
        self.billing_synced_at = Some(update.event_at);
        self.updated_at = now;
        SyncOutcome::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new("user-42").unwrap()
    }

    fn profile() -> UserProfile {
        UserProfile::new_free(user(), Timestamp::now())
    }

    fn active_update(event_at: Timestamp) -> BillingUpdate {
        BillingUpdate {
            tier: SubscriptionTier::Premium,
            status: SubscriptionStatus::Active,
            stripe_subscription_id: Some("sub_123".to_string()),
            event_at,
        }
    }

    #[test]
    fn new_profile_starts_free_and_unsubscribed() {
        let profile = profile();
        assert_eq!(profile.subscription_tier, SubscriptionTier::Free);
        assert_eq!(profile.status, SubscriptionStatus::NotSubscribed);
        assert!(profile.billing_synced_at.is_none());
    }

    #[test]
    fn free_profile_accesses_free_content_only() {
        let profile = profile();
        assert!(profile.can_access(SubscriptionTier::Free));
        assert!(!profile.can_access(SubscriptionTier::Basic));
        assert!(!profile.can_access(SubscriptionTier::Premium));
    }

    #[test]
    fn basic_profile_denied_premium_content() {
        let mut profile = profile();
        profile.apply_billing_update(
            BillingUpdate {
                tier: SubscriptionTier::Basic,
                status: SubscriptionStatus::Active,
                stripe_subscription_id: None,
                event_at: Timestamp::now(),
            },
            Timestamp::now(),
        );
        assert!(profile.can_access(SubscriptionTier::Free));
        assert!(profile.can_access(SubscriptionTier::Basic));
        assert!(!profile.can_access(SubscriptionTier::Premium));
    }

    #[test]
    fn begin_checkout_records_customer_and_pending_state() {
        let mut profile = profile();
        profile.begin_checkout("cus_abc", Timestamp::now()).unwrap();
        assert_eq!(profile.status, SubscriptionStatus::CheckoutPending);
        assert_eq!(profile.stripe_customer_id.as_deref(), Some("cus_abc"));
        // Still no paid access until the provider confirms.
        assert_eq!(profile.subscription_tier, SubscriptionTier::Free);
    }

    #[test]
    fn begin_checkout_rejected_while_active() {
        let mut profile = profile();
        profile.apply_billing_update(active_update(Timestamp::now()), Timestamp::now());
        assert!(profile.begin_checkout("cus_abc", Timestamp::now()).is_err());
    }

    #[test]
    fn billing_update_applies_tier_and_status() {
        let mut profile = profile();
        let event_at = Timestamp::now();
        let outcome = profile.apply_billing_update(active_update(event_at), Timestamp::now());

        assert_eq!(outcome, SyncOutcome::Applied);
        assert_eq!(profile.subscription_tier, SubscriptionTier::Premium);
        assert_eq!(profile.status, SubscriptionStatus::Active);
        assert_eq!(profile.stripe_subscription_id.as_deref(), Some("sub_123"));
        assert_eq!(profile.billing_synced_at, Some(event_at));
    }

    #[test]
    fn stale_event_is_skipped() {
        let mut profile = profile();
        let newer = Timestamp::now();
        let older = newer.minus_days(1);

        profile.apply_billing_update(active_update(newer), Timestamp::now());

        let outcome = profile.apply_billing_update(
            BillingUpdate {
                tier: SubscriptionTier::Free,
                status: SubscriptionStatus::Expired,
                stripe_subscription_id: None,
                event_at: older,
            },
            Timestamp::now(),
        );

        assert_eq!(outcome, SyncOutcome::Stale);
        assert_eq!(profile.subscription_tier, SubscriptionTier::Premium);
        assert_eq!(profile.status, SubscriptionStatus::Active);
    }

    #[test]
    fn expired_status_downgrades_tier_to_free() {
        let mut profile = profile();
        let first = Timestamp::now();
        profile.apply_billing_update(active_update(first), Timestamp::now());

        profile.apply_billing_update(
            BillingUpdate {
                tier: SubscriptionTier::Premium,
                status: SubscriptionStatus::Expired,
                stripe_subscription_id: None,
                event_at: first.add_days(30),
            },
            Timestamp::now(),
        );

        assert_eq!(profile.subscription_tier, SubscriptionTier::Free);
        assert_eq!(profile.status, SubscriptionStatus::Expired);
    }

    #[test]
    fn past_due_keeps_paid_tier_during_grace() {
        let mut profile = profile();
        let first = Timestamp::now();
        profile.apply_billing_update(active_update(first), Timestamp::now());

        profile.apply_billing_update(
            BillingUpdate {
                tier: SubscriptionTier::Premium,
                status: SubscriptionStatus::PastDue,
                stripe_subscription_id: None,
                event_at: first.add_days(1),
            },
            Timestamp::now(),
        );

        assert_eq!(profile.subscription_tier, SubscriptionTier::Premium);
        assert_eq!(profile.status, SubscriptionStatus::PastDue);
    }

    #[test]
    fn update_without_subscription_id_keeps_existing() {
        let mut profile = profile();
        let first = Timestamp::now();
        profile.apply_billing_update(active_update(first), Timestamp::now());

        profile.apply_billing_update(
            BillingUpdate {
                tier: SubscriptionTier::Premium,
                status: SubscriptionStatus::Active,
                stripe_subscription_id: None,
                event_at: first.add_days(1),
            },
            Timestamp::now(),
        );

        assert_eq!(profile.stripe_subscription_id.as_deref(), Some("sub_123"));
    }
}

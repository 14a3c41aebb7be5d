//! Subscription status state machine.
//!
//! Defines all possible subscription states and valid transitions
//! according to the billing lifecycle.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Subscription status.
///
/// Represents the current state of a user's subscription in the
/// payment lifecycle. Transitions are driven by the checkout flow and
/// asynchronous provider events, never directly by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// No subscription has ever been started. Free-tier access only.
    NotSubscribed,

    /// A hosted checkout session was created and payment is pending.
    /// No paid access until the provider confirms.
    CheckoutPending,

    /// Fully paid subscription with complete access.
    Active,

    /// Payment failed but within the provider's retry grace period.
    /// The user retains paid access during retries.
    PastDue,

    /// The user requested cancellation. Paid access continues until
    /// the current period ends.
    Canceled,

    /// Subscription ended. The user must resubscribe to regain access.
    Expired,
}

impl SubscriptionStatus {
    /// Returns true if this status keeps the paid tier in effect.
    ///
    /// Access is retained for:
    /// - Active: paid and current
    /// - PastDue: grace period during payment retry
    /// - Canceled: until period end
    pub fn retains_paid_access(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::PastDue | SubscriptionStatus::Canceled
        )
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From NOT_SUBSCRIBED
            (NotSubscribed, CheckoutPending)
            // From CHECKOUT_PENDING
                | (CheckoutPending, Active)
                | (CheckoutPending, CheckoutPending) // retried checkout
                | (CheckoutPending, NotSubscribed) // abandoned checkout
            // From ACTIVE
                | (Active, PastDue)
                | (Active, Canceled)
                | (Active, Active) // renewal
                | (Active, Expired)
            // From PAST_DUE
                | (PastDue, Active)
                | (PastDue, Canceled)
                | (PastDue, Expired)
            // From CANCELED
                | (Canceled, Active) // reactivated before period end
                | (Canceled, Expired)
            // From EXPIRED
                | (Expired, CheckoutPending) // resubscribe
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            NotSubscribed => vec![CheckoutPending],
            CheckoutPending => vec![Active, CheckoutPending, NotSubscribed],
            Active => vec![PastDue, Canceled, Active, Expired],
            PastDue => vec![Active, Canceled, Expired],
            Canceled => vec![Active, Expired],
            Expired => vec![CheckoutPending],
        }
    }
}

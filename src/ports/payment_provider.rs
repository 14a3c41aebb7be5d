//! Payment provider port for external payment processing.
//!
//! Defines the contract for the billing gateway integration (Stripe).
//! Implementations handle hosted checkout/portal session creation and
//! webhook verification.
//!
//! # Design
//!
//! - **Gateway agnostic**: the interface carries no Stripe types
//! - **Bounded**: every call runs under a client-side timeout; a timeout
//!   is a failure, never an assumed success
//! - **Not retried**: session-creation failures surface to the caller;
//!   only the user retries

use crate::domain::entitlement::SubscriptionTier;
use crate::domain::foundation::{DomainError, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for the payment provider integration.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a customer in the payment system.
    ///
    /// Returns the provider's customer id for future reference.
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError>;

    /// Create a hosted checkout session for a paid plan.
    ///
    /// Returns a URL for the customer to complete payment.
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Create a hosted billing-portal session for subscription management.
    ///
    /// Returns a URL for the customer to manage their subscription.
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, PaymentError>;

    /// Verify a webhook signature and parse the event.
    ///
    /// Returns the parsed event if valid, error if the signature is
    /// invalid or the payload is malformed.
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, PaymentError>;
}

/// Request to create a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCustomerRequest {
    /// Internal user id (stored as provider metadata).
    pub user_id: UserId,

    /// Customer email address.
    pub email: String,

    /// Idempotency key for safe retries.
    pub idempotency_key: Option<String>,
}

/// Customer in the payment system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Provider's customer id.
    pub id: String,

    /// Customer email.
    pub email: String,

    /// When the customer was created (provider timestamp).
    pub created_at: i64,
}

/// Request to create a checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCheckoutRequest {
    /// Internal user id (round-tripped via session metadata).
    pub user_id: UserId,

    /// Provider customer id.
    pub customer_id: String,

    /// Plan being purchased.
    pub plan: SubscriptionTier,

    /// Provider price id for the plan.
    pub price_id: String,

    /// URL to redirect after successful checkout.
    pub success_url: String,

    /// URL to redirect after canceled checkout.
    pub cancel_url: String,

    /// Optional coupon code forwarded to the provider.
    pub coupon_code: Option<String>,
}

/// Checkout session for payment completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session id.
    pub id: String,

    /// URL for the customer to complete checkout.
    pub url: String,

    /// When the session expires (Unix timestamp).
    pub expires_at: i64,
}

/// Portal session for subscription management.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalSession {
    /// Provider's session id.
    pub id: String,

    /// URL for the customer to access the portal.
    pub url: String,
}

/// Webhook event from the payment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event id from the provider (idempotency key).
    pub id: String,

    /// Event type.
    pub event_type: WebhookEventType,

    /// Event payload.
    pub data: WebhookEventData,

    /// When the event occurred at the provider (Unix timestamp).
    /// Drives last-writer-wins ordering of state sync.
    pub created_at: i64,
}

/// Types of webhook events we handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    /// Checkout session completed successfully.
    CheckoutSessionCompleted,

    /// Subscription created.
    SubscriptionCreated,

    /// Subscription updated (plan change, status change).
    SubscriptionUpdated,

    /// Subscription deleted/ended.
    SubscriptionDeleted,

    /// Invoice payment failed.
    InvoicePaymentFailed,

    /// Unknown event type (acknowledged, not processed).
    Unknown(String),
}

/// Webhook event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WebhookEventData {
    /// Checkout session data.
    #[serde(rename = "checkout")]
    Checkout {
        session_id: String,
        customer_id: String,
        subscription_id: Option<String>,
        /// Internal user id round-tripped through session metadata.
        user_id: Option<String>,
        /// Plan tier round-tripped through session metadata.
        plan: Option<SubscriptionTier>,
    },

    /// Subscription data.
    #[serde(rename = "subscription")]
    Subscription {
        subscription_id: String,
        customer_id: String,
        status: ProviderSubscriptionStatus,
        /// Price id of the first subscription item, mapped to a tier by
        /// the plan catalog.
        price_id: Option<String>,
        current_period_end: i64,
    },

    /// Invoice data.
    #[serde(rename = "invoice")]
    Invoice {
        invoice_id: String,
        customer_id: String,
        subscription_id: Option<String>,
    },

    /// Raw/unknown event data.
    #[serde(rename = "raw")]
    Raw { json: String },
}

/// Subscription status as reported by the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderSubscriptionStatus {
    /// Subscription is active and current.
    Active,

    /// Subscription is in trial period.
    Trialing,

    /// Payment is past due, grace period active.
    PastDue,

    /// Subscription is canceled (may still run until period end).
    Canceled,

    /// Initial payment incomplete.
    Incomplete,

    /// Payment failed after retries exhausted.
    IncompleteExpired,

    /// Subscription is paused.
    Paused,

    /// Unknown status from provider.
    Unknown,
}

impl ProviderSubscriptionStatus {
    /// Check if this provider status still grants paid access.
    pub fn has_access(&self) -> bool {
        matches!(
            self,
            ProviderSubscriptionStatus::Active
                | ProviderSubscriptionStatus::Trialing
                | ProviderSubscriptionStatus::PastDue
        )
    }
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried (by the user).
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Attach the provider's own error code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Create a network error (includes client-side timeouts).
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Create an invalid webhook error.
    pub fn invalid_webhook(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidWebhook, message)
    }

    /// Create a provider API error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        use crate::domain::foundation::ErrorCode;

        let code = match err.code {
            PaymentErrorCode::InvalidWebhook => ErrorCode::InvalidWebhookSignature,
            _ => ErrorCode::ProviderError,
        };

        DomainError::new(code, err.message)
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue or timeout.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Invalid webhook signature or payload.
    InvalidWebhook,

    /// Provider API error.
    ProviderError,

    /// Unknown error.
    Unknown,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable by the user.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::InvalidWebhook => "invalid_webhook",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_provider_is_object_safe() {
        fn _accepts_dyn(_provider: &dyn PaymentProvider) {}
    }

    #[test]
    fn provider_status_access_checks() {
        assert!(ProviderSubscriptionStatus::Active.has_access());
        assert!(ProviderSubscriptionStatus::Trialing.has_access());
        assert!(ProviderSubscriptionStatus::PastDue.has_access());

        assert!(!ProviderSubscriptionStatus::Canceled.has_access());
        assert!(!ProviderSubscriptionStatus::Incomplete.has_access());
        assert!(!ProviderSubscriptionStatus::IncompleteExpired.has_access());
        assert!(!ProviderSubscriptionStatus::Paused.has_access());
    }

    #[test]
    fn network_errors_are_retryable() {
        assert!(PaymentErrorCode::NetworkError.is_retryable());
        assert!(PaymentErrorCode::RateLimitExceeded.is_retryable());
        assert!(!PaymentErrorCode::InvalidWebhook.is_retryable());
        assert!(!PaymentErrorCode::ProviderError.is_retryable());
    }

    #[test]
    fn payment_error_display_includes_code_and_message() {
        let err = PaymentError::provider("something broke");
        assert!(err.to_string().contains("provider_error"));
        assert!(err.to_string().contains("something broke"));
    }

    #[test]
    fn webhook_error_converts_to_signature_domain_error() {
        use crate::domain::foundation::ErrorCode;
        let err: DomainError = PaymentError::invalid_webhook("bad sig").into();
        assert_eq!(err.code, ErrorCode::InvalidWebhookSignature);
    }
}

//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` trait against the Stripe HTTP API:
//! customer creation, hosted checkout and portal sessions, and webhook
//! verification.
//!
//! # Security
//!
//! - HMAC-SHA256 signature verification with constant-time comparison
//! - Timestamp validation (5-minute window) for replay attack prevention
//! - Secrets handled via `secrecy::SecretString`
//!
//! # Timeouts
//!
//! Every API call carries a bounded client timeout. A timed-out call is
//! a failure; subscription state is only ever granted by a verified
//! webhook event, never assumed from an unanswered request.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use crate::domain::entitlement::SubscriptionTier;
use crate::ports::{
    CheckoutSession, CreateCheckoutRequest, CreateCustomerRequest, Customer, PaymentError,
    PaymentProvider, PortalSession, ProviderSubscriptionStatus, WebhookEvent, WebhookEventData,
    WebhookEventType,
};

use super::webhook_types::{
    hex_encode, signature_for, SignatureHeader, StripeCheckoutSession, StripeCustomer,
    StripeInvoice, StripePortalSession, StripeSubscription, StripeWebhookEvent,
};

/// Maximum age for webhook events (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Default per-request timeout for Stripe API calls.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Base URL for the Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Per-request timeout in seconds.
    request_timeout_secs: u64,
}

impl StripeConfig {
    /// Create a new Stripe configuration.
    pub fn new(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: "https://api.stripe.com".to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Stripe payment provider adapter.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripePaymentAdapter {
    /// Create a new Stripe adapter with the given configuration.
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Verify webhook signature using HMAC-SHA256.
    ///
    /// Constant-time comparison, with a replay window on the header
    /// timestamp.
    fn verify_signature(
        &self,
        payload: &[u8],
        header: &SignatureHeader,
    ) -> Result<(), PaymentError> {
        let now = chrono::Utc::now().timestamp();
        let age = now - header.timestamp;

        if age > MAX_TIMESTAMP_AGE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                age_secs = age,
                "Webhook event too old - possible replay"
            );
            return Err(PaymentError::invalid_webhook(format!(
                "Event too old ({} seconds)",
                age
            )));
        }

        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                "Webhook event from future - clock skew or manipulation"
            );
            return Err(PaymentError::invalid_webhook("Event timestamp in future"));
        }

        let expected = signature_for(
            self.config.webhook_secret.expose_secret(),
            header.timestamp,
            payload,
        );

        let expected_bytes: &[u8] = expected.as_slice();
        let provided_bytes: &[u8] = &header.v1_signature;

        if expected_bytes.ct_eq(provided_bytes).unwrap_u8() != 1 {
            tracing::warn!(
                expected_signature = hex_encode(expected_bytes),
                "Invalid webhook signature"
            );
            return Err(PaymentError::invalid_webhook("Invalid signature"));
        }

        Ok(())
    }

    /// Parse a verified Stripe event into the port's event type.
    fn parse_event(&self, payload: &[u8]) -> Result<WebhookEvent, PaymentError> {
        let stripe_event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse webhook payload");
            PaymentError::invalid_webhook(format!("Invalid JSON: {}", e))
        })?;

        let event_type = match stripe_event.event_type.as_str() {
            "checkout.session.completed" => WebhookEventType::CheckoutSessionCompleted,
            "customer.subscription.created" => WebhookEventType::SubscriptionCreated,
            "customer.subscription.updated" => WebhookEventType::SubscriptionUpdated,
            "customer.subscription.deleted" => WebhookEventType::SubscriptionDeleted,
            "invoice.payment_failed" => WebhookEventType::InvoicePaymentFailed,
            other => WebhookEventType::Unknown(other.to_string()),
        };

        let data = self.extract_event_data(&stripe_event)?;

        Ok(WebhookEvent {
            id: stripe_event.id,
            event_type,
            data,
            created_at: stripe_event.created,
        })
    }

    /// Extract event data from the polymorphic `data.object`.
    fn extract_event_data(
        &self,
        event: &StripeWebhookEvent,
    ) -> Result<WebhookEventData, PaymentError> {
        match event.event_type.as_str() {
            "checkout.session.completed" => {
                let session: StripeCheckoutSession =
                    serde_json::from_value(event.data.object.clone()).map_err(|e| {
                        PaymentError::invalid_webhook(format!("Invalid checkout session: {}", e))
                    })?;

                let plan = session
                    .metadata
                    .get("tier")
                    .and_then(|t| parse_tier_metadata(t));

                Ok(WebhookEventData::Checkout {
                    session_id: session.id,
                    customer_id: session.customer.unwrap_or_default(),
                    subscription_id: session.subscription,
                    user_id: session.metadata.get("user_id").cloned(),
                    plan,
                })
            }

            s if s.starts_with("customer.subscription.") => {
                let sub: StripeSubscription = serde_json::from_value(event.data.object.clone())
                    .map_err(|e| {
                        PaymentError::invalid_webhook(format!("Invalid subscription: {}", e))
                    })?;

                let status = match sub.status.as_str() {
                    "active" => ProviderSubscriptionStatus::Active,
                    "trialing" => ProviderSubscriptionStatus::Trialing,
                    "past_due" => ProviderSubscriptionStatus::PastDue,
                    "canceled" => ProviderSubscriptionStatus::Canceled,
                    "incomplete" => ProviderSubscriptionStatus::Incomplete,
                    "unpaid" | "incomplete_expired" => {
                        ProviderSubscriptionStatus::IncompleteExpired
                    }
                    "paused" => ProviderSubscriptionStatus::Paused,
                    _ => ProviderSubscriptionStatus::Unknown,
                };

                let price_id = sub.items.data.first().map(|item| item.price.id.clone());

                Ok(WebhookEventData::Subscription {
                    subscription_id: sub.id,
                    customer_id: sub.customer,
                    status,
                    price_id,
                    current_period_end: sub.current_period_end,
                })
            }

            s if s.starts_with("invoice.") => {
                let invoice: StripeInvoice = serde_json::from_value(event.data.object.clone())
                    .map_err(|e| {
                        PaymentError::invalid_webhook(format!("Invalid invoice: {}", e))
                    })?;

                Ok(WebhookEventData::Invoice {
                    invoice_id: invoice.id,
                    customer_id: invoice.customer,
                    subscription_id: invoice.subscription,
                })
            }

            _ => Ok(WebhookEventData::Raw {
                json: serde_json::to_string(&event.data.object).unwrap_or_default(),
            }),
        }
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        context: &str,
    ) -> Result<T, PaymentError> {
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .http_client
            .post(&url)
            .timeout(self.config.request_timeout())
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(params)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(%status, error = %error_text, "Stripe {} failed", context);
            return Err(PaymentError::provider(format!(
                "Stripe API error: {}",
                error_text
            ))
            .with_provider_code(status.as_str().to_string()));
        }

        response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

fn parse_tier_metadata(value: &str) -> Option<SubscriptionTier> {
    match value {
        "free" => Some(SubscriptionTier::Free),
        "basic" => Some(SubscriptionTier::Basic),
        "premium" => Some(SubscriptionTier::Premium),
        _ => None,
    }
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        let params = vec![
            ("email", request.email.clone()),
            ("metadata[user_id]", request.user_id.to_string()),
        ];

        let stripe_customer: StripeCustomer = self
            .post_form("/v1/customers", &params, "create_customer")
            .await?;

        Ok(Customer {
            id: stripe_customer.id,
            email: stripe_customer.email.unwrap_or(request.email),
            created_at: stripe_customer.created,
        })
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut params = vec![
            ("mode", "subscription".to_string()),
            ("customer", request.customer_id.clone()),
            ("line_items[0][price]", request.price_id.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", request.success_url.clone()),
            ("cancel_url", request.cancel_url.clone()),
            ("metadata[user_id]", request.user_id.to_string()),
            (
                "metadata[tier]",
                request.plan.display_name().to_lowercase(),
            ),
        ];

        if let Some(coupon_code) = &request.coupon_code {
            params.push(("metadata[coupon_code]", coupon_code.clone()));
        }

        let session: StripeCheckoutSession = self
            .post_form("/v1/checkout/sessions", &params, "create_checkout_session")
            .await?;

        let url = session.url.ok_or_else(|| {
            PaymentError::provider("Checkout session response carried no URL")
        })?;

        Ok(CheckoutSession {
            id: session.id,
            url,
            expires_at: session.expires_at,
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, PaymentError> {
        let params = vec![
            ("customer", customer_id.to_string()),
            ("return_url", return_url.to_string()),
        ];

        let session: StripePortalSession = self
            .post_form(
                "/v1/billing_portal/sessions",
                &params,
                "create_portal_session",
            )
            .await?;

        Ok(PortalSession {
            id: session.id,
            url: session.url,
        })
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, PaymentError> {
        let header = SignatureHeader::parse(signature).ok_or_else(|| {
            PaymentError::invalid_webhook("Malformed Stripe-Signature header")
        })?;

        self.verify_signature(payload, &header)?;
        self.parse_event(payload)
    }
}

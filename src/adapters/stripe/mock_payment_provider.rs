//! Mock payment provider for tests.
//!
//! Implements `PaymentProvider` without any network. Its webhook wire
//! format is simply the serialized port-level `WebhookEvent`, signed
//! with the same HMAC scheme the live adapter verifies, so handler and
//! integration tests exercise the full verify-then-apply path.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use subtle::ConstantTimeEq;

use crate::ports::{
    CheckoutSession, CreateCheckoutRequest, CreateCustomerRequest, Customer, PaymentError,
    PaymentProvider, PortalSession, WebhookEvent,
};

use super::webhook_types::{hex_encode, signature_for, SignatureHeader};

const MOCK_WEBHOOK_SECRET: &str = "whsec_mock_secret";

/// In-memory payment provider double.
pub struct MockPaymentProvider {
    fail_checkout: bool,
    fail_portal: bool,
    customer_calls: AtomicU32,
    checkout_calls: AtomicU32,
    portal_calls: AtomicU32,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self {
            fail_checkout: false,
            fail_portal: false,
            customer_calls: AtomicU32::new(0),
            checkout_calls: AtomicU32::new(0),
            portal_calls: AtomicU32::new(0),
        }
    }

    /// Make checkout-session creation fail with a provider error.
    pub fn failing_checkout(mut self) -> Self {
        self.fail_checkout = true;
        self
    }

    /// Make portal-session creation fail with a provider error.
    pub fn failing_portal(mut self) -> Self {
        self.fail_portal = true;
        self
    }

    pub fn customer_calls(&self) -> u32 {
        self.customer_calls.load(Ordering::SeqCst)
    }

    pub fn checkout_calls(&self) -> u32 {
        self.checkout_calls.load(Ordering::SeqCst)
    }

    pub fn portal_calls(&self) -> u32 {
        self.portal_calls.load(Ordering::SeqCst)
    }

    /// Produce a valid `Stripe-Signature` header for an event, matching
    /// the payload `serde_json::to_vec(event)` produces.
    pub fn sign(&self, event: &WebhookEvent) -> String {
        let payload = serde_json::to_vec(event).expect("event serializes");
        let timestamp = chrono::Utc::now().timestamp();
        let signature = signature_for(MOCK_WEBHOOK_SECRET, timestamp, &payload);
        format!("t={},v1={}", timestamp, hex_encode(&signature))
    }
}

impl Default for MockPaymentProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        let n = self.customer_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Customer {
            id: format!("cus_mock_{}", n),
            email: request.email,
            created_at: chrono::Utc::now().timestamp(),
        })
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let n = self.checkout_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_checkout {
            return Err(PaymentError::provider("Mock checkout failure"));
        }
        Ok(CheckoutSession {
            id: format!("cs_mock_{}", n),
            url: format!(
                "https://checkout.stripe.test/c/pay/cs_mock_{}?plan={}",
                n, request.plan
            ),
            expires_at: chrono::Utc::now().timestamp() + 24 * 3600,
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        _return_url: &str,
    ) -> Result<PortalSession, PaymentError> {
        let n = self.portal_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_portal {
            return Err(PaymentError::provider("Mock portal failure"));
        }
        Ok(PortalSession {
            id: format!("bps_mock_{}", n),
            url: format!("https://billing.stripe.test/p/session/{}/{}", customer_id, n),
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

        let expected = signature_for(MOCK_WEBHOOK_SECRET, header.timestamp, payload);
        let expected_bytes: &[u8] = expected.as_slice();
        let provided_bytes: &[u8] = &header.v1_signature;
        if expected_bytes.ct_eq(provided_bytes).unwrap_u8() != 1 {
            return Err(PaymentError::invalid_webhook("Invalid signature"));
        }

        serde_json::from_slice(payload)
            .map_err(|e| PaymentError::invalid_webhook(format!("Invalid payload: {}", e)))
    }
}

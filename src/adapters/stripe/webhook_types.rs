//! Stripe wire types and signature helpers.
//!
//! Only the fields this engine reads are captured; everything else in
//! Stripe's schemas is ignored by serde.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

/// Encode bytes as lowercase hex.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Decode lowercase/uppercase hex into bytes.
pub fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

/// Compute the Stripe webhook signature for a payload.
///
/// The signed payload is `"{timestamp}.{payload}"`, HMAC-SHA256 keyed by
/// the webhook secret. Shared by the live adapter (verification) and the
/// mock provider (generation).
pub fn signature_for(secret: &str, timestamp: i64, payload: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(format!("{}.", timestamp).as_bytes());
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Parsed `Stripe-Signature` header.
///
/// Format: `t=<unix seconds>,v1=<hex signature>[,v1=...]`. Only the
/// first v1 signature is kept.
#[derive(Debug, Clone)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub v1_signature: Vec<u8>,
}

impl SignatureHeader {
    /// Parses the header, returning `None` on any malformed part.
    pub fn parse(header: &str) -> Option<Self> {
        let mut timestamp = None;
        let mut v1_signature = None;

        for part in header.split(',') {
            let (key, value) = part.trim().split_once('=')?;
            match key {
                "t" => timestamp = value.parse::<i64>().ok(),
                "v1" if v1_signature.is_none() => v1_signature = hex_decode(value),
                _ => {}
            }
        }

        Some(Self {
            timestamp: timestamp?,
            v1_signature: v1_signature?,
        })
    }
}

/// Stripe webhook event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeWebhookEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g. "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    pub created: i64,

    /// Object containing event-specific data.
    pub data: StripeEventData,

    /// Whether this is a live mode event (vs test mode).
    #[serde(default)]
    pub livemode: bool,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object that triggered the event (polymorphic by event type).
    pub object: serde_json::Value,
}

/// Checkout session object as delivered in webhooks and API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub expires_at: i64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Subscription object (webhook payload).
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub customer: String,
    pub status: String,
    #[serde(default)]
    pub current_period_end: i64,
    #[serde(default)]
    pub items: StripeSubscriptionItems,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeSubscriptionItems {
    #[serde(default)]
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionItem {
    pub price: StripePrice,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripePrice {
    pub id: String,
}

/// Invoice object (webhook payload).
#[derive(Debug, Clone, Deserialize)]
pub struct StripeInvoice {
    pub id: String,
    pub customer: String,
    #[serde(default)]
    pub subscription: Option<String>,
}

/// Customer object (API response).
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub deleted: bool,
}

/// Billing portal session object (API response).
#[derive(Debug, Clone, Deserialize)]
pub struct StripePortalSession {
    pub id: String,
    pub url: String,
}

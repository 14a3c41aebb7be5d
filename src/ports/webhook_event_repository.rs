//! WebhookEventRepository port - tracking processed billing webhooks.
//!
//! Enables idempotent webhook handling by recording which provider events
//! have already been applied, together with their payload and outcome for
//! auditing.
//!
//! ## Why webhook idempotency matters
//!
//! The provider may deliver the same event multiple times:
//! - Network timeouts
//! - A 5xx response from our endpoint (triggers provider retry)
//! - Our endpoint succeeding but the acknowledgment getting lost
//!
//! All webhook handling MUST be idempotent; the event id is the key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::foundation::DomainError;

/// Record of a processed webhook event.
#[derive(Debug, Clone)]
pub struct WebhookEventRecord {
    /// Provider event id (evt_xxx format).
    pub event_id: String,

    /// Provider event type string (e.g. "customer.subscription.updated").
    pub event_type: String,

    /// When the event was processed.
    pub processed_at: DateTime<Utc>,

    /// Result of processing: "success", "ignored", or "failed".
    pub result: String,

    /// Error or ignore reason, if any.
    pub error_message: Option<String>,

    /// Original event payload for debugging.
    pub payload: serde_json::Value,
}

impl WebhookEventRecord {
    /// Creates a new success record.
    pub fn success(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Utc::now(),
            result: "success".to_string(),
            error_message: None,
            payload,
        }
    }

    /// Creates a new ignored record.
    pub fn ignored(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        reason: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Utc::now(),
            result: "ignored".to_string(),
            error_message: Some(reason.into()),
            payload,
        }
    }

    /// Creates a new failure record.
    pub fn failed(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        error: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Utc::now(),
            result: "failed".to_string(),
            error_message: Some(error.into()),
            payload,
        }
    }
}

/// Result of attempting to save a webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Record was inserted (first time seeing this event).
    Inserted,
    /// Record already exists (duplicate event).
    AlreadyExists,
}

/// Overall outcome of processing one webhook delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookResult {
    /// The event was processed by this delivery.
    Processed,
    /// Another delivery already processed this event (idempotent skip).
    AlreadyProcessed,
}

/// Port for storing and retrieving processed webhook events.
///
/// Implementations should use a storage constraint (PRIMARY KEY on
/// event_id) so concurrent deliveries of the same event resolve to one
/// winner.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Find a previously processed event by its provider event id.
    ///
    /// Returns `None` if the event hasn't been processed yet.
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    /// Attempt to save a webhook event record.
    ///
    /// Uses insert-if-absent semantics: returns `AlreadyExists` instead
    /// of overwriting when another delivery got there first.
    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_record_has_no_error() {
        let record = WebhookEventRecord::success("evt_1", "checkout.session.completed", json!({}));
        assert_eq!(record.result, "success");
        assert!(record.error_message.is_none());
    }

    #[test]
    fn ignored_record_keeps_reason() {
        let record =
            WebhookEventRecord::ignored("evt_2", "invoice.created", "unhandled type", json!({}));
        assert_eq!(record.result, "ignored");
        assert_eq!(record.error_message.as_deref(), Some("unhandled type"));
    }

    #[test]
    fn failed_record_keeps_error() {
        let record = WebhookEventRecord::failed(
            "evt_3",
            "customer.subscription.updated",
            "no profile for customer",
            json!({}),
        );
        assert_eq!(record.result, "failed");
        assert!(record.error_message.is_some());
    }

    #[test]
    fn webhook_event_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn WebhookEventRepository) {}
    }
}

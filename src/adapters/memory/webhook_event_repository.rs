//! In-memory implementation of WebhookEventRepository.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository};

/// In-memory webhook event record store.
pub struct InMemoryWebhookEventRepository {
    records: Mutex<HashMap<String, WebhookEventRecord>>,
}

impl InMemoryWebhookEventRepository {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored records (test inspection).
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryWebhookEventRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryWebhookEventRepository {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        let records = self.records.lock().unwrap();
        Ok(records.get(event_id).cloned())
    }

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.event_id) {
            return Ok(SaveResult::AlreadyExists);
        }
        records.insert(record.event_id.clone(), record);
        Ok(SaveResult::Inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn save_inserts_first_record() {
        let repo = InMemoryWebhookEventRepository::new();
        let record = WebhookEventRecord::success("evt_1", "checkout.session.completed", json!({}));
        assert_eq!(repo.save(record).await.unwrap(), SaveResult::Inserted);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_save_reports_already_exists() {
        let repo = InMemoryWebhookEventRepository::new();
        let record = WebhookEventRecord::success("evt_1", "checkout.session.completed", json!({}));
        repo.save(record.clone()).await.unwrap();
        assert_eq!(repo.save(record).await.unwrap(), SaveResult::AlreadyExists);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn find_returns_saved_record() {
        let repo = InMemoryWebhookEventRepository::new();
        let record = WebhookEventRecord::failed("evt_2", "invoice.payment_failed", "boom", json!({}));
        repo.save(record).await.unwrap();

        let found = repo.find_by_event_id("evt_2").await.unwrap().unwrap();
        assert_eq!(found.result, "failed");
        assert!(repo.find_by_event_id("evt_3").await.unwrap().is_none());
    }
}

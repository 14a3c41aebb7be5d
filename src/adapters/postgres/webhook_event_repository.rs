//! PostgreSQL implementation of WebhookEventRepository.
//!
//! The PRIMARY KEY on `event_id` plus `ON CONFLICT DO NOTHING` is what
//! resolves concurrent deliveries of the same event to a single winner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository};

/// PostgreSQL implementation of the WebhookEventRepository port.
pub struct PostgresWebhookEventRepository {
    pool: PgPool,
}

impl PostgresWebhookEventRepository {
    /// Creates a new PostgresWebhookEventRepository with the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    event_id: String,
    event_type: String,
    processed_at: DateTime<Utc>,
    result: String,
    error_message: Option<String>,
    payload: serde_json::Value,
}

impl From<WebhookEventRow> for WebhookEventRecord {
    fn from(row: WebhookEventRow) -> Self {
        WebhookEventRecord {
            event_id: row.event_id,
            event_type: row.event_type,
            processed_at: row.processed_at,
            result: row.result,
            error_message: row.error_message,
            payload: row.payload,
        }
    }
}

#[async_trait]
impl WebhookEventRepository for PostgresWebhookEventRepository {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(
            r#"
            SELECT event_id, event_type, processed_at, result, error_message, payload
            FROM webhook_events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to load webhook event: {}", e),
            )
        })?;

        Ok(row.map(WebhookEventRecord::from))
    }

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO webhook_events (
                event_id, event_type, processed_at, result, error_message, payload
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(&record.event_id)
        .bind(&record.event_type)
        .bind(record.processed_at)
        .bind(&record.result)
        .bind(&record.error_message)
        .bind(&record.payload)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to save webhook event: {}", e),
            )
        })?;

        if inserted.rows_affected() > 0 {
            Ok(SaveResult::Inserted)
        } else {
            Ok(SaveResult::AlreadyExists)
        }
    }
}

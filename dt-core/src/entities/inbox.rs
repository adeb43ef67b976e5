//! The `inbox` table (consumer-side dedup).
//!
//! `(message_id, topic)` is UNIQUE. The at-least-once bus may redeliver;
//! the upsert makes redelivery a visible no-op so side effects run once.

use kanau::processor::Processor;

use crate::clock::now_ms;
use crate::framework::DatabaseProcessor;

#[derive(Debug, Clone)]
/// Dedup-insert an inbound message.
///
/// Returns `true` when the message was seen for the first time.
pub struct UpsertInbox {
    pub message_id: String,
    pub topic: String,
    pub payload: String,
    pub processed_at: i64,
}

impl Processor<UpsertInbox, Result<bool, sqlx::Error>> for DatabaseProcessor {
    #[tracing::instrument(skip_all, err, name = "SQL:UpsertInbox")]
    async fn process(&self, cmd: UpsertInbox) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO inbox (message_id, topic, payload, processed_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (message_id, topic) DO NOTHING
            "#,
        )
        .bind(&cmd.message_id)
        .bind(&cmd.topic)
        .bind(&cmd.payload)
        .bind(cmd.processed_at)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

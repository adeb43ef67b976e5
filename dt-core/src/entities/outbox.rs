//! The `outbox` table (transactional outbox).
//!
//! Rows are written in the same transaction as the state change they
//! describe and published asynchronously by the dispatcher with
//! at-least-once semantics. `status`: 1 = pending, 2 = sent, 3 = dead.

use kanau::processor::Processor;
use serde::Serialize;
use sqlx::Postgres;

use crate::clock::now_ms;
use crate::framework::DatabaseProcessor;

/// Delivery status of an outbox row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[repr(i16)]
pub enum OutboxStatus {
    Pending = 1,
    Sent = 2,
    Dead = 3,
}

/// Attempts after which a row is parked as dead.
pub const MAX_RETRY_COUNT: i32 = 10;

/// Stored `last_error` is truncated to this many bytes.
pub const LAST_ERROR_MAX_LEN: usize = 240;

/// Serialize a payload and insert it as a pending outbox row.
///
/// Must be called inside the transaction that performs the state change
/// the event describes.
pub async fn create_tx<P: Serialize>(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    topic: &str,
    biz_key: &str,
    payload: &P,
) -> Result<(), sqlx::Error> {
    let body = serde_json::to_string(payload)
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
    let now = now_ms();
    sqlx::query(
        r#"
        INSERT INTO outbox (topic, biz_key, payload, status, retry_count, last_error,
                            created_at, updated_at)
        VALUES ($1, $2, $3, $4, 0, '', $5, $5)
        "#,
    )
    .bind(topic)
    .bind(biz_key)
    .bind(&body)
    .bind(OutboxStatus::Pending)
    .bind(now)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Lightweight projection scanned by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OutboxRow {
    pub id: i64,
    pub topic: String,
    pub biz_key: String,
    pub payload: String,
}

#[derive(Debug, Clone)]
/// Pending rows with remaining retry budget, oldest first.
pub struct ListOutboxPending {
    pub limit: i64,
}

impl Processor<ListOutboxPending, Result<Vec<OutboxRow>, sqlx::Error>> for DatabaseProcessor {
    #[tracing::instrument(skip_all, err, name = "SQL:ListOutboxPending")]
    async fn process(&self, query: ListOutboxPending) -> Result<Vec<OutboxRow>, sqlx::Error> {
        sqlx::query_as::<_, OutboxRow>(
            r#"
            SELECT id, topic, biz_key, payload
            FROM outbox
            WHERE status = $1 AND retry_count < $2
            ORDER BY id ASC
            LIMIT $3
            "#,
        )
        .bind(OutboxStatus::Pending)
        .bind(MAX_RETRY_COUNT)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Mark a row as delivered.
pub struct MarkOutboxSent {
    pub id: i64,
}

impl Processor<MarkOutboxSent, Result<(), sqlx::Error>> for DatabaseProcessor {
    #[tracing::instrument(skip_all, err, name = "SQL:MarkOutboxSent")]
    async fn process(&self, cmd: MarkOutboxSent) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE outbox SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(OutboxStatus::Sent)
            .bind(now_ms())
            .bind(cmd.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Record a failed publish: bump `retry_count`, keep the truncated error,
/// and park the row as dead once the retry budget is exhausted.
pub struct MarkOutboxFailed {
    pub id: i64,
    pub last_error: String,
}

impl Processor<MarkOutboxFailed, Result<(), sqlx::Error>> for DatabaseProcessor {
    #[tracing::instrument(skip_all, err, name = "SQL:MarkOutboxFailed")]
    async fn process(&self, cmd: MarkOutboxFailed) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE outbox
            SET status = CASE WHEN retry_count >= $1 THEN $2 ELSE $3 END,
                retry_count = retry_count + 1,
                last_error = $4,
                updated_at = $5
            WHERE id = $6
            "#,
        )
        .bind(MAX_RETRY_COUNT - 1)
        .bind(OutboxStatus::Dead)
        .bind(OutboxStatus::Pending)
        .bind(truncate_error(&cmd.last_error))
        .bind(now_ms())
        .bind(cmd.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Clip an error message to [`LAST_ERROR_MAX_LEN`] bytes on a char
/// boundary.
pub fn truncate_error(err: &str) -> String {
    if err.len() <= LAST_ERROR_MAX_LEN {
        return err.to_string();
    }
    let mut cut = LAST_ERROR_MAX_LEN;
    while !err.is_char_boundary(cut) {
        cut -= 1;
    }
    err[..cut].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_error_respects_limit_and_boundaries() {
        assert_eq!(truncate_error("short"), "short");

        let long = "x".repeat(500);
        assert_eq!(truncate_error(&long).len(), LAST_ERROR_MAX_LEN);

        // 239 ASCII bytes followed by a multi-byte char straddling the cut.
        let mut tricky = "y".repeat(LAST_ERROR_MAX_LEN - 1);
        tricky.push('好');
        tricky.push_str("tail");
        let cut = truncate_error(&tricky);
        assert!(cut.len() <= LAST_ERROR_MAX_LEN);
        assert!(cut.chars().all(|c| c == 'y'));
    }
}

//! The `idempotency_keys` table.
//!
//! `(idempotency_key, purpose)` is UNIQUE; `ref_no` records the bill_no
//! of the first committed attempt. The insert is the third and final
//! idempotency layer: whatever happens to the KV store, two transactions
//! can never both commit the same key.

use kanau::processor::Processor;
use sqlx::Postgres;

use crate::clock::now_ms;
use crate::framework::DatabaseProcessor;

#[derive(Debug, Clone)]
pub struct IdempotencyKey {
    pub idempotency_key: String,
    pub purpose: String,
    pub ref_no: String,
}

impl IdempotencyKey {
    /// Claim the key. A unique-violation error means a prior attempt
    /// committed; the caller rolls back and recovers the prior result.
    pub async fn insert_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO idempotency_keys (idempotency_key, purpose, ref_no, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&self.idempotency_key)
        .bind(&self.purpose)
        .bind(&self.ref_no)
        .bind(now_ms())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Look up the `ref_no` (bill_no) recorded by the first committed attempt.
pub struct GetIdemRef {
    pub idempotency_key: String,
    pub purpose: String,
}

impl Processor<GetIdemRef, Result<Option<String>, sqlx::Error>> for DatabaseProcessor {
    #[tracing::instrument(skip_all, err, name = "SQL:GetIdemRef")]
    async fn process(&self, query: GetIdemRef) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT ref_no FROM idempotency_keys WHERE idempotency_key = $1 AND purpose = $2",
        )
        .bind(&query.idempotency_key)
        .bind(&query.purpose)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(ref_no,)| ref_no))
    }
}

//! The `settlement_log` table.
//!
//! One row per settled round; `game_round_id` is UNIQUE and acts as the
//! persistent settled-once witness. Totals are written back once every
//! order of the round has been adjudicated.

use rust_decimal::Decimal;
use sqlx::Postgres;

use crate::clock::now_ms;

#[derive(Debug, Clone)]
pub struct SettlementLog {
    pub game_round_id: String,
    pub card_list: String,
    pub result: String,
    pub operator: String,
    pub trace_id: String,
}

impl SettlementLog {
    /// Insert the witness row with zeroed totals.
    ///
    /// A unique violation here means another settlement already ran for
    /// this round; the caller treats it as an idempotent no-op.
    pub async fn insert_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO settlement_log
                (game_round_id, card_list, result, total_orders, total_payout,
                 operator, trace_id, created_at)
            VALUES ($1, $2, $3, 0, 0, $4, $5, $6)
            "#,
        )
        .bind(&self.game_round_id)
        .bind(&self.card_list)
        .bind(&self.result)
        .bind(&self.operator)
        .bind(&self.trace_id)
        .bind(now_ms())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Check whether a witness row exists, without locking it.
    pub async fn exists_tx(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        game_round_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM settlement_log WHERE game_round_id = $1")
                .bind(game_round_id)
                .fetch_optional(&mut **tx)
                .await?;
        Ok(row.is_some())
    }

    /// Fill in the totals after all orders are adjudicated.
    pub async fn update_stats_tx(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        game_round_id: &str,
        total_orders: i64,
        total_payout: Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE settlement_log
            SET total_orders = $1, total_payout = $2
            WHERE game_round_id = $3
            "#,
        )
        .bind(total_orders)
        .bind(total_payout)
        .bind(game_round_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

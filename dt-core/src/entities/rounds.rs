//! The `game_round_info` table.
//!
//! One row per round, keyed by `game_round_id`. The row lock on this
//! table is the serialization point for everything that happens inside a
//! round: operator events, bets and settlement all take it first.
//!
//! `game_status` holds the lifecycle code (see [`crate::state`]);
//! `game_result` uses 0 = unset, 1 = dragon, 2 = tiger, 3 = tie with a
//! redundant string for queries; `is_settled` moves 0 → 1 exactly once.

use kanau::processor::Processor;
use sqlx::Postgres;

use crate::clock::now_ms;
use crate::framework::DatabaseProcessor;

/// `game_result` code for a round that has not been drawn.
pub const RESULT_UNSET: i16 = 0;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Round {
    pub id: i64,
    pub game_round_id: String,
    pub game_id: String,
    pub room_id: String,
    pub bet_start_time: i64,
    pub bet_stop_time: i64,
    pub game_draw_time: i64,
    pub card_list: String,
    pub game_result: i16,
    pub game_result_str: String,
    pub game_status: i16,
    pub is_settled: i16,
    pub trace_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Status fields read under lock by the draw engine.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct SettlementStatus {
    pub game_status: i16,
    pub is_settled: i16,
}

impl Round {
    /// Create the round row on `game_start` if it does not exist yet.
    ///
    /// Rounds are created lazily: the first `game_start` for an unknown
    /// `game_round_id` inserts it in state `init`.
    pub async fn ensure_on_start_tx(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        game_round_id: &str,
        game_id: &str,
        room_id: &str,
        trace_id: &str,
    ) -> Result<(), sqlx::Error> {
        let now = now_ms();
        sqlx::query(
            r#"
            INSERT INTO game_round_info
                (game_round_id, game_id, room_id, game_status, trace_id, created_at, updated_at)
            VALUES ($1, $2, $3, 1, $4, $5, $5)
            ON CONFLICT (game_round_id) DO NOTHING
            "#,
        )
        .bind(game_round_id)
        .bind(game_id)
        .bind(room_id)
        .bind(trace_id)
        .bind(now)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Lock the round row and return the full record.
    pub async fn get_for_update_tx(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        game_round_id: &str,
    ) -> Result<Option<Round>, sqlx::Error> {
        sqlx::query_as::<_, Round>(
            r#"
            SELECT id, game_round_id, game_id, room_id, bet_start_time, bet_stop_time,
                   game_draw_time, card_list, game_result, game_result_str, game_status,
                   is_settled, trace_id, created_at, updated_at
            FROM game_round_info
            WHERE game_round_id = $1
            FOR UPDATE
            "#,
        )
        .bind(game_round_id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Lock the round row and return only the lifecycle code.
    pub async fn get_status_for_update_tx(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        game_round_id: &str,
    ) -> Result<Option<i16>, sqlx::Error> {
        let row: Option<(i16,)> = sqlx::query_as(
            "SELECT game_status FROM game_round_info WHERE game_round_id = $1 FOR UPDATE",
        )
        .bind(game_round_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.map(|(status,)| status))
    }

    /// Lock the round row and return `(game_status, is_settled)`.
    pub async fn get_settlement_status_for_update_tx(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        game_round_id: &str,
    ) -> Result<Option<SettlementStatus>, sqlx::Error> {
        sqlx::query_as::<_, SettlementStatus>(
            "SELECT game_status, is_settled FROM game_round_info WHERE game_round_id = $1 FOR UPDATE",
        )
        .bind(game_round_id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Record the draw outcome. The status stays `drawn` until settlement
    /// marks the round settled at the end of the same transaction.
    pub async fn update_draw_tx(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        game_round_id: &str,
        card_list: &str,
        result_code: i16,
        result_str: &str,
    ) -> Result<(), sqlx::Error> {
        let now = now_ms();
        sqlx::query(
            r#"
            UPDATE game_round_info
            SET card_list = $1, game_result = $2, game_result_str = $3,
                game_draw_time = $4, updated_at = $4
            WHERE game_round_id = $5
            "#,
        )
        .bind(card_list)
        .bind(result_code)
        .bind(result_str)
        .bind(now)
        .bind(game_round_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Move the round to a new lifecycle state.
    pub async fn update_state_tx(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        game_round_id: &str,
        new_status: i16,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE game_round_info SET game_status = $1, updated_at = $2 WHERE game_round_id = $3",
        )
        .bind(new_status)
        .bind(now_ms())
        .bind(game_round_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Set both ends of the betting window (on `game_start`).
    pub async fn set_bet_times_tx(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        game_round_id: &str,
        bet_start_ms: i64,
        bet_stop_ms: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE game_round_info
            SET bet_start_time = $1, bet_stop_time = $2, updated_at = $3
            WHERE game_round_id = $4
            "#,
        )
        .bind(bet_start_ms)
        .bind(bet_stop_ms)
        .bind(now_ms())
        .bind(game_round_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Close the betting window now (on `game_stop`).
    pub async fn set_bet_stop_now_tx(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        game_round_id: &str,
    ) -> Result<(), sqlx::Error> {
        let now = now_ms();
        sqlx::query(
            "UPDATE game_round_info SET bet_stop_time = $1, updated_at = $1 WHERE game_round_id = $2",
        )
        .bind(now)
        .bind(game_round_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Flip `is_settled` and move the round to `settled`.
    pub async fn mark_settled_tx(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        game_round_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE game_round_info
            SET is_settled = 1, game_status = 6, updated_at = $1
            WHERE game_round_id = $2
            "#,
        )
        .bind(now_ms())
        .bind(game_round_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Read a round without locking (query endpoint fallback path).
pub struct GetRoundDetail {
    pub game_round_id: String,
}

impl Processor<GetRoundDetail, Result<Option<Round>, sqlx::Error>> for DatabaseProcessor {
    #[tracing::instrument(skip_all, err, name = "SQL:GetRoundDetail")]
    async fn process(&self, query: GetRoundDetail) -> Result<Option<Round>, sqlx::Error> {
        sqlx::query_as::<_, Round>(
            r#"
            SELECT id, game_round_id, game_id, room_id, bet_start_time, bet_stop_time,
                   game_draw_time, card_list, game_result, game_result_str, game_status,
                   is_settled, trace_id, created_at, updated_at
            FROM game_round_info
            WHERE game_round_id = $1
            "#,
        )
        .bind(&query.game_round_id)
        .fetch_optional(&self.pool)
        .await
    }
}

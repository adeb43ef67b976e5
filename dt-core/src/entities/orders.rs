//! The `orders` table.
//!
//! One row per accepted bet, keyed by the human-readable `bill_no`.
//! `idempotency_key` carries its own UNIQUE index so the table itself is
//! the last line of defence against duplicate bets.

use kanau::processor::Processor;
use rust_decimal::Decimal;
use sqlx::Postgres;

use crate::clock::now_ms;
use crate::framework::DatabaseProcessor;

/// The side a user bets on. Stored as 1 / 2 / 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[repr(i16)]
pub enum PlayType {
    Dragon = 1,
    Tiger = 2,
    Tie = 3,
}

impl PlayType {
    /// Wire code → play type.
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(PlayType::Dragon),
            2 => Some(PlayType::Tiger),
            3 => Some(PlayType::Tie),
            _ => None,
        }
    }

    pub fn code(self) -> i16 {
        self as i16
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlayType::Dragon => "dragon",
            PlayType::Tiger => "tiger",
            PlayType::Tie => "tie",
        }
    }

    /// The side that conflicts with this one in the same round, if any.
    ///
    /// Dragon and tiger exclude each other; tie coexists with both.
    pub fn opposite(self) -> Option<PlayType> {
        match self {
            PlayType::Dragon => Some(PlayType::Tiger),
            PlayType::Tiger => Some(PlayType::Dragon),
            PlayType::Tie => None,
        }
    }
}

impl std::fmt::Display for PlayType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement status of an order. Stored as 1 / 2 / 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[repr(i16)]
pub enum BillStatus {
    Pending = 1,
    Settled = 2,
    Cancelled = 3,
}

/// `bet_status` code for a successfully recorded bet.
pub const BET_STATUS_SUCCESS: i16 = 2;

/// Insert payload for a new order. The row is written with
/// `bet_status = success` and `bill_status = pending`.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub bill_no: String,
    pub room_id: String,
    pub game_round_id: String,
    pub game_id: String,
    pub user_id: i64,
    pub platform_id: i16,
    pub platform_user_id: String,
    pub user_name: String,
    pub bet_amount: Decimal,
    pub play_type: PlayType,
    pub bet_odds: Decimal,
    pub currency: String,
    pub idempotency_key: String,
    pub trace_id: String,
}

impl NewOrder {
    pub async fn insert_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
    ) -> Result<(), sqlx::Error> {
        let now = now_ms();
        sqlx::query(
            r#"
            INSERT INTO orders
                (bill_no, room_id, game_round_id, game_id, user_id, platform_id,
                 platform_user_id, user_name, bet_amount, play_type, bet_status, bet_time,
                 bill_status, game_result, win_amount, bet_odds, currency,
                 idempotency_key, trace_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    $13, 0, 0, $14, $15, $16, $17, $18, $18)
            "#,
        )
        .bind(&self.bill_no)
        .bind(&self.room_id)
        .bind(&self.game_round_id)
        .bind(&self.game_id)
        .bind(self.user_id)
        .bind(self.platform_id)
        .bind(&self.platform_user_id)
        .bind(&self.user_name)
        .bind(self.bet_amount)
        .bind(self.play_type)
        .bind(BET_STATUS_SUCCESS)
        .bind(now)
        .bind(BillStatus::Pending)
        .bind(self.bet_odds)
        .bind(&self.currency)
        .bind(&self.idempotency_key)
        .bind(&self.trace_id)
        .bind(now)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

/// Projection used during settlement.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PendingOrder {
    pub bill_no: String,
    pub user_id: i64,
    pub bet_amount: Decimal,
    pub play_type: PlayType,
    pub bet_odds: Decimal,
    pub currency: String,
}

/// Play types the user already holds in a round with a live order
/// (`bill_status` pending or settled). Input to the conflict check.
pub async fn list_live_play_types_tx(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    game_round_id: &str,
    platform_id: i16,
    platform_user_id: &str,
) -> Result<Vec<i16>, sqlx::Error> {
    let rows: Vec<(i16,)> = sqlx::query_as(
        r#"
        SELECT play_type
        FROM orders
        WHERE game_round_id = $1 AND platform_id = $2 AND platform_user_id = $3
          AND bill_status IN (1, 2)
        "#,
    )
    .bind(game_round_id)
    .bind(platform_id)
    .bind(platform_user_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows.into_iter().map(|(code,)| code).collect())
}

/// Lock every order of the round that is still waiting for settlement.
pub async fn list_pending_for_update_tx(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    game_round_id: &str,
) -> Result<Vec<PendingOrder>, sqlx::Error> {
    sqlx::query_as::<_, PendingOrder>(
        r#"
        SELECT bill_no, user_id, bet_amount, play_type, bet_odds, currency
        FROM orders
        WHERE game_round_id = $1 AND bill_status = 1 AND bet_status = $2
        FOR UPDATE
        "#,
    )
    .bind(game_round_id)
    .bind(BET_STATUS_SUCCESS)
    .fetch_all(&mut **tx)
    .await
}

/// Write a settled order's payout and result.
pub async fn update_settlement_tx(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    bill_no: &str,
    win_amount: Decimal,
    game_result: i16,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE orders
        SET win_amount = $1, bill_status = $2, game_result = $3, updated_at = $4
        WHERE bill_no = $5
        "#,
    )
    .bind(win_amount)
    .bind(BillStatus::Settled)
    .bind(game_result)
    .bind(now_ms())
    .bind(bill_no)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct BetRecordRow {
    pub bill_no: String,
    pub game_round_id: String,
    pub play_type: i16,
    pub bet_amount: Decimal,
    pub bet_status: i16,
    pub bill_status: i16,
    pub game_result: i16,
    pub win_amount: Decimal,
    pub bet_odds: Decimal,
    pub bet_time: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
/// List a user's bets, newest first, optionally scoped to one round.
pub struct ListUserBets {
    pub platform_id: i16,
    pub platform_user_id: String,
    pub game_round_id: Option<String>,
    pub limit: i64,
}

impl Processor<ListUserBets, Result<Vec<BetRecordRow>, sqlx::Error>> for DatabaseProcessor {
    #[tracing::instrument(skip_all, err, name = "SQL:ListUserBets")]
    async fn process(&self, query: ListUserBets) -> Result<Vec<BetRecordRow>, sqlx::Error> {
        let limit = query.limit.clamp(1, 100);

        let mut qb = sqlx::QueryBuilder::new(
            "SELECT bill_no, game_round_id, play_type, bet_amount, bet_status, bill_status, \
             game_result, win_amount, bet_odds, bet_time, created_at, updated_at \
             FROM orders WHERE platform_id = ",
        );
        qb.push_bind(query.platform_id);
        qb.push(" AND platform_user_id = ");
        qb.push_bind(query.platform_user_id.clone());
        if let Some(round) = &query.game_round_id {
            qb.push(" AND game_round_id = ");
            qb.push_bind(round.clone());
        }
        qb.push(" ORDER BY bet_time DESC LIMIT ");
        qb.push_bind(limit);

        qb.build_query_as::<BetRecordRow>().fetch_all(&self.pool).await
    }
}

use serde::{Deserialize, Serialize};

/// Full round view returned by `GET /api/round/{round_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundDetail {
    pub game_round_id: String,
    pub game_id: String,
    pub room_id: String,
    pub bet_start_time: i64,
    pub bet_stop_time: i64,
    pub game_draw_time: i64,
    /// Raw outcome string; empty until a draw result is submitted.
    pub card_list: String,
    /// Winner name (`dragon` / `tiger` / `tie`); empty until drawn.
    pub result: String,
    /// State code, see the round lifecycle.
    pub game_status: i16,
    pub is_settled: i16,
}

/// Cached round info written to the KV store on `game_start`.
///
/// Frontends read this for window countdowns without touching the
/// database; it expires on its own and is deleted on `game_end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundInfoSnapshot {
    pub game_id: String,
    pub room_id: String,
    pub game_round_id: String,
    pub bet_start_time: i64,
    pub bet_stop_time: i64,
    pub game_status: i16,
}

/// Cached draw result written to the KV store after settlement commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResultSnapshot {
    pub game_id: String,
    pub room_id: String,
    pub game_round_id: String,
    pub card_list: String,
    pub result: String,
    pub game_status: i16,
    pub is_settled: i16,
    pub total_orders: i64,
    pub total_payout: rust_decimal::Decimal,
}

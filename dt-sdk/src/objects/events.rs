//! Outbox event payloads.
//!
//! These are written to the `outbox` table in the same transaction as
//! the state change they describe and later published verbatim to the
//! message bus, so the field names here are a wire contract with every
//! downstream consumer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Published on topic `bet_placed` after a bet commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetPlacedPayload {
    pub event: String,
    pub bill_no: String,
    pub user_id: i64,
    pub platform_id: i16,
    pub platform_user_id: String,
}

/// Published on topic `game_started` when the betting window opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStartedPayload {
    pub event: String,
    pub game_id: String,
    pub room_id: String,
    pub game_round_id: String,
    pub bet_start_time: i64,
    pub bet_stop_time: i64,
    pub trace_id: String,
}

/// Published on topic `game_draw_ready` when the operator triggers
/// `game_draw` and the round is waiting for a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDrawReadyPayload {
    pub event: String,
    pub game_id: String,
    pub room_id: String,
    pub game_round_id: String,
    pub trace_id: String,
}

/// Published on topic `game_drawn` once an outcome is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDrawnPayload {
    pub event: String,
    pub game_id: String,
    pub room_id: String,
    pub game_round_id: String,
    pub card_list: String,
    pub result: String,
    pub trace_id: String,
}

/// Published on topic `order_settled`, one per settled order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSettledPayload {
    pub event: String,
    pub bill_no: String,
    pub user_id: i64,
    pub game_id: String,
    pub room_id: String,
    pub game_round_id: String,
    /// Side name: `dragon` / `tiger` / `tie`.
    pub play_type: String,
    pub payout: Decimal,
    pub result: String,
    pub trace_id: String,
}

/// Published on topic `game_ended` when the round finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEndedPayload {
    pub event: String,
    pub game_id: String,
    pub room_id: String,
    pub game_round_id: String,
    pub trace_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_settled_wire_shape() {
        let payload = OrderSettledPayload {
            event: "order_settled".into(),
            bill_no: "DT202601021530257001A3F".into(),
            user_id: 42,
            game_id: "dt".into(),
            room_id: "r1".into(),
            game_round_id: "R20260102-007".into(),
            play_type: "dragon".into(),
            payout: "197.00".parse().unwrap(),
            result: "dragon".into(),
            trace_id: "t-1".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["event"], "order_settled");
        assert_eq!(json["payout"], "197.00");
        assert_eq!(json["play_type"], "dragon");
    }

    #[test]
    fn game_started_wire_shape() {
        let payload = GameStartedPayload {
            event: "game_started".into(),
            game_id: "dt".into(),
            room_id: "r1".into(),
            game_round_id: "R1".into(),
            bet_start_time: 1_700_000_000_000,
            bet_stop_time: 1_700_000_045_000,
            trace_id: "t-2".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["bet_stop_time"], 1_700_000_045_000_i64);
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request body for `POST /api/bet`.
///
/// The platform identity travels in headers; the body carries only the
/// wager itself. `bet_amount` is a decimal string so platforms never
/// round through binary floats, and `play_type` uses the wire codes
/// 1 = dragon, 2 = tiger, 3 = tie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetRequest {
    pub game_id: String,
    pub room_id: String,
    pub game_round_id: String,
    pub bet_amount: String,
    pub play_type: i16,
    /// Client-chosen token identifying this logical bet attempt.
    pub idempotency_key: String,
}

/// Success payload of `POST /api/bet`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetData {
    /// Human-readable order number.
    pub bill_no: String,
    /// Balance remaining after the deduction.
    pub remain_amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bet_data_amount_serializes_as_decimal_string() {
        let data = BetData {
            bill_no: "DT202601021530257001A3F".into(),
            remain_amount: "900.00".parse().unwrap(),
        };
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["remain_amount"], "900.00");
    }

    #[test]
    fn bet_request_round_trips() {
        let raw = r#"{
            "game_id": "dt",
            "room_id": "r1",
            "game_round_id": "R20260102-007",
            "bet_amount": "100.00",
            "play_type": 1,
            "idempotency_key": "K1"
        }"#;
        let req: BetRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(req.play_type, 1);
        assert_eq!(req.bet_amount, "100.00");
    }
}

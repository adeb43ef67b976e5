use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Success payload of `GET /api/user/balance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceData {
    pub balance: Decimal,
    pub currency: String,
}

/// One row of `GET /api/user/bets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRecordItem {
    pub bill_no: String,
    pub game_round_id: String,
    /// 1 = dragon, 2 = tiger, 3 = tie.
    pub play_type: i16,
    pub bet_amount: Decimal,
    /// 1 = created, 2 = success, 3 = failed.
    pub bet_status: i16,
    /// 1 = pending, 2 = settled, 3 = cancelled.
    pub bill_status: i16,
    /// 0 = undrawn, 1 = dragon, 2 = tiger, 3 = tie.
    pub game_result: i16,
    pub win_amount: Decimal,
    pub bet_odds: Decimal,
    pub bet_time: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Success payload of `GET /api/user/bets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRecordsData {
    pub records: Vec<BetRecordItem>,
}

//! The `wallet_ledger` table (append-only double-entry ledger).
//!
//! Every balance mutation writes one row recording the amount and the
//! before/after snapshot, so `after_amount = before_amount ± amount`
//! with the sign implied by `biz_type`. `biz_type` is stored as a code
//! with a redundant string for ad-hoc queries.

use rust_decimal::Decimal;
use sqlx::Postgres;

use crate::clock::now_ms;

/// Ledger entry kind. Stored as 1 / 2 / 3 / 4.
///
/// `Bet` and `Adjust` debit the balance; `Settle` and `Refund` credit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[repr(i16)]
pub enum LedgerBizType {
    Bet = 1,
    Settle = 2,
    Refund = 3,
    Adjust = 4,
}

impl LedgerBizType {
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerBizType::Bet => "bet",
            LedgerBizType::Settle => "settle",
            LedgerBizType::Refund => "refund",
            LedgerBizType::Adjust => "adjust",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WalletLedger {
    pub user_id: i64,
    pub biz_type: LedgerBizType,
    pub amount: Decimal,
    pub before_amount: Decimal,
    pub after_amount: Decimal,
    pub currency: String,
    pub bill_no: String,
    pub game_round_id: String,
    pub game_id: String,
    pub room_id: String,
    pub remark: String,
    pub trace_id: String,
}

impl WalletLedger {
    pub async fn insert_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO wallet_ledger
                (user_id, biz_type, biz_type_str, amount, before_amount, after_amount,
                 currency, bill_no, game_round_id, game_id, room_id, remark, trace_id,
                 created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(self.user_id)
        .bind(self.biz_type)
        .bind(self.biz_type.as_str())
        .bind(self.amount)
        .bind(self.before_amount)
        .bind(self.after_amount)
        .bind(&self.currency)
        .bind(&self.bill_no)
        .bind(&self.game_round_id)
        .bind(&self.game_id)
        .bind(&self.room_id)
        .bind(&self.remark)
        .bind(&self.trace_id)
        .bind(now_ms())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

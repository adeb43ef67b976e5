//! Draw & settlement engine.
//!
//! Parses the card list, records the outcome and settles every open
//! order of the round in one transaction. Settlement happens at most
//! once per round, guarded three ways: the `is_settled` flag read under
//! the round row lock, the `settlement_log` UNIQUE witness, and the flag
//! flip at commit. A repeated submission is a successful no-op.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;

use dt_sdk::objects::{GameDrawnPayload, OrderSettledPayload, RoundResultSnapshot};

use crate::entities::customers::Customer;
use crate::entities::game_event_audit::GameEventAudit;
use crate::entities::orders::{self, PendingOrder, PlayType};
use crate::entities::outbox;
use crate::entities::rounds::Round;
use crate::entities::settlement_log::SettlementLog;
use crate::entities::wallet_ledger::{LedgerBizType, WalletLedger};
use crate::framework::DatabaseProcessor;
use crate::kv::{keys, KvStore};
use crate::services::bet::round2;
use crate::state::{GameEvent, RoundState};

/// TTL of the draw result snapshot written after commit.
const RESULT_SNAPSHOT_TTL: std::time::Duration = std::time::Duration::from_secs(120);

/// Winner of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Dragon,
    Tiger,
    Tie,
}

impl Winner {
    /// Storage code, matching the play type codes.
    pub fn code(self) -> i16 {
        match self {
            Winner::Dragon => 1,
            Winner::Tiger => 2,
            Winner::Tie => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Winner::Dragon => "dragon",
            Winner::Tiger => "tiger",
            Winner::Tie => "tie",
        }
    }
}

impl std::fmt::Display for Winner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One draw submission.
#[derive(Debug, Clone)]
pub struct DrawInput {
    pub game_id: String,
    pub room_id: String,
    pub game_round_id: String,
    /// Raw outcome string, e.g. `D9,T8,Rd`.
    pub card_list: String,
    pub trace_id: String,
}

/// Settlement summary returned to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawOutput {
    pub result: Winner,
    pub total_orders: usize,
    pub total_payout: Decimal,
    /// `true` when the round was already settled and nothing was done.
    pub idempotent: bool,
}

#[derive(Debug, Error)]
pub enum DrawError {
    #[error("invalid card list format")]
    InvalidCardList,
    #[error("game round not found")]
    RoundNotFound,
    #[error("draw not allowed in current state")]
    InvalidState,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Draw & settlement engine.
pub struct DrawService {
    processor: DatabaseProcessor,
    kv: Arc<dyn KvStore>,
}

impl DrawService {
    pub fn new(processor: DatabaseProcessor, kv: Arc<dyn KvStore>) -> Self {
        Self { processor, kv }
    }

    /// Record the outcome and settle the round. Safe to call repeatedly.
    pub async fn submit_draw_result(&self, input: DrawInput) -> Result<DrawOutput, DrawError> {
        let winner = decide_result(&input.card_list).ok_or(DrawError::InvalidCardList)?;

        tracing::info!(
            round_id = %input.game_round_id,
            card_list = %input.card_list,
            result = %winner,
            trace_id = %input.trace_id,
            "draw result received"
        );

        let mut tx = self.processor.pool.begin().await?;

        // Guard 1: settlement flag and witness, read under the round lock.
        let status = Round::get_settlement_status_for_update_tx(&mut tx, &input.game_round_id)
            .await?
            .ok_or(DrawError::RoundNotFound)?;

        if status.is_settled == 1 || SettlementLog::exists_tx(&mut tx, &input.game_round_id).await? {
            tracing::info!(
                round_id = %input.game_round_id,
                trace_id = %input.trace_id,
                "round already settled, skipping"
            );
            return Ok(DrawOutput {
                result: winner,
                total_orders: 0,
                total_payout: Decimal::ZERO,
                idempotent: true,
            });
        }

        if RoundState::from_code(status.game_status) != RoundState::Drawn {
            return Err(DrawError::InvalidState);
        }

        // Record the outcome; the status stays `drawn` until the end of
        // this transaction.
        Round::update_draw_tx(
            &mut tx,
            &input.game_round_id,
            &input.card_list,
            winner.code(),
            winner.as_str(),
        )
        .await?;

        outbox::create_tx(
            &mut tx,
            "game_drawn",
            &input.game_round_id,
            &GameDrawnPayload {
                event: "game_drawn".to_string(),
                game_id: input.game_id.clone(),
                room_id: input.room_id.clone(),
                game_round_id: input.game_round_id.clone(),
                card_list: input.card_list.clone(),
                result: winner.as_str().to_string(),
                trace_id: input.trace_id.clone(),
            },
        )
        .await?;

        // Guard 2: the UNIQUE witness row.
        let log = SettlementLog {
            game_round_id: input.game_round_id.clone(),
            card_list: input.card_list.clone(),
            result: winner.as_str().to_string(),
            operator: "admin".to_string(),
            trace_id: input.trace_id.clone(),
        };
        if let Err(err) = log.insert_tx(&mut tx).await {
            if crate::framework::is_unique_violation(&err) {
                tx.rollback().await.ok();
                tracing::info!(
                    round_id = %input.game_round_id,
                    trace_id = %input.trace_id,
                    "settlement log exists, skipping duplicate settlement"
                );
                return Ok(DrawOutput {
                    result: winner,
                    total_orders: 0,
                    total_payout: Decimal::ZERO,
                    idempotent: true,
                });
            }
            return Err(err.into());
        }

        let pending = orders::list_pending_for_update_tx(&mut tx, &input.game_round_id).await?;
        tracing::info!(
            round_id = %input.game_round_id,
            orders = pending.len(),
            trace_id = %input.trace_id,
            "settling orders"
        );

        let mut total_payout = Decimal::ZERO;
        for order in &pending {
            let payout = settle_payout(order.play_type, order.bet_amount, order.bet_odds, winner);
            total_payout += payout;
            orders::update_settlement_tx(&mut tx, &order.bill_no, payout, winner.code()).await?;
        }

        // Group winning orders by user so each user row is locked once.
        let mut per_user: BTreeMap<i64, Vec<(&PendingOrder, Decimal)>> = BTreeMap::new();
        for order in &pending {
            let payout = settle_payout(order.play_type, order.bet_amount, order.bet_odds, winner);
            if payout > Decimal::ZERO {
                per_user.entry(order.user_id).or_default().push((order, payout));
            }
        }

        for (user_id, credits) in &per_user {
            let user = Customer::get_by_id_for_update_tx(&mut tx, *user_id)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;

            let user_total: Decimal = credits.iter().map(|(_, payout)| *payout).sum();
            let after = round2(user.balance + user_total);
            Customer::update_balance_tx(&mut tx, *user_id, after).await?;

            // One ledger row per contributing order; the running
            // accumulator keeps before/after chained.
            let mut running = user.balance;
            for (order, payout) in credits {
                let before = running;
                running = round2(running + *payout);
                WalletLedger {
                    user_id: *user_id,
                    biz_type: LedgerBizType::Settle,
                    amount: *payout,
                    before_amount: before,
                    after_amount: running,
                    currency: order.currency.clone(),
                    bill_no: order.bill_no.clone(),
                    game_round_id: input.game_round_id.clone(),
                    game_id: input.game_id.clone(),
                    room_id: input.room_id.clone(),
                    remark: "bet payout".to_string(),
                    trace_id: input.trace_id.clone(),
                }
                .insert_tx(&mut tx)
                .await?;
            }
        }

        for order in &pending {
            let payout = settle_payout(order.play_type, order.bet_amount, order.bet_odds, winner);
            outbox::create_tx(
                &mut tx,
                "order_settled",
                &order.bill_no,
                &OrderSettledPayload {
                    event: "order_settled".to_string(),
                    bill_no: order.bill_no.clone(),
                    user_id: order.user_id,
                    game_id: input.game_id.clone(),
                    room_id: input.room_id.clone(),
                    game_round_id: input.game_round_id.clone(),
                    play_type: order.play_type.as_str().to_string(),
                    payout,
                    result: winner.as_str().to_string(),
                    trace_id: input.trace_id.clone(),
                },
            )
            .await?;
        }

        // Guard 3: flip the flag and leave `settled` behind.
        Round::mark_settled_tx(&mut tx, &input.game_round_id).await?;

        SettlementLog::update_stats_tx(
            &mut tx,
            &input.game_round_id,
            pending.len() as i64,
            total_payout,
        )
        .await?;

        let audit_payload = serde_json::json!({
            "card_list": input.card_list,
            "result": winner.as_str(),
            "total_orders": pending.len(),
            "total_payout": total_payout,
        });
        GameEventAudit {
            game_id: input.game_id.clone(),
            room_id: input.room_id.clone(),
            game_round_id: input.game_round_id.clone(),
            event_type: GameEvent::GameDraw.code(),
            prev_state: RoundState::Drawn.as_str().to_string(),
            next_state: RoundState::Settled.as_str().to_string(),
            operator: "system".to_string(),
            source: "api".to_string(),
            payload: audit_payload.to_string(),
            trace_id: input.trace_id.clone(),
        }
        .insert_tx(&mut tx)
        .await?;

        tx.commit().await?;

        // Post-commit: cache the result for the query endpoint.
        let snapshot = RoundResultSnapshot {
            game_id: input.game_id.clone(),
            room_id: input.room_id.clone(),
            game_round_id: input.game_round_id.clone(),
            card_list: input.card_list.clone(),
            result: winner.as_str().to_string(),
            game_status: RoundState::Settled.code(),
            is_settled: 1,
            total_orders: pending.len() as i64,
            total_payout,
        };
        if let Ok(json) = serde_json::to_string(&snapshot) {
            if let Err(err) = self
                .kv
                .set_ex(
                    &keys::round_result_key(&input.game_round_id),
                    &json,
                    RESULT_SNAPSHOT_TTL,
                )
                .await
            {
                tracing::warn!(
                    round_id = %input.game_round_id,
                    error = %err,
                    "failed to cache draw result"
                );
            }
        }

        tracing::info!(
            round_id = %input.game_round_id,
            result = %winner,
            total_orders = pending.len(),
            total_payout = %total_payout,
            trace_id = %input.trace_id,
            "settlement complete"
        );

        Ok(DrawOutput {
            result: winner,
            total_orders: pending.len(),
            total_payout,
            idempotent: false,
        })
    }
}

/// Parse a card list into the winner.
///
/// Format: `D<n>,T<n>[,R<tag>]` with `n` in 1..=13 and tag one of
/// `d`/`dragon`/`t`/`tiger`/`tie`. A valid explicit tag names the winner
/// authoritatively; otherwise the winner is computed by comparing the
/// card values. Returns `None` for anything malformed.
pub fn decide_result(card_list: &str) -> Option<Winner> {
    let input = card_list.trim();
    if input.is_empty() {
        return None;
    }

    let tokens: Vec<&str> = input.split(',').collect();
    if !(2..=3).contains(&tokens.len()) {
        return None;
    }

    let mut dragon: Option<u8> = None;
    let mut tiger: Option<u8> = None;
    let mut tagged: Option<Winner> = None;

    for token in tokens {
        let tok = token.trim().to_ascii_lowercase();
        let Some(rest) = tok.get(1..) else {
            continue;
        };
        match tok.as_bytes().first() {
            Some(b'd') => {
                if let Ok(value) = rest.parse::<u8>() {
                    if (1..=13).contains(&value) {
                        dragon = Some(value);
                    }
                }
            }
            Some(b't') => {
                if let Ok(value) = rest.parse::<u8>() {
                    if (1..=13).contains(&value) {
                        tiger = Some(value);
                    }
                }
            }
            Some(b'r') => {
                tagged = parse_result_tag(rest);
            }
            _ => {}
        }
    }

    let (dragon, tiger) = (dragon?, tiger?);

    if let Some(winner) = tagged {
        return Some(winner);
    }

    Some(match dragon.cmp(&tiger) {
        std::cmp::Ordering::Greater => Winner::Dragon,
        std::cmp::Ordering::Less => Winner::Tiger,
        std::cmp::Ordering::Equal => Winner::Tie,
    })
}

/// Recognized explicit result tags.
fn parse_result_tag(tag: &str) -> Option<Winner> {
    match tag {
        "d" | "dragon" => Some(Winner::Dragon),
        "t" | "tiger" => Some(Winner::Tiger),
        "tie" => Some(Winner::Tie),
        _ => None,
    }
}

/// Payout credited for one order.
///
/// The stake was already deducted at bet time, so the payout is the full
/// amount returned to the user: `stake × (1 + odds)` on a win, the bare
/// stake when dragon/tiger is refunded by a tie, zero on a loss.
pub fn settle_payout(
    play_type: PlayType,
    bet_amount: Decimal,
    bet_odds: Decimal,
    winner: Winner,
) -> Decimal {
    if play_type.code() == winner.code() {
        return round2(bet_amount * (Decimal::ONE + bet_odds));
    }
    if matches!(play_type, PlayType::Dragon | PlayType::Tiger) && winner == Winner::Tie {
        return bet_amount;
    }
    Decimal::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn explicit_tags_are_authoritative() {
        assert_eq!(decide_result("D9,T8,Rd"), Some(Winner::Dragon));
        assert_eq!(decide_result("D1,T2,Rt"), Some(Winner::Tiger));
        assert_eq!(decide_result("D9,T9,Rtie"), Some(Winner::Tie));
        // The tag wins even against the card comparison.
        assert_eq!(decide_result("D2,T9,Rdragon"), Some(Winner::Dragon));
        assert_eq!(decide_result("D9,T2,Rtiger"), Some(Winner::Tiger));
    }

    #[test]
    fn missing_or_unknown_tag_falls_back_to_comparison() {
        assert_eq!(decide_result("D5,T3"), Some(Winner::Dragon));
        assert_eq!(decide_result("D3,T5"), Some(Winner::Tiger));
        assert_eq!(decide_result("D7,T7"), Some(Winner::Tie));
        assert_eq!(decide_result("D13,T10,Rwhat"), Some(Winner::Dragon));
    }

    #[test]
    fn parsing_tolerates_case_and_spacing() {
        assert_eq!(decide_result(" d9 , t8 , rD "), Some(Winner::Dragon));
        assert_eq!(decide_result("D13,T10,Rd"), Some(Winner::Dragon));
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        assert_eq!(decide_result(""), None);
        assert_eq!(decide_result("foo"), None);
        assert_eq!(decide_result("D9"), None);
        assert_eq!(decide_result("D9,T8,Rd,extra"), None);
        assert_eq!(decide_result("D0,T8"), None);
        assert_eq!(decide_result("D14,T8"), None);
        assert_eq!(decide_result("T8,Rd"), None);
        assert_eq!(decide_result("D9,Rd"), None);
    }

    #[test]
    fn decide_result_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(decide_result("D9,T8,Rd"), Some(Winner::Dragon));
        }
    }

    #[test]
    fn payout_table() {
        let stake = dec("100.00");
        let odds = dec("0.97");
        let tie_odds = dec("8.0");

        // Dragon bet across outcomes.
        assert_eq!(
            settle_payout(PlayType::Dragon, stake, odds, Winner::Dragon),
            dec("197.00")
        );
        assert_eq!(
            settle_payout(PlayType::Dragon, stake, odds, Winner::Tiger),
            Decimal::ZERO
        );
        assert_eq!(
            settle_payout(PlayType::Dragon, stake, odds, Winner::Tie),
            stake
        );

        // Tiger bet across outcomes.
        assert_eq!(
            settle_payout(PlayType::Tiger, stake, odds, Winner::Tiger),
            dec("197.00")
        );
        assert_eq!(
            settle_payout(PlayType::Tiger, stake, odds, Winner::Dragon),
            Decimal::ZERO
        );
        assert_eq!(
            settle_payout(PlayType::Tiger, stake, odds, Winner::Tie),
            stake
        );

        // Tie bet across outcomes.
        assert_eq!(
            settle_payout(PlayType::Tie, stake, tie_odds, Winner::Tie),
            dec("900.00")
        );
        assert_eq!(
            settle_payout(PlayType::Tie, stake, tie_odds, Winner::Dragon),
            Decimal::ZERO
        );
        assert_eq!(
            settle_payout(PlayType::Tie, stake, tie_odds, Winner::Tiger),
            Decimal::ZERO
        );
    }

    #[test]
    fn payout_rounds_half_even() {
        // 33.335 × 1.97 = 65.66995 -> 65.67
        assert_eq!(
            settle_payout(PlayType::Dragon, dec("33.335"), dec("0.97"), Winner::Dragon),
            dec("65.67")
        );
        // 0.05 × 1.5 = 0.075 -> half-even to 0.08
        assert_eq!(
            settle_payout(PlayType::Dragon, dec("0.05"), dec("0.5"), Winner::Dragon),
            dec("0.08")
        );
        // 0.15 × 1.5 = 0.225 -> half-even to 0.22
        assert_eq!(
            settle_payout(PlayType::Dragon, dec("0.15"), dec("0.5"), Winner::Dragon),
            dec("0.22")
        );
    }
}

//! Bet placement engine.
//!
//! Validates the wager, runs the idempotency protocol, and executes the
//! deduction inside a single transaction ordered as: user row lock →
//! round row lock (state + window checks) → conflict scan → idempotency
//! row → balance/ledger/order/outbox writes. The round row lock
//! serializes bets against operator events, so a bet can never slip past
//! a `game_stop` it raced with.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use dt_sdk::objects::{BetData, BetPlacedPayload};

use crate::clock::now_ms;
use crate::entities::customers::Customer;
use crate::entities::idempotency_keys::{GetIdemRef, IdempotencyKey};
use crate::entities::orders::{self, NewOrder, PlayType};
use crate::entities::outbox;
use crate::entities::rounds::Round;
use crate::entities::wallet_ledger::{LedgerBizType, WalletLedger};
use crate::framework::{is_unique_violation, DatabaseProcessor};
use crate::kv::KvStore;
use crate::services::idempotency::{IdemBegin, IdemConfig, IdemCoordinator};
use crate::state::RoundState;

use kanau::processor::Processor;

/// Idempotency purpose recorded for bet attempts.
const PURPOSE_BET: &str = "bet";

/// Limits, odds and timeouts of the bet engine.
#[derive(Debug, Clone)]
pub struct BetConfig {
    pub min_bet: Decimal,
    pub max_bet: Decimal,
    /// Budget for the whole transactional section when the caller did
    /// not impose a deadline of its own.
    pub tx_timeout: Duration,
    pub odds_dragon: Decimal,
    pub odds_tiger: Decimal,
    pub odds_tie: Decimal,
    pub currency: String,
}

impl Default for BetConfig {
    fn default() -> Self {
        Self {
            min_bet: Decimal::new(1, 2),          // 0.01
            max_bet: Decimal::new(1_000_000, 0),  // 1,000,000
            tx_timeout: Duration::from_secs(3),
            odds_dragon: Decimal::new(97, 2), // 0.97
            odds_tiger: Decimal::new(97, 2),  // 0.97
            odds_tie: Decimal::new(80, 1),    // 8.0
            currency: "CNY".to_string(),
        }
    }
}

impl BetConfig {
    /// Odds applied to a winning bet on the given side.
    pub fn odds_for(&self, play_type: PlayType) -> Decimal {
        match play_type {
            PlayType::Dragon => self.odds_dragon,
            PlayType::Tiger => self.odds_tiger,
            PlayType::Tie => self.odds_tie,
        }
    }
}

/// One bet attempt. All fields required except the display name.
#[derive(Debug, Clone)]
pub struct BetInput {
    pub game_id: String,
    pub room_id: String,
    pub game_round_id: String,
    pub platform_id: i16,
    pub platform_user_id: String,
    pub platform_user_name: String,
    /// Decimal string, e.g. `"100.00"`.
    pub bet_amount: String,
    /// 1 = dragon, 2 = tiger, 3 = tie.
    pub play_type: i16,
    pub idempotency_key: String,
    pub trace_id: String,
}

/// Everything that can go wrong with a bet, in surfacing order.
#[derive(Debug, Error)]
pub enum BetError {
    #[error("invalid bet amount format")]
    InvalidFormat,
    #[error("bet amount must be positive")]
    NonPositiveAmount,
    #[error("bet amount below minimum limit: {0}")]
    BelowMinimum(Decimal),
    #[error("bet amount exceeds maximum limit: {0}")]
    AboveMaximum(Decimal),
    #[error("invalid play type: {0}")]
    InvalidPlayType(i16),
    #[error("duplicate request in flight")]
    DuplicateInFlight,
    #[error("game round not found")]
    RoundNotFound,
    #[error("bet not allowed in current state")]
    InvalidState,
    #[error("bet window not started")]
    WindowNotStart,
    #[error("bet window closed")]
    WindowClosed,
    #[error("cannot bet on both dragon and tiger in the same round")]
    ConflictingPlayTypes,
    #[error("user disabled")]
    UserDisabled,
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("duplicate idempotency key, prior result unavailable")]
    IdempotencyConflict,
    #[error("bet transaction timed out")]
    Timeout,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Bet placement engine. One instance per process, shared by reference.
pub struct BetService {
    processor: DatabaseProcessor,
    kv: Arc<dyn KvStore>,
    config: BetConfig,
    idem: IdemConfig,
}

impl BetService {
    pub fn new(
        processor: DatabaseProcessor,
        kv: Arc<dyn KvStore>,
        config: BetConfig,
        idem: IdemConfig,
    ) -> Self {
        Self {
            processor,
            kv,
            config,
            idem,
        }
    }

    /// Place a bet.
    ///
    /// Duplicates of a committed attempt return the first result;
    /// concurrent duplicates of a running attempt fail with
    /// [`BetError::DuplicateInFlight`].
    pub async fn place_bet(&self, input: BetInput) -> Result<BetData, BetError> {
        let amount = validate_amount(&input.bet_amount, &self.config)?;
        let play_type =
            PlayType::from_code(input.play_type).ok_or(BetError::InvalidPlayType(input.play_type))?;

        tracing::info!(
            round_id = %input.game_round_id,
            platform_id = input.platform_id,
            platform_user_id = %input.platform_user_id,
            amount = %amount,
            play_type = %play_type,
            idem_key = %input.idempotency_key,
            trace_id = %input.trace_id,
            "bet request received"
        );

        let coordinator = IdemCoordinator::new(self.kv.as_ref(), &self.idem);

        // Layer 1: a committed duplicate returns immediately.
        if let Some(cached) = coordinator.cached_result(&input.idempotency_key).await {
            if let Ok(result) = serde_json::from_str::<BetData>(&cached) {
                tracing::info!(
                    idem_key = %input.idempotency_key,
                    bill_no = %result.bill_no,
                    "result cache hit"
                );
                return Ok(result);
            }
        }

        // Layer 2: in-flight lock.
        let lock = match coordinator.begin(&input.idempotency_key).await {
            IdemBegin::Proceed(lock) => lock,
            IdemBegin::CachedResult(cached) => {
                return serde_json::from_str::<BetData>(&cached)
                    .map_err(|_| BetError::DuplicateInFlight);
            }
            IdemBegin::InFlight => return Err(BetError::DuplicateInFlight),
        };

        let outcome = match tokio::time::timeout(
            self.config.tx_timeout,
            self.place_bet_tx(&input, amount, play_type),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(BetError::Timeout),
        };

        // The lock is released whatever happened inside the transaction.
        if let Some(lock) = lock {
            lock.release(self.kv.as_ref()).await;
        }

        let result = outcome?;
        if let Ok(json) = serde_json::to_string(&result) {
            coordinator
                .store_result(&input.idempotency_key, &json)
                .await;
        }
        Ok(result)
    }

    /// The transactional section: everything between `BEGIN` and
    /// `COMMIT`, plus unique-violation recovery.
    async fn place_bet_tx(
        &self,
        input: &BetInput,
        amount: Decimal,
        play_type: PlayType,
    ) -> Result<BetData, BetError> {
        let mut tx = self.processor.pool.begin().await?;

        let user = Customer::get_or_create_tx(
            &mut tx,
            input.platform_id,
            &input.platform_user_id,
            &input.platform_user_name,
        )
        .await?;

        let odds = self.config.odds_for(play_type);
        let bill_no = generate_bill_no(user.user_id);

        let round = Round::get_for_update_tx(&mut tx, &input.game_round_id)
            .await?
            .ok_or(BetError::RoundNotFound)?;

        if RoundState::from_code(round.game_status) != RoundState::Betting {
            tracing::warn!(
                round_id = %input.game_round_id,
                state = round.game_status,
                trace_id = %input.trace_id,
                "bet rejected: round not in betting state"
            );
            return Err(BetError::InvalidState);
        }

        let now = now_ms();
        if now < round.bet_start_time {
            return Err(BetError::WindowNotStart);
        }
        if now > round.bet_stop_time {
            return Err(BetError::WindowClosed);
        }

        if let Some(opposite) = play_type.opposite() {
            let held = orders::list_live_play_types_tx(
                &mut tx,
                &input.game_round_id,
                input.platform_id,
                &input.platform_user_id,
            )
            .await?;
            if held.contains(&opposite.code()) {
                return Err(BetError::ConflictingPlayTypes);
            }
        }

        // Layer 3: the UNIQUE row. A violation means a prior attempt
        // committed; roll back and hand its result over.
        let idem_row = IdempotencyKey {
            idempotency_key: input.idempotency_key.clone(),
            purpose: PURPOSE_BET.to_string(),
            ref_no: bill_no.clone(),
        };
        if let Err(err) = idem_row.insert_tx(&mut tx).await {
            if is_unique_violation(&err) {
                tx.rollback().await.ok();
                return self.recover_prior_result(input).await;
            }
            return Err(err.into());
        }

        if !user.is_active() {
            return Err(BetError::UserDisabled);
        }
        if user.balance < amount {
            return Err(BetError::InsufficientBalance);
        }

        let before = user.balance;
        let after = round2(before - amount);

        Customer::update_balance_tx(&mut tx, user.user_id, after).await?;

        WalletLedger {
            user_id: user.user_id,
            biz_type: LedgerBizType::Bet,
            amount,
            before_amount: before,
            after_amount: after,
            currency: self.config.currency.clone(),
            bill_no: bill_no.clone(),
            game_round_id: input.game_round_id.clone(),
            game_id: input.game_id.clone(),
            room_id: input.room_id.clone(),
            remark: "bet deduct".to_string(),
            trace_id: input.trace_id.clone(),
        }
        .insert_tx(&mut tx)
        .await?;

        NewOrder {
            bill_no: bill_no.clone(),
            room_id: input.room_id.clone(),
            game_round_id: input.game_round_id.clone(),
            game_id: input.game_id.clone(),
            user_id: user.user_id,
            platform_id: input.platform_id,
            platform_user_id: input.platform_user_id.clone(),
            user_name: user.username.clone(),
            bet_amount: amount,
            play_type,
            bet_odds: odds,
            currency: self.config.currency.clone(),
            idempotency_key: input.idempotency_key.clone(),
            trace_id: input.trace_id.clone(),
        }
        .insert_tx(&mut tx)
        .await?;

        outbox::create_tx(
            &mut tx,
            "bet_placed",
            &bill_no,
            &BetPlacedPayload {
                event: "bet_placed".to_string(),
                bill_no: bill_no.clone(),
                user_id: user.user_id,
                platform_id: input.platform_id,
                platform_user_id: input.platform_user_id.clone(),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            bill_no = %bill_no,
            user_id = user.user_id,
            remain = %after,
            trace_id = %input.trace_id,
            "bet accepted"
        );

        Ok(BetData {
            bill_no,
            remain_amount: after,
        })
    }

    /// Unique-violation recovery: the first committed attempt's bill_no
    /// plus the user's current balance, read outside any transaction.
    async fn recover_prior_result(&self, input: &BetInput) -> Result<BetData, BetError> {
        let coordinator = IdemCoordinator::new(self.kv.as_ref(), &self.idem);
        if let Some(cached) = coordinator.cached_result(&input.idempotency_key).await {
            if let Ok(result) = serde_json::from_str::<BetData>(&cached) {
                return Ok(result);
            }
        }

        let ref_no = self
            .processor
            .process(GetIdemRef {
                idempotency_key: input.idempotency_key.clone(),
                purpose: PURPOSE_BET.to_string(),
            })
            .await?;

        let Some(bill_no) = ref_no else {
            return Err(BetError::IdempotencyConflict);
        };

        let balance = self
            .processor
            .process(crate::entities::customers::GetUserBalance {
                platform_id: input.platform_id,
                platform_user_id: input.platform_user_id.clone(),
            })
            .await?
            .map(|row| row.balance)
            .ok_or(BetError::IdempotencyConflict)?;

        tracing::info!(
            bill_no = %bill_no,
            idem_key = %input.idempotency_key,
            trace_id = %input.trace_id,
            "returning prior bet result after idempotency conflict"
        );

        Ok(BetData {
            bill_no,
            remain_amount: balance,
        })
    }
}

/// Parse and bound-check the stake. Returns the stake normalized to two
/// decimal places.
fn validate_amount(raw: &str, config: &BetConfig) -> Result<Decimal, BetError> {
    let parsed: Decimal = raw.trim().parse().map_err(|_| BetError::InvalidFormat)?;
    if parsed <= Decimal::ZERO {
        return Err(BetError::NonPositiveAmount);
    }
    if parsed < config.min_bet {
        return Err(BetError::BelowMinimum(config.min_bet));
    }
    if parsed > config.max_bet {
        return Err(BetError::AboveMaximum(config.max_bet));
    }
    Ok(round2(parsed))
}

/// Half-even rounding to two decimal places.
pub(crate) fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Human-readable order number:
/// `DT` + UTC `yyyyMMddHHmmss` + last 4 digits of the user id + 3 random
/// uppercase hex chars. Sortable by creation time and traceable to the
/// user; the idempotency layers, not this suffix, guarantee uniqueness.
fn generate_bill_no(user_id: i64) -> String {
    let now = time::OffsetDateTime::now_utc();
    let suffix: u16 = rand::random::<u16>() & 0x0FFF;
    format!(
        "DT{:04}{:02}{:02}{:02}{:02}{:02}{:04}{:03X}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second(),
        user_id.rem_euclid(10_000),
        suffix,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BetConfig {
        BetConfig::default()
    }

    #[test]
    fn amount_boundaries() {
        let cfg = config();
        assert!(matches!(
            validate_amount("abc", &cfg),
            Err(BetError::InvalidFormat)
        ));
        assert!(matches!(
            validate_amount("0.00", &cfg),
            Err(BetError::NonPositiveAmount)
        ));
        assert!(matches!(
            validate_amount("-5", &cfg),
            Err(BetError::NonPositiveAmount)
        ));
        assert!(matches!(
            validate_amount("0.005", &cfg),
            Err(BetError::BelowMinimum(_))
        ));
        assert_eq!(
            validate_amount("0.01", &cfg).unwrap(),
            "0.01".parse::<Decimal>().unwrap()
        );
        assert_eq!(
            validate_amount("1000000", &cfg).unwrap(),
            "1000000".parse::<Decimal>().unwrap()
        );
        assert!(matches!(
            validate_amount("1000000.01", &cfg),
            Err(BetError::AboveMaximum(_))
        ));
        // Whitespace tolerated, value normalized to 2 dp.
        assert_eq!(
            validate_amount(" 100.005 ", &cfg).unwrap(),
            "100.00".parse::<Decimal>().unwrap()
        );
    }

    #[test]
    fn round2_is_half_even() {
        let cases = [
            ("100.005", "100.00"),
            ("100.015", "100.02"),
            ("100.025", "100.02"),
            ("0.125", "0.12"),
            ("0.135", "0.14"),
        ];
        for (input, expected) in cases {
            assert_eq!(
                round2(input.parse().unwrap()),
                expected.parse::<Decimal>().unwrap(),
                "{input}"
            );
        }
    }

    #[test]
    fn default_odds_table() {
        let cfg = config();
        assert_eq!(cfg.odds_for(PlayType::Dragon), "0.97".parse().unwrap());
        assert_eq!(cfg.odds_for(PlayType::Tiger), "0.97".parse().unwrap());
        assert_eq!(cfg.odds_for(PlayType::Tie), "8.0".parse().unwrap());
    }

    #[test]
    fn bill_no_shape() {
        let bill = generate_bill_no(98_76_54_32_10);
        assert!(bill.starts_with("DT"));
        assert_eq!(bill.len(), 2 + 14 + 4 + 3);
        // Date-time and user-suffix section is numeric.
        assert!(bill[2..20].chars().all(|c| c.is_ascii_digit()));
        // Last four digits of the user id.
        assert_eq!(&bill[16..20], "3210");
        // Random part is uppercase hex.
        assert!(bill[20..].chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!bill[20..].chars().any(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn play_type_conflicts() {
        assert_eq!(PlayType::Dragon.opposite(), Some(PlayType::Tiger));
        assert_eq!(PlayType::Tiger.opposite(), Some(PlayType::Dragon));
        assert_eq!(PlayType::Tie.opposite(), None);
    }
}

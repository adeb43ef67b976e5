//! Round query service.
//!
//! Serves `GET /api/round/{round_id}`: KV snapshots first, database
//! fallback with KV backfill. The cache is read-through only — a miss,
//! a parse failure or a KV error all land on the database.

use std::sync::Arc;
use std::time::Duration;

use kanau::processor::Processor;

use dt_sdk::objects::{RoundDetail, RoundInfoSnapshot, RoundResultSnapshot};

use crate::entities::rounds::{GetRoundDetail, Round};
use crate::framework::DatabaseProcessor;
use crate::kv::{keys, KvStore};
use crate::state::RoundState;

/// TTL of the backfilled round-info snapshot.
const INFO_BACKFILL_TTL: Duration = Duration::from_secs(60);
/// TTL of the backfilled result snapshot.
const RESULT_BACKFILL_TTL: Duration = Duration::from_secs(120);

/// KV-first round reader.
pub struct RoundQueryService {
    processor: DatabaseProcessor,
    kv: Arc<dyn KvStore>,
}

impl RoundQueryService {
    pub fn new(processor: DatabaseProcessor, kv: Arc<dyn KvStore>) -> Self {
        Self { processor, kv }
    }

    /// Round info plus draw result, or `None` for an unknown round.
    pub async fn get_round(&self, round_id: &str) -> Result<Option<RoundDetail>, sqlx::Error> {
        if let Some(detail) = self.read_from_kv(round_id).await {
            return Ok(Some(detail));
        }

        let Some(round) = self
            .processor
            .process(GetRoundDetail {
                game_round_id: round_id.to_string(),
            })
            .await?
        else {
            return Ok(None);
        };

        self.backfill(&round).await;
        Ok(Some(to_detail(&round)))
    }

    /// Build the detail from the KV snapshots when the info snapshot is
    /// present; the result snapshot enriches it once the round is drawn.
    async fn read_from_kv(&self, round_id: &str) -> Option<RoundDetail> {
        let info_raw = match self.kv.get(&keys::round_info_key(round_id)).await {
            Ok(hit) => hit?,
            Err(err) => {
                tracing::warn!(round_id, error = %err, "round info cache read failed");
                return None;
            }
        };
        let info: RoundInfoSnapshot = serde_json::from_str(&info_raw).ok()?;

        let mut detail = RoundDetail {
            game_round_id: info.game_round_id,
            game_id: info.game_id,
            room_id: info.room_id,
            bet_start_time: info.bet_start_time,
            bet_stop_time: info.bet_stop_time,
            game_draw_time: 0,
            card_list: String::new(),
            result: String::new(),
            game_status: info.game_status,
            is_settled: 0,
        };

        if let Ok(Some(result_raw)) = self.kv.get(&keys::round_result_key(round_id)).await {
            if let Ok(result) = serde_json::from_str::<RoundResultSnapshot>(&result_raw) {
                detail.card_list = result.card_list;
                detail.result = result.result;
                detail.game_status = detail.game_status.max(result.game_status);
                detail.is_settled = result.is_settled;
            }
        }

        Some(detail)
    }

    /// Refresh the KV snapshots from a database read.
    async fn backfill(&self, round: &Round) {
        let info = RoundInfoSnapshot {
            game_id: round.game_id.clone(),
            room_id: round.room_id.clone(),
            game_round_id: round.game_round_id.clone(),
            bet_start_time: round.bet_start_time,
            bet_stop_time: round.bet_stop_time,
            game_status: round.game_status,
        };
        if let Ok(json) = serde_json::to_string(&info) {
            if let Err(err) = self
                .kv
                .set_ex(
                    &keys::round_info_key(&round.game_round_id),
                    &json,
                    INFO_BACKFILL_TTL,
                )
                .await
            {
                tracing::warn!(
                    round_id = %round.game_round_id,
                    error = %err,
                    "round info backfill failed"
                );
            }
        }

        // Only drawn rounds have a result worth caching.
        if round.game_status < RoundState::Drawn.code() {
            return;
        }
        let result = RoundResultSnapshot {
            game_id: round.game_id.clone(),
            room_id: round.room_id.clone(),
            game_round_id: round.game_round_id.clone(),
            card_list: round.card_list.clone(),
            result: round.game_result_str.clone(),
            game_status: round.game_status,
            is_settled: round.is_settled,
            total_orders: 0,
            total_payout: rust_decimal::Decimal::ZERO,
        };
        if let Ok(json) = serde_json::to_string(&result) {
            if let Err(err) = self
                .kv
                .set_ex(
                    &keys::round_result_key(&round.game_round_id),
                    &json,
                    RESULT_BACKFILL_TTL,
                )
                .await
            {
                tracing::warn!(
                    round_id = %round.game_round_id,
                    error = %err,
                    "round result backfill failed"
                );
            }
        }
    }
}

fn to_detail(round: &Round) -> RoundDetail {
    RoundDetail {
        game_round_id: round.game_round_id.clone(),
        game_id: round.game_id.clone(),
        room_id: round.room_id.clone(),
        bet_start_time: round.bet_start_time,
        bet_stop_time: round.bet_stop_time,
        game_draw_time: round.game_draw_time,
        card_list: round.card_list.clone(),
        result: round.game_result_str.clone(),
        game_status: round.game_status,
        is_settled: round.is_settled,
    }
}

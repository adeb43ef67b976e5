//! Round lifecycle engine.
//!
//! Applies operator events to a round under its row lock: compute the
//! next state from the transition table, perform the event's side
//! effects, write the audit row, commit, then maintain the KV round-info
//! cache outside the transaction so uncommitted data is never readable.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use dt_sdk::objects::{
    GameDrawReadyPayload, GameEndedPayload, GameStartedPayload, RoundInfoSnapshot,
};

use crate::clock::now_ms;
use crate::entities::game_event_audit::GameEventAudit;
use crate::entities::outbox;
use crate::entities::rounds::{Round, RESULT_UNSET};
use crate::framework::DatabaseProcessor;
use crate::kv::{keys, KvStore};
use crate::state::{GameEvent, InvalidTransition, RoundState};

/// Windows and cache lifetimes of the lifecycle engine.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Betting window opened by `game_start`.
    pub bet_window: Duration,
    /// TTL of the KV round-info cache. Must be at least the window.
    pub round_info_ttl: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            bet_window: Duration::from_secs(45),
            round_info_ttl: Duration::from_secs(60),
        }
    }
}

/// One operator event.
#[derive(Debug, Clone)]
pub struct GameEventInput {
    pub game_id: String,
    pub room_id: String,
    pub game_round_id: String,
    /// 1 = game_start … 5 = game_end.
    pub event_type: i16,
    pub trace_id: String,
}

/// Result of a processed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEventOutput {
    pub prev: RoundState,
    pub next: RoundState,
    /// Betting window, present for `game_start` only.
    pub bet_window: Option<(i64, i64)>,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid event type: {0}")]
    InvalidEventType(i16),
    #[error("game round not found")]
    RoundNotFound,
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error("game end not allowed: draw result not found")]
    GameEndWithoutDraw,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Round lifecycle engine.
pub struct LifecycleService {
    processor: DatabaseProcessor,
    kv: Arc<dyn KvStore>,
    config: LifecycleConfig,
}

impl LifecycleService {
    pub fn new(processor: DatabaseProcessor, kv: Arc<dyn KvStore>, config: LifecycleConfig) -> Self {
        Self {
            processor,
            kv,
            config,
        }
    }

    /// Apply one operator event to a round.
    pub async fn handle(&self, input: GameEventInput) -> Result<GameEventOutput, LifecycleError> {
        let event = GameEvent::from_code(input.event_type)
            .ok_or(LifecycleError::InvalidEventType(input.event_type))?;

        tracing::info!(
            event = %event,
            round_id = %input.game_round_id,
            game_id = %input.game_id,
            room_id = %input.room_id,
            trace_id = %input.trace_id,
            "game event received"
        );

        let mut tx = self.processor.pool.begin().await?;

        // Rounds are created lazily on the first game_start.
        if event == GameEvent::GameStart {
            Round::ensure_on_start_tx(
                &mut tx,
                &input.game_round_id,
                &input.game_id,
                &input.room_id,
                &input.trace_id,
            )
            .await?;
        }

        let prev_code = Round::get_status_for_update_tx(&mut tx, &input.game_round_id)
            .await?
            .ok_or(LifecycleError::RoundNotFound)?;
        let prev = RoundState::from_code(prev_code);
        let next = prev.apply(event)?;

        let mut bet_window = None;
        match event {
            GameEvent::GameStart => {
                let bet_start = now_ms();
                let bet_stop = bet_start + self.config.bet_window.as_millis() as i64;
                Round::set_bet_times_tx(&mut tx, &input.game_round_id, bet_start, bet_stop).await?;
                bet_window = Some((bet_start, bet_stop));
                tracing::info!(
                    round_id = %input.game_round_id,
                    bet_start,
                    bet_stop,
                    trace_id = %input.trace_id,
                    "betting window opened"
                );
            }
            GameEvent::GameStop => {
                Round::set_bet_stop_now_tx(&mut tx, &input.game_round_id).await?;
            }
            GameEvent::NewCard => {}
            GameEvent::GameDraw => {}
            GameEvent::GameEnd => {
                let round = Round::get_for_update_tx(&mut tx, &input.game_round_id)
                    .await?
                    .ok_or(LifecycleError::RoundNotFound)?;
                if round.game_result == RESULT_UNSET || round.card_list.is_empty() {
                    return Err(LifecycleError::GameEndWithoutDraw);
                }
                if round.is_settled == 0 {
                    tracing::warn!(
                        round_id = %input.game_round_id,
                        trace_id = %input.trace_id,
                        "ending a drawn round that was never settled"
                    );
                }
            }
        }

        Round::update_state_tx(&mut tx, &input.game_round_id, next.code()).await?;

        match event {
            GameEvent::GameStart => {
                let (bet_start, bet_stop) = bet_window.unwrap_or((0, 0));
                outbox::create_tx(
                    &mut tx,
                    "game_started",
                    &input.game_round_id,
                    &GameStartedPayload {
                        event: "game_started".to_string(),
                        game_id: input.game_id.clone(),
                        room_id: input.room_id.clone(),
                        game_round_id: input.game_round_id.clone(),
                        bet_start_time: bet_start,
                        bet_stop_time: bet_stop,
                        trace_id: input.trace_id.clone(),
                    },
                )
                .await?;
            }
            GameEvent::GameDraw => {
                outbox::create_tx(
                    &mut tx,
                    "game_draw_ready",
                    &input.game_round_id,
                    &GameDrawReadyPayload {
                        event: "game_draw_ready".to_string(),
                        game_id: input.game_id.clone(),
                        room_id: input.room_id.clone(),
                        game_round_id: input.game_round_id.clone(),
                        trace_id: input.trace_id.clone(),
                    },
                )
                .await?;
            }
            GameEvent::GameEnd => {
                outbox::create_tx(
                    &mut tx,
                    "game_ended",
                    &input.game_round_id,
                    &GameEndedPayload {
                        event: "game_ended".to_string(),
                        game_id: input.game_id.clone(),
                        room_id: input.room_id.clone(),
                        game_round_id: input.game_round_id.clone(),
                        trace_id: input.trace_id.clone(),
                    },
                )
                .await?;
            }
            GameEvent::GameStop | GameEvent::NewCard => {}
        }

        GameEventAudit {
            game_id: input.game_id.clone(),
            room_id: input.room_id.clone(),
            game_round_id: input.game_round_id.clone(),
            event_type: event.code(),
            prev_state: prev.as_str().to_string(),
            next_state: next.as_str().to_string(),
            operator: "system".to_string(),
            source: "api".to_string(),
            payload: "{}".to_string(),
            trace_id: input.trace_id.clone(),
        }
        .insert_tx(&mut tx)
        .await?;

        tx.commit().await?;

        // KV maintenance after commit so readers never see uncommitted
        // state.
        match event {
            GameEvent::GameStart => {
                if let Some((bet_start, bet_stop)) = bet_window {
                    let snapshot = RoundInfoSnapshot {
                        game_id: input.game_id.clone(),
                        room_id: input.room_id.clone(),
                        game_round_id: input.game_round_id.clone(),
                        bet_start_time: bet_start,
                        bet_stop_time: bet_stop,
                        game_status: next.code(),
                    };
                    if let Ok(json) = serde_json::to_string(&snapshot) {
                        if let Err(err) = self
                            .kv
                            .set_ex(
                                &keys::round_info_key(&input.game_round_id),
                                &json,
                                self.config.round_info_ttl,
                            )
                            .await
                        {
                            tracing::warn!(
                                round_id = %input.game_round_id,
                                error = %err,
                                "failed to cache round info"
                            );
                        }
                    }
                }
            }
            GameEvent::GameEnd => {
                if let Err(err) = self.kv.del(&keys::round_info_key(&input.game_round_id)).await {
                    tracing::warn!(
                        round_id = %input.game_round_id,
                        error = %err,
                        "failed to drop round info cache"
                    );
                }
            }
            _ => {}
        }

        tracing::info!(
            event = %event,
            round_id = %input.game_round_id,
            prev = %prev,
            next = %next,
            trace_id = %input.trace_id,
            "game event applied"
        );

        Ok(GameEventOutput {
            prev,
            next,
            bet_window,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_45s_and_cache_outlives_it() {
        let config = LifecycleConfig::default();
        assert_eq!(config.bet_window, Duration::from_secs(45));
        assert!(config.round_info_ttl >= config.bet_window);
    }
}

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;

use dt_core::services::BetInput;
use dt_sdk::objects::BetRequest;

use super::error::{bet_error_response, success};
use super::extractors::{PlatformIdentity, TraceId};
use crate::state::AppState;

/// `POST /api/bet` — place a wager for the authenticated platform user.
///
/// Success returns `{bill_no, remain_amount}`. A duplicate of a
/// committed attempt returns the first result; a duplicate of a running
/// attempt answers 202 with `Retry-After: 1`.
pub async fn place_bet(
    state: State<AppState>,
    identity: PlatformIdentity,
    TraceId(trace_id): TraceId,
    Json(body): Json<BetRequest>,
) -> Response {
    let input = BetInput {
        game_id: body.game_id,
        room_id: body.room_id,
        game_round_id: body.game_round_id,
        platform_id: identity.platform_id,
        platform_user_id: identity.platform_user_id,
        platform_user_name: identity.platform_user_name,
        bet_amount: body.bet_amount,
        play_type: body.play_type,
        idempotency_key: body.idempotency_key,
        trace_id: trace_id.clone(),
    };

    match state.bet.place_bet(input).await {
        Ok(data) => success(data, &trace_id).into_response(),
        Err(err) => bet_error_response(err, &trace_id),
    }
}

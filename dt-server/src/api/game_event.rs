use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use dt_core::services::GameEventInput;
use dt_sdk::codes;
use dt_sdk::objects::{GameEventData, GameEventRequest};

use super::error::{failure_with_message, lifecycle_error_response, success, success_empty};
use super::extractors::TraceId;
use crate::state::AppState;

/// `POST /api/game_event` — advance the round lifecycle.
///
/// `game_start` answers with the betting window and the countdown; all
/// other events answer with an empty success.
pub async fn handle_game_event(
    state: State<AppState>,
    TraceId(trace_id): TraceId,
    Json(body): Json<GameEventRequest>,
) -> Response {
    if body.game_round_id.is_empty() {
        return failure_with_message(
            StatusCode::BAD_REQUEST,
            codes::BAD_REQUEST,
            "game_round_id is required",
            &trace_id,
        );
    }

    let input = GameEventInput {
        game_id: body.game_id,
        room_id: body.room_id,
        game_round_id: body.game_round_id,
        event_type: body.event_type,
        trace_id: trace_id.clone(),
    };

    match state.lifecycle.handle(input).await {
        Ok(output) => match output.bet_window {
            Some((bet_start, bet_stop)) => success(
                GameEventData {
                    bet_start_time: bet_start,
                    bet_stop_time: bet_stop,
                    countdown_second: (bet_stop - bet_start) / 1000,
                },
                &trace_id,
            )
            .into_response(),
            None => success_empty(&trace_id).into_response(),
        },
        Err(err) => lifecycle_error_response(err, &trace_id),
    }
}

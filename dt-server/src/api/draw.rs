use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use dt_core::services::DrawInput;
use dt_sdk::codes;
use dt_sdk::objects::DrawRequest;

use super::error::{draw_error_response, failure_with_message, success};
use super::extractors::TraceId;
use crate::state::AppState;

/// `POST /api/drawresult` — submit the outcome and settle the round.
///
/// Settlement is idempotent: resubmitting the same round answers
/// success without doing anything.
pub async fn submit_draw(
    state: State<AppState>,
    TraceId(trace_id): TraceId,
    Json(body): Json<DrawRequest>,
) -> Response {
    if body.game_round_id.is_empty() || body.card_list.is_empty() {
        return failure_with_message(
            StatusCode::BAD_REQUEST,
            codes::BAD_REQUEST,
            "game_round_id and card_list are required",
            &trace_id,
        );
    }

    let input = DrawInput {
        game_id: body.game_id,
        room_id: body.room_id,
        game_round_id: body.game_round_id,
        card_list: body.card_list,
        trace_id: trace_id.clone(),
    };

    match state.draw.submit_draw_result(input).await {
        Ok(output) => success(
            serde_json::json!({
                "result": output.result.as_str(),
                "total_orders": output.total_orders,
                "total_payout": output.total_payout,
            }),
            &trace_id,
        )
        .into_response(),
        Err(err) => draw_error_response(err, &trace_id),
    }
}

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use dt_sdk::codes;

use super::error::{failure, success};
use super::extractors::TraceId;
use crate::state::AppState;

/// `GET /api/round/{round_id}` — round info and draw result.
///
/// Serves the KV snapshots when present, falls back to the database and
/// backfills the cache.
pub async fn get_round(
    state: State<AppState>,
    TraceId(trace_id): TraceId,
    Path(round_id): Path<String>,
) -> Response {
    match state.round_query.get_round(&round_id).await {
        Ok(Some(detail)) => success(detail, &trace_id).into_response(),
        Ok(None) => failure(StatusCode::NOT_FOUND, codes::NOT_FOUND, &trace_id),
        Err(err) => {
            tracing::error!(round_id = %round_id, error = %err, trace_id = %trace_id, "round query failed");
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::SYSTEM_ERROR,
                &trace_id,
            )
        }
    }
}

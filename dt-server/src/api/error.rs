//! Envelope builders and service-error mapping.
//!
//! Propagation policy: validation and state errors travel verbatim to
//! the client; everything internal is logged under the trace id and
//! surfaced as a generic message with code 5000.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use dt_core::services::{BetError, DrawError, LifecycleError};
use dt_sdk::codes;
use dt_sdk::objects::ApiResponse;

/// Success envelope with data.
pub fn success<T: Serialize>(data: T, trace_id: &str) -> Response {
    Json(ApiResponse {
        code: codes::SUCCESS,
        message: codes::default_message(codes::SUCCESS).to_string(),
        data: Some(data),
        trace_id: Some(trace_id.to_string()),
        timestamp: dt_core::clock::now_ms(),
    })
    .into_response()
}

/// Success envelope without data.
pub fn success_empty(trace_id: &str) -> Response {
    Json(ApiResponse::<()> {
        code: codes::SUCCESS,
        message: codes::default_message(codes::SUCCESS).to_string(),
        data: None,
        trace_id: Some(trace_id.to_string()),
        timestamp: dt_core::clock::now_ms(),
    })
    .into_response()
}

/// Failure envelope with the default message for the code.
pub fn failure(status: StatusCode, code: u32, trace_id: &str) -> Response {
    failure_with_message(status, code, codes::default_message(code), trace_id)
}

/// Failure envelope with an explicit message.
pub fn failure_with_message(
    status: StatusCode,
    code: u32,
    message: &str,
    trace_id: &str,
) -> Response {
    let body = Json(ApiResponse::<()> {
        code,
        message: message.to_string(),
        data: None,
        trace_id: Some(trace_id.to_string()),
        timestamp: dt_core::clock::now_ms(),
    });
    (status, body).into_response()
}

/// 202 with `Retry-After: 1` for a duplicate attempt still in flight.
pub fn retry_later(trace_id: &str) -> Response {
    let body = Json(ApiResponse::<()> {
        code: codes::DUPLICATE_IN_FLIGHT,
        message: codes::default_message(codes::DUPLICATE_IN_FLIGHT).to_string(),
        data: None,
        trace_id: Some(trace_id.to_string()),
        timestamp: dt_core::clock::now_ms(),
    });
    (
        StatusCode::ACCEPTED,
        [(header::RETRY_AFTER, "1")],
        body,
    )
        .into_response()
}

/// Map a bet engine error onto the wire contract.
pub fn bet_error_response(err: BetError, trace_id: &str) -> Response {
    match &err {
        BetError::InvalidFormat
        | BetError::NonPositiveAmount
        | BetError::BelowMinimum(_)
        | BetError::AboveMaximum(_)
        | BetError::InvalidPlayType(_) => failure_with_message(
            StatusCode::BAD_REQUEST,
            codes::BAD_REQUEST,
            &err.to_string(),
            trace_id,
        ),
        BetError::DuplicateInFlight => retry_later(trace_id),
        BetError::RoundNotFound => {
            failure(StatusCode::NOT_FOUND, codes::NOT_FOUND, trace_id)
        }
        BetError::InvalidState => {
            failure(StatusCode::CONFLICT, codes::INVALID_STATE, trace_id)
        }
        BetError::WindowNotStart => {
            failure(StatusCode::CONFLICT, codes::BET_WINDOW_NOT_START, trace_id)
        }
        BetError::WindowClosed => {
            failure(StatusCode::CONFLICT, codes::BET_WINDOW_CLOSED, trace_id)
        }
        BetError::ConflictingPlayTypes => {
            failure(StatusCode::CONFLICT, codes::CONFLICTING_BET, trace_id)
        }
        BetError::UserDisabled => failure_with_message(
            StatusCode::BAD_REQUEST,
            codes::BAD_REQUEST,
            &err.to_string(),
            trace_id,
        ),
        BetError::InsufficientBalance => failure_with_message(
            StatusCode::BAD_REQUEST,
            codes::INSUFFICIENT_BALANCE,
            &err.to_string(),
            trace_id,
        ),
        BetError::IdempotencyConflict => {
            failure(StatusCode::CONFLICT, codes::DUPLICATE_KEY, trace_id)
        }
        BetError::Timeout | BetError::Database(_) => {
            tracing::error!(error = %err, trace_id, "bet failed");
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::SYSTEM_ERROR,
                trace_id,
            )
        }
    }
}

/// Map a draw engine error onto the wire contract.
pub fn draw_error_response(err: DrawError, trace_id: &str) -> Response {
    match &err {
        DrawError::InvalidCardList => failure_with_message(
            StatusCode::BAD_REQUEST,
            codes::BAD_REQUEST,
            &err.to_string(),
            trace_id,
        ),
        DrawError::RoundNotFound => {
            failure(StatusCode::NOT_FOUND, codes::NOT_FOUND, trace_id)
        }
        DrawError::InvalidState => {
            failure(StatusCode::CONFLICT, codes::INVALID_STATE_DRAW, trace_id)
        }
        DrawError::Database(_) => {
            tracing::error!(error = %err, trace_id, "draw failed");
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::SYSTEM_ERROR,
                trace_id,
            )
        }
    }
}

/// Map a lifecycle engine error onto the wire contract.
pub fn lifecycle_error_response(err: LifecycleError, trace_id: &str) -> Response {
    match &err {
        LifecycleError::InvalidEventType(_) => failure_with_message(
            StatusCode::BAD_REQUEST,
            codes::BAD_REQUEST,
            &err.to_string(),
            trace_id,
        ),
        LifecycleError::RoundNotFound => {
            failure(StatusCode::NOT_FOUND, codes::NOT_FOUND, trace_id)
        }
        LifecycleError::InvalidTransition(_) => {
            failure(StatusCode::CONFLICT, codes::INVALID_STATE, trace_id)
        }
        LifecycleError::GameEndWithoutDraw => failure(
            StatusCode::CONFLICT,
            codes::INVALID_STATE_GAME_END,
            trace_id,
        ),
        LifecycleError::Database(_) => {
            tracing::error!(error = %err, trace_id, "game event failed");
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::SYSTEM_ERROR,
                trace_id,
            )
        }
    }
}

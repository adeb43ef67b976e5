//! User query endpoints.
//!
//! Platform users can only read their own data; the scope comes from the
//! identity headers, never from the query string.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kanau::processor::Processor;
use serde::Deserialize;

use dt_core::entities::customers::GetUserBalance;
use dt_core::entities::orders::ListUserBets;
use dt_sdk::codes;
use dt_sdk::objects::{BalanceData, BetRecordItem, BetRecordsData};

use super::error::{failure, success};
use super::extractors::{PlatformIdentity, TraceId};
use crate::state::AppState;

/// `GET /api/user/balance` — the caller's current balance.
pub async fn get_balance(
    state: State<AppState>,
    identity: PlatformIdentity,
    TraceId(trace_id): TraceId,
) -> Response {
    let result = state
        .processor()
        .process(GetUserBalance {
            platform_id: identity.platform_id,
            platform_user_id: identity.platform_user_id.clone(),
        })
        .await;

    match result {
        Ok(Some(row)) => success(
            BalanceData {
                balance: row.balance,
                currency: "CNY".to_string(),
            },
            &trace_id,
        )
        .into_response(),
        Ok(None) => failure(StatusCode::NOT_FOUND, codes::NOT_FOUND, &trace_id),
        Err(err) => {
            tracing::error!(error = %err, trace_id = %trace_id, "balance query failed");
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::SYSTEM_ERROR,
                &trace_id,
            )
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BetsQuery {
    #[serde(default)]
    pub game_round_id: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// `GET /api/user/bets` — the caller's recent bets, newest first,
/// optionally scoped to one round. `limit` is clamped to 1..=100.
pub async fn list_bets(
    state: State<AppState>,
    identity: PlatformIdentity,
    TraceId(trace_id): TraceId,
    Query(query): Query<BetsQuery>,
) -> Response {
    let result = state
        .processor()
        .process(ListUserBets {
            platform_id: identity.platform_id,
            platform_user_id: identity.platform_user_id.clone(),
            game_round_id: query.game_round_id.filter(|round| !round.is_empty()),
            limit: query.limit.unwrap_or(10),
        })
        .await;

    match result {
        Ok(rows) => {
            let records = rows
                .into_iter()
                .map(|row| BetRecordItem {
                    bill_no: row.bill_no,
                    game_round_id: row.game_round_id,
                    play_type: row.play_type,
                    bet_amount: row.bet_amount,
                    bet_status: row.bet_status,
                    bill_status: row.bill_status,
                    game_result: row.game_result,
                    win_amount: row.win_amount,
                    bet_odds: row.bet_odds,
                    bet_time: row.bet_time,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                })
                .collect();
            success(BetRecordsData { records }, &trace_id).into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, trace_id = %trace_id, "bet list query failed");
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::SYSTEM_ERROR,
                &trace_id,
            )
        }
    }
}

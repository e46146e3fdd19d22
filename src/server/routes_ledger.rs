//! Ledger API — bonus redemption and the caller's withdrawals.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::middleware_auth::RequireAuth;
use super::{bad_request, error_response, AppState};
use crate::db::withdrawals::STATUS_PENDING;

/// POST /api/v1/bonus/redeem — move one fixed chunk of bonus into balance.
pub(super) async fn handler_v1_redeem(
    State(state): State<Arc<AppState>>,
    RequireAuth(auth_user): RequireAuth,
) -> Response {
    match state.db.redeem_bonus(auth_user.user_id).await {
        Ok(redemption) => {
            state.prom_metrics.redemptions.inc();
            Json(serde_json::json!(redemption)).into_response()
        }
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub(super) struct WithdrawalListQuery {
    #[serde(default)]
    status: Option<String>,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// GET /api/v1/withdrawals — the caller's own withdrawals, newest first.
pub(super) async fn handler_v1_withdrawals_list(
    State(state): State<Arc<AppState>>,
    RequireAuth(auth_user): RequireAuth,
    Query(query): Query<WithdrawalListQuery>,
) -> Response {
    match state
        .db
        .list_withdrawals(
            Some(auth_user.user_id),
            query.status.as_deref(),
            query.limit.clamp(1, 500),
        )
        .await
    {
        Ok(rows) => Json(serde_json::json!(rows)).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub(super) struct WithdrawalPayload {
    amount: i64,
    phone: String,
}

/// POST /api/v1/withdrawals — request a payout; the balance is debited now.
pub(super) async fn handler_v1_withdrawals_create(
    State(state): State<Arc<AppState>>,
    RequireAuth(auth_user): RequireAuth,
    Json(payload): Json<WithdrawalPayload>,
) -> Response {
    if payload.amount <= 0 {
        return bad_request("amount must be positive");
    }
    if payload.phone.trim().is_empty() {
        return bad_request("phone is required");
    }
    match state
        .db
        .request_withdrawal(auth_user.user_id, payload.amount, &payload.phone)
        .await
    {
        Ok(row) => {
            state.prom_metrics.withdrawal(STATUS_PENDING);
            (StatusCode::CREATED, Json(serde_json::json!(row))).into_response()
        }
        Err(e) => error_response(e),
    }
}

//! Account API — registration (with optional referral code) and the
//! caller's own profile.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::middleware_auth::RequireAuth;
use super::{bad_request, error_response, AppState};

#[derive(Deserialize)]
pub(super) struct RegisterPayload {
    username: String,
    email: String,
    #[serde(default)]
    referral_code: Option<String>,
}

/// POST /api/v1/register — create an account. Unknown referral codes are
/// ignored; the account is still created.
pub(super) async fn handler_v1_register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterPayload>,
) -> Response {
    if payload.username.trim().is_empty() {
        return bad_request("username is required");
    }
    if !payload.email.contains('@') {
        return bad_request("a valid email is required");
    }

    match state
        .db
        .register_user(
            &payload.username,
            &payload.email,
            payload.referral_code.as_deref(),
        )
        .await
    {
        Ok(registration) => {
            if registration.referral_credited {
                state.prom_metrics.referrals.inc();
            }
            (StatusCode::CREATED, Json(serde_json::json!(registration))).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/me — the authenticated user's profile, counters, and
/// referral count.
pub(super) async fn handler_v1_me(
    State(state): State<Arc<AppState>>,
    RequireAuth(auth_user): RequireAuth,
) -> Response {
    let user = match state.db.get_user(auth_user.user_id).await {
        Ok(u) => u,
        Err(e) => return error_response(e),
    };
    let referrals = match state.db.count_referrals(user.id).await {
        Ok(n) => n,
        Err(e) => return error_response(e),
    };
    Json(serde_json::json!({
        "id": user.id,
        "username": user.username,
        "email": user.email,
        "referral_code": user.referral_code,
        "balance": user.balance,
        "bonus": user.bonus,
        "activated": user.activated,
        "is_admin": user.is_admin,
        "referrals": referrals,
        "day_key": state.clock.today(),
    }))
    .into_response()
}

//! Admin API — user overrides, platform settings, catalog toggles,
//! withdrawal resolution, and the audit log.
//!
//! Every route requires `RequireAdmin`; every mutation writes an audit entry
//! in the same transaction as the change (see `db::audit`).

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::middleware_auth::RequireAdmin;
use super::{error_response, AppState};
use crate::db::users::UserOverride;
use crate::settings::PlatformSettings;

#[derive(Deserialize)]
pub(super) struct PageQuery {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    100
}

// ── Users ───────────────────────────────────────────────────────

/// GET /api/admin/users?limit=&offset=
pub(super) async fn handler_admin_users(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Query(page): Query<PageQuery>,
) -> Response {
    match state
        .db
        .list_users(page.limit.clamp(1, 1000), page.offset.max(0))
        .await
    {
        Ok(users) => Json(serde_json::json!(users)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/admin/users/{id}/override — absolute balance/bonus/activation writes.
pub(super) async fn handler_admin_user_override(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Path(user_id): Path<uuid::Uuid>,
    Json(changes): Json<UserOverride>,
) -> Response {
    match state
        .db
        .admin_override(Some(admin.user_id), user_id, &changes)
        .await
    {
        Ok(user) => Json(serde_json::json!(user)).into_response(),
        Err(e) => error_response(e),
    }
}

// ── Settings ────────────────────────────────────────────────────

/// GET /api/admin/settings
pub(super) async fn handler_admin_settings_get(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
) -> Response {
    match state.db.get_settings().await {
        Ok(settings) => Json(serde_json::json!(settings)).into_response(),
        Err(e) => error_response(e),
    }
}

/// PUT /api/admin/settings — replace all settings after validation.
pub(super) async fn handler_admin_settings_put(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Json(settings): Json<PlatformSettings>,
) -> Response {
    match state
        .db
        .update_settings(Some(admin.user_id), &settings)
        .await
    {
        Ok(saved) => Json(serde_json::json!(saved)).into_response(),
        Err(e) => error_response(e),
    }
}

// ── Catalog ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct TaskListQuery {
    #[serde(default)]
    active_only: bool,
}

/// GET /api/admin/tasks?active_only=
pub(super) async fn handler_admin_tasks(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<TaskListQuery>,
) -> Response {
    match state.db.list_tasks(query.active_only).await {
        Ok(tasks) => Json(serde_json::json!(tasks)).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub(super) struct TaskActivePayload {
    active: bool,
}

/// POST /api/admin/tasks/{id}/active
pub(super) async fn handler_admin_task_active(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Path(task_id): Path<i64>,
    Json(payload): Json<TaskActivePayload>,
) -> Response {
    match state
        .db
        .set_task_active(Some(admin.user_id), task_id, payload.active)
        .await
    {
        Ok(task) => Json(serde_json::json!(task)).into_response(),
        Err(e) => error_response(e),
    }
}

// ── Withdrawals ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct AdminWithdrawalQuery {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    user_id: Option<uuid::Uuid>,
    #[serde(default = "default_limit")]
    limit: i64,
}

/// GET /api/admin/withdrawals?status=pending
pub(super) async fn handler_admin_withdrawals(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<AdminWithdrawalQuery>,
) -> Response {
    match state
        .db
        .list_withdrawals(
            query.user_id,
            query.status.as_deref(),
            query.limit.clamp(1, 1000),
        )
        .await
    {
        Ok(rows) => Json(serde_json::json!(rows)).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub(super) struct ResolvePayload {
    approve: bool,
}

/// POST /api/admin/withdrawals/{id}/resolve — approve, or reject and refund.
pub(super) async fn handler_admin_withdrawal_resolve(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Path(withdrawal_id): Path<i64>,
    Json(payload): Json<ResolvePayload>,
) -> Response {
    match state
        .db
        .resolve_withdrawal(Some(admin.user_id), withdrawal_id, payload.approve)
        .await
    {
        Ok(row) => {
            state.prom_metrics.withdrawal(&row.status);
            Json(serde_json::json!(row)).into_response()
        }
        Err(e) => error_response(e),
    }
}

// ── Audit ───────────────────────────────────────────────────────

/// GET /api/admin/audit?limit=
pub(super) async fn handler_admin_audit(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Query(page): Query<PageQuery>,
) -> Response {
    match state.db.list_audit_logs(page.limit.clamp(1, 1000)).await {
        Ok(rows) => Json(serde_json::json!(rows)).into_response(),
        Err(e) => error_response(e),
    }
}

//! Daily task API — today's assignments and answer submission.
//!
//! The day key comes from the server clock at request time, so a user who
//! loads tasks just before the home-timezone midnight and submits just after
//! will get `not_assigned` for yesterday's task.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::middleware_auth::RequireAuth;
use super::{error_response, AppState};
use crate::prom_metrics::KindLabel;

/// GET /api/v1/tasks/today — allocate (first call of the day) and list.
pub(super) async fn handler_v1_tasks_today(
    State(state): State<Arc<AppState>>,
    RequireAuth(auth_user): RequireAuth,
) -> Response {
    let day = state.clock.today();
    match state.db.get_today_tasks(auth_user.user_id, day).await {
        Ok(today) => {
            state
                .prom_metrics
                .assignments_created
                .inc_by(today.newly_assigned as u64);
            Json(serde_json::json!(today)).into_response()
        }
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub(super) struct CompletePayload {
    answer: String,
}

/// POST /api/v1/tasks/{id}/complete
pub(super) async fn handler_v1_task_complete(
    State(state): State<Arc<AppState>>,
    RequireAuth(auth_user): RequireAuth,
    Path(task_id): Path<i64>,
    Json(payload): Json<CompletePayload>,
) -> Response {
    let day = state.clock.today();
    match state
        .db
        .complete_task(auth_user.user_id, task_id, &payload.answer, day)
        .await
    {
        Ok(completion) => {
            state
                .prom_metrics
                .tasks_completed
                .get_or_create(&KindLabel {
                    kind: completion.kind.clone(),
                })
                .inc();
            state
                .prom_metrics
                .rewards_credited
                .inc_by(completion.reward.max(0) as u64);
            Json(serde_json::json!(completion)).into_response()
        }
        Err(e) => error_response(e),
    }
}

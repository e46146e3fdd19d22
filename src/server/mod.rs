//! # Server — HTTP API
//!
//! Runs an Axum HTTP server exposing the user API (registration, today's
//! tasks, completions, bonus redemption, withdrawals), the admin API, and the
//! health/metrics probes. Handlers are stateless: every request reads what it
//! needs from PostgreSQL and the day key is computed from the wall clock.

pub mod middleware_auth;
mod routes_admin;
mod routes_auth;
mod routes_health;
mod routes_ledger;
mod routes_tasks;

use crate::day::DayClock;
use crate::error::TaskError;
use crate::{db, prom_metrics};
use anyhow::Result;
use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn, Instrument};

pub use middleware_auth::TokenAuth;

pub struct AppState {
    pub db: db::Database,
    pub clock: DayClock,
    pub auth: TokenAuth,
    pub prom_metrics: prom_metrics::Metrics,
}

impl AppState {
    pub fn with_db(db: db::Database, clock: DayClock, auth: TokenAuth) -> Arc<Self> {
        Arc::new(AppState {
            db,
            clock,
            auth,
            prom_metrics: prom_metrics::Metrics::new(),
        })
    }
}

/// Render a domain failure as `{"error": <code>, "message": <text>}`.
///
/// Storage faults are logged here and reach the client as a generic 500.
pub(super) fn error_response(err: TaskError) -> Response {
    if err.is_expected() {
        debug!(code = err.code(), "request rejected");
    }
    let status = match &err {
        TaskError::NotAssigned
        | TaskError::TaskNotFound
        | TaskError::UserNotFound
        | TaskError::WithdrawalNotFound => StatusCode::NOT_FOUND,
        TaskError::AlreadyCompleted
        | TaskError::UserExists
        | TaskError::WithdrawalNotPending => StatusCode::CONFLICT,
        TaskError::TaskInactive => StatusCode::GONE,
        TaskError::InvalidAnswer(_)
        | TaskError::ThresholdNotMet { .. }
        | TaskError::BelowMinimum { .. }
        | TaskError::InsufficientBalance => StatusCode::UNPROCESSABLE_ENTITY,
        TaskError::NotActivated => StatusCode::FORBIDDEN,
        TaskError::InvalidSettings(_) => StatusCode::BAD_REQUEST,
        TaskError::Storage(e) => {
            error!(error = %e, "storage failure");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": err.code(),
                    "message": "internal storage error",
                })),
            )
                .into_response();
        }
    };
    (
        status,
        Json(serde_json::json!({
            "error": err.code(),
            "message": err.to_string(),
        })),
    )
        .into_response()
}

/// 400 for malformed input that never reaches the domain layer.
pub(super) fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": "invalid_request",
            "message": message,
        })),
    )
        .into_response()
}

/// Middleware that records HTTP request duration into the Prometheus histogram,
/// generates (or propagates) a request ID for correlation, and wraps the
/// request in a tracing span using `.instrument()` for proper async propagation.
async fn metrics_middleware(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let method = req.method().to_string();
    let raw_path = req.uri().path().to_string();
    let norm_path = normalize_path(&raw_path);
    let start = std::time::Instant::now();

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %raw_path,
    );
    let mut response = next.run(req).instrument(span).await;

    let duration = start.elapsed().as_secs_f64();
    state
        .prom_metrics
        .http_request_duration
        .get_or_create(&prom_metrics::HttpLabel {
            method,
            path: norm_path,
        })
        .observe(duration);

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Normalize URL path to collapse high-cardinality segments (UUIDs, numeric IDs)
/// into placeholders, preventing histogram label explosion.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|seg| {
            if seg.is_empty() {
                seg.to_string()
            } else if seg.chars().all(|c| c.is_ascii_digit()) {
                ":id".to_string()
            } else if seg.len() == 36 && seg.chars().filter(|c| *c == '-').count() == 4 {
                ":uuid".to_string()
            } else {
                seg.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/register", post(routes_auth::handler_v1_register))
        .route("/api/v1/me", get(routes_auth::handler_v1_me))
        .route("/api/v1/tasks/today", get(routes_tasks::handler_v1_tasks_today))
        .route(
            "/api/v1/tasks/{id}/complete",
            post(routes_tasks::handler_v1_task_complete),
        )
        .route("/api/v1/bonus/redeem", post(routes_ledger::handler_v1_redeem))
        .route(
            "/api/v1/withdrawals",
            get(routes_ledger::handler_v1_withdrawals_list)
                .post(routes_ledger::handler_v1_withdrawals_create),
        )
        // Admin
        .route("/api/admin/users", get(routes_admin::handler_admin_users))
        .route(
            "/api/admin/users/{id}/override",
            post(routes_admin::handler_admin_user_override),
        )
        .route(
            "/api/admin/settings",
            get(routes_admin::handler_admin_settings_get)
                .put(routes_admin::handler_admin_settings_put),
        )
        .route("/api/admin/tasks", get(routes_admin::handler_admin_tasks))
        .route(
            "/api/admin/tasks/{id}/active",
            post(routes_admin::handler_admin_task_active),
        )
        .route(
            "/api/admin/withdrawals",
            get(routes_admin::handler_admin_withdrawals),
        )
        .route(
            "/api/admin/withdrawals/{id}/resolve",
            post(routes_admin::handler_admin_withdrawal_resolve),
        )
        .route("/api/admin/audit", get(routes_admin::handler_admin_audit))
        .route("/healthz", get(routes_health::handler_healthz))
        .route("/readyz", get(routes_health::handler_readyz))
        .route("/metrics", get(routes_health::handler_metrics))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CatchPanicLayer::new())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .with_state(state)
}

pub async fn run(port: u16, database_url: &str, clock: DayClock, auth: TokenAuth) -> Result<()> {
    if auth.is_insecure() {
        warn!("bearer token signatures are NOT verified (--insecure-dev-auth)");
    }
    let database = db::Database::connect(database_url).await?;
    let state = AppState::with_db(database, clock, auth);
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        addr = %addr,
        utc_offset = %clock.offset(),
        "tasklane API listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => error!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_collapses_ids() {
        assert_eq!(
            normalize_path("/api/v1/tasks/42/complete"),
            "/api/v1/tasks/:id/complete"
        );
        assert_eq!(
            normalize_path("/api/admin/users/0b6f1c7e-9a43-4f7e-8d2a-1c3b5e7f9a11/override"),
            "/api/admin/users/:uuid/override"
        );
        assert_eq!(normalize_path("/healthz"), "/healthz");
    }

    #[test]
    fn error_codes_map_to_statuses() {
        let cases = [
            (TaskError::NotAssigned, StatusCode::NOT_FOUND),
            (TaskError::AlreadyCompleted, StatusCode::CONFLICT),
            (TaskError::TaskInactive, StatusCode::GONE),
            (TaskError::TaskNotFound, StatusCode::NOT_FOUND),
            (
                TaskError::InvalidAnswer("short".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                TaskError::ThresholdNotMet {
                    bonus: 900,
                    threshold: 1000,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (TaskError::UserExists, StatusCode::CONFLICT),
            (TaskError::NotActivated, StatusCode::FORBIDDEN),
            (TaskError::WithdrawalNotPending, StatusCode::CONFLICT),
            (
                TaskError::InvalidSettings("limit".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                TaskError::Storage(sqlx::Error::RowNotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(error_response(err).status(), expected);
        }
    }
}

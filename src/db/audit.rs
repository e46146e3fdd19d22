//! Admin audit log.

use super::{AuditLogRow, Database};
use crate::error::TaskResult;
use sqlx::PgConnection;

/// Append an audit entry on the caller's connection, so it commits or rolls
/// back together with the mutation it describes.
pub(crate) async fn record(
    conn: &mut PgConnection,
    admin_id: Option<uuid::Uuid>,
    action: &str,
    target_user_id: Option<uuid::Uuid>,
    detail: serde_json::Value,
) -> TaskResult<()> {
    sqlx::query(
        "INSERT INTO admin_audit_logs (admin_id, action, target_user_id, detail)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(admin_id)
    .bind(action)
    .bind(target_user_id)
    .bind(detail)
    .execute(conn)
    .await?;
    Ok(())
}

impl Database {
    /// Most recent audit entries, newest first.
    pub async fn list_audit_logs(&self, limit: i64) -> TaskResult<Vec<AuditLogRow>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(
            "SELECT id, admin_id, action, target_user_id, detail, created_at
             FROM admin_audit_logs
             ORDER BY id DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

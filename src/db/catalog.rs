//! Task catalog queries — the active snapshot the allocator works from,
//! bulk import, and admin activation toggles.

use super::{Database, TaskRow};
use crate::allocation::{CatalogEntry, TaskCatalog};
use crate::catalog::NewTask;
use crate::error::{TaskError, TaskResult};

#[async_trait::async_trait]
impl TaskCatalog for Database {
    async fn active_entries(&self) -> TaskResult<Vec<CatalogEntry>> {
        let rows = sqlx::query_as::<_, CatalogEntry>(
            "SELECT id, kind, category FROM tasks WHERE active ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

impl Database {
    /// Insert catalog entries in one transaction. Returns the new task ids.
    pub async fn import_tasks(&self, tasks: &[NewTask]) -> anyhow::Result<Vec<i64>> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(tasks.len());
        for task in tasks {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO tasks (kind, category, title, prompt, media_url, reference_answer, reward, active)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 RETURNING id",
            )
            .bind(task.kind.trim())
            .bind(task.category.trim())
            .bind(&task.title)
            .bind(&task.prompt)
            .bind(task.media_url.as_deref())
            .bind(task.reference_answer.as_deref())
            .bind(task.reward)
            .bind(task.active)
            .fetch_one(&mut *tx)
            .await?;
            ids.push(id);
        }
        tx.commit().await?;
        Ok(ids)
    }

    /// Full catalog for the admin view, newest first.
    pub async fn list_tasks(&self, active_only: bool) -> TaskResult<Vec<TaskRow>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            "SELECT * FROM tasks WHERE active OR NOT $1 ORDER BY id DESC",
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Enable or disable a task. Disabled tasks are never newly assigned and
    /// can no longer be completed.
    pub async fn set_task_active(
        &self,
        admin_id: Option<uuid::Uuid>,
        task_id: i64,
        active: bool,
    ) -> TaskResult<TaskRow> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, TaskRow>(
            "UPDATE tasks SET active = $2 WHERE id = $1 RETURNING *",
        )
        .bind(task_id)
        .bind(active)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(TaskError::TaskNotFound)?;
        super::audit::record(
            &mut tx,
            admin_id,
            "set_task_active",
            None,
            serde_json::json!({ "task_id": task_id, "active": active }),
        )
        .await?;
        tx.commit().await?;
        Ok(row)
    }
}

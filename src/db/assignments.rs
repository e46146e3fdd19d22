//! Daily allocation — "ensure on read" task assignment.
//!
//! The first request a user makes on a given day assigns that day's tasks;
//! later requests see the same set. There is no scheduler: the day key is
//! computed from wall-clock time at request time (see [`crate::day`]).
//!
//! ## Concurrency
//!
//! Allocation runs in a transaction that first locks the user's row with
//! `SELECT ... FOR UPDATE`, so two concurrent first-requests for the same user
//! serialize: the second one sees the first one's rows and tops up nothing.
//! Inserts use `ON CONFLICT DO NOTHING` on the (user, day_key, task) unique
//! key as a second guard.
//!
//! The dangling-row sweep runs under the same lock, and the limit is checked
//! against every assignment row for the day, not just rows whose task still
//! exists. A task deleted mid-allocation can shorten the day, never lengthen it.

use super::{Database, TodayTask, TodayTasks};
use crate::allocation::{self, CatalogEntry, TaskCatalog};
use crate::error::{TaskError, TaskResult};
use chrono::NaiveDate;
use rand::SeedableRng;
use sqlx::PgConnection;
use tracing::{debug, info, warn};

/// Open (not yet completed) assignments for a user's day.
pub(crate) async fn remaining_count(
    conn: &mut PgConnection,
    user_id: uuid::Uuid,
    day: NaiveDate,
) -> TaskResult<i64> {
    let n: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM daily_assignments
         WHERE user_id = $1 AND day_key = $2 AND completed_at IS NULL",
    )
    .bind(user_id)
    .bind(day)
    .fetch_one(conn)
    .await?;
    Ok(n)
}

/// Drop this user's assignments whose task or user row no longer exists.
///
/// The user side normally cascades; task drift comes from out-of-band
/// catalog deletes.
async fn sweep_dangling(conn: &mut PgConnection, user_id: uuid::Uuid) -> TaskResult<u64> {
    let result = sqlx::query(
        "DELETE FROM daily_assignments da
         WHERE da.user_id = $1
           AND (NOT EXISTS (SELECT 1 FROM tasks t WHERE t.id = da.task_id)
                OR NOT EXISTS (SELECT 1 FROM users u WHERE u.id = da.user_id))",
    )
    .bind(user_id)
    .execute(conn)
    .await?;
    if result.rows_affected() > 0 {
        warn!(
            user_id = %user_id,
            count = result.rows_affected(),
            "swept dangling assignments"
        );
    }
    Ok(result.rows_affected())
}

impl Database {
    /// Make sure the user holds up to the configured daily limit of tasks for
    /// `day`. Idempotent: once the limit is reached nothing changes. Returns
    /// the number of newly assigned tasks.
    ///
    /// An empty catalog assigns nothing and is not an error.
    pub async fn ensure_daily_assignments(
        &self,
        user_id: uuid::Uuid,
        day: NaiveDate,
    ) -> TaskResult<usize> {
        let mut tx = self.pool.begin().await?;
        let locked: Option<uuid::Uuid> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(TaskError::UserNotFound);
        }
        sweep_dangling(&mut tx, user_id).await?;

        let settings = super::settings::load(&mut tx).await?;
        let limit = settings.daily_task_limit.max(0) as usize;

        let existing = sqlx::query_as::<_, CatalogEntry>(
            "SELECT t.id, t.kind, t.category
             FROM daily_assignments da
             JOIN tasks t ON t.id = da.task_id
             WHERE da.user_id = $1 AND da.day_key = $2
             ORDER BY da.id",
        )
        .bind(user_id)
        .bind(day)
        .fetch_all(&mut *tx)
        .await?;

        let held: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM daily_assignments WHERE user_id = $1 AND day_key = $2",
        )
        .bind(user_id)
        .bind(day)
        .fetch_one(&mut *tx)
        .await?;
        let held = held.max(0) as usize;

        if held >= limit {
            tx.commit().await?;
            return Ok(0);
        }
        let need = limit - held;

        let catalog = self.active_entries().await?;
        if catalog.is_empty() {
            debug!(user_id = %user_id, day = %day, "no active tasks to assign");
            tx.commit().await?;
            return Ok(0);
        }

        let picks = {
            let mut rng = rand::rngs::StdRng::from_entropy();
            allocation::select_tasks(&catalog, &existing, need, &mut rng)
        };

        let mut assigned = 0usize;
        for &task_id in &picks {
            let result = sqlx::query(
                "INSERT INTO daily_assignments (user_id, day_key, task_id)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (user_id, day_key, task_id) DO NOTHING",
            )
            .bind(user_id)
            .bind(day)
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
            assigned += result.rows_affected() as usize;
        }
        tx.commit().await?;

        if assigned > 0 {
            info!(
                user_id = %user_id,
                day = %day,
                assigned,
                total = held + assigned,
                "daily tasks assigned"
            );
        }
        Ok(assigned)
    }

    /// The user's task list for `day`, in assignment order, allocating first
    /// if needed.
    pub async fn get_today_tasks(
        &self,
        user_id: uuid::Uuid,
        day: NaiveDate,
    ) -> TaskResult<TodayTasks> {
        let newly_assigned = self.ensure_daily_assignments(user_id, day).await?;
        let tasks = sqlx::query_as::<_, TodayTask>(
            "SELECT da.id AS assignment_id, t.id, t.kind, t.category, t.title,
                    t.prompt, t.media_url, t.reward,
                    (da.completed_at IS NOT NULL) AS completed
             FROM daily_assignments da
             JOIN tasks t ON t.id = da.task_id
             WHERE da.user_id = $1 AND da.day_key = $2
             ORDER BY da.id",
        )
        .bind(user_id)
        .bind(day)
        .fetch_all(&self.pool)
        .await?;
        let remaining = tasks.iter().filter(|t| !t.completed).count() as i64;
        Ok(TodayTasks {
            day_key: day,
            tasks,
            remaining,
            newly_assigned,
        })
    }

    /// Number of assignment rows for a user's day (completed or not).
    pub async fn count_assignments(&self, user_id: uuid::Uuid, day: NaiveDate) -> TaskResult<i64> {
        let n: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM daily_assignments WHERE user_id = $1 AND day_key = $2",
        )
        .bind(user_id)
        .bind(day)
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }
}

//! Task completion: answer checking and reward crediting.
//!
//! A completion touches three rows in one transaction: the assignment is
//! stamped, a completion record is appended at the task's current reward, and
//! the user's balance grows by that reward. The assignment row is locked
//! first, so a concurrent duplicate submission waits and then sees the stamp.

use super::{Completion, Database};
use crate::answer;
use crate::error::{is_unique_violation, TaskError, TaskResult};
use chrono::NaiveDate;
use tracing::info;

#[derive(sqlx::FromRow)]
struct LockedAssignment {
    id: i64,
    completed: bool,
}

#[derive(sqlx::FromRow)]
struct TaskTerms {
    kind: String,
    reward: i64,
    active: bool,
    reference_answer: Option<String>,
}

impl Database {
    /// Submit `answer` for `task_id` in the user's assignments for `day`.
    ///
    /// Failures are checked in order: not assigned, already completed, task
    /// gone or inactive, answer rejected. Nothing is written unless every
    /// check passes.
    pub async fn complete_task(
        &self,
        user_id: uuid::Uuid,
        task_id: i64,
        answer_text: &str,
        day: NaiveDate,
    ) -> TaskResult<Completion> {
        let mut tx = self.pool.begin().await?;

        let assignment = sqlx::query_as::<_, LockedAssignment>(
            "SELECT id, (completed_at IS NOT NULL) AS completed
             FROM daily_assignments
             WHERE user_id = $1 AND day_key = $2 AND task_id = $3
             FOR UPDATE",
        )
        .bind(user_id)
        .bind(day)
        .bind(task_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(TaskError::NotAssigned)?;
        if assignment.completed {
            return Err(TaskError::AlreadyCompleted);
        }

        let terms = sqlx::query_as::<_, TaskTerms>(
            "SELECT kind, reward, active, reference_answer FROM tasks WHERE id = $1",
        )
        .bind(task_id)
        .fetch_optional(&mut *tx)
        .await?
        .filter(|t| t.active)
        .ok_or(TaskError::TaskInactive)?;

        answer::validate(answer_text, terms.reference_answer.as_deref())?;

        sqlx::query(
            "UPDATE daily_assignments SET completed_at = NOW(), answer = $2
             WHERE id = $1 AND completed_at IS NULL",
        )
        .bind(assignment.id)
        .bind(answer_text.trim())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO completion_records (user_id, task_id, day_key, reward)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(task_id)
        .bind(day)
        .bind(terms.reward)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                TaskError::AlreadyCompleted
            } else {
                TaskError::Storage(e)
            }
        })?;

        let new_balance: i64 = sqlx::query_scalar(
            "UPDATE users SET balance = balance + $2 WHERE id = $1 RETURNING balance",
        )
        .bind(user_id)
        .bind(terms.reward)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(TaskError::UserNotFound)?;

        let remaining = super::assignments::remaining_count(&mut tx, user_id, day).await?;
        tx.commit().await?;

        info!(
            user_id = %user_id,
            task_id,
            reward = terms.reward,
            new_balance,
            remaining,
            "task completed"
        );
        Ok(Completion {
            task_id,
            kind: terms.kind,
            reward: terms.reward,
            new_balance,
            remaining,
        })
    }

    /// Sum of all rewards recorded for a user.
    pub async fn total_rewards(&self, user_id: uuid::Uuid) -> TaskResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(reward), 0)::BIGINT FROM completion_records WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }
}

//! Withdrawal requests and admin resolution.
//!
//! Requesting debits the balance immediately with a guarded delta
//! (`balance >= amount` in the same statement); rejection refunds it. Approval
//! only marks the row: payout happens outside this system.

use super::{Database, WithdrawalRow};
use crate::error::{TaskError, TaskResult};
use tracing::info;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_APPROVED: &str = "approved";
pub const STATUS_REJECTED: &str = "rejected";

const WITHDRAWAL_COLUMNS: &str =
    "id, user_id, amount, phone, status, created_at, resolved_at, resolved_by";

impl Database {
    /// Request a payout of `amount` to `phone`.
    pub async fn request_withdrawal(
        &self,
        user_id: uuid::Uuid,
        amount: i64,
        phone: &str,
    ) -> TaskResult<WithdrawalRow> {
        let mut tx = self.pool.begin().await?;
        let settings = super::settings::load(&mut tx).await?;

        let activated: bool =
            sqlx::query_scalar("SELECT activated FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(TaskError::UserNotFound)?;
        if !activated {
            return Err(TaskError::NotActivated);
        }
        if amount < settings.min_withdrawal {
            return Err(TaskError::BelowMinimum {
                minimum: settings.min_withdrawal,
            });
        }

        let debited = sqlx::query(
            "UPDATE users SET balance = balance - $2 WHERE id = $1 AND balance >= $2",
        )
        .bind(user_id)
        .bind(amount)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if debited == 0 {
            return Err(TaskError::InsufficientBalance);
        }

        let row = sqlx::query_as::<_, WithdrawalRow>(&format!(
            "INSERT INTO withdrawals (user_id, amount, phone)
             VALUES ($1, $2, $3)
             RETURNING {}",
            WITHDRAWAL_COLUMNS
        ))
        .bind(user_id)
        .bind(amount)
        .bind(phone.trim())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(user_id = %user_id, withdrawal_id = row.id, amount, "withdrawal requested");
        Ok(row)
    }

    /// Approve or reject a pending withdrawal. Rejection refunds the amount.
    pub async fn resolve_withdrawal(
        &self,
        admin_id: Option<uuid::Uuid>,
        withdrawal_id: i64,
        approve: bool,
    ) -> TaskResult<WithdrawalRow> {
        let mut tx = self.pool.begin().await?;
        let current = sqlx::query_as::<_, WithdrawalRow>(&format!(
            "SELECT {} FROM withdrawals WHERE id = $1 FOR UPDATE",
            WITHDRAWAL_COLUMNS
        ))
        .bind(withdrawal_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(TaskError::WithdrawalNotFound)?;
        if current.status != STATUS_PENDING {
            return Err(TaskError::WithdrawalNotPending);
        }

        let status = if approve { STATUS_APPROVED } else { STATUS_REJECTED };
        let row = sqlx::query_as::<_, WithdrawalRow>(&format!(
            "UPDATE withdrawals SET status = $2, resolved_at = NOW(), resolved_by = $3
             WHERE id = $1
             RETURNING {}",
            WITHDRAWAL_COLUMNS
        ))
        .bind(withdrawal_id)
        .bind(status)
        .bind(admin_id)
        .fetch_one(&mut *tx)
        .await?;

        if !approve {
            sqlx::query("UPDATE users SET balance = balance + $2 WHERE id = $1")
                .bind(row.user_id)
                .bind(row.amount)
                .execute(&mut *tx)
                .await?;
        }

        super::audit::record(
            &mut tx,
            admin_id,
            if approve { "approve_withdrawal" } else { "reject_withdrawal" },
            Some(row.user_id),
            serde_json::json!({ "withdrawal_id": row.id, "amount": row.amount }),
        )
        .await?;
        tx.commit().await?;

        info!(
            withdrawal_id = row.id,
            user_id = %row.user_id,
            amount = row.amount,
            status,
            "withdrawal resolved"
        );
        Ok(row)
    }

    /// Withdrawals, newest first, optionally narrowed to one user and/or status.
    pub async fn list_withdrawals(
        &self,
        user_id: Option<uuid::Uuid>,
        status: Option<&str>,
        limit: i64,
    ) -> TaskResult<Vec<WithdrawalRow>> {
        let rows = sqlx::query_as::<_, WithdrawalRow>(&format!(
            "SELECT {} FROM withdrawals
             WHERE ($1::UUID IS NULL OR user_id = $1)
               AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY id DESC
             LIMIT $3",
            WITHDRAWAL_COLUMNS
        ))
        .bind(user_id)
        .bind(status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

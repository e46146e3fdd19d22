//! Bonus redemption.
//!
//! The user's row is locked before the threshold is checked, so the decision
//! and the bonus → balance move see the same bonus. Two concurrent redeems
//! serialize on the lock and the second sees the reduced bonus; a referral
//! credit committed while the redeem waits is counted.

use super::{Database, Redemption};
use crate::error::{TaskError, TaskResult};
use crate::ledger;
use tracing::info;

impl Database {
    /// Convert one fixed chunk of bonus into balance.
    pub async fn redeem_bonus(&self, user_id: uuid::Uuid) -> TaskResult<Redemption> {
        let mut tx = self.pool.begin().await?;
        let settings = super::settings::load(&mut tx).await?;

        let bonus: i64 = sqlx::query_scalar("SELECT bonus FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(TaskError::UserNotFound)?;
        let amount = ledger::redeemable_amount(bonus, &settings)?;

        let (new_balance, new_bonus): (i64, i64) = sqlx::query_as(
            "UPDATE users
             SET bonus = bonus - $2, balance = balance + $2
             WHERE id = $1
             RETURNING balance, bonus",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO redemptions (user_id, amount) VALUES ($1, $2)")
            .bind(user_id)
            .bind(amount)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(user_id = %user_id, amount, new_balance, new_bonus, "bonus redeemed");
        Ok(Redemption {
            redeemed_amount: amount,
            new_balance,
            new_bonus,
        })
    }

    /// Total amount a user has redeemed so far.
    pub async fn total_redeemed(&self, user_id: uuid::Uuid) -> TaskResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM redemptions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }
}

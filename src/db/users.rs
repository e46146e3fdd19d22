//! User registration, referral crediting, lookups, and admin overrides.

use super::{Database, Registration, UserRow};
use crate::error::{is_unique_violation, TaskError, TaskResult};
use crate::ledger;
use serde::Deserialize;
use sqlx::PgConnection;
use tracing::{info, warn};

/// Absolute field writes applied by an admin. Absent fields are untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserOverride {
    pub balance: Option<i64>,
    pub bonus: Option<i64>,
    pub activated: Option<bool>,
}

/// Referral code generation retries before giving up on a collision streak.
const REFERRAL_CODE_ATTEMPTS: usize = 5;

async fn referral_code_taken(conn: &mut PgConnection, code: &str) -> TaskResult<bool> {
    let taken: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE referral_code = $1)")
            .bind(code)
            .fetch_one(conn)
            .await?;
    Ok(taken)
}

impl Database {
    // ── Registration ────────────────────────────────────────────

    /// Create a user and, when `referral_code` names an existing user, credit
    /// that referrer's bonus. One transaction: a duplicate username or email
    /// fails with [`TaskError::UserExists`] and credits nothing.
    pub async fn register_user(
        &self,
        username: &str,
        email: &str,
        referral_code: Option<&str>,
    ) -> TaskResult<Registration> {
        let mut tx = self.pool.begin().await?;
        let settings = super::settings::load(&mut tx).await?;

        let mut code = ledger::generate_referral_code();
        for _ in 1..REFERRAL_CODE_ATTEMPTS {
            if !referral_code_taken(&mut tx, &code).await? {
                break;
            }
            code = ledger::generate_referral_code();
        }

        let user = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (username, email, referral_code)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(username.trim())
        .bind(email.trim().to_lowercase())
        .bind(&code)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                TaskError::UserExists
            } else {
                TaskError::Storage(e)
            }
        })?;

        let mut referral_credited = false;
        if let Some(code) = ledger::clean_referral_code(referral_code) {
            let referrer: Option<uuid::Uuid> =
                sqlx::query_scalar("SELECT id FROM users WHERE referral_code = $1")
                    .bind(&code)
                    .fetch_optional(&mut *tx)
                    .await?;
            match referrer {
                Some(referrer_id) if referrer_id != user.id => {
                    let inserted = sqlx::query(
                        "INSERT INTO referrals (referrer_id, referred_user_id, bonus_amount)
                         VALUES ($1, $2, $3)
                         ON CONFLICT (referred_user_id) DO NOTHING",
                    )
                    .bind(referrer_id)
                    .bind(user.id)
                    .bind(settings.referral_bonus)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();
                    if inserted == 1 {
                        sqlx::query("UPDATE users SET bonus = bonus + $2 WHERE id = $1")
                            .bind(referrer_id)
                            .bind(settings.referral_bonus)
                            .execute(&mut *tx)
                            .await?;
                        referral_credited = true;
                        info!(
                            referrer_id = %referrer_id,
                            referred_user_id = %user.id,
                            bonus = settings.referral_bonus,
                            "referral credited"
                        );
                    }
                }
                _ => {
                    warn!(code = %code, username = %user.username, "unknown referral code ignored");
                }
            }
        }

        tx.commit().await?;
        info!(
            user_id = %user.id,
            username = %user.username,
            referral_credited,
            "user registered"
        );
        Ok(Registration {
            user,
            referral_credited,
        })
    }

    // ── Lookups ─────────────────────────────────────────────────

    pub async fn get_user(&self, user_id: uuid::Uuid) -> TaskResult<UserRow> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(TaskError::UserNotFound)
    }

    pub async fn get_user_by_referral_code(&self, code: &str) -> TaskResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE referral_code = $1")
            .bind(code.trim().to_ascii_uppercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Users for the admin view, newest first.
    pub async fn list_users(&self, limit: i64, offset: i64) -> TaskResult<Vec<UserRow>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users ORDER BY created_at DESC, id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Number of users this user has referred.
    pub async fn count_referrals(&self, referrer_id: uuid::Uuid) -> TaskResult<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM referrals WHERE referrer_id = $1")
            .bind(referrer_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    // ── Admin ───────────────────────────────────────────────────

    /// Grant or revoke the admin flag (bootstrap path for the CLI).
    pub async fn set_admin(&self, user_id: uuid::Uuid, is_admin: bool) -> TaskResult<UserRow> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET is_admin = $2 WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(is_admin)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(TaskError::UserNotFound)?;
        super::audit::record(
            &mut tx,
            None,
            "set_admin",
            Some(user_id),
            serde_json::json!({ "is_admin": is_admin }),
        )
        .await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Absolute overwrite of balance, bonus, and/or activation. The only
    /// path that writes the counters without a delta; always audited with
    /// the before and after values.
    pub async fn admin_override(
        &self,
        admin_id: Option<uuid::Uuid>,
        user_id: uuid::Uuid,
        changes: &UserOverride,
    ) -> TaskResult<UserRow> {
        if changes.balance.is_some_and(|b| b < 0) || changes.bonus.is_some_and(|b| b < 0) {
            return Err(TaskError::InvalidSettings(
                "balance and bonus must be non-negative".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let before = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(TaskError::UserNotFound)?;

        let after = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET
               balance = COALESCE($2, balance),
               bonus = COALESCE($3, bonus),
               activated = COALESCE($4, activated)
             WHERE id = $1
             RETURNING *",
        )
        .bind(user_id)
        .bind(changes.balance)
        .bind(changes.bonus)
        .bind(changes.activated)
        .fetch_one(&mut *tx)
        .await?;

        super::audit::record(
            &mut tx,
            admin_id,
            "admin_override",
            Some(user_id),
            serde_json::json!({
                "before": {
                    "balance": before.balance,
                    "bonus": before.bonus,
                    "activated": before.activated,
                },
                "after": {
                    "balance": after.balance,
                    "bonus": after.bonus,
                    "activated": after.activated,
                },
            }),
        )
        .await?;
        tx.commit().await?;

        info!(
            admin_id = ?admin_id,
            user_id = %user_id,
            balance = after.balance,
            bonus = after.bonus,
            activated = after.activated,
            "admin override applied"
        );
        Ok(after)
    }
}

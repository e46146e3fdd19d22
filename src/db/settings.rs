//! Platform settings singleton.
//!
//! Callers read this fresh for every operation; nothing is cached.

use super::Database;
use crate::error::TaskResult;
use crate::settings::PlatformSettings;
use sqlx::PgConnection;

const SELECT_SETTINGS: &str = "SELECT daily_task_limit, referral_bonus, redeem_threshold,
        redeem_amount, min_withdrawal
 FROM platform_settings
 LIMIT 1";

/// Read settings on an existing connection (e.g. inside a transaction).
/// Falls back to defaults when the singleton row is missing.
pub(crate) async fn load(conn: &mut PgConnection) -> TaskResult<PlatformSettings> {
    let row = sqlx::query_as::<_, PlatformSettings>(SELECT_SETTINGS)
        .fetch_optional(conn)
        .await?;
    Ok(row.unwrap_or_default())
}

impl Database {
    /// Current platform settings.
    pub async fn get_settings(&self) -> TaskResult<PlatformSettings> {
        let row = sqlx::query_as::<_, PlatformSettings>(SELECT_SETTINGS)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.unwrap_or_default())
    }

    /// Replace the settings after validation, recording an audit entry.
    pub async fn update_settings(
        &self,
        admin_id: Option<uuid::Uuid>,
        settings: &PlatformSettings,
    ) -> TaskResult<PlatformSettings> {
        settings.validate()?;
        let mut tx = self.pool.begin().await?;
        let previous = load(&mut tx).await?;
        let row = sqlx::query_as::<_, PlatformSettings>(
            "INSERT INTO platform_settings
                (id, daily_task_limit, referral_bonus, redeem_threshold, redeem_amount, min_withdrawal, updated_at)
             VALUES (TRUE, $1, $2, $3, $4, $5, NOW())
             ON CONFLICT (id) DO UPDATE SET
               daily_task_limit = EXCLUDED.daily_task_limit,
               referral_bonus = EXCLUDED.referral_bonus,
               redeem_threshold = EXCLUDED.redeem_threshold,
               redeem_amount = EXCLUDED.redeem_amount,
               min_withdrawal = EXCLUDED.min_withdrawal,
               updated_at = NOW()
             RETURNING daily_task_limit, referral_bonus, redeem_threshold,
                       redeem_amount, min_withdrawal",
        )
        .bind(settings.daily_task_limit)
        .bind(settings.referral_bonus)
        .bind(settings.redeem_threshold)
        .bind(settings.redeem_amount)
        .bind(settings.min_withdrawal)
        .fetch_one(&mut *tx)
        .await?;
        super::audit::record(
            &mut tx,
            admin_id,
            "update_settings",
            None,
            serde_json::json!({ "before": previous, "after": row }),
        )
        .await?;
        tx.commit().await?;
        tracing::info!(
            daily_task_limit = row.daily_task_limit,
            redeem_threshold = row.redeem_threshold,
            redeem_amount = row.redeem_amount,
            "platform settings updated"
        );
        Ok(row)
    }
}

//! Platform settings — the admin-tunable business knobs.
//!
//! Stored as a singleton row (`platform_settings`) and read fresh on every
//! operation that depends on them, so an admin change applies to the next
//! request without a restart.

use crate::error::{TaskError, TaskResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DAILY_TASK_LIMIT: i32 = 10;
pub const DEFAULT_REFERRAL_BONUS: i64 = 100;
pub const DEFAULT_REDEEM_THRESHOLD: i64 = 1000;
pub const DEFAULT_REDEEM_AMOUNT: i64 = 1000;
pub const DEFAULT_MIN_WITHDRAWAL: i64 = 500;

/// Upper bound on the daily limit an admin may configure.
pub const MAX_DAILY_TASK_LIMIT: i32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlatformSettings {
    pub daily_task_limit: i32,
    pub referral_bonus: i64,
    pub redeem_threshold: i64,
    pub redeem_amount: i64,
    pub min_withdrawal: i64,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        PlatformSettings {
            daily_task_limit: DEFAULT_DAILY_TASK_LIMIT,
            referral_bonus: DEFAULT_REFERRAL_BONUS,
            redeem_threshold: DEFAULT_REDEEM_THRESHOLD,
            redeem_amount: DEFAULT_REDEEM_AMOUNT,
            min_withdrawal: DEFAULT_MIN_WITHDRAWAL,
        }
    }
}

impl PlatformSettings {
    /// Reject settings that would break ledger invariants.
    pub fn validate(&self) -> TaskResult<()> {
        if !(1..=MAX_DAILY_TASK_LIMIT).contains(&self.daily_task_limit) {
            return Err(TaskError::InvalidSettings(format!(
                "daily_task_limit must be between 1 and {}",
                MAX_DAILY_TASK_LIMIT
            )));
        }
        if self.referral_bonus < 0 {
            return Err(TaskError::InvalidSettings(
                "referral_bonus must not be negative".into(),
            ));
        }
        if self.redeem_amount <= 0 {
            return Err(TaskError::InvalidSettings(
                "redeem_amount must be positive".into(),
            ));
        }
        if self.redeem_threshold <= 0 {
            return Err(TaskError::InvalidSettings(
                "redeem_threshold must be positive".into(),
            ));
        }
        if self.min_withdrawal <= 0 {
            return Err(TaskError::InvalidSettings(
                "min_withdrawal must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Bonus balance a user needs before a redemption can go through.
    /// Never less than the transfer itself, so bonus cannot go negative.
    pub fn redeem_floor(&self) -> i64 {
        self.redeem_threshold.max(self.redeem_amount)
    }
}

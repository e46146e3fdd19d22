//! Typed failures for the task, ledger, and withdrawal operations.
//!
//! Every expected, recoverable condition has its own variant with a stable
//! machine code (`code()`) and a user-facing message (`Display`), so the HTTP
//! layer can render specific guidance. Storage failures are wrapped in
//! [`TaskError::Storage`] and abort the surrounding transaction: the
//! `sqlx::Transaction` is dropped on the `?` exit and rolls back.

/// Result alias for domain operations.
pub type TaskResult<T> = std::result::Result<T, TaskError>;

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("this task is not in today's assignments")]
    NotAssigned,

    #[error("this task has already been completed today")]
    AlreadyCompleted,

    #[error("this task is no longer available")]
    TaskInactive,

    #[error("task not found")]
    TaskNotFound,

    #[error("answer rejected: {0}")]
    InvalidAnswer(String),

    #[error("bonus must reach {threshold} to redeem (current bonus: {bonus})")]
    ThresholdNotMet { bonus: i64, threshold: i64 },

    #[error("user not found")]
    UserNotFound,

    #[error("username or email is already registered")]
    UserExists,

    #[error("account must be activated before withdrawing")]
    NotActivated,

    #[error("minimum withdrawal is {minimum}")]
    BelowMinimum { minimum: i64 },

    #[error("insufficient balance for this withdrawal")]
    InsufficientBalance,

    #[error("withdrawal not found")]
    WithdrawalNotFound,

    #[error("withdrawal has already been resolved")]
    WithdrawalNotPending,

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl TaskError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAssigned => "not_assigned",
            Self::AlreadyCompleted => "already_completed",
            Self::TaskInactive => "task_inactive",
            Self::TaskNotFound => "task_not_found",
            Self::InvalidAnswer(_) => "invalid_answer",
            Self::ThresholdNotMet { .. } => "threshold_not_met",
            Self::UserNotFound => "user_not_found",
            Self::UserExists => "user_exists",
            Self::NotActivated => "not_activated",
            Self::BelowMinimum { .. } => "below_minimum",
            Self::InsufficientBalance => "insufficient_balance",
            Self::WithdrawalNotFound => "withdrawal_not_found",
            Self::WithdrawalNotPending => "withdrawal_not_pending",
            Self::InvalidSettings(_) => "invalid_settings",
            Self::Storage(_) => "storage_error",
        }
    }

    /// True for failures the caller caused (as opposed to storage faults).
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

/// True if the error is a PostgreSQL unique-constraint violation (SQLSTATE 23505).
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

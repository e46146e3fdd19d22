//! # Database — PostgreSQL Storage Layer
//!
//! Async storage operations for users, the task catalog, daily assignments,
//! the completion and redemption ledgers, withdrawals, settings, and the admin
//! audit log, via `sqlx::PgPool`.
//!
//! ## Schema
//!
//! - `users`: identity, `balance`, `bonus`, activation and admin flags
//! - `tasks`: catalog entries (kind, category, reward, optional reference answer)
//! - `daily_assignments`: (user, day_key, task) bindings, stamped on completion
//! - `completion_records`: append-only reward ledger
//! - `referrals`: one row per referred user
//! - `redemptions`, `withdrawals`, `platform_settings`, `admin_audit_logs`
//!
//! ## Module Structure
//!
//! - [`users`] — Registration with referral crediting, lookups, admin overrides
//! - [`catalog`] — Active catalog snapshot, import, activation toggles
//! - [`assignments`] — Daily allocation and today's task list
//! - [`completions`] — Answer submission and reward crediting
//! - [`redemptions`] — Bonus → balance conversion
//! - [`withdrawals`] — Withdrawal requests and admin resolution
//! - [`settings`] — Platform settings singleton
//! - [`audit`] — Admin audit log
//!
//! ## Consistency
//!
//! The store is the only shared mutable state. Balance and bonus move only by
//! relative deltas inside the transaction that writes their companion row
//! (completion record, redemption, withdrawal, audit entry). Races are settled
//! by row locks, conditional updates, and unique constraints, never by
//! in-process locking, since several server instances may share one database.

pub mod assignments;
pub mod audit;
pub mod catalog;
pub mod completions;
pub mod redemptions;
pub mod settings;
pub mod users;
pub mod withdrawals;

use anyhow::Result;
use serde::Serialize;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

// ── User types ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserRow {
    pub id: uuid::Uuid,
    pub username: String,
    pub email: String,
    pub referral_code: String,
    pub balance: i64,
    pub bonus: i64,
    pub activated: bool,
    pub is_admin: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Outcome of a registration: the new user, and whether a referrer was
/// credited for it.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    #[serde(flatten)]
    pub user: UserRow,
    pub referral_credited: bool,
}

// ── Task types ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TaskRow {
    pub id: i64,
    pub kind: String,
    pub category: String,
    pub title: String,
    pub prompt: String,
    pub media_url: Option<String>,
    #[serde(skip_serializing)]
    pub reference_answer: Option<String>,
    pub reward: i64,
    pub active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// One entry in a user's task list for the day.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TodayTask {
    pub assignment_id: i64,
    pub id: i64,
    pub kind: String,
    pub category: String,
    pub title: String,
    pub prompt: String,
    pub media_url: Option<String>,
    pub reward: i64,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TodayTasks {
    pub day_key: chrono::NaiveDate,
    pub tasks: Vec<TodayTask>,
    pub remaining: i64,
    /// Tasks assigned by this call (0 once the day is allocated).
    #[serde(skip)]
    pub newly_assigned: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Completion {
    pub task_id: i64,
    pub kind: String,
    pub reward: i64,
    pub new_balance: i64,
    pub remaining: i64,
}

// ── Ledger types ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Redemption {
    pub redeemed_amount: i64,
    pub new_balance: i64,
    pub new_bonus: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WithdrawalRow {
    pub id: i64,
    pub user_id: uuid::Uuid,
    pub amount: i64,
    pub phone: String,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub resolved_at: Option<chrono::DateTime<chrono::Utc>>,
    pub resolved_by: Option<uuid::Uuid>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditLogRow {
    pub id: i64,
    pub admin_id: Option<uuid::Uuid>,
    pub action: String,
    pub target_user_id: Option<uuid::Uuid>,
    pub detail: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// ── Migrations ──────────────────────────────────────────────────

/// Ordered schema migrations, embedded at compile time.
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("001_core.sql", include_str!("../../migrations/001_core.sql")),
    ("002_ledger.sql", include_str!("../../migrations/002_ledger.sql")),
];

// ── Database struct and connection ──────────────────────────────

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL using the provided database URL.
    ///
    /// Parses the URL by hand so percent-encoded usernames and passwords
    /// survive intact.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let url = url::Url::parse(database_url)?;
        let username = urlencoding::decode(url.username())?.into_owned();
        let password = url
            .password()
            .map(|p| urlencoding::decode(p).map(|s| s.into_owned()))
            .transpose()?;
        let mut opts = PgConnectOptions::new()
            .host(url.host_str().unwrap_or("localhost"))
            .port(url.port().unwrap_or(5432))
            .database(url.path().trim_start_matches('/'))
            .username(&username);
        if let Some(ref pw) = password {
            opts = opts.password(pw);
        }
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await?;
        Ok(Database { pool })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check: execute `SELECT 1` to verify database connectivity.
    ///
    /// Used by the `/readyz` readiness probe.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    /// Apply every embedded migration in order. All statements are idempotent
    /// (`IF NOT EXISTS` / `ON CONFLICT DO NOTHING`), so re-running is safe.
    pub async fn migrate(&self) -> Result<()> {
        for (name, sql) in MIGRATIONS {
            sqlx::raw_sql(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| anyhow::anyhow!("migration {} failed: {}", name, e))?;
            tracing::info!(migration = name, "migration applied");
        }
        Ok(())
    }
}

//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use tasklane::catalog::NewTask;
use tasklane::db::Database;

/// Returns the test database URL from the `TEST_DATABASE_URL` environment variable.
/// Panics if the variable is not set.
pub fn test_db_url() -> String {
    std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set for integration tests")
}

/// Returns true if the test database URL is configured.
pub fn has_test_db() -> bool {
    std::env::var("TEST_DATABASE_URL").is_ok()
}

/// Secret the test server verifies bearer tokens against.
pub const TEST_JWT_SECRET: &str = "tasklane-test-secret";

/// Serializes database tests within one test binary. Each `#[tokio::test]`
/// runs on its own runtime, so this has to be a runtime-agnostic lock.
static DB_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

static SCHEMA_READY: AtomicBool = AtomicBool::new(false);

/// A clean database handle that holds the suite-wide lock until dropped.
pub struct TestDb {
    db: Database,
    _guard: tokio::sync::MutexGuard<'static, ()>,
}

impl Deref for TestDb {
    type Target = Database;

    fn deref(&self) -> &Database {
        &self.db
    }
}

impl TestDb {
    pub fn database(&self) -> Database {
        self.db.clone()
    }
}

/// Connect to the test database, apply migrations once, and truncate every table.
pub async fn setup_test_db() -> TestDb {
    let guard = DB_LOCK.lock().await;
    let db = Database::connect(&test_db_url())
        .await
        .expect("Failed to connect to test database");
    if !SCHEMA_READY.load(Ordering::SeqCst) {
        db.migrate().await.expect("migrations failed");
        SCHEMA_READY.store(true, Ordering::SeqCst);
    }
    truncate_all_tables(db.pool()).await;
    TestDb { db, _guard: guard }
}

/// Truncate all tables and re-seed the settings singleton.
pub async fn truncate_all_tables(pool: &sqlx::PgPool) {
    sqlx::raw_sql(
        "TRUNCATE TABLE admin_audit_logs, withdrawals, redemptions, referrals,
                       completion_records, daily_assignments, tasks, users,
                       platform_settings
         RESTART IDENTITY CASCADE",
    )
    .execute(pool)
    .await
    .unwrap();

    sqlx::raw_sql("INSERT INTO platform_settings (id) VALUES (TRUE)")
        .execute(pool)
        .await
        .unwrap();
}

/// Build an Axum test app router connected to a clean test database.
/// The returned `TestDb` must be kept alive for the duration of the test.
pub async fn build_test_app() -> (axum::Router, TestDb) {
    let db = setup_test_db().await;
    let state = tasklane::server::AppState::with_db(
        db.database(),
        Default::default(),
        tasklane::server::TokenAuth::Verified(TEST_JWT_SECRET.to_string()),
    );
    (tasklane::server::build_router(state), db)
}

// ── Fixtures ────────────────────────────────────────────────────

/// A task without a reference answer (free-form kinds like surveys).
pub fn free_task(kind: &str, category: &str, reward: i64) -> NewTask {
    NewTask {
        kind: kind.to_string(),
        category: category.to_string(),
        title: format!("{} task", kind),
        prompt: "Answer the question.".to_string(),
        media_url: None,
        reference_answer: None,
        reward,
        active: true,
    }
}

/// A match-based task (transcription, copy-typing).
pub fn reference_task(kind: &str, category: &str, reward: i64, reference: &str) -> NewTask {
    NewTask {
        reference_answer: Some(reference.to_string()),
        ..free_task(kind, category, reward)
    }
}

/// `kinds` distinct kinds spread round-robin over `categories` categories,
/// `per_kind` tasks each, every one worth `reward`.
pub fn varied_catalog(kinds: usize, categories: usize, per_kind: usize, reward: i64) -> Vec<NewTask> {
    let mut tasks = Vec::new();
    for k in 0..kinds {
        let category = format!("category_{}", k % categories.max(1));
        for _ in 0..per_kind {
            tasks.push(free_task(&format!("kind_{:02}", k), &category, reward));
        }
    }
    tasks
}

pub async fn seed_catalog(db: &Database, tasks: &[NewTask]) -> Vec<i64> {
    db.import_tasks(tasks).await.expect("catalog import failed")
}

/// Register a user with a unique-looking username/email derived from `name`.
pub async fn register(db: &Database, name: &str) -> tasklane::db::UserRow {
    db.register_user(name, &format!("{}@example.com", name), None)
        .await
        .expect("registration failed")
        .user
}

pub async fn make_admin(db: &Database, user_id: uuid::Uuid) {
    db.set_admin(user_id, true).await.expect("set_admin failed");
}

/// A bearer token for `user_id`, signed with the test server's secret.
pub fn bearer_token(user_id: uuid::Uuid) -> String {
    token_signed_with(user_id, TEST_JWT_SECRET.as_bytes())
}

/// A well-formed bearer token for `user_id` signed with an arbitrary key.
pub fn token_signed_with(user_id: uuid::Uuid, key: &[u8]) -> String {
    let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp();
    let claims = serde_json::json!({
        "sub": user_id.to_string(),
        "aud": "authenticated",
        "exp": exp,
    });
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(key),
    )
    .expect("token encoding failed")
}

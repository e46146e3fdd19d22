//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim. Each function
//! connects to PostgreSQL, performs one operational task, and reports on
//! stderr (machine-readable output such as settings JSON goes to stdout).

use anyhow::Result;
use std::path::Path;
use tasklane::{catalog, db};
use tracing::info;

pub async fn run_migrate(database_url: &str) -> Result<()> {
    let database = db::Database::connect(database_url).await?;
    database.migrate().await?;
    eprintln!("Applied {} migrations", db::MIGRATIONS.len());
    Ok(())
}

/// Parse, validate, and insert a catalog file in one transaction.
pub async fn run_import_tasks(database_url: &str, file: &Path) -> Result<()> {
    let parsed = catalog::parse_toml_file(file)?;
    let database = db::Database::connect(database_url).await?;
    let ids = database.import_tasks(&parsed.tasks).await?;
    info!(file = %file.display(), count = ids.len(), "catalog imported");

    eprintln!("Imported {} tasks from {}", ids.len(), file.display());
    let mut kinds: Vec<&str> = parsed.tasks.iter().map(|t| t.kind.trim()).collect();
    kinds.sort_unstable();
    kinds.dedup();
    eprintln!("  Kinds ({}): {}", kinds.len(), kinds.join(", "));
    Ok(())
}

pub async fn run_settings(database_url: &str) -> Result<()> {
    let database = db::Database::connect(database_url).await?;
    let settings = database.get_settings().await?;
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

pub async fn run_grant_admin(database_url: &str, user_id: uuid::Uuid, grant: bool) -> Result<()> {
    let database = db::Database::connect(database_url).await?;
    let user = database.set_admin(user_id, grant).await?;
    eprintln!(
        "User '{}' ({}) is_admin = {}",
        user.username, user.id, user.is_admin
    );
    Ok(())
}

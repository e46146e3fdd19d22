//! CLI integration tests using assert_cmd.
//!
//! Tests without database: always run (help, arg validation).
//! Tests with database: gated on TEST_DATABASE_URL environment variable.

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

#[allow(deprecated)]
fn tasklane() -> Command {
    let mut cmd = Command::cargo_bin("tasklane").unwrap();
    cmd.env_remove("DATABASE_URL")
        .env_remove("TASKLANE_UTC_OFFSET_HOURS")
        .env_remove("JWT_SECRET");
    cmd
}

// --- Help and arg validation (no database needed) ---

#[test]
fn help_shows_all_subcommands() {
    tasklane().arg("--help").assert().success().stdout(
        predicate::str::contains("serve")
            .and(predicate::str::contains("migrate"))
            .and(predicate::str::contains("import-tasks"))
            .and(predicate::str::contains("settings"))
            .and(predicate::str::contains("grant-admin"))
            .and(predicate::str::contains("--utc-offset-hours")),
    );
}

#[test]
fn help_serve_shows_port() {
    tasklane()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--port"));
}

#[test]
fn help_import_tasks_shows_file() {
    tasklane()
        .args(["import-tasks", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--file"));
}

#[test]
fn missing_subcommand_fails() {
    tasklane().assert().failure();
}

#[test]
fn serve_without_database_url_fails() {
    tasklane()
        .current_dir(std::env::temp_dir())
        .args(["serve", "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DATABASE_URL is required"));
}

#[test]
fn serve_without_jwt_secret_fails() {
    tasklane()
        .current_dir(std::env::temp_dir())
        .env("DATABASE_URL", "postgres://localhost:1/unused")
        .args(["serve", "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JWT_SECRET is required"));
}

#[test]
fn help_serve_shows_insecure_dev_auth() {
    tasklane()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--insecure-dev-auth"));
}

#[test]
fn out_of_range_offset_rejected() {
    tasklane()
        .current_dir(std::env::temp_dir())
        .args(["--utc-offset-hours", "20", "settings"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("UTC offset"));
}

#[test]
fn grant_admin_requires_uuid() {
    tasklane()
        .args(["grant-admin", "--user-id", "not-a-uuid"])
        .assert()
        .failure();
}

// --- Database-backed commands ---

#[test]
fn migrate_and_import_catalog() {
    if !common::has_test_db() {
        eprintln!("Skipping: TEST_DATABASE_URL not set");
        return;
    }
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[[task]]
kind = "cli_import_check"
category = "Surveys"
title = "Favourite fruit"
prompt = "Which fruit do you prefer?"
reward = 7
"#
    )
    .unwrap();

    tasklane()
        .env("DATABASE_URL", common::test_db_url())
        .arg("migrate")
        .assert()
        .success();

    tasklane()
        .env("DATABASE_URL", common::test_db_url())
        .args(["import-tasks", "--file"])
        .arg(file.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Imported 1 tasks"));

    tasklane()
        .env("DATABASE_URL", common::test_db_url())
        .arg("settings")
        .assert()
        .success()
        .stdout(predicate::str::contains("daily_task_limit"));
}

#[test]
fn import_rejects_invalid_catalog() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[[task]]
kind = "survey"
category = "Surveys"
title = "Broken"
reward = 0
"#
    )
    .unwrap();

    tasklane()
        .current_dir(std::env::temp_dir())
        .env("DATABASE_URL", "postgres://localhost:1/unused")
        .args(["import-tasks", "--file"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("reward must be positive"));
}

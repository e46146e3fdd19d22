//! # Main — CLI Entry Point
//!
//! Routes CLI subcommands to the HTTP server and the operational tasks
//! (migrations, catalog import, settings inspection, admin bootstrap).
//!
//! ## Global Options
//!
//! - `--database-url` / `DATABASE_URL`: PostgreSQL connection (required by every subcommand).
//! - `--utc-offset-hours` / `TASKLANE_UTC_OFFSET_HOURS`: home timezone for day keys (default 3).
//!
//! `serve` also needs `JWT_SECRET` unless started with `--insecure-dev-auth`.

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tasklane", about = "Micro-task earning platform API and tools")]
struct Cli {
    /// PostgreSQL connection URL (or set DATABASE_URL env var)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Whole-hour UTC offset of the platform's home timezone; tasks reset at
    /// local midnight there
    #[arg(
        long,
        env = "TASKLANE_UTC_OFFSET_HOURS",
        default_value_t = tasklane::day::DEFAULT_UTC_OFFSET_HOURS,
        allow_hyphen_values = true
    )]
    utc_offset_hours: i32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 7001)]
        port: u16,
        /// Accept bearer tokens without verifying their signature when
        /// JWT_SECRET is unset (local development only)
        #[arg(long)]
        insecure_dev_auth: bool,
    },
    /// Apply the embedded database migrations
    Migrate,
    /// Import task catalog entries from a TOML file
    ImportTasks {
        /// Path to the TOML catalog file ([[task]] tables)
        #[arg(long)]
        file: PathBuf,
    },
    /// Print the current platform settings as JSON
    Settings,
    /// Grant (or with --revoke, remove) the admin flag on a user
    GrantAdmin {
        /// User id (UUID)
        #[arg(long)]
        user_id: uuid::Uuid,
        /// Remove the flag instead of granting it
        #[arg(long)]
        revoke: bool,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Initialize structured logging: LOG_FORMAT=json for K8s, human-readable otherwise
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    let clock = tasklane::day::DayClock::from_offset_hours(cli.utc_offset_hours)?;
    let database_url = cli.database_url.as_deref().ok_or_else(|| {
        anyhow::anyhow!("DATABASE_URL is required (set via --database-url or env)")
    })?;

    let rt = tokio::runtime::Runtime::new()?;
    match &cli.command {
        Commands::Serve {
            port,
            insecure_dev_auth,
        } => {
            let auth = tasklane::server::TokenAuth::from_env(*insecure_dev_auth)?;
            rt.block_on(tasklane::server::run(*port, database_url, clock, auth))
        }
        Commands::Migrate => rt.block_on(cli::run_migrate(database_url)),
        Commands::ImportTasks { file } => rt.block_on(cli::run_import_tasks(database_url, file)),
        Commands::Settings => rt.block_on(cli::run_settings(database_url)),
        Commands::GrantAdmin { user_id, revoke } => {
            rt.block_on(cli::run_grant_admin(database_url, *user_id, !*revoke))
        }
    }
}

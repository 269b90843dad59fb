//! Database configuration module.

use std::str::FromStr;
use std::time::Duration;

use once_cell::sync::OnceCell;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::env::APP_CONFIG;
use crate::error::{AppError, AppResult};

static DB_POOL: OnceCell<SqlitePool> = OnceCell::new();

/// Builds connection options for a SQLite URL.
///
/// The database file is created if missing and foreign keys are enforced.
/// URLs without the `sqlite:` scheme are rejected instead of being read as file names.
pub fn connect_options(database_url: &str) -> AppResult<SqliteConnectOptions> {
    if !database_url.starts_with("sqlite:") {
        return Err(AppError::Internal(format!(
            "DATABASE_URL must use the sqlite: scheme, got '{database_url}'"
        )));
    }

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    Ok(options)
}

/// Initializes the database connection pool.
///
/// This function creates a connection pool and stores it in a global `OnceCell`.
/// Subsequent calls will return the same pool.
pub async fn init_db() -> AppResult<SqlitePool> {
    if let Some(pool) = DB_POOL.get() {
        return Ok(pool.clone());
    }

    let options = connect_options(&APP_CONFIG.database_url)?;

    let pool = SqlitePoolOptions::new()
        .max_connections(APP_CONFIG.db_max_connections)
        .min_connections(APP_CONFIG.db_min_connections)
        .acquire_timeout(Duration::from_secs(APP_CONFIG.db_acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(APP_CONFIG.db_idle_timeout_secs))
        .max_lifetime(Duration::from_secs(APP_CONFIG.db_max_lifetime_secs))
        // Log slow connection acquisitions
        .acquire_slow_threshold(Duration::from_millis(500))
        .connect_with(options)
        .await?;

    DB_POOL.set(pool.clone()).ok();
    tracing::info!(
        database_url = %APP_CONFIG.database_url,
        max_connections = APP_CONFIG.db_max_connections,
        "Database connection pool established"
    );

    Ok(pool)
}

/// Applies the embedded schema migrations.
pub async fn run_migrations(pool: &SqlitePool) -> AppResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Closes the database connection pool.
pub async fn close_db() {
    if let Some(pool) = DB_POOL.get() {
        pool.close().await;
        tracing::info!("Database connection closed");
    }
}

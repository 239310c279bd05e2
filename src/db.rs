//! Database connection pool and migration management.
//!
//! This module provides utilities for:
//! - Creating and managing a SQLite connection pool
//! - Running database migrations automatically

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

/// Type alias for SQLite connection pool.
///
/// Instead of writing `Pool<Sqlite>` everywhere, we can use `DbPool`.
pub type DbPool = Pool<Sqlite>;

/// Create a new SQLite connection pool.
///
/// A connection pool maintains multiple database connections that can be reused across HTTP requests which is much more efficient than opening a new connection for each request.
///
/// # Arguments
///
/// * `database_url` - SQLite connection string (e.g. `sqlite://cti.db`)
///
/// # Configuration
///
/// - Maximum connections: 5 (small pool to limit writer contention)
/// - Database file is created on first run if missing
/// - WAL journal mode so authentications keep reading while admin writes commit
/// - 5 second busy timeout instead of immediate `SQLITE_BUSY` failures
///
/// # Errors
///
/// Returns an error if:
/// - Database connection string is invalid
/// - The database file cannot be created or opened
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        // Limit concurrent connections
        .max_connections(5)
        .connect_with(options)
        .await
}

/// Run database migrations from the `migrations/` directory.
///
/// This function executes all SQL migration files in order. Migrations are tracked in a special `_sqlx_migrations` table, so each migration runs only once.
///
/// # Arguments
///
/// * `pool` - Database connection pool
///
/// # Migration Files
///
/// Migration files must be in `migrations/` directory with format:
/// - `<timestamp>_<name>.sql` (e.g., `20251215000001_create_api_keys.sql`)
///
/// # Errors
///
/// Returns an error if:
/// - Migration files cannot be read
/// - SQL syntax errors in migration files
/// - Database errors during migration execution
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    // The macro reads migrations at compile time from ./migrations directory
    sqlx::migrate!("./migrations").run(pool).await
}

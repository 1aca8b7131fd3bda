//! Relational store for the club: pool bootstrap, migrations, row models and
//! one repository per table.
//!
//! Every query is a runtime query with bound parameters. Repository methods
//! are generic over [`sqlx::SqliteExecutor`] so they run equally against the
//! pool or inside a transaction.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

pub mod hydrate;
pub mod models;
pub mod repositories;

pub type DbPool = sqlx::SqlitePool;

/// Pool sizing and timeouts.
#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    /// Upper bound on concurrently open connections.
    pub max_connections: u32,
    /// How long a caller waits for a free connection before giving up.
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 20,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Create a connection pool from a database URL.
///
/// Foreign keys are enforced and file databases use WAL so readers do not
/// block the writer.
pub async fn create_pool(database_url: &str, settings: PoolSettings) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(settings.acquire_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect_with(options)
        .await?;

    tracing::debug!(max_connections = settings.max_connections, "Database pool created");
    Ok(pool)
}

/// Open a private in-memory database with the schema applied.
///
/// Every call yields an independent, empty store. The pool holds a single
/// connection that is never recycled, since closing it would drop the data.
pub async fn create_memory_pool() -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Cheap round-trip used at start-up and by `/health`.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations in `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

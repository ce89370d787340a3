// ABOUTME: Database connection management and schema initialization
// ABOUTME: Creates the SQLite pool and the users, tokens, and comments tables

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::StorageError;

/// Schema is created idempotently at startup; there is no migration history.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created_at TEXT NOT NULL,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE COLLATE NOCASE,
        password_hash TEXT NOT NULL,
        activated INTEGER NOT NULL DEFAULT 0,
        version INTEGER NOT NULL DEFAULT 1
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tokens (
        hash TEXT PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        expiry INTEGER NOT NULL,
        scope TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_tokens_user_scope ON tokens(user_id, scope)",
    "CREATE INDEX IF NOT EXISTS idx_tokens_expiry ON tokens(expiry)",
    r#"
    CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created_at TEXT NOT NULL,
        content TEXT NOT NULL,
        author TEXT NOT NULL,
        version INTEGER NOT NULL DEFAULT 1
    )
    "#,
];

/// Open a pool for `database_url` and make sure the schema exists.
pub async fn connect(database_url: &str) -> Result<SqlitePool, StorageError> {
    debug!("Connecting to database: {}", database_url);

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;
    info!("Database connection pool established");

    Ok(pool)
}

/// Single-connection in-memory pool. Every SQLite `:memory:` connection is a
/// separate database, so the pool must never open a second one.
pub async fn connect_in_memory() -> Result<SqlitePool, StorageError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), StorageError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

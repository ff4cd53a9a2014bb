//! Relational backend on SQLite.
//!
//! Uniqueness is enforced by primary keys, so racing duplicate inserts are
//! rejected by the database itself rather than by a read-then-write check.

mod bet;
mod poll;
mod user;

pub use bet::SqliteBetRepository;
pub use poll::SqlitePollRepository;
pub use user::SqliteUserRepository;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS polls (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        outcome INTEGER NOT NULL,
        status INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS poll_options (
        poll_id TEXT NOT NULL REFERENCES polls(id) ON DELETE CASCADE,
        option_index INTEGER NOT NULL,
        option_text TEXT NOT NULL,
        PRIMARY KEY (poll_id, option_index)
    )",
    "CREATE TABLE IF NOT EXISTS bets (
        poll_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        selected_option_index INTEGER NOT NULL,
        bet_status INTEGER NOT NULL,
        PRIMARY KEY (poll_id, user_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_bets_user_id ON bets (user_id)",
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username_ciphertext TEXT NOT NULL,
        display_name_ciphertext TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS user_identities (
        provider TEXT NOT NULL,
        external_id_ciphertext TEXT NOT NULL,
        external_id_hash TEXT NOT NULL,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        PRIMARY KEY (provider, external_id_hash)
    )",
    "CREATE INDEX IF NOT EXISTS idx_user_identities_user_id ON user_identities (user_id)",
];

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Opens a pool and makes sure the schema exists.
///
/// An in-memory database lives inside a single connection, so the pool is
/// pinned to exactly one connection that is never recycled.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool_options = if is_in_memory(database_url) {
        SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections.max(1))
    };

    let pool = pool_options.connect_with(options).await?;
    init_schema(&pool).await?;
    Ok(pool)
}

/// Creates all tables and indexes. Safe to run repeatedly.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::debug!(statements = SCHEMA.len(), "schema ready");
    Ok(())
}

/// True when `err` is a primary-key or unique-constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation()
                // SQLITE_CONSTRAINT_PRIMARYKEY / SQLITE_CONSTRAINT_UNIQUE
                || matches!(db_err.code().as_deref(), Some("1555") | Some("2067"))
        }
        _ => false,
    }
}

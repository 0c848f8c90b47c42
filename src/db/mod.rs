//! Database module for SQLite persistence.
//!
//! SQLite is the entity store: profiles, events and sessions live here, and
//! every read-modify-write goes through a transaction that holds the write
//! lock from its first statement.

mod registration;
mod repository;
mod wishlist;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Single-row write counter; bumping it is how a transaction takes the write lock.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            schema_version INTEGER NOT NULL DEFAULT 1,
            revision_id INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        INSERT OR IGNORE INTO meta (id, schema_version, revision_id, updated_at)
        VALUES (1, 1, 0, datetime('now'));
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            user_id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            main_email TEXT NOT NULL,
            tee_shirt_size TEXT NOT NULL DEFAULT 'NOT_SPECIFIED',
            conference_keys_to_attend TEXT NOT NULL DEFAULT '[]',
            session_wishlist_keys TEXT NOT NULL DEFAULT '[]'
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            organizer_user_id TEXT NOT NULL,
            topics TEXT NOT NULL DEFAULT '[]',
            city TEXT NOT NULL,
            start_date TEXT,
            month INTEGER NOT NULL DEFAULT 0,
            end_date TEXT,
            max_attendees INTEGER NOT NULL DEFAULT 0,
            seats_available INTEGER NOT NULL DEFAULT 0,
            CHECK (seats_available >= 0 AND seats_available <= max_attendees)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            event_id TEXT NOT NULL,
            name TEXT NOT NULL,
            highlights TEXT NOT NULL,
            location TEXT NOT NULL,
            typeof_session TEXT NOT NULL DEFAULT '[]',
            speakers TEXT NOT NULL DEFAULT '[]',
            start_date TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_date TEXT NOT NULL,
            end_time TEXT NOT NULL,
            max_attendees INTEGER NOT NULL DEFAULT 0,
            seats_available INTEGER NOT NULL DEFAULT 0
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_events_name ON events(name);
        CREATE INDEX IF NOT EXISTS idx_events_organizer ON events(organizer_user_id);
        CREATE INDEX IF NOT EXISTS idx_events_seats ON events(seats_available);
        CREATE INDEX IF NOT EXISTS idx_sessions_event ON sessions(event_id);
        CREATE INDEX IF NOT EXISTS idx_sessions_start_time ON sessions(start_time);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

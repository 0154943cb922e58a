// Kasa — SQLite Database Management
//
// The relational store is the source of truth for every record kind. Ids
// are plain `INTEGER PRIMARY KEY` rowids, so once a table is emptied the
// next insert starts again at 1 (the first-salt convention relies on this).

use std::path::Path;

use rusqlite::Connection;

use super::StoreError;

/// Wrapper around a single SQLite connection.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database file at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.run_migrations()?;

        tracing::debug!(path = %path.display(), "Database opened");
        Ok(db)
    }

    /// Open an in-memory database (for testing only).
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.run_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run schema migrations to create or update tables.
    fn run_migrations(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS salt (
                id          INTEGER PRIMARY KEY,
                method      TEXT NOT NULL,
                salt        TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cipher (
                id                  INTEGER PRIMARY KEY,
                name                TEXT NOT NULL,
                encrypted_cipher    TEXT NOT NULL,
                method              TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS session (
                id          INTEGER PRIMARY KEY,
                token       TEXT NOT NULL,
                expiration  TEXT NOT NULL
            );
            ",
        )?;

        tracing::debug!("Database migrations completed successfully");
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

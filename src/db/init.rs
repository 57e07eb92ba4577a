use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

pub fn init_db() -> Result<Connection> {
    let db_path = crate::global::db_file()?;
    init_db_at(&db_path)
}

pub fn init_db_at(db_path: &Path) -> Result<Connection> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let conn = Connection::open(db_path).context("Failed to open database connection")?;

    migrate(&conn)?;

    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    // `seq` keeps insertion order; `id` is the timestamp-derived record id.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS calls (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id INTEGER NOT NULL UNIQUE,
            number TEXT NOT NULL,
            direction TEXT NOT NULL,
            start_ms INTEGER NOT NULL,
            end_ms INTEGER NOT NULL,
            duration_ms INTEGER NOT NULL,
            audio_base64 TEXT,
            mime TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create calls table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_calls_number ON calls(number)",
        [],
    )
    .context("Failed to create index on number")?;

    Ok(())
}

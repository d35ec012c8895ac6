//! Database schema migrations for the session store.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: finished session records.
///
/// Summary columns are denormalized from the JSON payload so listings do
/// not need to decode every record.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            id            TEXT PRIMARY KEY,
            player_id     TEXT NOT NULL,
            program_id    TEXT NOT NULL,
            status        TEXT NOT NULL,
            started_at    TEXT NOT NULL,
            ended_at      TEXT,
            attempt_count INTEGER NOT NULL DEFAULT 0,
            total_time    REAL NOT NULL DEFAULT 0,
            success_rate  REAL,
            record_json   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_player ON sessions(player_id, started_at);
        CREATE INDEX IF NOT EXISTS idx_sessions_started_at ON sessions(started_at);",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: per-drill metrics for completed sessions.
///
/// Enables best-time-per-drill queries across a player's history.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS session_drills (
            session_id    TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
            drill_id      TEXT NOT NULL,
            attempt_count INTEGER NOT NULL,
            best_time     REAL NOT NULL,
            avg_time      REAL NOT NULL,
            total_errors  INTEGER NOT NULL,
            PRIMARY KEY (session_id, drill_id)
        );

        CREATE INDEX IF NOT EXISTS idx_session_drills_drill ON session_drills(drill_id);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrates_fresh_database_to_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);

        // Idempotent.
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }
}

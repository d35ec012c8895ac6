//! SQLite-based storage for finished session records.
//!
//! The session engine never writes here itself. Callers hand a finished
//! [`AgilitySessionExecution`] to a [`SessionSink`] once the runner returns.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::{data_dir, migrations};
use crate::error::StorageError;
use crate::session::{AgilitySessionExecution, SessionStatus};

/// Receives finished session records.
pub trait SessionSink {
    /// # Errors
    /// Returns an error if the record cannot be persisted.
    fn save(&mut self, record: &AgilitySessionExecution) -> Result<(), StorageError>;
}

/// One row of a session listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub player_id: String,
    pub program_id: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub attempt_count: u64,
    pub total_time: f64,
    pub success_rate: Option<f64>,
}

/// Best recorded time for one drill across a player's completed sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillBest {
    pub drill_id: String,
    pub best_time: f64,
    pub sessions: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub player_id: String,
    pub sessions: u64,
    pub completed: u64,
    pub abandoned: u64,
    pub total_attempts: u64,
    pub avg_success_rate: Option<f64>,
    pub drill_bests: Vec<DrillBest>,
}

/// SQLite database of finished sessions.
pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    /// Open the store at `~/.config/agility/agility.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened,
    /// or migration fails.
    pub fn open() -> Result<Self, StorageError> {
        let dir = data_dir().map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        Self::open_at(&dir.join("agility.db"))
    }

    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if migration fails.
    pub fn open_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        migrations::migrate(&conn).map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Insert or replace a finished record.
    ///
    /// # Errors
    /// Returns `StorageError::NotFinished` for in-progress records, or a
    /// query error.
    pub fn save(&self, record: &AgilitySessionExecution) -> Result<(), StorageError> {
        if record.status == SessionStatus::InProgress {
            return Err(StorageError::NotFinished(record.id.to_string()));
        }
        let id = record.id.to_string();
        let json = serde_json::to_string(record)?;
        let total_time: f64 = record.attempts.iter().map(|a| a.completion_time).sum();

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO sessions
                (id, player_id, program_id, status, started_at, ended_at,
                 attempt_count, total_time, success_rate, record_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id,
                record.player_id,
                record.program_id,
                record.status.as_str(),
                record.started_at.to_rfc3339(),
                record.ended_at.map(|t| t.to_rfc3339()),
                record.attempts.len() as i64,
                total_time,
                record.metrics.as_ref().map(|m| m.success_rate),
                json,
            ],
        )?;
        tx.execute("DELETE FROM session_drills WHERE session_id = ?1", params![id])?;
        if let Some(metrics) = &record.metrics {
            for drill in &metrics.per_drill {
                tx.execute(
                    "INSERT INTO session_drills
                        (session_id, drill_id, attempt_count, best_time, avg_time, total_errors)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        id,
                        drill.drill_id,
                        drill.attempt_count as i64,
                        drill.best_time,
                        drill.avg_completion_time,
                        drill.total_errors,
                    ],
                )?;
            }
        }
        tx.commit()?;
        tracing::debug!(session_id = %id, status = %record.status, "session stored");
        Ok(())
    }

    /// # Errors
    /// Returns an error if the query fails or the stored payload is corrupt.
    pub fn get(&self, id: &str) -> Result<Option<AgilitySessionExecution>, StorageError> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT record_json FROM sessions WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// # Errors
    /// Returns an error if the delete fails.
    pub fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM session_drills WHERE session_id = ?1", params![id])?;
        let removed = tx.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    /// Most recent sessions first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<SessionSummary>, StorageError> {
        self.list(None, limit)
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub fn list_for_player(
        &self,
        player_id: &str,
        limit: usize,
    ) -> Result<Vec<SessionSummary>, StorageError> {
        self.list(Some(player_id), limit)
    }

    fn list(&self, player_id: Option<&str>, limit: usize) -> Result<Vec<SessionSummary>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, player_id, program_id, status, started_at, ended_at,
                    attempt_count, total_time, success_rate
             FROM sessions
             WHERE (?1 IS NULL OR player_id = ?1)
             ORDER BY started_at DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![player_id, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, f64>(7)?,
                row.get::<_, Option<f64>>(8)?,
            ))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (id, player_id, program_id, status, started_at, ended_at, attempts, total_time, success_rate) =
                row?;
            summaries.push(SessionSummary {
                id,
                player_id,
                program_id,
                status,
                started_at: parse_time(&started_at)?,
                ended_at: ended_at.as_deref().map(parse_time).transpose()?,
                attempt_count: attempts.max(0) as u64,
                total_time,
                success_rate,
            });
        }
        Ok(summaries)
    }

    /// Aggregate history for one player.
    ///
    /// # Errors
    /// Returns an error if a query fails.
    pub fn player_summary(&self, player_id: &str) -> Result<PlayerSummary, StorageError> {
        let mut summary = PlayerSummary {
            player_id: player_id.to_string(),
            ..PlayerSummary::default()
        };

        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*), COALESCE(SUM(attempt_count), 0)
             FROM sessions
             WHERE player_id = ?1
             GROUP BY status",
        )?;
        let rows = stmt.query_map(params![player_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;
        for row in rows {
            let (status, count, attempts) = row?;
            let count = count.max(0) as u64;
            summary.sessions += count;
            summary.total_attempts += attempts.max(0) as u64;
            match status.as_str() {
                "completed" => summary.completed += count,
                "abandoned" => summary.abandoned += count,
                _ => {}
            }
        }

        summary.avg_success_rate = self.conn.query_row(
            "SELECT AVG(success_rate) FROM sessions
             WHERE player_id = ?1 AND status = 'completed'",
            params![player_id],
            |row| row.get::<_, Option<f64>>(0),
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT d.drill_id, MIN(d.best_time), COUNT(*)
             FROM session_drills d
             JOIN sessions s ON s.id = d.session_id
             WHERE s.player_id = ?1
             GROUP BY d.drill_id
             ORDER BY d.drill_id",
        )?;
        let rows = stmt.query_map(params![player_id], |row| {
            Ok(DrillBest {
                drill_id: row.get(0)?,
                best_time: row.get(1)?,
                sessions: row.get::<_, i64>(2)?.max(0) as u64,
            })
        })?;
        for row in rows {
            summary.drill_bests.push(row?);
        }

        Ok(summary)
    }
}

impl SessionSink for SessionStore {
    fn save(&mut self, record: &AgilitySessionExecution) -> Result<(), StorageError> {
        SessionStore::save(self, record)
    }
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::QueryFailed(format!("bad timestamp '{s}': {e}")))
}

//! Persistent call-analysis store (SQLite).
//!
//! One row per session: repeated saves for the same session id converge to a
//! single record instead of duplicating it, so a save issued inside the
//! reasoning loop combines safely with a later re-analysis of the same
//! session. Tickets are replaced wholesale on update.

use crate::analysis::Requirement;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio_rusqlite::Connection;

/// A call analysis row as written by `save_analysis`.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub session_id: String,
    pub transcript: String,
    pub intent: String,
    pub sentiment: String,
    pub agent_score: f64,
    pub duration_secs: f64,
}

/// A persisted follow-up ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketRow {
    pub requirement_type: String,
    pub description: String,
    pub priority: String,
    pub status: String,
}

/// A persisted call with its tickets, as served by the report endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallReport {
    pub call_id: i64,
    pub session_id: String,
    pub intent: String,
    pub sentiment: String,
    pub agent_score: f64,
    pub duration_secs: f64,
    pub created_at: String,
    pub tickets: Vec<TicketRow>,
}

/// Aggregate statistics across all analyzed calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_calls: i64,
    pub avg_agent_score: Option<f64>,
    pub open_tickets: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
}

impl From<tokio_rusqlite::Error> for StoreError {
    fn from(e: tokio_rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

/// The analysis store.
pub struct CallStore {
    conn: Connection,
}

impl CallStore {
    /// Open (and migrate) the store at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::Database(format!("cannot create {parent:?}: {e}")))?;
            }
        }

        let conn = Connection::open(path).await?;
        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS calls (
                     id INTEGER PRIMARY KEY AUTOINCREMENT,
                     session_id TEXT NOT NULL UNIQUE,
                     transcript TEXT NOT NULL,
                     intent TEXT NOT NULL,
                     sentiment TEXT NOT NULL,
                     agent_score REAL NOT NULL,
                     duration_secs REAL NOT NULL DEFAULT 0,
                     created_at TEXT NOT NULL,
                     updated_at TEXT NOT NULL
                 );
                 CREATE TABLE IF NOT EXISTS tickets (
                     id INTEGER PRIMARY KEY AUTOINCREMENT,
                     session_id TEXT NOT NULL,
                     requirement_type TEXT NOT NULL,
                     description TEXT NOT NULL,
                     priority TEXT NOT NULL,
                     status TEXT NOT NULL DEFAULT 'OPEN'
                 );
                 CREATE INDEX IF NOT EXISTS idx_tickets_session ON tickets(session_id);",
            )?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Idempotent save keyed by session id: insert on first sight, update on
    /// conflict, tickets replaced.
    pub async fn save_analysis(
        &self,
        record: CallRecord,
        requirements: Vec<Requirement>,
    ) -> Result<i64, StoreError> {
        let call_id = self
            .conn
            .call(move |conn| {
                let now = chrono::Utc::now().to_rfc3339();
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO calls (session_id, transcript, intent, sentiment,
                                        agent_score, duration_secs, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                     ON CONFLICT(session_id) DO UPDATE SET
                         transcript = excluded.transcript,
                         intent = excluded.intent,
                         sentiment = excluded.sentiment,
                         agent_score = excluded.agent_score,
                         duration_secs = excluded.duration_secs,
                         updated_at = excluded.updated_at",
                    params![
                        record.session_id,
                        record.transcript,
                        record.intent,
                        record.sentiment,
                        record.agent_score,
                        record.duration_secs,
                        now,
                    ],
                )?;
                let call_id: i64 = tx.query_row(
                    "SELECT id FROM calls WHERE session_id = ?1",
                    params![record.session_id],
                    |row| row.get(0),
                )?;
                tx.execute(
                    "DELETE FROM tickets WHERE session_id = ?1",
                    params![record.session_id],
                )?;
                for requirement in &requirements {
                    tx.execute(
                        "INSERT INTO tickets (session_id, requirement_type, description, priority)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![
                            record.session_id,
                            requirement.kind,
                            requirement.description,
                            requirement.priority.as_str(),
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(call_id)
            })
            .await?;
        Ok(call_id)
    }

    /// Fetch the persisted report for a session, if any.
    pub async fn fetch_report(&self, session_id: &str) -> Result<Option<CallReport>, StoreError> {
        let session_id = session_id.to_string();
        let report = self
            .conn
            .call(move |conn| {
                let call = conn
                    .query_row(
                        "SELECT id, session_id, intent, sentiment, agent_score,
                                duration_secs, created_at
                         FROM calls WHERE session_id = ?1",
                        params![session_id],
                        |row| {
                            Ok(CallReport {
                                call_id: row.get(0)?,
                                session_id: row.get(1)?,
                                intent: row.get(2)?,
                                sentiment: row.get(3)?,
                                agent_score: row.get(4)?,
                                duration_secs: row.get(5)?,
                                created_at: row.get(6)?,
                                tickets: Vec::new(),
                            })
                        },
                    )
                    .optional()?;

                let Some(mut report) = call else {
                    return Ok(None);
                };

                let mut stmt = conn.prepare(
                    "SELECT requirement_type, description, priority, status
                     FROM tickets WHERE session_id = ?1 ORDER BY id",
                )?;
                let tickets = stmt
                    .query_map(params![report.session_id], |row| {
                        Ok(TicketRow {
                            requirement_type: row.get(0)?,
                            description: row.get(1)?,
                            priority: row.get(2)?,
                            status: row.get(3)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                report.tickets = tickets;
                Ok(Some(report))
            })
            .await?;
        Ok(report)
    }

    /// Aggregate statistics for the stats endpoint.
    pub async fn stats(&self) -> Result<StoreStats, StoreError> {
        let stats = self
            .conn
            .call(|conn| {
                let total_calls: i64 =
                    conn.query_row("SELECT COUNT(*) FROM calls", [], |row| row.get(0))?;
                let avg_agent_score: Option<f64> =
                    conn.query_row("SELECT AVG(agent_score) FROM calls", [], |row| row.get(0))?;
                let open_tickets: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM tickets WHERE status = 'OPEN'",
                    [],
                    |row| row.get(0),
                )?;
                Ok(StoreStats {
                    total_calls,
                    avg_agent_score,
                    open_tickets,
                })
            })
            .await?;
        Ok(stats)
    }
}

// SQLite persistence layer for raffle sessions.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::raffle::model::RoundRecord;
use crate::raffle::state::WinnerRecord;

/// SQLite-backed persistence for the session snapshot, the confirmed-winner
/// mirror, and the batch audit trail.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS raffle_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS winners (
                position   INTEGER PRIMARY KEY AUTOINCREMENT,
                team       TEXT NOT NULL,
                round      INTEGER NOT NULL,
                round_name TEXT NOT NULL,
                prize      TEXT NOT NULL,
                timestamp  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS round_records (
                position            INTEGER PRIMARY KEY AUTOINCREMENT,
                round_number        INTEGER NOT NULL,
                model               TEXT NOT NULL,
                participants_before TEXT NOT NULL,
                participants_after  TEXT NOT NULL,
                winner              TEXT,
                eliminated          TEXT NOT NULL,
                timestamp           TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection guard. The mutex is API hygiene for the
    /// single-threaded session, not a concurrency discipline.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Session snapshot (key-value)
    // ------------------------------------------------------------------

    /// Store a value in the key-value session state table.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO raffle_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value.to_string()],
        )
        .context("failed to save session state")?;
        Ok(())
    }

    /// Load a value from the key-value session state table.
    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT value FROM raffle_state WHERE key = ?1")
            .context("failed to prepare load_state query")?;

        let mut rows = stmt
            .query_map(params![key], |row| row.get::<_, String>(0))
            .context("failed to query session state")?;

        match rows.next() {
            Some(text) => {
                let text = text.context("failed to read session state row")?;
                let value = serde_json::from_str(&text)
                    .context("failed to parse stored session state as JSON")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Confirmed winners
    // ------------------------------------------------------------------

    /// Append a confirmed winner to the winners mirror table.
    pub fn record_winner(&self, record: &WinnerRecord) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO winners (team, round, round_name, prize) VALUES (?1, ?2, ?3, ?4)",
            params![record.team, record.round, record.round_name, record.prize],
        )
        .context("failed to record winner")?;
        Ok(())
    }

    /// All recorded winners in confirmation order.
    pub fn load_winners(&self) -> Result<Vec<WinnerRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT team, round, round_name, prize FROM winners ORDER BY position")
            .context("failed to prepare load_winners query")?;

        let winners = stmt
            .query_map([], |row| {
                Ok(WinnerRecord {
                    team: row.get(0)?,
                    round: row.get(1)?,
                    round_name: row.get(2)?,
                    prize: row.get(3)?,
                })
            })
            .context("failed to query winners")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to read winner rows")?;
        Ok(winners)
    }

    // ------------------------------------------------------------------
    // Batch audit trail
    // ------------------------------------------------------------------

    /// Append a batch round record to the audit trail.
    pub fn record_round(&self, record: &RoundRecord) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO round_records
                 (round_number, model, participants_before, participants_after,
                  winner, eliminated, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.round_number,
                record.model,
                serde_json::to_string(&record.participants_before)
                    .context("failed to encode participants_before")?,
                serde_json::to_string(&record.participants_after)
                    .context("failed to encode participants_after")?,
                record.winner,
                serde_json::to_string(&record.eliminated)
                    .context("failed to encode eliminated")?,
                record.timestamp.to_rfc3339(),
            ],
        )
        .context("failed to record round")?;
        Ok(())
    }

    /// The full batch audit trail in execution order.
    pub fn load_round_records(&self) -> Result<Vec<RoundRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT round_number, model, participants_before, participants_after,
                        winner, eliminated, timestamp
                 FROM round_records ORDER BY position",
            )
            .context("failed to prepare load_round_records query")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .context("failed to query round records")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to read round record rows")?;

        let mut records = Vec::with_capacity(rows.len());
        for (round_number, model, before, after, winner, eliminated, timestamp) in rows {
            records.push(RoundRecord {
                round_number,
                model,
                participants_before: serde_json::from_str(&before)
                    .context("failed to parse participants_before")?,
                participants_after: serde_json::from_str(&after)
                    .context("failed to parse participants_after")?,
                winner,
                eliminated: serde_json::from_str(&eliminated)
                    .context("failed to parse eliminated")?,
                timestamp: chrono::DateTime::parse_from_rfc3339(&timestamp)
                    .context("failed to parse round record timestamp")?
                    .with_timezone(&chrono::Utc),
            });
        }
        Ok(records)
    }

    // ------------------------------------------------------------------
    // Reset
    // ------------------------------------------------------------------

    /// Clear all session data: snapshot, winners mirror, and audit trail.
    pub fn clear_session(&self) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        tx.execute("DELETE FROM raffle_state", [])
            .context("failed to clear session state")?;
        tx.execute("DELETE FROM winners", [])
            .context("failed to clear winners")?;
        tx.execute("DELETE FROM round_records", [])
            .context("failed to clear round records")?;
        tx.commit().context("failed to commit session clear")?;
        Ok(())
    }
}

//! Call Journal Module
//!
//! This module implements the append-only journal of committed calls.
//! The ledger is a deterministic state machine, so the committed calls
//! together with their commit contexts are enough to rebuild it.
//!
//! # Storage
//! - `calls`: one row per committed call (sequence number, commit time, entry)
//! - `events`: the events each call emitted, for indexers catching up
//! - `meta`: the ledger configuration the calls were committed under
//!
//! Rows are only ever inserted.

use crate::{
    Call, CommittedEvent, LedgerError, LedgerEvent, TxContext, config::LedgerConfig, error::Result,
};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

const LEDGER_CONFIG_KEY: &str = "ledger_config";

/// One committed call as stored in the journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq: u64,
    pub context: TxContext,
    pub call: Call,
}

/// SQLite-backed append-only journal
pub struct Journal {
    pool: SqlitePool,
}

impl Journal {
    /// Open (or create) the journal database and its tables
    ///
    /// # Arguments
    /// * `url` - Database URL (e.g. "sqlite://ledger.db" or "sqlite::memory:")
    pub async fn open(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // A single long-lived connection keeps writes ordered and keeps
        // in-memory databases alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS calls (
                seq INTEGER PRIMARY KEY,
                timestamp INTEGER NOT NULL,
                entry TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                seq INTEGER NOT NULL REFERENCES calls(seq),
                kind TEXT NOT NULL,
                payload TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        info!("Journal opened at {}", url);
        Ok(Self { pool })
    }

    /// Pin the journal to the ledger configuration its calls are replayed under
    ///
    /// The first caller records `config`. Every later caller must pass the
    /// same configuration, since replaying the recorded calls under a
    /// different house identity or escrow policy yields a different ledger.
    ///
    /// # Returns
    /// * `Ok(())` if the configuration was recorded or matches the recorded one
    /// * `Err` naming both configurations on a mismatch
    pub async fn bind_config(&self, config: &LedgerConfig) -> anyhow::Result<()> {
        let recorded: Option<(String,)> = sqlx::query_as("SELECT value FROM meta WHERE key = ?")
            .bind(LEDGER_CONFIG_KEY)
            .fetch_optional(&self.pool)
            .await?;

        match recorded {
            Some((value,)) => {
                let recorded: LedgerConfig = serde_json::from_str(&value)?;
                if recorded != *config {
                    anyhow::bail!(
                        "ledger config mismatch: journal was written with {:?}, configured {:?}",
                        recorded,
                        config
                    );
                }
            }
            None => {
                sqlx::query("INSERT INTO meta (key, value) VALUES (?, ?)")
                    .bind(LEDGER_CONFIG_KEY)
                    .bind(serde_json::to_string(config)?)
                    .execute(&self.pool)
                    .await?;
                info!("Journal bound to {:?}", config);
            }
        }

        Ok(())
    }

    /// Break the `events` table so the next append carrying events fails
    #[cfg(test)]
    pub(crate) async fn drop_events_table(&self) {
        sqlx::query("DROP TABLE events")
            .execute(&self.pool)
            .await
            .unwrap();
    }

    /// Append a committed call and its events in one SQL transaction
    pub async fn append(&self, entry: &JournalEntry, events: &[LedgerEvent]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO calls (seq, timestamp, entry) VALUES (?, ?, ?)")
            .bind(entry.seq as i64)
            .bind(entry.context.timestamp as i64)
            .bind(serde_json::to_string(entry)?)
            .execute(&mut *tx)
            .await?;

        for event in events {
            sqlx::query("INSERT INTO events (seq, kind, payload) VALUES (?, ?, ?)")
                .bind(entry.seq as i64)
                .bind(event.kind())
                .bind(serde_json::to_string(event)?)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!("Journaled call #{} ({})", entry.seq, entry.call.name());
        Ok(())
    }

    /// All committed calls in sequence order
    pub async fn load(&self) -> Result<Vec<JournalEntry>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT entry FROM calls ORDER BY seq")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|(entry,)| serde_json::from_str::<JournalEntry>(&entry).map_err(LedgerError::from))
            .collect()
    }

    /// Events of every call committed after `seq`, in commit order
    pub async fn events_since(&self, seq: u64) -> Result<Vec<CommittedEvent>> {
        let rows: Vec<(i64, i64, String)> = sqlx::query_as(
            "SELECT e.seq, c.timestamp, e.payload
             FROM events e JOIN calls c ON c.seq = e.seq
             WHERE e.seq > ?
             ORDER BY e.id",
        )
        .bind(seq as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(seq, timestamp, payload)| -> Result<CommittedEvent> {
                Ok(CommittedEvent {
                    seq: seq as u64,
                    timestamp: timestamp as u64,
                    event: serde_json::from_str(&payload)?,
                })
            })
            .collect()
    }
}

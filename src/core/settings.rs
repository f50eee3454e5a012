//! Persistent settings and usage counters
//!
//! A small SQLite database with two key/value tables: `settings` holds the
//! configured channels and resolver template, `stats` holds counters.
//! Every write is a single statement or a single transaction, so a reader
//! never observes a half-applied update.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::SettingsError;

const KEY_FORCE_SUB: &str = "force_sub";
const KEY_DUMB_CHANNEL: &str = "dumb_channel";
const KEY_API_TEMPLATE: &str = "api_template";

const STAT_REQUESTS: &str = "total_requests";
const STAT_RESOLVED: &str = "resolved_links";
const STAT_UPLOADED: &str = "uploaded_files";
const STAT_BYTES: &str = "bytes_transferred";

type Result<T> = std::result::Result<T, SettingsError>;

/// Snapshot of the usage counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub total_requests: u64,
    pub resolved_links: u64,
    pub uploaded_files: u64,
    pub bytes_transferred: u64,
}

pub struct SettingsStore {
    conn: Mutex<Connection>,
}

impl SettingsStore {
    /// Opens (and creates if needed) the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS stats (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO settings(key, value) VALUES(?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Returns whether a value was actually removed
    pub fn delete(&self, key: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let removed = conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    pub fn force_sub_channel(&self) -> Result<Option<String>> {
        self.get(KEY_FORCE_SUB)
    }

    pub fn set_force_sub_channel(&self, channel: &str) -> Result<()> {
        self.set(KEY_FORCE_SUB, channel)
    }

    pub fn clear_force_sub_channel(&self) -> Result<bool> {
        self.delete(KEY_FORCE_SUB)
    }

    pub fn relay_channel(&self) -> Result<Option<String>> {
        self.get(KEY_DUMB_CHANNEL)
    }

    pub fn set_relay_channel(&self, channel: &str) -> Result<()> {
        self.set(KEY_DUMB_CHANNEL, channel)
    }

    pub fn clear_relay_channel(&self) -> Result<bool> {
        self.delete(KEY_DUMB_CHANNEL)
    }

    pub fn api_template(&self) -> Result<Option<String>> {
        self.get(KEY_API_TEMPLATE)
    }

    pub fn set_api_template(&self, template: &str) -> Result<()> {
        self.set(KEY_API_TEMPLATE, template)
    }

    /// Stores `template` unless one was already saved
    pub fn seed_api_template(&self, template: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR IGNORE INTO settings(key, value) VALUES(?1, ?2)",
            params![KEY_API_TEMPLATE, template],
        )?;
        Ok(())
    }

    pub fn stat(&self, key: &str) -> Result<u64> {
        let conn = self.conn.lock();
        let value: Option<i64> = conn
            .query_row(
                "SELECT value FROM stats WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.unwrap_or(0).max(0) as u64)
    }

    pub fn incr_stat(&self, key: &str, by: u64) -> Result<()> {
        let conn = self.conn.lock();
        incr(&conn, key, by)?;
        Ok(())
    }

    pub fn record_request(&self) -> Result<()> {
        self.incr_stat(STAT_REQUESTS, 1)
    }

    pub fn record_resolved(&self) -> Result<()> {
        self.incr_stat(STAT_RESOLVED, 1)
    }

    /// Counts one delivered file and its size in one transaction
    pub fn record_upload(&self, bytes: u64) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        incr(&tx, STAT_UPLOADED, 1)?;
        incr(&tx, STAT_BYTES, bytes)?;
        tx.commit()?;
        Ok(())
    }

    pub fn stats(&self) -> Result<Stats> {
        Ok(Stats {
            total_requests: self.stat(STAT_REQUESTS)?,
            resolved_links: self.stat(STAT_RESOLVED)?,
            uploaded_files: self.stat(STAT_UPLOADED)?,
            bytes_transferred: self.stat(STAT_BYTES)?,
        })
    }
}

fn incr(conn: &Connection, key: &str, by: u64) -> rusqlite::Result<usize> {
    let by = i64::try_from(by).unwrap_or(i64::MAX);
    conn.execute(
        "INSERT INTO stats(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = value + excluded.value",
        params![key, by],
    )
}

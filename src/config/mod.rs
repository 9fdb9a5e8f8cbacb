//! Key-value settings backed by SQLite.
//!
//! Shares a database file with [`AuthStorage`](crate::auth::AuthStorage).
//! Stored values act as defaults underneath command-line flags.

use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use std::sync::Mutex;

/// Keys `troupe config set` accepts.
pub const KNOWN_KEYS: &[&str] = &[
    "provider",
    "model",
    "crew",
    "output_dir",
    "memory_capacity",
    "context_window",
    "log_level",
];

/// Startup-fatal configuration problems.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no {name} secret configured: run `troupe login {name} --key <KEY>` or set {env_var}")]
    MissingSecret { name: String, env_var: String },
}

/// Persistent key-value settings store.
pub struct Config {
    conn: Mutex<Connection>,
}

impl Config {
    /// Open or create the settings table in the given database.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open config database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .context("failed to create config table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT value FROM config WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Parse a stored value. A value that does not parse is an error, not a default.
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key)? {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|e| anyhow::anyhow!("config key '{key}' has invalid value '{raw}': {e}")),
            None => Ok(None),
        }
    }

    /// Upsert. Only [`KNOWN_KEYS`] are accepted.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        if !KNOWN_KEYS.contains(&key) {
            bail!(
                "unknown config key '{key}' (expected one of: {})",
                KNOWN_KEYS.join(", ")
            );
        }
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM config WHERE key = ?1", [key])?;
        Ok(())
    }

    /// Every stored pair, sorted by key.
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT key, value FROM config ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read config")
    }
}

use std::sync::Mutex;

use anyhow::Result;
use rusqlite::Connection;

/// Credential types stored per provider.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum Credential {
    #[serde(rename = "api_key")]
    ApiKey { key: String },
    /// Telegram bot token.
    #[serde(rename = "bot_token")]
    BotToken { token: String },
}

impl Credential {
    pub fn secret(&self) -> &str {
        match self {
            Credential::ApiKey { key } => key,
            Credential::BotToken { token } => token,
        }
    }
}

/// Credential storage in SQLite.
///
/// Shares a database with [`Config`](crate::config::Config); pass the same path.
pub struct AuthStorage {
    conn: Mutex<Connection>,
}

impl AuthStorage {
    /// Open or create a credentials table in the given database path.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS credentials (
                provider TEXT PRIMARY KEY,
                data     TEXT NOT NULL
            )",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn get(&self, provider: &str) -> Result<Option<Credential>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT data FROM credentials WHERE provider = ?1")?;
        let mut rows = stmt.query([provider])?;
        match rows.next()? {
            Some(row) => {
                let json: String = row.get(0)?;
                let cred: Credential = serde_json::from_str(&json)?;
                Ok(Some(cred))
            }
            None => Ok(None),
        }
    }

    /// Store credential for a provider (upsert).
    pub fn set(&self, provider: &str, credential: Credential) -> Result<()> {
        let json = serde_json::to_string(&credential)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO credentials (provider, data) VALUES (?1, ?2)
             ON CONFLICT(provider) DO UPDATE SET data = excluded.data",
            [provider, &json],
        )?;
        Ok(())
    }

    pub fn remove(&self, provider: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM credentials WHERE provider = ?1", [provider])?;
        Ok(())
    }

    /// Providers with a stored credential, sorted.
    pub fn providers(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT provider FROM credentials ORDER BY provider")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    /// Priority: stored credential, then the environment variable.
    /// Empty values count as missing.
    pub fn get_secret(&self, provider: &str, env_var: &str) -> Result<Option<String>> {
        if let Some(cred) = self.get(provider)?
            && !cred.secret().is_empty()
        {
            return Ok(Some(cred.secret().to_string()));
        }

        if let Ok(value) = std::env::var(env_var)
            && !value.is_empty()
        {
            return Ok(Some(value));
        }

        Ok(None)
    }
}

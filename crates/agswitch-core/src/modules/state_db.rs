//! Identity data in the target's `state.vscdb` (SQLite `ItemTable`).
//!
//! Backups copy a fixed set of rows out; restores write them back inside one
//! transaction, so a failed restore leaves the previous identity intact.

use agswitch_types::models::{Account, AccountBackupData, AccountInfo};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

pub const STATE_DB_FILE: &str = "state.vscdb";
const AUTH_STATUS_KEY: &str = "antigravityAuthStatus";

/// Rows that together make up a signed-in identity.
pub const IDENTITY_KEYS: [&str; 3] = [
    AUTH_STATUS_KEY,
    "jetskiStateSync.agentManagerInitState",
    "antigravityUnifiedStateSync.oauthToken",
];

/// Captures and restores account data in the target store.
#[async_trait]
pub trait BackupStore: Send + Sync {
    async fn backup(&self, account: &Account) -> AppResult<AccountBackupData>;

    /// Replace the stored identity with `backup`; all or nothing.
    async fn restore(&self, backup: &AccountBackupData) -> AppResult<()>;
}

/// Reports who is signed in to the target right now.
#[async_trait]
pub trait IdentityProbe: Send + Sync {
    async fn current_identity(&self) -> AppResult<AccountInfo>;
}

#[derive(Debug, Clone)]
pub struct StateDatabase {
    db_path: PathBuf,
}

impl StateDatabase {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self { db_path: db_path.into() }
    }

    /// Database living next to `storage.json`.
    pub fn in_storage_dir(storage_dir: &Path) -> Self {
        Self::new(storage_dir.join(STATE_DB_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> AppResult<Connection> {
        if !self.db_path.exists() {
            return Err(AppError::Storage(format!(
                "state_db_not_found: {}",
                self.db_path.display()
            )));
        }
        Ok(Connection::open(&self.db_path)?)
    }

    fn read_rows(&self) -> AppResult<Map<String, Value>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare("SELECT value FROM ItemTable WHERE key = ?1")?;
        let mut rows = Map::new();
        for key in IDENTITY_KEYS {
            let value: Option<String> = stmt.query_row([key], |row| row.get(0)).optional()?;
            if let Some(value) = value {
                drop(rows.insert(key.to_string(), Value::String(value)));
            }
        }
        Ok(rows)
    }

    fn write_rows(&self, data: &Map<String, Value>) -> AppResult<()> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        for key in IDENTITY_KEYS {
            match data.get(key) {
                Some(Value::String(text)) => {
                    let _rows: usize = tx.execute(
                        "INSERT OR REPLACE INTO ItemTable (key, value) VALUES (?1, ?2)",
                        [key, text.as_str()],
                    )?;
                },
                Some(other) => {
                    let _rows: usize = tx.execute(
                        "INSERT OR REPLACE INTO ItemTable (key, value) VALUES (?1, ?2)",
                        [key, other.to_string().as_str()],
                    )?;
                },
                None => {
                    let _rows: usize = tx.execute("DELETE FROM ItemTable WHERE key = ?1", [key])?;
                },
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn read_identity(&self) -> AppResult<AccountInfo> {
        let conn = self.open()?;
        let raw: Option<String> = conn
            .query_row("SELECT value FROM ItemTable WHERE key = ?1", [AUTH_STATUS_KEY], |row| {
                row.get(0)
            })
            .optional()?;
        let Some(raw) = raw else {
            return Ok(AccountInfo::default());
        };

        let status: Value = serde_json::from_str(&raw)?;
        let field = |name: &str| {
            status.get(name).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
        };
        let email = field("email").unwrap_or_default().to_string();
        Ok(AccountInfo {
            is_authenticated: !email.is_empty(),
            name: field("name").map(str::to_string),
            email,
        })
    }
}

#[async_trait]
impl BackupStore for StateDatabase {
    async fn backup(&self, account: &Account) -> AppResult<AccountBackupData> {
        let db = self.clone();
        let data = tokio::task::spawn_blocking(move || db.read_rows()).await??;
        if !data.contains_key(AUTH_STATUS_KEY) {
            return Err(AppError::Storage(format!("identity_rows_missing: {}", AUTH_STATUS_KEY)));
        }
        tracing::info!(account = %account.email, rows = data.len(), "identity_backed_up");
        Ok(AccountBackupData::new(account.clone(), data))
    }

    async fn restore(&self, backup: &AccountBackupData) -> AppResult<()> {
        let db = self.clone();
        let data = backup.data.clone();
        tokio::task::spawn_blocking(move || db.write_rows(&data)).await??;
        tracing::info!(account = %backup.account.email, "identity_restored");
        Ok(())
    }
}

#[async_trait]
impl IdentityProbe for StateDatabase {
    async fn current_identity(&self) -> AppResult<AccountInfo> {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.read_identity()).await?
    }
}

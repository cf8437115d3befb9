//! Account index persistence with atomic replace.

use parking_lot::Mutex;
use std::fs;
use std::path::PathBuf;

use crate::error::{AppError, AppResult};
use crate::models::AccountIndex;
use crate::utils::fs::write_json_atomic;

/// Whole-index load/save.
pub trait AccountIndexStore: Send + Sync {
    fn load(&self) -> AppResult<AccountIndex>;
    fn save(&self, index: &AccountIndex) -> AppResult<()>;
}

/// `accounts.json` on disk.
#[derive(Debug, Clone)]
pub struct JsonAccountIndex {
    path: PathBuf,
}

impl JsonAccountIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AccountIndexStore for JsonAccountIndex {
    fn load(&self) -> AppResult<AccountIndex> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "account_index_missing");
            return Ok(AccountIndex::new());
        }

        let content = fs::read_to_string(&self.path)?;
        let index: AccountIndex = serde_json::from_str(&content).map_err(|e| {
            AppError::Storage(format!("account_index_corrupt ({}): {}", self.path.display(), e))
        })?;
        tracing::debug!(accounts = index.len(), "account_index_loaded");
        Ok(index)
    }

    fn save(&self, index: &AccountIndex) -> AppResult<()> {
        write_json_atomic(&self.path, index)
    }
}

/// Store plus the lock that serializes read-modify-write cycles.
pub(crate) struct IndexHandle {
    store: Box<dyn AccountIndexStore>,
    lock: Mutex<()>,
}

impl IndexHandle {
    pub fn new(store: Box<dyn AccountIndexStore>) -> Self {
        Self { store, lock: Mutex::new(()) }
    }

    /// Best-effort read; may observe a switch mid-flight.
    pub fn read(&self) -> AppResult<AccountIndex> {
        self.store.load()
    }

    /// Load, mutate and save under the index lock.
    ///
    /// Nothing is written when `mutate` fails.
    pub fn update<R>(&self, mutate: impl FnOnce(&mut AccountIndex) -> AppResult<R>) -> AppResult<R> {
        let _lock = self.lock.lock();
        let mut index = self.store.load()?;
        let result = mutate(&mut index)?;
        self.store.save(&index)?;
        Ok(result)
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

const DATA_DIR: &str = ".agswitch";
const ACCOUNTS_INDEX: &str = "accounts.json";
const BACKUPS_DIR: &str = "backups";
const LOGS_DIR: &str = "logs";
const CONFIG_FILE: &str = "config.json";
/// Filename for the original device profile baseline.
const GLOBAL_BASELINE: &str = "device_original.json";

/// Locations of everything agswitch persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    /// Use an explicit data directory (tests, portable installs).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the data directory.
    ///
    /// Priority:
    /// 1. `AGSWITCH_DATA_DIR` environment variable
    /// 2. `~/.agswitch` (default for desktop usage)
    pub fn from_env() -> AppResult<Self> {
        if let Ok(custom_dir) = std::env::var("AGSWITCH_DATA_DIR") {
            return Ok(Self::new(custom_dir));
        }
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::Config("Cannot get home directory".to_string()))?;
        Ok(Self::new(home.join(DATA_DIR)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the data and backup directories if needed.
    pub fn ensure_dirs(&self) -> AppResult<()> {
        fs::create_dir_all(&self.root)?;
        fs::create_dir_all(self.backups_dir())?;
        Ok(())
    }

    pub fn accounts_file(&self) -> PathBuf {
        self.root.join(ACCOUNTS_INDEX)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.root.join(BACKUPS_DIR)
    }

    /// Default backup location for an account without a stored path.
    pub fn backup_file(&self, account_id: &str) -> PathBuf {
        self.backups_dir().join(format!("{}.json", account_id))
    }

    pub fn baseline_file(&self) -> PathBuf {
        self.root.join(GLOBAL_BASELINE)
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join(LOGS_DIR)
    }
}

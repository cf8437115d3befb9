//! Unified error types for agswitch core.

use agswitch_types::error::{AccountError, ErrorCategory, ProfileError, SwitchFailure};
use serde::Serialize;
use thiserror::Error;

/// Main error type for all agswitch operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// Account lookup or account data problem.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// Profile history resolution or edit rejected.
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// Switch flow ended in a tagged failure.
    #[error(transparent)]
    Switch(#[from] SwitchFailure),

    /// Target storage (storage.json, backups, index) unreadable or unwritable.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Target process could not be controlled.
    #[error("Process error: {0}")]
    Process(String),

    /// Database operation failed (SQLite).
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Blocking task panicked or was cancelled.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    /// Unclassified error with message.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    /// Map onto the caller-facing error taxonomy.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Account(AccountError::NotFound { .. } | AccountError::BackupNotFound { .. }) => {
                ErrorCategory::NotFound
            },
            Self::Account(AccountError::NotAuthenticated) => ErrorCategory::InvalidState,
            Self::Profile(e) => e.category(),
            Self::Switch(e) => e.reason.category(),
            Self::Process(_) => ErrorCategory::ProcessLifecycle,
            Self::Storage(_) | Self::Database(_) | Self::Io(_) | Self::Json(_) => {
                ErrorCategory::DataIntegrity
            },
            Self::Config(_) | Self::TaskJoin(_) | Self::Unknown(_) => ErrorCategory::Unknown,
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for agswitch operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Unknown(s)
    }
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::Unknown(s.to_string())
    }
}

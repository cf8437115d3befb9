//! Account-related errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during account operations.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum AccountError {
    /// Account with given ID not found
    #[error("Account not found: {id}")]
    NotFound {
        /// Unique identifier of the missing account
        id: String,
    },

    /// Backup payload referenced by an account is missing
    #[error("Backup file not found: {path}")]
    BackupNotFound {
        /// Expected location of the backup payload
        path: String,
    },

    /// No signed-in identity in the target application
    #[error("No authenticated account found. Please ensure the target application is running and you are logged in.")]
    NotAuthenticated,
}

//! Device profile history errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ErrorCategory;

/// Errors raised while resolving or editing an account's profile history.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ProfileError {
    #[error("Global original profile not found")]
    BaselineNotFound,

    #[error("No currently bound profile")]
    NoBoundProfile,

    #[error("Device profile version not found: {id}")]
    VersionNotFound {
        /// Requested version ID
        id: String,
    },

    #[error("Original profile cannot be deleted")]
    BaselineNotDeletable,

    #[error("Currently bound profile cannot be deleted")]
    CurrentNotDeletable {
        /// ID of the current version
        id: String,
    },
}

impl ProfileError {
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::BaselineNotFound | Self::NoBoundProfile | Self::VersionNotFound { .. } => {
                ErrorCategory::NotFound
            },
            Self::BaselineNotDeletable | Self::CurrentNotDeletable { .. } => {
                ErrorCategory::InvalidState
            },
        }
    }
}

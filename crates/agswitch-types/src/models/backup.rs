//! Backup payload and identity probe types.

use super::Account;
use serde::{Deserialize, Serialize};

/// Current backup payload format version.
pub const BACKUP_FORMAT_VERSION: &str = "1.0";

/// Identity data captured from the target database for one account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountBackupData {
    /// Backup format version
    pub version: String,
    /// Account the payload belongs to
    pub account: Account,
    /// Key/value rows copied from the target database
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl AccountBackupData {
    pub fn new(account: Account, data: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { version: BACKUP_FORMAT_VERSION.to_string(), account, data }
    }
}

/// Identity currently signed in to the target application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    /// Email (empty when signed out)
    pub email: String,
    /// Display name reported by the target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub is_authenticated: bool,
}

impl AccountInfo {
    /// Local part of the email, used as the default display name.
    pub fn default_name(&self) -> &str {
        self.email.split('@').next().unwrap_or_default()
    }
}

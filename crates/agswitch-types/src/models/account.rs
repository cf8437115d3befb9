//! Account model and related types.

use super::{DeviceProfile, DeviceProfileVersion};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A captured identity of the target application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    /// Unique identifier for the account
    pub id: String,
    /// Display name
    pub name: String,
    /// Email address associated with the account
    pub email: String,
    /// Path of the backup payload holding this identity's data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_file: Option<String>,
    /// Optional avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Device profile bound to this account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_profile: Option<DeviceProfile>,
    /// Bound profile versions, oldest first
    #[serde(default)]
    pub device_history: Vec<DeviceProfileVersion>,
    /// Timestamp when account was created
    pub created_at: i64,
    /// Timestamp when account was last used
    pub last_used: i64,
}

impl Account {
    /// Create a new account with the given ID, name, and email.
    pub fn new(id: String, name: String, email: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id,
            name,
            email,
            backup_file: None,
            avatar_url: None,
            device_profile: None,
            device_history: Vec::new(),
            created_at: now,
            last_used: now,
        }
    }

    /// Update the last used timestamp to now.
    pub fn update_last_used(&mut self) {
        self.last_used = chrono::Utc::now().timestamp();
    }

    /// Version currently marked as current, if any.
    pub fn current_version(&self) -> Option<&DeviceProfileVersion> {
        self.device_history.iter().find(|v| v.is_current)
    }
}

/// Account index data structure (accounts.json), keyed by account ID.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct AccountIndex {
    accounts: BTreeMap<String, Account>,
}

impl AccountIndex {
    /// Create a new empty account index.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Account> {
        self.accounts.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Account> {
        self.accounts.get_mut(id)
    }

    /// Insert or replace an account, keyed by its ID.
    pub fn insert(&mut self, account: Account) -> Option<Account> {
        self.accounts.insert(account.id.clone(), account)
    }

    pub fn remove(&mut self, id: &str) -> Option<Account> {
        self.accounts.remove(id)
    }

    /// Find the ID of the account registered under `email`.
    pub fn find_id_by_email(&self, email: &str) -> Option<String> {
        self.accounts.values().find(|a| a.email == email).map(|a| a.id.clone())
    }

    /// All accounts, most recently used first.
    pub fn sorted_by_last_used(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| b.last_used.cmp(&a.last_used));
        accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

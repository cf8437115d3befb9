//! Account listing, snapshot capture, and deletion.

use agswitch_types::error::AccountError;
use agswitch_types::models::{Account, AccountInfo};
use std::fs;
use uuid::Uuid;

use super::AccountService;
use crate::error::AppResult;
use crate::utils::fs::write_json_atomic;

/// Display name for a newly captured account.
fn new_account_name(info: &AccountInfo) -> String {
    if let Some(name) = info.name.as_deref().filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    let local_part = info.default_name();
    if !info.email.is_empty() && info.email != "Unknown" && !local_part.is_empty() {
        return local_part.to_string();
    }
    format!("Account_{}", chrono::Utc::now().timestamp_millis())
}

/// A custom name survives unless the target reports a non-default one.
fn refreshed_name(existing: &str, info: &AccountInfo) -> String {
    match info.name.as_deref() {
        Some(name) if !name.is_empty() && name != info.default_name() => name.to_string(),
        _ => existing.to_string(),
    }
}

impl AccountService {
    /// All accounts, most recently used first.
    pub async fn list_accounts(&self) -> AppResult<Vec<Account>> {
        self.blocking(|service| Ok(service.index.read()?.sorted_by_last_used())).await
    }

    /// Capture the identity currently signed in to the target.
    ///
    /// An account with the same email is refreshed in place; otherwise a new
    /// one is created.
    pub async fn add_account_snapshot(&self) -> AppResult<Account> {
        let info = self.identity.current_identity().await?;
        if !info.is_authenticated {
            tracing::error!("add_account_snapshot_not_authenticated");
            return Err(AccountError::NotAuthenticated.into());
        }

        let email = info.email.clone();
        let existing = self
            .blocking(move |service| {
                let index = service.index.read()?;
                Ok(index.find_id_by_email(&email).and_then(|id| index.get(&id).cloned()))
            })
            .await?;

        let mut account = match existing {
            Some(mut account) => {
                account.name = refreshed_name(&account.name, &info);
                account.update_last_used();
                tracing::info!(email = %info.email, id = %account.id, "updating_existing_account");
                account
            },
            None => {
                let account = Account::new(
                    Uuid::new_v4().to_string(),
                    new_account_name(&info),
                    info.email.clone(),
                );
                tracing::info!(email = %info.email, id = %account.id, "creating_new_account");
                account
            },
        };
        let backup_path = self.backup_path(&account);
        account.backup_file = Some(backup_path.to_string_lossy().into_owned());

        let backup = self.backups.backup(&account).await?;
        let account = self
            .blocking(move |service| {
                write_json_atomic(&backup_path, &backup)?;
                service.index.update(|index| {
                    // Keep profile bindings made since the read above.
                    let merged = match index.get(&account.id) {
                        Some(stored) => Account {
                            device_profile: stored.device_profile.clone(),
                            device_history: stored.device_history.clone(),
                            ..account
                        },
                        None => account,
                    };
                    let _previous = index.insert(merged.clone());
                    Ok(merged)
                })
            })
            .await?;

        tracing::info!(id = %account.id, "account_snapshot_saved");
        Ok(account)
    }

    /// Remove an account and, best effort, its backup file.
    pub async fn delete_account(&self, account_id: &str) -> AppResult<()> {
        let id = account_id.to_string();
        self.blocking(move |service| {
            service.index.update(|index| {
                let account = index
                    .remove(&id)
                    .ok_or_else(|| AccountError::NotFound { id: id.clone() })?;

                let backup_path = service.backup_path(&account);
                if backup_path.exists() {
                    match fs::remove_file(&backup_path) {
                        Ok(()) => tracing::info!(path = %backup_path.display(), "backup_deleted"),
                        Err(e) => tracing::warn!(
                            path = %backup_path.display(),
                            "backup_delete_failed: {}",
                            e
                        ),
                    }
                }
                Ok(())
            })
        })
        .await?;

        tracing::info!(id = %account_id, "account_deleted");
        Ok(())
    }
}

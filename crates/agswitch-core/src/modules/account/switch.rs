//! Guarded account switching.

use agswitch_types::error::AccountError;
use agswitch_types::models::{
    Account, AccountBackupData, DeviceProfile, DeviceProfileVersion, SwitchScope,
};
use futures::FutureExt;
use std::fs;
use std::path::{Path, PathBuf};

use super::identity::ensure_baseline;
use super::AccountService;
use crate::error::AppResult;
use crate::modules::history::ProfileVersionHistory;
use crate::modules::switch::{SwitchFlowConfig, SwitchFlowReport};

const AUTO_GENERATED_LABEL: &str = "auto_generated";

/// What a local switch needs once the account has been resolved.
struct LocalSwitchPlan {
    backup_path: PathBuf,
    target_profile: DeviceProfile,
    /// Set when the profile was generated for this switch and is not yet bound
    generated: bool,
}

/// Account fields a local switch overwrites.
struct SwitchRecord {
    device_profile: Option<DeviceProfile>,
    device_history: Vec<DeviceProfileVersion>,
    last_used: i64,
}

impl SwitchRecord {
    fn of(account: &Account) -> Self {
        Self {
            device_profile: account.device_profile.clone(),
            device_history: account.device_history.clone(),
            last_used: account.last_used,
        }
    }

    fn restore(self, account: &mut Account) {
        account.device_profile = self.device_profile;
        account.device_history = self.device_history;
        account.last_used = self.last_used;
    }
}

fn read_backup(path: &Path) -> AppResult<AccountBackupData> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

impl AccountService {
    /// Switch the target application to a stored account.
    ///
    /// Queued behind any switch already in flight.
    pub async fn switch_account(&self, account_id: &str) -> AppResult<SwitchFlowReport> {
        let service = self.clone();
        let id = account_id.to_string();
        self.guard
            .run(SwitchScope::Local, move || async move { service.run_local_switch(id).await })
            .await
    }

    /// Switch to an identity supplied by a remote store.
    pub async fn switch_cloud_account(
        &self,
        backup: AccountBackupData,
        profile: Option<DeviceProfile>,
    ) -> AppResult<SwitchFlowReport> {
        let service = self.clone();
        self.guard
            .run(SwitchScope::Cloud, move || async move {
                tracing::info!(email = %backup.account.email, "cloud_switch_requested");
                let backups = service.backups.clone();
                let perform_switch = async move { backups.restore(&backup).await }.boxed();
                service
                    .flow
                    .execute(SwitchFlowConfig {
                        scope: SwitchScope::Cloud,
                        target_profile: profile,
                        apply_fingerprint: service.config.apply_identity_profile,
                        process_exit_timeout: service.process_exit_timeout(),
                        restart_process: service.config.restart_after_switch,
                        perform_switch,
                    })
                    .await
            })
            .await
    }

    async fn run_local_switch(&self, account_id: String) -> AppResult<SwitchFlowReport> {
        tracing::info!(id = %account_id, "local_switch_requested");
        let id = account_id.clone();
        let plan = self.blocking(move |service| service.plan_local_switch(&id)).await?;

        let service = self.clone();
        let LocalSwitchPlan { backup_path, target_profile, generated } = plan;
        let bind = generated.then(|| target_profile.clone());
        let perform_switch = async move {
            let backup = service.blocking(move |_| read_backup(&backup_path)).await?;
            let id = account_id.clone();
            let previous = service
                .blocking(move |service| service.record_switch(&id, bind))
                .await?;

            if let Err(e) = service.backups.restore(&backup).await {
                let outcome = service
                    .blocking(move |service| service.revert_switch(&account_id, previous))
                    .await;
                if let Err(revert) = outcome {
                    tracing::error!("account_switch_record_revert_failed: {}", revert);
                }
                return Err(e);
            }
            Ok(())
        }
        .boxed();

        self.flow
            .execute(SwitchFlowConfig {
                scope: SwitchScope::Local,
                target_profile: Some(target_profile),
                apply_fingerprint: self.config.apply_identity_profile,
                process_exit_timeout: self.process_exit_timeout(),
                restart_process: self.config.restart_after_switch,
                perform_switch,
            })
            .await
    }

    /// Persists the switch on the account before the store is swapped and
    /// returns what it replaced.
    fn record_switch(
        &self,
        account_id: &str,
        bind: Option<DeviceProfile>,
    ) -> AppResult<SwitchRecord> {
        self.index.update(|index| {
            let account = index
                .get_mut(account_id)
                .ok_or_else(|| AccountError::NotFound { id: account_id.to_string() })?;
            let previous = SwitchRecord::of(account);
            if let Some(profile) = bind {
                let _version = account.bind_profile(profile, AUTO_GENERATED_LABEL, true);
            }
            account.update_last_used();
            Ok(previous)
        })
    }

    /// Undoes [`Self::record_switch`] after the store refused the swap.
    fn revert_switch(&self, account_id: &str, previous: SwitchRecord) -> AppResult<()> {
        self.index.update(|index| {
            match index.get_mut(account_id) {
                Some(account) => previous.restore(account),
                None => tracing::warn!(id = %account_id, "switched_account_removed_before_revert"),
            }
            Ok(())
        })
    }

    /// Resolves the account, its backup, and the profile to apply.
    fn plan_local_switch(&self, account_id: &str) -> AppResult<LocalSwitchPlan> {
        let account = self.load_account(account_id)?;
        let backup_path = self.backup_path(&account);
        if !backup_path.exists() {
            return Err(AccountError::BackupNotFound {
                path: backup_path.display().to_string(),
            }
            .into());
        }

        ensure_baseline(&self.profiles);
        match account.device_profile {
            Some(target_profile) => Ok(LocalSwitchPlan { backup_path, target_profile, generated: false }),
            None => {
                let target_profile = self.profiles.generate();
                let _created = self.profiles.save_baseline_if_absent(&target_profile)?;
                tracing::info!(id = %account_id, "device_profile_auto_generated");
                Ok(LocalSwitchPlan { backup_path, target_profile, generated: true })
            },
        }
    }
}

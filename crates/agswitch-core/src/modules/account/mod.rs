//! Account management: snapshots, switching, and identity profiles.
//!
//! [`AccountService`] is cheap to clone; every clone shares the same index
//! lock, switch guard, and metrics.

mod crud;
mod identity;
mod index;
mod switch;

#[cfg(test)]
mod tests;

pub use identity::BindMode;
pub use index::{AccountIndexStore, JsonAccountIndex};

use agswitch_types::error::AccountError;
use agswitch_types::models::{
    Account, AppConfig, SwitchGuardSnapshot, SwitchMetricsSnapshot, SwitchScope,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use index::IndexHandle;

use crate::error::AppResult;
use crate::modules::device::{get_storage_path, DeviceProfileManager};
use crate::modules::process::{ProcessController, SystemProcessController, TargetProcess};
use crate::modules::state_db::{BackupStore, IdentityProbe, StateDatabase};
use crate::modules::switch::{SwitchFlow, SwitchGuard, SwitchMetrics};
use crate::utils::paths::DataPaths;

/// Collaborators an [`AccountService`] is assembled from.
pub struct AccountServiceParts {
    pub paths: DataPaths,
    pub config: AppConfig,
    pub profiles: DeviceProfileManager,
    pub index: Box<dyn AccountIndexStore>,
    pub backups: Arc<dyn BackupStore>,
    pub identity: Arc<dyn IdentityProbe>,
    pub process: Arc<dyn ProcessController>,
}

#[derive(Clone)]
pub struct AccountService {
    paths: DataPaths,
    config: AppConfig,
    index: Arc<IndexHandle>,
    backups: Arc<dyn BackupStore>,
    identity: Arc<dyn IdentityProbe>,
    profiles: Arc<DeviceProfileManager>,
    guard: Arc<SwitchGuard>,
    metrics: Arc<SwitchMetrics>,
    flow: SwitchFlow,
}

impl AccountService {
    /// Must be called inside a Tokio runtime (the switch guard spawns its worker).
    pub fn from_parts(parts: AccountServiceParts) -> Self {
        let profiles = Arc::new(parts.profiles);
        let metrics = Arc::new(SwitchMetrics::new());
        let flow = SwitchFlow::new(parts.process, Arc::clone(&profiles), Arc::clone(&metrics));
        Self {
            paths: parts.paths,
            config: parts.config,
            index: Arc::new(IndexHandle::new(parts.index)),
            backups: parts.backups,
            identity: parts.identity,
            profiles,
            guard: Arc::new(SwitchGuard::new()),
            metrics,
            flow,
        }
    }

    /// Wire the service against the installed target application.
    pub fn system(paths: DataPaths, config: AppConfig) -> AppResult<Self> {
        paths.ensure_dirs()?;
        let storage_path = get_storage_path(&config.target_product)?;
        let profiles = DeviceProfileManager::new(storage_path, paths.baseline_file());
        let state_db = Arc::new(StateDatabase::in_storage_dir(&profiles.storage_dir()?));
        let process = Arc::new(SystemProcessController::new(TargetProcess::from_config(&config)));

        tracing::info!(
            storage = %profiles.storage_path().display(),
            data_dir = %paths.root().display(),
            "account_service_ready"
        );
        Ok(Self::from_parts(AccountServiceParts {
            index: Box::new(JsonAccountIndex::new(paths.accounts_file())),
            paths,
            config,
            profiles,
            backups: Arc::clone(&state_db) as Arc<dyn BackupStore>,
            identity: state_db,
            process,
        }))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    pub fn switch_metrics(&self) -> SwitchMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn switch_guard_snapshot(&self) -> SwitchGuardSnapshot {
        self.guard.snapshot()
    }

    fn process_exit_timeout(&self) -> Duration {
        Duration::from_millis(self.config.process_exit_timeout_ms)
    }

    fn load_account(&self, account_id: &str) -> AppResult<Account> {
        self.index
            .read()?
            .get(account_id)
            .cloned()
            .ok_or_else(|| AccountError::NotFound { id: account_id.to_string() }.into())
    }

    /// Stored backup location, or the default one under the data directory.
    fn backup_path(&self, account: &Account) -> PathBuf {
        account
            .backup_file
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.paths.backup_file(&account.id))
    }

    /// Runs blocking filesystem work off the async executor.
    async fn blocking<T, F>(&self, task: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&AccountService) -> AppResult<T> + Send + 'static,
    {
        let this = self.clone();
        tokio::task::spawn_blocking(move || task(&this)).await?
    }

    /// [`Self::blocking`] queued on the switch guard, for work that writes
    /// `storage.json` outside a switch flow.
    async fn guarded_blocking<T, F>(&self, task: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&AccountService) -> AppResult<T> + Send + 'static,
    {
        let service = self.clone();
        self.guard
            .run(SwitchScope::Local, move || async move { service.blocking(task).await })
            .await
    }
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("paths", &self.paths)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

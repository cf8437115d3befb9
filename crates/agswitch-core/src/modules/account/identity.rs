//! Identity profile operations on a single account.

use agswitch_types::error::{AccountError, ProfileError};
use agswitch_types::models::{
    Account, DeviceProfile, DeviceProfilesSnapshot, BASELINE_VERSION_ID,
};
use std::path::{Path, PathBuf};
use std::process::Command;

use super::AccountService;
use crate::error::{AppError, AppResult};
use crate::modules::device::DeviceProfileManager;
use crate::modules::history::ProfileVersionHistory;

/// Where a freshly bound profile comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    /// Read the fingerprint currently on disk
    Capture,
    /// Generate a random fingerprint
    Generate,
}

impl BindMode {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Generate => "generate",
        }
    }
}

/// Records the on-disk profile as baseline before the first write; failures
/// only warn.
pub(super) fn ensure_baseline(profiles: &DeviceProfileManager) {
    if let Err(e) = profiles.ensure_baseline_captured() {
        tracing::warn!("baseline_capture_failed: {}", e);
    }
}

impl AccountService {
    /// Random profile for display; nothing is written.
    pub fn preview_generate_identity_profile(&self) -> DeviceProfile {
        self.profiles.generate()
    }

    pub async fn get_identity_profiles(&self, account_id: &str) -> AppResult<DeviceProfilesSnapshot> {
        let id = account_id.to_string();
        self.blocking(move |service| {
            let account = service.load_account(&id)?;
            let current_storage = match service.profiles.capture() {
                Ok(profile) => Some(profile),
                Err(e) => {
                    tracing::warn!("current_storage_profile_unreadable: {}", e);
                    None
                },
            };
            Ok(DeviceProfilesSnapshot {
                current_storage,
                bound_profile: account.device_profile,
                history: account.device_history,
                baseline: service.profiles.load_baseline(),
            })
        })
        .await
    }

    /// Capture or generate a profile, write it to disk, and bind it as a new
    /// current version.
    pub async fn bind_identity_profile(
        &self,
        account_id: &str,
        mode: BindMode,
    ) -> AppResult<DeviceProfile> {
        let id = account_id.to_string();
        self.guarded_blocking(move |service| {
            let _account = service.load_account(&id)?;
            let profile = match mode {
                BindMode::Capture => service.profiles.capture()?,
                BindMode::Generate => service.profiles.generate(),
            };
            service.apply_and_bind(&id, profile, mode.label())
        })
        .await
    }

    /// Bind a caller-supplied profile.
    pub async fn bind_identity_profile_with_payload(
        &self,
        account_id: &str,
        profile: DeviceProfile,
    ) -> AppResult<DeviceProfile> {
        let id = account_id.to_string();
        self.guarded_blocking(move |service| {
            let _account = service.load_account(&id)?;
            service.apply_and_bind(&id, profile, "generated")
        })
        .await
    }

    /// Write the account's bound profile to disk.
    pub async fn apply_bound_identity_profile(&self, account_id: &str) -> AppResult<DeviceProfile> {
        let id = account_id.to_string();
        self.guarded_blocking(move |service| {
            let profile = service.write_with_binding(&id, |account| {
                let profile = account.device_profile.clone().ok_or(ProfileError::NoBoundProfile)?;
                account.update_last_used();
                Ok(profile)
            })?;
            tracing::info!(account = %id, "bound_identity_profile_applied");
            Ok(profile)
        })
        .await
    }

    /// Make a revision (`baseline`, `current`, or a version ID) the bound
    /// profile and write it to disk.
    pub async fn restore_identity_profile_revision(
        &self,
        account_id: &str,
        version_id: &str,
    ) -> AppResult<DeviceProfile> {
        let id = account_id.to_string();
        let version_id = version_id.to_string();
        self.guarded_blocking(move |service| {
            let baseline = service.profiles.load_baseline();
            let profile = service.write_with_binding(&id, |account| {
                Ok(account.restore_revision(&version_id, baseline.as_ref())?)
            })?;
            tracing::info!(account = %id, version = %version_id, "identity_profile_restored");
            Ok(profile)
        })
        .await
    }

    pub async fn delete_identity_profile_revision(
        &self,
        account_id: &str,
        version_id: &str,
    ) -> AppResult<()> {
        let id = account_id.to_string();
        let version_id = version_id.to_string();
        self.blocking(move |service| {
            let removed = service.index.update(|index| {
                let account =
                    index.get_mut(&id).ok_or_else(|| AccountError::NotFound { id: id.clone() })?;
                Ok(account.delete_revision(&version_id)?)
            })?;
            tracing::info!(account = %id, version = %removed.id, "identity_profile_revision_deleted");
            Ok(())
        })
        .await
    }

    /// Rebind the baseline without touching the disk.
    pub async fn restore_baseline_profile(&self, account_id: &str) -> AppResult<DeviceProfile> {
        let id = account_id.to_string();
        self.blocking(move |service| {
            let baseline = service.profiles.load_baseline();
            service.index.update(|index| {
                let account =
                    index.get_mut(&id).ok_or_else(|| AccountError::NotFound { id: id.clone() })?;
                Ok(account.restore_revision(BASELINE_VERSION_ID, baseline.as_ref())?)
            })
        })
        .await
    }

    /// Copy `storage.json` to a timestamped sibling before manual edits.
    pub async fn backup_identity_storage(&self) -> AppResult<PathBuf> {
        self.blocking(|service| {
            let path = service.profiles.backup_storage()?;
            tracing::info!(path = %path.display(), "storage_json_backed_up");
            Ok(path)
        })
        .await
    }

    /// Open the directory holding the target's storage files.
    pub fn open_identity_storage_folder(&self) -> AppResult<()> {
        let dir = self.profiles.storage_dir()?;
        open_in_file_manager(&dir)
    }

    /// Shared tail of the bind operations; runs on a blocking thread.
    fn apply_and_bind(
        &self,
        account_id: &str,
        profile: DeviceProfile,
        label: &str,
    ) -> AppResult<DeviceProfile> {
        ensure_baseline(&self.profiles);
        let _created = self.profiles.save_baseline_if_absent(&profile)?;

        let profile = self.write_with_binding(account_id, |account| {
            let _version = account.bind_profile(profile.clone(), label, true);
            Ok(profile)
        })?;
        tracing::info!(account = %account_id, label, "identity_profile_bound");
        Ok(profile)
    }

    /// Resolves the profile on the stored account and writes it to disk while
    /// the index lock is held.
    ///
    /// The index is only saved after the write succeeds. If the save fails the
    /// fingerprint that was on disk before is put back.
    fn write_with_binding(
        &self,
        account_id: &str,
        bind: impl FnOnce(&mut Account) -> AppResult<DeviceProfile>,
    ) -> AppResult<DeviceProfile> {
        let previous = self.profiles.capture().ok();
        let mut written = false;
        let result = self.index.update(|index| {
            let account = index
                .get_mut(account_id)
                .ok_or_else(|| AccountError::NotFound { id: account_id.to_string() })?;
            let profile = bind(account)?;
            self.profiles.apply(&profile)?;
            written = true;
            Ok(profile)
        });

        if let Err(e) = &result {
            if written {
                tracing::warn!(account = %account_id, "identity_binding_not_saved: {}", e);
                match previous {
                    Some(previous) => {
                        if let Err(revert) = self.profiles.apply(&previous) {
                            tracing::error!("identity_profile_revert_failed: {}", revert);
                        }
                    },
                    None => tracing::error!("identity_profile_revert_skipped: no prior profile"),
                }
            }
        }
        result
    }
}

fn open_in_file_manager(dir: &Path) -> AppResult<()> {
    #[cfg(target_os = "windows")]
    let program = "explorer";
    #[cfg(target_os = "macos")]
    let program = "open";
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let program = "xdg-open";

    let _child = Command::new(program).arg(dir).spawn().map_err(|e| {
        AppError::Process(format!("failed to open {} with {}: {}", dir.display(), program, e))
    })?;
    tracing::info!(path = %dir.display(), "storage_folder_opened");
    Ok(())
}

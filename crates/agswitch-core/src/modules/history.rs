//! Per-account device profile version history.
//!
//! Invariant: at most one version in an account's history is marked current.
//! Every mutation goes through [`mark_current`], which demotes all versions
//! before promoting at most one.

use agswitch_types::error::ProfileError;
use agswitch_types::models::{
    Account, DeviceProfile, DeviceProfileVersion, BASELINE_VERSION_ID, CURRENT_VERSION_ID,
};
use uuid::Uuid;

/// A revision request, as accepted by restore and delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionTarget {
    /// Installation-wide baseline profile
    Baseline,
    /// Profile currently bound to the account
    Current,
    /// Concrete history entry
    Version(String),
}

impl RevisionTarget {
    pub fn parse(version_id: &str) -> Self {
        match version_id {
            BASELINE_VERSION_ID => Self::Baseline,
            CURRENT_VERSION_ID => Self::Current,
            other => Self::Version(other.to_string()),
        }
    }
}

/// Demote every version, then promote `id` if given.
fn mark_current(history: &mut [DeviceProfileVersion], id: Option<&str>) {
    for version in history.iter_mut() {
        version.is_current = id.is_some_and(|target| version.id == target);
    }
}

/// Profile binding and revision management on an account.
pub trait ProfileVersionHistory {
    /// Bind `profile` to the account, optionally recording a new current version.
    fn bind_profile(
        &mut self,
        profile: DeviceProfile,
        label: &str,
        record_history: bool,
    ) -> Option<&DeviceProfileVersion>;

    /// Resolve a revision and make it the bound profile.
    fn restore_revision(
        &mut self,
        version_id: &str,
        baseline: Option<&DeviceProfile>,
    ) -> Result<DeviceProfile, ProfileError>;

    /// Remove a non-current history entry.
    fn delete_revision(&mut self, version_id: &str) -> Result<DeviceProfileVersion, ProfileError>;
}

impl ProfileVersionHistory for Account {
    fn bind_profile(
        &mut self,
        profile: DeviceProfile,
        label: &str,
        record_history: bool,
    ) -> Option<&DeviceProfileVersion> {
        self.device_profile = Some(profile.clone());
        if !record_history {
            return None;
        }

        let id = Uuid::new_v4().to_string();
        self.device_history.push(DeviceProfileVersion {
            id: id.clone(),
            created_at: chrono::Utc::now().timestamp(),
            label: label.to_string(),
            profile,
            is_current: false,
        });
        mark_current(&mut self.device_history, Some(&id));
        self.device_history.last()
    }

    fn restore_revision(
        &mut self,
        version_id: &str,
        baseline: Option<&DeviceProfile>,
    ) -> Result<DeviceProfile, ProfileError> {
        let profile = match RevisionTarget::parse(version_id) {
            RevisionTarget::Baseline => {
                let baseline = baseline.cloned().ok_or(ProfileError::BaselineNotFound)?;
                mark_current(&mut self.device_history, None);
                baseline
            },
            RevisionTarget::Current => {
                self.device_profile.clone().ok_or(ProfileError::NoBoundProfile)?
            },
            RevisionTarget::Version(id) => {
                let profile = self
                    .device_history
                    .iter()
                    .find(|v| v.id == id)
                    .map(|v| v.profile.clone())
                    .ok_or_else(|| ProfileError::VersionNotFound { id: id.clone() })?;
                mark_current(&mut self.device_history, Some(&id));
                profile
            },
        };

        self.device_profile = Some(profile.clone());
        Ok(profile)
    }

    fn delete_revision(&mut self, version_id: &str) -> Result<DeviceProfileVersion, ProfileError> {
        let id = match RevisionTarget::parse(version_id) {
            RevisionTarget::Baseline => return Err(ProfileError::BaselineNotDeletable),
            RevisionTarget::Current => {
                return Err(ProfileError::CurrentNotDeletable { id: version_id.to_string() })
            },
            RevisionTarget::Version(id) => id,
        };

        let position = self
            .device_history
            .iter()
            .position(|v| v.id == id)
            .ok_or_else(|| ProfileError::VersionNotFound { id: id.clone() })?;
        if self.device_history[position].is_current {
            return Err(ProfileError::CurrentNotDeletable { id });
        }
        Ok(self.device_history.remove(position))
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod history_tests;

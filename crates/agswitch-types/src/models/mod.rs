//! Core domain models for agswitch.
//!
//! This module contains all shared data structures used across the workspace.

mod account;
mod backup;
mod config;
mod device;
mod switch;

// Re-export all models
pub use account::{Account, AccountIndex};
pub use backup::{AccountBackupData, AccountInfo, BACKUP_FORMAT_VERSION};
pub use config::AppConfig;
pub use device::{
    DeviceProfile, DeviceProfileVersion, DeviceProfilesSnapshot, BASELINE_VERSION_ID,
    CURRENT_VERSION_ID,
};
pub use switch::{
    SwitchFailureMetadata, SwitchGuardSnapshot, SwitchMetricBucket, SwitchMetricsSnapshot,
    SwitchScope,
};

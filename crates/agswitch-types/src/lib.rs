//! # agswitch Types
//!
//! Core types, models, and error definitions for agswitch.
//!
//! This crate provides the foundational type system shared by the switcher:
//!
//! - **`error`** - Switch failure reasons and typed account/profile errors
//! - **`models`** - Domain models (Account, DeviceProfile, metrics, config)
//!
//! ## Architecture Role
//!
//! `agswitch-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!          agswitch-types (this crate)
//!                  │
//!                  ▼
//!            agswitch-core
//!                  │
//!                  ▼
//!            agswitch-cli
//! ```
//!
//! All types are designed to be:
//! - **Serializable** via serde for persistence and IPC
//! - **Clone** for cheap sharing across async boundaries
//! - **PartialEq** for testing and comparison

pub mod error;
pub mod models;

// Re-export error types for convenience
pub use error::{AccountError, ErrorCategory, ProfileError, SwitchFailure, SwitchFailureReason};

// Re-export core model types
pub use models::{
    Account, AccountBackupData, AccountIndex, AccountInfo, AppConfig, DeviceProfile,
    DeviceProfileVersion, DeviceProfilesSnapshot, SwitchGuardSnapshot, SwitchMetricBucket,
    SwitchMetricsSnapshot, SwitchScope,
};

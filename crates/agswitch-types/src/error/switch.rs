//! Switch flow failure reasons.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::ErrorCategory;
use crate::models::SwitchScope;

/// Why a switch flow ended in failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SwitchFailureReason {
    Unknown,
    ProcessCloseFailed,
    MissingBoundProfile,
    ApplyDeviceProfileFailed,
    PerformSwitchFailed,
    StartProcessFailed,
}

impl SwitchFailureReason {
    pub const ALL: [Self; 6] = [
        Self::Unknown,
        Self::ProcessCloseFailed,
        Self::MissingBoundProfile,
        Self::ApplyDeviceProfileFailed,
        Self::PerformSwitchFailed,
        Self::StartProcessFailed,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::ProcessCloseFailed => "process_close_failed",
            Self::MissingBoundProfile => "missing_bound_profile",
            Self::ApplyDeviceProfileFailed => "apply_device_profile_failed",
            Self::PerformSwitchFailed => "perform_switch_failed",
            Self::StartProcessFailed => "start_process_failed",
        }
    }

    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::ProcessCloseFailed | Self::StartProcessFailed => ErrorCategory::ProcessLifecycle,
            Self::ApplyDeviceProfileFailed | Self::PerformSwitchFailed => {
                ErrorCategory::DataIntegrity
            },
            Self::MissingBoundProfile => ErrorCategory::InvalidState,
            Self::Unknown => ErrorCategory::Unknown,
        }
    }
}

impl fmt::Display for SwitchFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of a switch flow, tagged with scope and reason.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[error("{scope} switch failed [{reason}]: {message}")]
pub struct SwitchFailure {
    pub scope: SwitchScope,
    pub reason: SwitchFailureReason,
    /// Original error message from the failing step
    pub message: String,
    /// Outcome of the fingerprint rollback, when one was attempted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_succeeded: Option<bool>,
}

impl SwitchFailure {
    pub fn new(scope: SwitchScope, reason: SwitchFailureReason, message: impl Into<String>) -> Self {
        Self { scope, reason, message: message.into(), rollback_succeeded: None }
    }

    #[must_use]
    pub const fn with_rollback(mut self, succeeded: bool) -> Self {
        self.rollback_succeeded = Some(succeeded);
        self
    }
}

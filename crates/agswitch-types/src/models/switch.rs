//! Switch scopes, guard diagnostics, and per-scope switch metrics.

use crate::error::SwitchFailureReason;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Origin of a switch request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SwitchScope {
    /// Account captured from this machine
    Local,
    /// Account sourced from a remote store
    Cloud,
}

impl SwitchScope {
    pub const ALL: [Self; 2] = [Self::Local, Self::Cloud];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Cloud => "cloud",
        }
    }

    /// Owner tag used by the switch guard in its logs.
    pub const fn owner_tag(&self) -> &'static str {
        match self {
            Self::Local => "local-account-switch",
            Self::Cloud => "cloud-account-switch",
        }
    }
}

impl fmt::Display for SwitchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Most recent failure recorded for a scope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SwitchFailureMetadata {
    pub reason: SwitchFailureReason,
    pub message: String,
    /// Unix timestamp in milliseconds
    pub occurred_at: i64,
}

/// Monotonic switch counters for one scope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SwitchMetricBucket {
    pub switch_success: u64,
    pub switch_failure: u64,
    pub rollback_attempt: u64,
    pub rollback_success: u64,
    pub rollback_failure: u64,
    /// Failure count per reason; every reason is present
    pub failure_reasons: BTreeMap<SwitchFailureReason, u64>,
    pub last_failure: Option<SwitchFailureMetadata>,
}

impl SwitchMetricBucket {
    pub fn new() -> Self {
        Self {
            switch_success: 0,
            switch_failure: 0,
            rollback_attempt: 0,
            rollback_success: 0,
            rollback_failure: 0,
            failure_reasons: SwitchFailureReason::ALL.iter().map(|r| (*r, 0)).collect(),
            last_failure: None,
        }
    }

    /// Failure count recorded for one reason.
    pub fn failures_for(&self, reason: SwitchFailureReason) -> u64 {
        self.failure_reasons.get(&reason).copied().unwrap_or(0)
    }
}

impl Default for SwitchMetricBucket {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned copy of all switch metrics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SwitchMetricsSnapshot {
    pub local: SwitchMetricBucket,
    pub cloud: SwitchMetricBucket,
}

impl SwitchMetricsSnapshot {
    pub const fn bucket(&self, scope: SwitchScope) -> &SwitchMetricBucket {
        match scope {
            SwitchScope::Local => &self.local,
            SwitchScope::Cloud => &self.cloud,
        }
    }

    pub fn bucket_mut(&mut self, scope: SwitchScope) -> &mut SwitchMetricBucket {
        match scope {
            SwitchScope::Local => &mut self.local,
            SwitchScope::Cloud => &mut self.cloud,
        }
    }
}

/// Read-only view of the switch guard queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SwitchGuardSnapshot {
    pub active_owner: Option<SwitchScope>,
    /// Waiting owners in admission order
    pub pending_owners: Vec<SwitchScope>,
    pub pending_count: usize,
}

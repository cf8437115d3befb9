//! Application configuration.

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_exit_timeout_ms() -> u64 {
    10_000
}

fn default_product() -> String {
    "Antigravity".to_string()
}

/// Persisted switcher settings (`config.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Rewrite the device fingerprint when switching accounts
    #[serde(default = "default_true")]
    pub apply_identity_profile: bool,
    /// How long to wait for the target process to exit
    #[serde(default = "default_exit_timeout_ms")]
    pub process_exit_timeout_ms: u64,
    /// Start the target again once the swap has committed
    #[serde(default = "default_true")]
    pub restart_after_switch: bool,
    /// Product directory name of the target (e.g. `Antigravity`)
    #[serde(default = "default_product")]
    pub target_product: String,
    /// Manually configured target executable path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_executable: Option<String>,
    /// Extra arguments passed when starting the target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_args: Option<Vec<String>>,
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            apply_identity_profile: true,
            process_exit_timeout_ms: default_exit_timeout_ms(),
            restart_after_switch: true,
            target_product: default_product(),
            target_executable: None,
            target_args: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

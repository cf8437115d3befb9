//! Device fingerprint types for account isolation.
//!
//! Each account can carry its own device fingerprint so the target
//! application sees a distinct "installation" per identity.

use serde::{Deserialize, Serialize};

/// Revision sentinel naming the installation-wide baseline profile.
pub const BASELINE_VERSION_ID: &str = "baseline";
/// Revision sentinel naming the account's currently bound profile.
pub const CURRENT_VERSION_ID: &str = "current";

/// Device fingerprint profile matching the target's `storage.json` telemetry keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfile {
    /// Machine ID in auth0 format: `auth0|user_{random_hex_32}`
    pub machine_id: String,

    /// MAC-based machine ID in UUID v4 format
    pub mac_machine_id: String,

    /// Device ID (UUID v4)
    pub dev_device_id: String,

    /// SQM telemetry ID in format `{UUID}` (with braces, uppercase)
    pub sqm_id: String,
}

/// Historical version of a device profile bound to an account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfileVersion {
    /// Unique version ID
    pub id: String,

    /// Unix timestamp (seconds) of when this version was bound
    pub created_at: i64,

    /// Origin label (e.g. "generate", "capture", "auto_generated")
    pub label: String,

    /// The device profile snapshot
    pub profile: DeviceProfile,

    /// Whether this is the currently active profile
    pub is_current: bool,
}

/// Everything a profile editor needs to render one account.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfilesSnapshot {
    /// Profile read from the target's storage right now (if readable)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_storage: Option<DeviceProfile>,

    /// Profile currently bound to the account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_profile: Option<DeviceProfile>,

    /// Historical versions, oldest first
    pub history: Vec<DeviceProfileVersion>,

    /// Installation-wide baseline profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<DeviceProfile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_profile_uses_telemetry_keys() {
        let profile = DeviceProfile {
            machine_id: "auth0|user_abc123".to_string(),
            mac_machine_id: "550e8400-e29b-41d4-a716-446655440000".to_string(),
            dev_device_id: "660e8400-e29b-41d4-a716-446655440001".to_string(),
            sqm_id: "{770E8400-E29B-41D4-A716-446655440002}".to_string(),
        };

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["machineId"], "auth0|user_abc123");
        assert_eq!(json["macMachineId"], "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(json["devDeviceId"], "660e8400-e29b-41d4-a716-446655440001");
        assert_eq!(json["sqmId"], "{770E8400-E29B-41D4-A716-446655440002}");
    }

    #[test]
    fn test_snapshot_omits_absent_profiles() {
        let snapshot = DeviceProfilesSnapshot::default();
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, r#"{"history":[]}"#);
    }
}

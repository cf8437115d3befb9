//! Device fingerprint generation and storage for account isolation.
//!
//! Generates VSCode-style device fingerprints and reads/writes them in the
//! target application's `storage.json`. Also owns the installation-wide
//! baseline: the fingerprint found on disk before the first tool-driven write.

use agswitch_types::models::DeviceProfile;
use chrono::Local;
use rand::Rng;
use rusqlite::Connection;
use serde_json::Value;
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::utils::fs::{write_atomic, write_json_atomic};

const STATE_DB: &str = "state.vscdb";
const SERVICE_MACHINE_ID_KEY: &str = "storage.serviceMachineId";

/// Telemetry keys in `storage.json`, paired with the profile field they carry.
const TELEMETRY_KEYS: [&str; 4] = ["machineId", "macMachineId", "devDeviceId", "sqmId"];

/// Generates a new random device profile.
pub fn generate_profile() -> DeviceProfile {
    DeviceProfile {
        machine_id: format!("auth0|user_{}", random_hex(32)),
        mac_machine_id: new_standard_machine_id(),
        dev_device_id: Uuid::new_v4().to_string(),
        sqm_id: format!("{{{}}}", Uuid::new_v4().to_string().to_uppercase()),
    }
}

/// Generates a random lowercase hex string of the specified length.
fn random_hex(length: usize) -> String {
    const HEX_CHARS: &[u8] = b"0123456789abcdef";
    let mut rng = rand::thread_rng();
    (0..length).map(|_| HEX_CHARS[rng.gen_range(0..16)] as char).collect()
}

/// Generates a standard UUID v4 shaped machine ID.
fn new_standard_machine_id() -> String {
    let mut rng = rand::thread_rng();
    let mut id = String::with_capacity(36);

    for ch in "xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx".chars() {
        match ch {
            'x' => {
                let _ = write!(id, "{:x}", rng.gen_range(0..16));
            },
            'y' => {
                let _ = write!(id, "{:x}", rng.gen_range(8..12));
            },
            _ => id.push(ch),
        }
    }
    id
}

fn profile_field<'a>(profile: &'a DeviceProfile, key: &str) -> &'a str {
    match key {
        "machineId" => &profile.machine_id,
        "macMachineId" => &profile.mac_machine_id,
        "devDeviceId" => &profile.dev_device_id,
        _ => &profile.sqm_id,
    }
}

/// Locates the target's `storage.json` for a product directory name.
pub fn get_storage_path(product: &str) -> AppResult<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(config) = dirs::config_dir() {
        candidates.push(config.join(product).join("User/globalStorage/storage.json"));
    }
    if let Some(home) = dirs::home_dir() {
        candidates.push(
            home.join(format!(".{}", product.to_lowercase()))
                .join("User/globalStorage/storage.json"),
        );
    }

    candidates.into_iter().find(|p| p.exists()).ok_or_else(|| {
        AppError::Storage(format!("storage_json_not_found for product {}", product))
    })
}

/// Reads and maintains the fingerprint of one target installation.
#[derive(Debug, Clone)]
pub struct DeviceProfileManager {
    storage_path: PathBuf,
    baseline_path: PathBuf,
}

impl DeviceProfileManager {
    pub fn new(storage_path: impl Into<PathBuf>, baseline_path: impl Into<PathBuf>) -> Self {
        Self { storage_path: storage_path.into(), baseline_path: baseline_path.into() }
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// Directory holding `storage.json` and `state.vscdb`.
    pub fn storage_dir(&self) -> AppResult<PathBuf> {
        self.storage_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| AppError::Storage("failed_to_get_storage_parent_dir".to_string()))
    }

    /// Fresh random profile; touches nothing on disk.
    pub fn generate(&self) -> DeviceProfile {
        generate_profile()
    }

    /// Reads the four fingerprint fields from `storage.json`.
    pub fn capture(&self) -> AppResult<DeviceProfile> {
        let json = self.read_storage_json()?;

        let get_field = |key: &str| -> AppResult<String> {
            json.get("telemetry")
                .and_then(|t| t.get(key))
                .and_then(Value::as_str)
                .or_else(|| json.get(format!("telemetry.{key}")).and_then(Value::as_str))
                .map(str::to_string)
                .ok_or_else(|| AppError::Storage(format!("missing_field: {}", key)))
        };

        Ok(DeviceProfile {
            machine_id: get_field("machineId")?,
            mac_machine_id: get_field("macMachineId")?,
            dev_device_id: get_field("devDeviceId")?,
            sqm_id: get_field("sqmId")?,
        })
    }

    /// Writes all four fields through a staged file and a rename.
    ///
    /// A concurrent reader observes the previous profile or the new one,
    /// never a mix.
    pub fn apply(&self, profile: &DeviceProfile) -> AppResult<()> {
        let mut json = self.read_storage_json()?;
        let map = json
            .as_object_mut()
            .ok_or_else(|| AppError::Storage("json_top_level_not_object".to_string()))?;

        let telemetry = map
            .entry("telemetry")
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if !telemetry.is_object() {
            *telemetry = Value::Object(serde_json::Map::new());
        }
        if let Some(nested) = telemetry.as_object_mut() {
            for key in TELEMETRY_KEYS {
                drop(nested.insert(
                    key.to_string(),
                    Value::String(profile_field(profile, key).to_string()),
                ));
            }
        }

        for key in TELEMETRY_KEYS {
            drop(map.insert(
                format!("telemetry.{key}"),
                Value::String(profile_field(profile, key).to_string()),
            ));
        }
        drop(map.insert(
            SERVICE_MACHINE_ID_KEY.to_string(),
            Value::String(profile.dev_device_id.clone()),
        ));

        let updated = serde_json::to_vec_pretty(&json)?;
        write_atomic(&self.storage_path, &updated)?;
        tracing::info!(path = %self.storage_path.display(), "device_profile_written");

        if let Err(e) = self.sync_state_db(&profile.dev_device_id) {
            tracing::warn!("sqlite_sync_failed: {}", e);
        }

        Ok(())
    }

    /// Copies `storage.json` to a timestamped sibling.
    pub fn backup_storage(&self) -> AppResult<PathBuf> {
        if !self.storage_path.exists() {
            return Err(AppError::Storage(format!(
                "storage_json_missing: {}",
                self.storage_path.display()
            )));
        }
        let backup_path = self.storage_dir()?.join(format!(
            "storage.json.backup_{}",
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        let _bytes_copied: u64 = fs::copy(&self.storage_path, &backup_path)?;
        Ok(backup_path)
    }

    /// Loads the baseline profile, if one has been captured.
    pub fn load_baseline(&self) -> Option<DeviceProfile> {
        let content = fs::read_to_string(&self.baseline_path).ok()?;
        match serde_json::from_str::<DeviceProfile>(&content) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(path = %self.baseline_path.display(), "baseline_unreadable: {}", e);
                None
            },
        }
    }

    /// Persists `profile` as baseline unless one already exists.
    ///
    /// Returns `true` when this call created the baseline.
    pub fn save_baseline_if_absent(&self, profile: &DeviceProfile) -> AppResult<bool> {
        if self.baseline_path.exists() {
            return Ok(false);
        }
        write_json_atomic(&self.baseline_path, profile)?;
        tracing::info!(path = %self.baseline_path.display(), "device_baseline_saved");
        Ok(true)
    }

    /// Captures the on-disk profile as baseline the first time it is called.
    pub fn ensure_baseline_captured(&self) -> AppResult<DeviceProfile> {
        if let Some(existing) = self.load_baseline() {
            return Ok(existing);
        }
        let current = self.capture()?;
        let _created = self.save_baseline_if_absent(&current)?;
        Ok(current)
    }

    fn read_storage_json(&self) -> AppResult<Value> {
        let content = fs::read_to_string(&self.storage_path).map_err(|e| {
            AppError::Storage(format!("read_failed ({}): {}", self.storage_path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            AppError::Storage(format!("parse_failed ({}): {}", self.storage_path.display(), e))
        })
    }

    /// Mirrors the service machine ID into `state.vscdb` when present.
    fn sync_state_db(&self, service_id: &str) -> AppResult<()> {
        let db_path = self.storage_dir()?.join(STATE_DB);
        if !db_path.exists() {
            tracing::debug!("state_db_missing: {:?}", db_path);
            return Ok(());
        }
        sync_to_state_db(&db_path, service_id)
    }
}

/// Syncs service machine ID to the SQLite state database.
fn sync_to_state_db(db_path: &Path, service_id: &str) -> AppResult<()> {
    let conn = Connection::open(db_path)?;
    let _rows_affected: usize = conn
        .execute("CREATE TABLE IF NOT EXISTS ItemTable (key TEXT PRIMARY KEY, value TEXT);", [])?;
    let _rows_affected: usize = conn.execute(
        "INSERT OR REPLACE INTO ItemTable (key, value) VALUES (?1, ?2);",
        [SERVICE_MACHINE_ID_KEY, service_id],
    )?;

    tracing::info!("service_machine_id_synced_to_db");
    Ok(())
}

#[cfg(test)]
#[path = "device_tests.rs"]
mod device_tests;

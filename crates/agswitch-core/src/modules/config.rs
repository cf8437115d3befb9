//! Application configuration persistence (`config.json`).

use std::fs;

use crate::error::{AppError, AppResult};
use crate::models::AppConfig;
use crate::utils::fs::write_json_atomic;
use crate::utils::paths::DataPaths;

/// Load the configuration, falling back to defaults when the file is absent.
pub fn load_config(paths: &DataPaths) -> AppResult<AppConfig> {
    let config_path = paths.config_file();
    if !config_path.exists() {
        return Ok(AppConfig::new());
    }

    let content = fs::read_to_string(&config_path)?;
    serde_json::from_str(&content).map_err(|e| {
        AppError::Config(format!("invalid config ({}): {}", config_path.display(), e))
    })
}

/// Load the configuration; an unreadable file logs a warning and yields defaults.
pub fn load_config_or_default(paths: &DataPaths) -> AppConfig {
    load_config(paths).unwrap_or_else(|e| {
        tracing::warn!("config_load_failed_using_defaults: {}", e);
        AppConfig::new()
    })
}

/// Save the configuration atomically.
pub fn save_config(paths: &DataPaths, config: &AppConfig) -> AppResult<()> {
    write_json_atomic(&paths.config_file(), config)?;
    tracing::info!(path = %paths.config_file().display(), "config_saved");
    Ok(())
}

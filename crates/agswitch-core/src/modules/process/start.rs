//! Start the target application.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::TargetProcess;
use crate::error::{AppError, AppResult};

/// Launches the target, preferring the configured executable.
pub(crate) fn start_target(target: &TargetProcess) -> AppResult<()> {
    tracing::info!(product = %target.product, "starting_target");

    if let Some(path) = &target.executable {
        let path = normalize_manual_path(path);
        if path.exists() {
            tracing::info!(path = %path.display(), "starting_from_manual_path");
            return spawn_manual(&path, &target.args);
        }
        tracing::warn!(
            path = %path.display(),
            "manual_path_missing_falling_back_to_default"
        );
    }

    start_from_default_location(target)
}

/// A path pointing inside a macOS bundle is trimmed to the `.app` itself.
fn normalize_manual_path(path: &Path) -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        let path_str = path.to_string_lossy();
        if let Some(app_idx) = path_str.find(".app") {
            let bundle = &path_str[..app_idx + 4];
            if bundle != path_str {
                tracing::info!(bundle, "manual_path_corrected_to_bundle");
                return PathBuf::from(bundle);
            }
        }
    }
    path.to_path_buf()
}

fn spawn_manual(path: &Path, args: &[String]) -> AppResult<()> {
    #[cfg(target_os = "macos")]
    if path.extension().is_some_and(|ext| ext == "app") || path.is_dir() {
        let _child = Command::new("open")
            .arg("-a")
            .arg(path)
            .args(args)
            .spawn()
            .map_err(|e| AppError::Process(format!("start_failed (open): {}", e)))?;
        return Ok(());
    }

    let _child = Command::new(path)
        .args(args)
        .spawn()
        .map_err(|e| AppError::Process(format!("start_failed ({}): {}", path.display(), e)))?;
    Ok(())
}

#[cfg(target_os = "macos")]
fn start_from_default_location(target: &TargetProcess) -> AppResult<()> {
    let output = Command::new("open")
        .args(["-a", &target.product])
        .args(&target.args)
        .output()
        .map_err(|e| AppError::Process(format!("open_command_failed: {}", e)))?;
    if !output.status.success() {
        return Err(AppError::Process(format!(
            "start_failed (open exited with {}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

#[cfg(target_os = "windows")]
fn start_from_default_location(target: &TargetProcess) -> AppResult<()> {
    let _child = Command::new("cmd")
        .args(["/C", "start", &format!("{}://", target.product.to_lowercase())])
        .args(&target.args)
        .spawn()
        .map_err(|e| AppError::Process(format!("start_failed: {}", e)))?;
    Ok(())
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn start_from_default_location(target: &TargetProcess) -> AppResult<()> {
    let binary = target.product.to_lowercase();
    let _child = Command::new(&binary)
        .args(&target.args)
        .spawn()
        .map_err(|e| AppError::Process(format!("start_failed ({}): {}", binary, e)))?;
    Ok(())
}

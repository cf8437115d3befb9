//! Atomic file replacement.

use std::fs;
use std::path::Path;

use crate::error::AppResult;

/// Write `content` next to `path` and rename it into place.
///
/// Readers see either the old file or the new one, never a partial write.
pub fn write_atomic(path: &Path, content: &[u8]) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    if let Err(e) = fs::write(&temp_path, content) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        e.into()
    })
}

/// Serialize `value` as pretty JSON and replace `path` atomically.
pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> AppResult<()> {
    let content = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &content)
}

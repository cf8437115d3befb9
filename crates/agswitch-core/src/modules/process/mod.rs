//! Target application process control.
//!
//! [`ProcessController`] is the seam the switch flow drives; the system
//! implementation detects processes with `sysinfo` and signals them with the
//! platform tools (`kill` on Unix, `taskkill` on Windows).

mod close;
mod detection;
mod lifecycle_utils;
mod pid_collection;
mod start;

use agswitch_types::models::AppConfig;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::AppResult;

/// Lifecycle control over the target application.
#[async_trait]
pub trait ProcessController: Send + Sync {
    async fn is_running(&self) -> bool;

    /// Stop the target within `timeout`.
    ///
    /// `Ok(true)` when it is no longer running (already stopped included),
    /// `Ok(false)` when it outlived the timeout.
    ///
    /// The returned future may be dropped by a caller-side timeout; no
    /// further signal is sent after that.
    async fn stop(&self, timeout: Duration) -> AppResult<bool>;

    async fn start(&self) -> AppResult<()>;
}

/// Identity of the target application on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetProcess {
    /// Product name (`Antigravity`); matched case-insensitively
    pub product: String,
    /// Configured executable, takes precedence over name matching
    pub executable: Option<PathBuf>,
    /// Arguments passed on start
    pub args: Vec<String>,
}

impl TargetProcess {
    pub fn new(product: impl Into<String>) -> Self {
        Self { product: product.into(), executable: None, args: Vec::new() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            product: config.target_product.clone(),
            executable: config.target_executable.as_ref().map(PathBuf::from),
            args: config.target_args.clone().unwrap_or_default(),
        }
    }
}

/// Marks a blocking close as abandoned when the future awaiting it is
/// dropped, e.g. by an outer timeout.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// [`ProcessController`] over the real OS process table.
#[derive(Debug, Clone)]
pub struct SystemProcessController {
    target: TargetProcess,
}

impl SystemProcessController {
    pub fn new(target: TargetProcess) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &TargetProcess {
        &self.target
    }
}

#[async_trait]
impl ProcessController for SystemProcessController {
    async fn is_running(&self) -> bool {
        let target = self.target.clone();
        tokio::task::spawn_blocking(move || detection::is_target_running(&target))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("process_detection_task_failed: {}", e);
                false
            })
    }

    async fn stop(&self, timeout: Duration) -> AppResult<bool> {
        let target = self.target.clone();
        let cancelled = Arc::new(AtomicBool::new(false));
        let _cancel_on_drop = CancelOnDrop(Arc::clone(&cancelled));
        tokio::task::spawn_blocking(move || close::close_target(&target, timeout, &cancelled))
            .await?
    }

    async fn start(&self) -> AppResult<()> {
        let target = self.target.clone();
        tokio::task::spawn_blocking(move || start::start_target(&target)).await?
    }
}

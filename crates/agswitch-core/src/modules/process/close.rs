//! Stop the target application within a time budget.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::detection::is_target_running;
use super::lifecycle_utils::wait_for_exit;
use super::pid_collection::get_target_pids;
use super::TargetProcess;
use crate::error::AppResult;

/// Closes every main target process.
///
/// Returns `Ok(true)` when the target is gone (including when it was never
/// running) and `Ok(false)` when it survived the whole `timeout`.
///
/// Once `cancelled` is set no further signal is sent.
pub(crate) fn close_target(
    target: &TargetProcess,
    timeout: Duration,
    cancelled: &AtomicBool,
) -> AppResult<bool> {
    let started = Instant::now();
    let pids = get_target_pids(target);
    if pids.is_empty() {
        tracing::info!(product = %target.product, "target_not_running");
        return Ok(true);
    }

    tracing::info!(product = %target.product, count = pids.len(), "closing_target");
    terminate(target, &pids, timeout, cancelled);
    if cancelled.load(Ordering::SeqCst) {
        tracing::warn!(product = %target.product, "target_close_abandoned");
        return Ok(!is_target_running(target));
    }

    let remaining = timeout.saturating_sub(started.elapsed());
    let exited = wait_for_exit(target, remaining) || !is_target_running(target);
    if exited {
        tracing::info!(product = %target.product, "target_closed");
    } else {
        tracing::error!(product = %target.product, ?timeout, "target_still_running");
    }
    Ok(exited)
}

#[cfg(target_os = "windows")]
fn terminate(_target: &TargetProcess, pids: &[u32], _timeout: Duration, _cancelled: &AtomicBool) {
    super::lifecycle_utils::taskkill_pids(pids);
}

#[cfg(unix)]
fn terminate(target: &TargetProcess, pids: &[u32], timeout: Duration, cancelled: &AtomicBool) {
    use super::lifecycle_utils::{force_kill_remaining, graceful_budget, signal_pids};

    signal_pids(pids, "-15");
    if wait_for_exit(target, graceful_budget(timeout)) {
        tracing::info!("target_exited_gracefully");
        return;
    }
    // The caller gave up waiting; a later switch may already own the target.
    if cancelled.load(Ordering::SeqCst) {
        return;
    }
    force_kill_remaining(target);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_absent_target_is_noop_success() {
        let target = TargetProcess::new("agswitch-no-such-product-7f3a");
        let cancelled = AtomicBool::new(false);
        assert!(close_target(&target, Duration::from_millis(100), &cancelled).unwrap());
    }

    #[test]
    fn test_abandoned_close_reports_absent_target_as_closed() {
        let target = TargetProcess::new("agswitch-no-such-product-7f3a");
        let cancelled = AtomicBool::new(true);
        assert!(close_target(&target, Duration::from_millis(100), &cancelled).unwrap());
    }
}

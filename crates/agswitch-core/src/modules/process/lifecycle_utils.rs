//! Shared utilities for process lifecycle management.

use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

use super::detection::is_target_running;
use super::pid_collection::get_target_pids;
use super::TargetProcess;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Share of the stop budget spent waiting for a graceful exit.
pub(crate) fn graceful_budget(timeout: Duration) -> Duration {
    timeout.mul_f64(0.7)
}

/// Polls until the target is gone or `budget` elapses. Returns `true` once exited.
pub(crate) fn wait_for_exit(target: &TargetProcess, budget: Duration) -> bool {
    let start = Instant::now();
    loop {
        if !is_target_running(target) {
            return true;
        }
        if start.elapsed() >= budget {
            return false;
        }
        thread::sleep(POLL_INTERVAL.min(budget.saturating_sub(start.elapsed())));
    }
}

/// Sends `signal` (e.g. `-15`, `-9`) to each PID via `kill`.
#[cfg(unix)]
pub(crate) fn signal_pids(pids: &[u32], signal: &str) {
    for pid in pids {
        match Command::new("kill").args([signal, &pid.to_string()]).output() {
            Ok(result) if !result.status.success() => {
                let error = String::from_utf8_lossy(&result.stderr);
                if !error.contains("No such process") {
                    tracing::warn!(pid, signal, "kill_failed: {}", error.trim());
                }
            },
            Ok(_) => {},
            Err(e) => tracing::warn!(pid, signal, "kill_spawn_failed: {}", e),
        }
    }
}

/// Force-terminates each PID with `taskkill /F`.
#[cfg(target_os = "windows")]
pub(crate) fn taskkill_pids(pids: &[u32]) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;

    for pid in pids {
        if let Err(e) = Command::new("taskkill")
            .args(["/F", "/PID", &pid.to_string()])
            .creation_flags(CREATE_NO_WINDOW)
            .output()
        {
            tracing::warn!(pid, "taskkill_failed: {}", e);
        }
    }
}

/// SIGKILLs whatever survived the graceful phase.
#[cfg(unix)]
pub(crate) fn force_kill_remaining(target: &TargetProcess) {
    let remaining = get_target_pids(target);
    if remaining.is_empty() {
        tracing::info!("target_exited_after_sigterm");
        return;
    }
    tracing::warn!(count = remaining.len(), "graceful_close_timeout_force_killing");
    signal_pids(&remaining, "-9");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graceful_budget_is_seventy_percent() {
        assert_eq!(graceful_budget(Duration::from_secs(10)), Duration::from_secs(7));
    }

    #[test]
    fn test_wait_for_exit_returns_immediately_when_absent() {
        let target = TargetProcess::new("agswitch-no-such-product-7f3a");
        let start = Instant::now();
        assert!(wait_for_exit(&target, Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}

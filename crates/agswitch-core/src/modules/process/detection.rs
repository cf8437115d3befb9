//! Target process detection.
//!
//! Matches the main process of the target application by configured
//! executable path first, then by product name, skipping Chromium-style
//! helper processes and this tool itself.

use std::path::PathBuf;
use sysinfo::{Process, System};

use super::TargetProcess;

/// Get the canonicalized path of the current executable.
pub(crate) fn get_current_exe_path() -> Option<PathBuf> {
    std::env::current_exe().ok().and_then(|p| p.canonicalize().ok())
}

/// Check if a process is a helper/auxiliary process based on name and args.
pub(crate) fn is_helper_process(name: &str, args_str: &str, exe_path: &str) -> bool {
    const HELPER_MARKERS: [&str; 9] = [
        "helper",
        "plugin",
        "renderer",
        "gpu",
        "crashpad",
        "utility",
        "audio",
        "sandbox",
        "language_server",
    ];
    args_str.contains("--type=")
        || HELPER_MARKERS.iter().any(|marker| name.contains(marker))
        || exe_path.contains("crashpad")
}

/// Lowercased fields of one process, computed once per scan.
pub(crate) struct ProcessView {
    pub name: String,
    pub exe_path: String,
    pub args: String,
    pub canonical_exe: Option<PathBuf>,
}

impl ProcessView {
    pub fn of(process: &Process) -> Self {
        Self {
            name: process.name().to_string_lossy().to_lowercase(),
            exe_path: process.exe().and_then(|p| p.to_str()).unwrap_or("").to_lowercase(),
            args: process
                .cmd()
                .iter()
                .map(|arg| arg.to_string_lossy().to_lowercase())
                .collect::<Vec<String>>()
                .join(" "),
            canonical_exe: process.exe().and_then(|p| p.canonicalize().ok()),
        }
    }

    pub fn is_helper(&self) -> bool {
        is_helper_process(&self.name, &self.args, &self.exe_path)
    }
}

/// Decides which processes belong to the configured target.
pub(crate) struct ProcessMatcher {
    product: String,
    manual_path: Option<PathBuf>,
    current_exe: Option<PathBuf>,
    current_pid: u32,
}

impl ProcessMatcher {
    pub fn new(target: &TargetProcess) -> Self {
        Self {
            product: target.product.to_lowercase(),
            manual_path: target.executable.as_ref().and_then(|p| p.canonicalize().ok()),
            current_exe: get_current_exe_path(),
            current_pid: std::process::id(),
        }
    }

    /// Whether `pid` is this tool (same PID or same executable).
    pub fn is_self(&self, pid: u32, view: &ProcessView) -> bool {
        pid == self.current_pid
            || matches!((&self.current_exe, &view.canonical_exe), (Some(me), Some(exe)) if me == exe)
    }

    /// Whether the process is the main (non-helper) target process.
    pub fn is_main_target(&self, view: &ProcessView) -> bool {
        if view.is_helper() {
            return false;
        }
        if let (Some(manual), Some(exe)) = (&self.manual_path, &view.canonical_exe) {
            if same_installation(manual, exe) {
                return true;
            }
        }
        self.matches_product_name(view)
    }

    #[cfg(target_os = "macos")]
    fn matches_product_name(&self, view: &ProcessView) -> bool {
        view.exe_path.contains(&format!("{}.app", self.product))
    }

    #[cfg(target_os = "windows")]
    fn matches_product_name(&self, view: &ProcessView) -> bool {
        view.name == format!("{}.exe", self.product)
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    fn matches_product_name(&self, view: &ProcessView) -> bool {
        (view.name == self.product || view.exe_path.contains(&format!("/{}", self.product)))
            && !view.name.contains("tools")
    }
}

/// On macOS two executables belong to one installation when they share the
/// `.app` bundle; elsewhere the paths must be equal.
fn same_installation(manual: &std::path::Path, exe: &std::path::Path) -> bool {
    #[cfg(target_os = "macos")]
    {
        let manual = manual.to_string_lossy();
        let exe = exe.to_string_lossy();
        if let (Some(m_idx), Some(p_idx)) = (manual.find(".app"), exe.find(".app")) {
            return manual[..m_idx + 4] == exe[..p_idx + 4];
        }
        false
    }

    #[cfg(not(target_os = "macos"))]
    {
        manual == exe
    }
}

/// Check if the target's main process is currently running.
pub(crate) fn is_target_running(target: &TargetProcess) -> bool {
    let mut system = System::new();
    let _ = system.refresh_processes(sysinfo::ProcessesToUpdate::All);

    let matcher = ProcessMatcher::new(target);
    system.processes().iter().any(|(pid, process)| {
        let view = ProcessView::of(process);
        !matcher.is_self(pid.as_u32(), &view) && matcher.is_main_target(&view)
    })
}

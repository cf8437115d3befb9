//! PID collection for target processes.

use std::collections::{HashMap, HashSet, VecDeque};
use sysinfo::System;

use super::detection::{ProcessMatcher, ProcessView};
use super::TargetProcess;

/// Current process plus its ancestors and descendants.
///
/// Never signalled, so a launcher that started this tool survives a close.
pub(crate) fn get_self_family_pids(system: &System) -> HashSet<u32> {
    let current_pid = std::process::id();
    let mut family_pids = HashSet::new();
    let _ = family_pids.insert(current_pid);

    let mut next_pid = current_pid;
    for _ in 0..10 {
        let Some(parent) =
            system.process(sysinfo::Pid::from_u32(next_pid)).and_then(sysinfo::Process::parent)
        else {
            break;
        };
        let parent_id = parent.as_u32();
        if !family_pids.insert(parent_id) {
            break;
        }
        next_pid = parent_id;
    }

    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for (pid, process) in system.processes() {
        if let Some(parent) = process.parent() {
            children.entry(parent.as_u32()).or_default().push(pid.as_u32());
        }
    }

    let mut queue = VecDeque::from([current_pid]);
    while let Some(pid) = queue.pop_front() {
        for &child in children.get(&pid).map(Vec::as_slice).unwrap_or_default() {
            if family_pids.insert(child) {
                queue.push_back(child);
            }
        }
    }

    family_pids
}

/// PIDs of every main target process, excluding this tool's family.
pub(crate) fn get_target_pids(target: &TargetProcess) -> Vec<u32> {
    let mut system = System::new();
    let _ = system.refresh_processes(sysinfo::ProcessesToUpdate::All);

    let family_pids = get_self_family_pids(&system);
    let matcher = ProcessMatcher::new(target);

    let mut pids: Vec<u32> = system
        .processes()
        .iter()
        .filter_map(|(pid, process)| {
            let pid = pid.as_u32();
            if family_pids.contains(&pid) {
                return None;
            }
            let view = ProcessView::of(process);
            (!matcher.is_self(pid, &view) && matcher.is_main_target(&view)).then_some(pid)
        })
        .collect();
    pids.sort_unstable();

    if !pids.is_empty() {
        tracing::info!(product = %target.product, ?pids, "target_processes_found");
    }
    pids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_family_contains_current_pid() {
        let mut system = System::new();
        let _ = system.refresh_processes(sysinfo::ProcessesToUpdate::All);
        let family = get_self_family_pids(&system);
        assert!(family.contains(&std::process::id()));
    }

    #[test]
    fn test_unknown_product_has_no_pids() {
        assert!(get_target_pids(&TargetProcess::new("agswitch-no-such-product-7f3a")).is_empty());
    }
}

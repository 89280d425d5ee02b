// ABOUTME: Process liveness checks for stale lock detection.
// ABOUTME: SystemProcessFinder queries the OS process table through sysinfo.

use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};

pub trait ProcessFinder: Send + Sync {
    fn is_running(&self, process_id: u32) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessFinder;

impl ProcessFinder for SystemProcessFinder {
    fn is_running(&self, process_id: u32) -> bool {
        let pid = Pid::from_u32(process_id);
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        system
            .process(pid)
            .is_some_and(|p| !matches!(p.status(), ProcessStatus::Zombie | ProcessStatus::Dead))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_process_is_running() {
        assert!(SystemProcessFinder.is_running(std::process::id()));
    }

    #[test]
    fn unused_pid_is_not_running() {
        assert!(!SystemProcessFinder.is_running(u32::MAX - 1));
    }
}

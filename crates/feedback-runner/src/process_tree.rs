//! Best-effort teardown of a process and all of its descendants
//!
//! The algorithm only needs three platform capabilities: list the children of
//! a PID, force-kill a PID, and ask a PID to terminate. They sit behind
//! [`ProcessTable`] so the ordering can be tested without real processes;
//! [`SystemProcessTable`] provides them through `sysinfo`.

use std::collections::{HashSet, VecDeque};

use sysinfo::{Pid, ProcessStatus as SysProcessStatus, ProcessesToUpdate, Signal, System};

use feedback_core::prelude::*;

/// Process enumeration and signalling needed to tear down a tree
#[cfg_attr(test, mockall::automock)]
pub trait ProcessTable {
    /// Reload the process list from the OS
    fn refresh(&mut self);

    /// Direct children of `pid`
    fn children(&self, pid: u32) -> Vec<u32>;

    /// Forcefully kill `pid`. Returns `false` when the kill could not be delivered.
    fn kill(&self, pid: u32) -> bool;

    /// Ask `pid` to terminate gracefully.
    fn terminate(&self, pid: u32) -> bool;

    /// Whether `pid` still exists and is not a zombie
    fn is_alive(&self, pid: u32) -> bool;
}

/// What happened during a tree kill
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KillReport {
    /// PIDs that accepted the forceful kill
    pub killed: Vec<u32>,
    /// PIDs whose kill failed (usually already gone)
    pub failed: Vec<u32>,
    /// PIDs still alive after the kill pass that were sent a graceful terminate
    pub terminated: Vec<u32>,
}

/// All descendants of `root`, breadth first, excluding `root` itself
pub fn descendants<T: ProcessTable + ?Sized>(table: &T, root: u32) -> Vec<u32> {
    let mut seen = HashSet::from([root]);
    let mut queue = VecDeque::from([root]);
    let mut found = Vec::new();

    while let Some(pid) = queue.pop_front() {
        for child in table.children(pid) {
            // PID reuse can make the parent links cyclic
            if seen.insert(child) {
                found.push(child);
                queue.push_back(child);
            }
        }
    }

    found
}

/// Kill `root` and every descendant
///
/// Descendants are killed before the root so none of them is re-parented
/// mid-walk. Processes that survive the kill pass get a graceful terminate.
/// Individual failures are recorded in the report and never returned.
pub fn kill_tree<T: ProcessTable + ?Sized>(table: &mut T, root: u32) -> KillReport {
    table.refresh();

    let mut report = KillReport::default();
    let mut attempted = Vec::new();

    for pid in descendants(table, root) {
        if table.kill(pid) {
            report.killed.push(pid);
            attempted.push(pid);
        } else {
            debug!("Failed to kill descendant process {}", pid);
            report.failed.push(pid);
        }
    }

    if table.kill(root) {
        report.killed.push(root);
    } else {
        debug!("Failed to kill root process {}", root);
        report.failed.push(root);
    }
    attempted.push(root);

    table.refresh();
    for pid in attempted {
        if table.is_alive(pid) && table.terminate(pid) {
            report.terminated.push(pid);
        }
    }

    report
}

/// Kill a real process tree using the OS process table
pub fn kill_process_tree(root: u32) -> KillReport {
    let mut table = SystemProcessTable::new();
    let report = kill_tree(&mut table, root);
    debug!(
        "Killed process tree of {}: {} killed, {} failed, {} terminated",
        root,
        report.killed.len(),
        report.failed.len(),
        report.terminated.len()
    );
    report
}

/// [`ProcessTable`] backed by `sysinfo`
pub struct SystemProcessTable {
    system: System,
}

impl SystemProcessTable {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SystemProcessTable {
    fn refresh(&mut self) {
        self.system.refresh_processes(ProcessesToUpdate::All, true);
    }

    fn children(&self, pid: u32) -> Vec<u32> {
        let parent = Pid::from_u32(pid);
        self.system
            .processes()
            .iter()
            .filter(|(_, process)| process.thread_kind().is_none())
            .filter(|(_, process)| process.parent() == Some(parent))
            .map(|(child, _)| child.as_u32())
            .collect()
    }

    fn kill(&self, pid: u32) -> bool {
        match self.system.process(Pid::from_u32(pid)) {
            Some(process) => process
                .kill_with(Signal::Kill)
                .unwrap_or_else(|| process.kill()),
            None => false,
        }
    }

    fn terminate(&self, pid: u32) -> bool {
        match self.system.process(Pid::from_u32(pid)) {
            // Platforms without SIGTERM fall back to a plain kill
            Some(process) => process
                .kill_with(Signal::Term)
                .unwrap_or_else(|| process.kill()),
            None => false,
        }
    }

    fn is_alive(&self, pid: u32) -> bool {
        match self.system.process(Pid::from_u32(pid)) {
            Some(process) => !matches!(
                process.status(),
                SysProcessStatus::Zombie | SysProcessStatus::Dead
            ),
            None => false,
        }
    }
}

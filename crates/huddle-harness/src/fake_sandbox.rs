//! In-memory sandbox for mounter and runtime tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use huddle_app::{ProcessId, Sandbox};
use huddle_proto::FileTree;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Error type for the fake sandbox.
#[derive(Debug, Clone, thiserror::Error)]
#[error("fake sandbox error: {0}")]
pub struct FakeSandboxError(pub String);

#[derive(Default)]
struct SandboxState {
    mounts: Vec<FileTree>,
    spawned: Vec<(ProcessId, String)>,
    killed: Vec<ProcessId>,
    exited: Vec<ProcessId>,
    next_pid: u64,
    fail_next_spawn: bool,
}

/// Records every mount, spawn, and kill; process ids are assigned
/// sequentially starting from 1, so scripted tests can predict them.
///
/// Clones share state, letting a test keep one copy for inspection while
/// the runtime owns the other.
#[derive(Clone, Default)]
pub struct FakeSandbox {
    state: Arc<Mutex<SandboxState>>,
}

impl FakeSandbox {
    /// New sandbox with nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next spawn fail, for error-path tests.
    pub fn fail_next_spawn(&self) {
        lock(&self.state).fail_next_spawn = true;
    }

    /// Every tree that was mounted, in order.
    pub fn mounts(&self) -> Vec<FileTree> {
        lock(&self.state).mounts.clone()
    }

    /// Every spawned process with its command line, in order.
    pub fn spawned(&self) -> Vec<(ProcessId, String)> {
        lock(&self.state).spawned.clone()
    }

    /// Every killed process, in order.
    pub fn killed(&self) -> Vec<ProcessId> {
        lock(&self.state).killed.clone()
    }

    /// Record that a process terminated on its own.
    ///
    /// Exits originate outside the sandbox API, so scripted tests report
    /// them here alongside the exit event they inject.
    pub fn mark_exited(&self, process: ProcessId) {
        lock(&self.state).exited.push(process);
    }

    /// Spawned processes that neither exited nor were killed.
    pub fn live_processes(&self) -> Vec<ProcessId> {
        let state = lock(&self.state);
        state
            .spawned
            .iter()
            .map(|(pid, _)| *pid)
            .filter(|pid| !state.killed.contains(pid) && !state.exited.contains(pid))
            .collect()
    }
}

impl Sandbox for FakeSandbox {
    type Error = FakeSandboxError;

    fn mount(&mut self, tree: &FileTree) -> Result<(), FakeSandboxError> {
        lock(&self.state).mounts.push(tree.clone());
        Ok(())
    }

    fn spawn(&mut self, program: &str, args: &[&str]) -> Result<ProcessId, FakeSandboxError> {
        let mut state = lock(&self.state);
        if state.fail_next_spawn {
            state.fail_next_spawn = false;
            return Err(FakeSandboxError("spawn refused".into()));
        }
        state.next_pid += 1;
        let pid = ProcessId(state.next_pid);
        state.spawned.push((pid, format!("{program} {}", args.join(" "))));
        Ok(pid)
    }

    fn kill(&mut self, process: ProcessId) -> Result<(), FakeSandboxError> {
        lock(&self.state).killed.push(process);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pids_are_sequential_and_predictable() {
        let mut sandbox = FakeSandbox::new();
        let a = sandbox.spawn("npm", &["install"]).expect("spawn");
        let b = sandbox.spawn("npm", &["start"]).expect("spawn");
        assert_eq!(a, ProcessId(1));
        assert_eq!(b, ProcessId(2));
    }

    #[test]
    fn live_processes_excludes_killed() {
        let mut sandbox = FakeSandbox::new();
        let a = sandbox.spawn("npm", &["start"]).expect("spawn");
        let b = sandbox.spawn("npm", &["start"]).expect("spawn");
        sandbox.kill(a).expect("kill");
        assert_eq!(sandbox.live_processes(), vec![b]);
    }

    #[test]
    fn live_processes_excludes_exited() {
        let mut sandbox = FakeSandbox::new();
        let a = sandbox.spawn("npm", &["install"]).expect("spawn");
        let b = sandbox.spawn("npm", &["start"]).expect("spawn");
        sandbox.mark_exited(a);
        assert_eq!(sandbox.live_processes(), vec![b]);
    }

    #[test]
    fn clones_observe_the_same_state() {
        let sandbox = FakeSandbox::new();
        let mut worker = sandbox.clone();
        worker.mount(&FileTree::new()).expect("mount");
        assert_eq!(sandbox.mounts().len(), 1);
    }
}

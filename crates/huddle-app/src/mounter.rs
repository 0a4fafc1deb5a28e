//! Shared workspace mounter.
//!
//! Reconciles the session's file tree into a sandboxed execution
//! environment and supervises the install/run lifecycle. The sandbox
//! itself is a collaborator behind the [`Sandbox`] trait; this module only
//! decides WHAT to mount, spawn, and kill, never how.
//!
//! At most one run process is live at a time. A re-run kills the previous
//! run process before starting the next, and the server-ready notification
//! is surfaced at most once per run.

use huddle_proto::FileTree;

/// Manifest file that must exist before dependencies can be installed.
pub const MANIFEST: &str = "package.json";

/// Opaque handle to a process spawned inside the sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(pub u64);

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "proc-{}", self.0)
    }
}

/// Sandboxed execution environment for the shared workspace.
///
/// Implementations own the actual container/VM plumbing; process output,
/// exits, and server-ready signals flow back asynchronously as
/// [`crate::SandboxEvent`]s through the driver.
pub trait Sandbox {
    /// Sandbox-specific failure type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reflect the full file tree into the sandbox filesystem.
    ///
    /// Mounting is reconciliation, not execution: it must be safe to call
    /// repeatedly with successive trees.
    fn mount(&mut self, tree: &FileTree) -> Result<(), Self::Error>;

    /// Spawn a process in the workspace root.
    fn spawn(&mut self, program: &str, args: &[&str]) -> Result<ProcessId, Self::Error>;

    /// Kill a previously spawned process. Killing an already-dead process
    /// is not an error.
    fn kill(&mut self, process: ProcessId) -> Result<(), Self::Error>;
}

/// Where the install/run lifecycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Nothing installing or running.
    Idle,
    /// Dependency install in progress.
    Installing {
        /// The install process.
        process: ProcessId,
    },
    /// Run process spawned.
    Running {
        /// The run process.
        process: ProcessId,
    },
}

/// Workspace mounter failures.
#[derive(Debug, thiserror::Error)]
pub enum MounterError<E: std::error::Error + Send + Sync + 'static> {
    /// The workspace has no manifest; install cannot proceed.
    #[error("workspace has no {MANIFEST}; nothing to install")]
    MissingManifest,

    /// The install process exited nonzero.
    #[error("dependency install failed with exit code {code}")]
    InstallFailed {
        /// Install exit code.
        code: i32,
    },

    /// The sandbox collaborator failed.
    #[error("sandbox error: {0}")]
    Sandbox(#[source] E),
}

/// Supervises the sandbox side of a project session.
pub struct WorkspaceMounter<S: Sandbox> {
    sandbox: S,
    phase: RunPhase,
    /// The run process from the current or a previous cycle, if still
    /// considered live.
    active_run: Option<ProcessId>,
    /// Whether the current run already surfaced its server-ready signal.
    server_ready_fired: bool,
}

impl<S: Sandbox> WorkspaceMounter<S> {
    /// New mounter over the given sandbox.
    pub fn new(sandbox: S) -> Self {
        Self { sandbox, phase: RunPhase::Idle, active_run: None, server_ready_fired: false }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// The live run process, if any.
    pub fn active_run(&self) -> Option<ProcessId> {
        self.active_run
    }

    /// Reflect the tree into the sandbox filesystem.
    pub fn mount(&mut self, tree: &FileTree) -> Result<(), MounterError<S::Error>> {
        self.sandbox.mount(tree).map_err(MounterError::Sandbox)
    }

    /// Start an install/run cycle for the given tree.
    ///
    /// Fails with [`MounterError::MissingManifest`] before touching the
    /// sandbox when the tree has no manifest. Otherwise mounts the tree and
    /// spawns the install; the run process starts when the install exits
    /// zero (see [`process_exited`](Self::process_exited)).
    pub fn install_and_run(&mut self, tree: &FileTree) -> Result<(), MounterError<S::Error>> {
        if !tree.contains(MANIFEST) {
            return Err(MounterError::MissingManifest);
        }
        self.sandbox.mount(tree).map_err(MounterError::Sandbox)?;
        let process =
            self.sandbox.spawn("npm", &["install"]).map_err(MounterError::Sandbox)?;
        tracing::info!(%process, "dependency install started");
        self.phase = RunPhase::Installing { process };
        Ok(())
    }

    /// Handle a process exit.
    ///
    /// Exits of processes this mounter does not supervise are ignored. An
    /// install exiting zero kills the previous run process (if any) and
    /// spawns the run; an install exiting nonzero surfaces
    /// [`MounterError::InstallFailed`]. A run exit clears the active run.
    pub fn process_exited(
        &mut self,
        process: ProcessId,
        code: i32,
    ) -> Result<(), MounterError<S::Error>> {
        match self.phase {
            RunPhase::Installing { process: installing } if installing == process => {
                if code != 0 {
                    self.phase = RunPhase::Idle;
                    return Err(MounterError::InstallFailed { code });
                }
                // One live run at a time: retire the previous run before
                // spawning the next.
                if let Some(previous) = self.active_run.take() {
                    tracing::info!(process = %previous, "killing previous run");
                    self.sandbox.kill(previous).map_err(MounterError::Sandbox)?;
                }
                let run =
                    self.sandbox.spawn("npm", &["start"]).map_err(MounterError::Sandbox)?;
                tracing::info!(process = %run, "run started");
                self.phase = RunPhase::Running { process: run };
                self.active_run = Some(run);
                self.server_ready_fired = false;
                Ok(())
            },
            RunPhase::Running { process: running } if running == process => {
                tracing::info!(%process, code, "run exited");
                self.phase = RunPhase::Idle;
                self.active_run = None;
                Ok(())
            },
            _ => {
                tracing::debug!(%process, code, "exit of unsupervised process ignored");
                Ok(())
            },
        }
    }

    /// Handle a server-ready signal from the sandbox.
    ///
    /// Returns the port and URL to surface, or `None` when the signal is
    /// for a retired process or the current run already fired. A run exited
    /// before binding never surfaces a URL.
    pub fn server_ready(
        &mut self,
        process: ProcessId,
        port: u16,
        url: String,
    ) -> Option<(u16, String)> {
        if self.active_run != Some(process) {
            tracing::debug!(%process, "server-ready from retired process ignored");
            return None;
        }
        if self.server_ready_fired {
            return None;
        }
        self.server_ready_fired = true;
        tracing::info!(%process, port, "server ready");
        Some((port, url))
    }

    /// Kill the live run process, if any. Used on session shutdown.
    pub fn stop(&mut self) -> Result<(), MounterError<S::Error>> {
        if let Some(run) = self.active_run.take() {
            self.sandbox.kill(run).map_err(MounterError::Sandbox)?;
        }
        self.phase = RunPhase::Idle;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    enum Call {
        Mount(usize),
        Spawn(String),
        Kill(ProcessId),
    }

    #[derive(Default)]
    struct FakeSandbox {
        calls: Vec<Call>,
        next_pid: u64,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("fake sandbox failure")]
    struct FakeError;

    impl Sandbox for FakeSandbox {
        type Error = FakeError;

        fn mount(&mut self, tree: &FileTree) -> Result<(), FakeError> {
            self.calls.push(Call::Mount(tree.len()));
            Ok(())
        }

        fn spawn(&mut self, program: &str, args: &[&str]) -> Result<ProcessId, FakeError> {
            self.calls.push(Call::Spawn(format!("{program} {}", args.join(" "))));
            self.next_pid += 1;
            Ok(ProcessId(self.next_pid))
        }

        fn kill(&mut self, process: ProcessId) -> Result<(), FakeError> {
            self.calls.push(Call::Kill(process));
            Ok(())
        }
    }

    fn tree_with_manifest() -> FileTree {
        let mut tree = FileTree::new();
        tree.insert(MANIFEST, "{}");
        tree.insert("index.js", "console.log('hi')");
        tree
    }

    fn install_pid<S: Sandbox>(mounter: &WorkspaceMounter<S>) -> ProcessId {
        match mounter.phase() {
            RunPhase::Installing { process } => process,
            other => panic!("expected installing phase, got {other:?}"),
        }
    }

    #[test]
    fn missing_manifest_fails_before_sandbox_is_touched() {
        let mut mounter = WorkspaceMounter::new(FakeSandbox::default());
        let mut tree = FileTree::new();
        tree.insert("index.js", "x");

        let err = mounter.install_and_run(&tree);
        assert!(matches!(err, Err(MounterError::MissingManifest)));
        assert!(mounter.sandbox.calls.is_empty());
        assert_eq!(mounter.phase(), RunPhase::Idle);
    }

    #[test]
    fn install_then_run_on_zero_exit() {
        let mut mounter = WorkspaceMounter::new(FakeSandbox::default());
        mounter.install_and_run(&tree_with_manifest()).expect("install starts");
        let install = install_pid(&mounter);

        mounter.process_exited(install, 0).expect("run starts");
        assert!(matches!(mounter.phase(), RunPhase::Running { .. }));
        assert_eq!(
            mounter.sandbox.calls,
            vec![
                Call::Mount(2),
                Call::Spawn("npm install".into()),
                Call::Spawn("npm start".into()),
            ]
        );
    }

    #[test]
    fn failed_install_never_spawns_run() {
        let mut mounter = WorkspaceMounter::new(FakeSandbox::default());
        mounter.install_and_run(&tree_with_manifest()).expect("install starts");
        let install = install_pid(&mounter);

        let err = mounter.process_exited(install, 1);
        assert!(matches!(err, Err(MounterError::InstallFailed { code: 1 })));
        assert_eq!(mounter.phase(), RunPhase::Idle);
        assert!(mounter.active_run().is_none());
        assert!(!mounter.sandbox.calls.contains(&Call::Spawn("npm start".into())));
    }

    #[test]
    fn rerun_kills_previous_run_first() {
        let mut mounter = WorkspaceMounter::new(FakeSandbox::default());
        mounter.install_and_run(&tree_with_manifest()).expect("install starts");
        mounter.process_exited(install_pid(&mounter), 0).expect("first run");
        let first_run = mounter.active_run().expect("first run live");

        mounter.install_and_run(&tree_with_manifest()).expect("reinstall starts");
        mounter.process_exited(install_pid(&mounter), 0).expect("second run");
        let second_run = mounter.active_run().expect("second run live");

        assert_ne!(first_run, second_run);
        let kill_pos = mounter
            .sandbox
            .calls
            .iter()
            .position(|c| *c == Call::Kill(first_run))
            .expect("previous run killed");
        let spawn_pos = mounter
            .sandbox
            .calls
            .iter()
            .rposition(|c| *c == Call::Spawn("npm start".into()))
            .expect("second run spawned");
        assert!(kill_pos < spawn_pos, "kill must precede the new spawn");
    }

    #[test]
    fn server_ready_fires_at_most_once_per_run() {
        let mut mounter = WorkspaceMounter::new(FakeSandbox::default());
        mounter.install_and_run(&tree_with_manifest()).expect("install starts");
        mounter.process_exited(install_pid(&mounter), 0).expect("run starts");
        let run = mounter.active_run().expect("run live");

        let first = mounter.server_ready(run, 3000, "http://host:3000".into());
        assert_eq!(first, Some((3000, "http://host:3000".into())));
        assert!(mounter.server_ready(run, 3000, "http://host:3000".into()).is_none());

        // A new run cycle re-arms the signal.
        mounter.install_and_run(&tree_with_manifest()).expect("reinstall");
        mounter.process_exited(install_pid(&mounter), 0).expect("rerun");
        let rerun = mounter.active_run().expect("rerun live");
        assert!(mounter.server_ready(rerun, 3000, "http://host:3000".into()).is_some());
    }

    #[test]
    fn ready_from_retired_process_is_ignored() {
        let mut mounter = WorkspaceMounter::new(FakeSandbox::default());
        mounter.install_and_run(&tree_with_manifest()).expect("install starts");
        mounter.process_exited(install_pid(&mounter), 0).expect("run starts");
        let old_run = mounter.active_run().expect("run live");

        mounter.install_and_run(&tree_with_manifest()).expect("reinstall");
        mounter.process_exited(install_pid(&mounter), 0).expect("rerun");

        // Late ready from the killed run must not surface.
        assert!(mounter.server_ready(old_run, 3000, "http://host:3000".into()).is_none());
    }

    #[test]
    fn run_exit_before_bind_clears_active_run() {
        let mut mounter = WorkspaceMounter::new(FakeSandbox::default());
        mounter.install_and_run(&tree_with_manifest()).expect("install starts");
        mounter.process_exited(install_pid(&mounter), 0).expect("run starts");
        let run = mounter.active_run().expect("run live");

        mounter.process_exited(run, 1).expect("exit handled");
        assert_eq!(mounter.phase(), RunPhase::Idle);
        assert!(mounter.active_run().is_none());
        // A ready signal racing the exit does not surface.
        assert!(mounter.server_ready(run, 3000, "http://host:3000".into()).is_none());
    }

    #[test]
    fn stop_kills_live_run() {
        let mut mounter = WorkspaceMounter::new(FakeSandbox::default());
        mounter.install_and_run(&tree_with_manifest()).expect("install starts");
        mounter.process_exited(install_pid(&mounter), 0).expect("run starts");
        let run = mounter.active_run().expect("run live");

        mounter.stop().expect("stop");
        assert!(mounter.sandbox.calls.contains(&Call::Kill(run)));
        assert_eq!(mounter.phase(), RunPhase::Idle);
    }
}

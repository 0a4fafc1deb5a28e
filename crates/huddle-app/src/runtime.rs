//! Generic runtime for session orchestration.
//!
//! The Runtime drives the session event loop, coordinating between:
//! - [`SessionStore`]: room state machine
//! - [`Bridge`]: channel clients and envelope translation
//! - [`WorkspaceMounter`]: sandbox supervision
//! - [`Driver`]: platform-specific I/O
//!
//! Events are processed one at a time to completion, so the room's
//! single-consumer ordering holds end to end: no state transition is
//! observed half-applied, and per-namespace envelope FIFO is preserved.

use huddle_core::Environment;

use crate::{
    action::AppAction,
    bridge::Bridge,
    driver::Driver,
    event::{AppEvent, SandboxEvent, UserIntent},
    mounter::{Sandbox, WorkspaceMounter},
    store::SessionStore,
};

/// Generic runtime that orchestrates store, bridge, mounter, and driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `E`: Environment for time and randomness
/// - `S`: Sandboxed execution environment
pub struct Runtime<D, E, S>
where
    D: Driver,
    E: Environment,
    S: Sandbox,
{
    driver: D,
    store: SessionStore<E>,
    bridge: Bridge<E>,
    mounter: WorkspaceMounter<S>,
}

impl<D, E, S> Runtime<D, E, S>
where
    D: Driver,
    E: Environment,
    S: Sandbox,
{
    /// Create a new runtime with the given collaborators.
    pub fn new(driver: D, store: SessionStore<E>, bridge: Bridge<E>, sandbox: S) -> Self {
        Self { driver, store, bridge, mounter: WorkspaceMounter::new(sandbox) }
    }

    /// Run the main event loop.
    ///
    /// Connects the channels, issues the room's initial fetches, then
    /// processes events until a quit intent arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(&mut self) -> Result<(), D::Error> {
        let user_id = self.store.local_user().id.clone();
        let room = self.store.room().clone();
        self.bridge.connect(user_id, &room);

        let actions = self.store.enter();
        self.process_actions(actions).await?;

        loop {
            if self.process_cycle().await? {
                break;
            }
        }

        if let Err(error) = self.mounter.stop() {
            tracing::warn!(%error, "sandbox teardown failed");
        }
        self.bridge.disconnect();
        self.driver.stop();
        Ok(())
    }

    /// Process one cycle of the event loop.
    ///
    /// Returns `true` if the session should quit.
    async fn process_cycle(&mut self) -> Result<bool, D::Error> {
        if let Some(event) = self.driver.poll_event().await? {
            if self.dispatch(event).await? {
                return Ok(true);
            }
        }

        if let Some((namespace, envelope)) = self.driver.recv_envelope().await {
            match self.bridge.handle_envelope(namespace, &envelope) {
                Ok(events) => {
                    for event in events {
                        if self.dispatch(event).await? {
                            return Ok(true);
                        }
                    }
                },
                Err(error) => {
                    // Malformed or unknown traffic never tears the session
                    // down; it is logged and dropped.
                    tracing::warn!(?namespace, %error, "inbound envelope rejected");
                },
            }
        }

        Ok(false)
    }

    /// Route one event to its owner and execute the resulting actions.
    ///
    /// Returns `true` if should quit.
    async fn dispatch(&mut self, event: AppEvent) -> Result<bool, D::Error> {
        match event {
            AppEvent::Intent(UserIntent::Quit) => return Ok(true),
            AppEvent::Intent(UserIntent::InstallAndRun) => {
                if let Err(error) = self.mounter.install_and_run(self.store.file_tree()) {
                    self.driver.notify(crate::Severity::Error, &error.to_string());
                }
            },
            AppEvent::Sandbox(sandbox_event) => self.handle_sandbox(sandbox_event),
            AppEvent::Channel(transition) => {
                let events = self.bridge.handle_transition(transition);
                for event in events {
                    let actions = self.store.handle(event);
                    self.process_actions(actions).await?;
                }
            },
            other => {
                let actions = self.store.handle(other);
                self.process_actions(actions).await?;
            },
        }
        Ok(false)
    }

    fn handle_sandbox(&mut self, event: SandboxEvent) {
        match event {
            SandboxEvent::Output { process, chunk } => {
                tracing::debug!(%process, bytes = chunk.len(), "process output");
            },
            SandboxEvent::Exited { process, code } => {
                if let Err(error) = self.mounter.process_exited(process, code) {
                    self.driver.notify(crate::Severity::Error, &error.to_string());
                }
            },
            SandboxEvent::ServerReady { process, port, url } => {
                if let Some((port, url)) = self.mounter.server_ready(process, port, url) {
                    self.driver.server_ready(port, &url);
                }
            },
        }
    }

    /// Execute actions produced by the store.
    async fn process_actions(&mut self, actions: Vec<AppAction>) -> Result<(), D::Error> {
        for action in actions {
            match action {
                AppAction::Broadcast(event) => {
                    match self.bridge.broadcast(event) {
                        // Guarded no-op: the channel is not usable yet and
                        // the send is dropped by contract.
                        Ok(false) => tracing::debug!("broadcast dropped, channel not ready"),
                        Ok(true) => {},
                        Err(error) => tracing::warn!(%error, "broadcast failed"),
                    }
                    self.flush_outgoing().await?;
                },
                AppAction::Rest(request) => self.driver.execute_rest(request).await?,
                AppAction::Mount(tree) => {
                    if let Err(error) = self.mounter.mount(&tree) {
                        self.driver.notify(crate::Severity::Error, &error.to_string());
                    }
                },
                AppAction::PreserveScroll { prepended } => {
                    self.driver.preserve_scroll(prepended);
                },
                AppAction::Notify { severity, text } => self.driver.notify(severity, &text),
                AppAction::Render => self.driver.render(&self.store.view())?,
            }
        }
        Ok(())
    }

    /// Flush queued outbound envelopes to the wire, in send order.
    async fn flush_outgoing(&mut self) -> Result<(), D::Error> {
        for (context, envelope) in self.bridge.take_outgoing() {
            self.driver.send_envelope(&context, envelope).await?;
        }
        Ok(())
    }

    /// The session store, for inspection.
    pub fn store(&self) -> &SessionStore<E> {
        &self.store
    }

    /// The workspace mounter, for inspection.
    pub fn mounter(&self) -> &WorkspaceMounter<S> {
        &self.mounter
    }
}

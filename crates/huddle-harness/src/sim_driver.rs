//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` plays the role a browser frontend plays in production:
//! it feeds events and broker envelopes into the session and records
//! everything the runtime asks it to do. It implements
//! [`huddle_app::Driver`], so the same [`huddle_app::Runtime`]
//! orchestration code runs in production and in simulation.
//!
//! Tests hold a [`SimHandle`] (a clone of the driver's shared state) to
//! inject input before or during a run and to inspect the recorded output
//! afterwards.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use std::time::Duration;

use huddle_app::{AppEvent, Driver, RestRequest, SessionView, Severity};
use huddle_client::RoomContext;
use huddle_proto::{Envelope, Namespace};

use crate::SimEnv;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Error type for the simulation driver.
#[derive(Debug, Clone, thiserror::Error)]
#[error("sim driver error: {0}")]
pub struct SimDriverError(pub String);

/// One scripted input: an event, or a virtual-time jump that lands as a
/// tick once the clock has moved.
enum SimInput {
    Event(AppEvent),
    Advance(Duration),
}

#[derive(Default)]
struct SimState {
    pending: VecDeque<SimInput>,
    incoming_envelopes: VecDeque<(Namespace, Envelope)>,
    sent_envelopes: Vec<(RoomContext, Envelope)>,
    rest_requests: Vec<RestRequest>,
    notifications: Vec<(Severity, String)>,
    scroll_anchors: Vec<usize>,
    ready_servers: Vec<(u16, String)>,
    views: Vec<SessionView>,
    stopped: bool,
}

/// Shared handle for injecting input and inspecting recorded output.
#[derive(Clone)]
pub struct SimHandle {
    state: Arc<Mutex<SimState>>,
}

impl SimHandle {
    /// Queue an event for the runtime to poll.
    pub fn inject_event(&self, event: AppEvent) {
        lock(&self.state).pending.push_back(SimInput::Event(event));
    }

    /// Queue an inbound broker envelope.
    pub fn inject_envelope(&self, namespace: Namespace, envelope: Envelope) {
        lock(&self.state).incoming_envelopes.push_back((namespace, envelope));
    }

    /// Queue a tick.
    pub fn inject_tick(&self) {
        lock(&self.state).pending.push_back(SimInput::Event(AppEvent::Tick));
    }

    /// Queue a virtual-time jump. When the runtime polls it, the shared
    /// clock advances by `by` and the runtime observes a tick.
    pub fn advance_and_tick(&self, by: Duration) {
        lock(&self.state).pending.push_back(SimInput::Advance(by));
    }

    /// Envelopes the runtime flushed to the wire, in send order.
    pub fn sent_envelopes(&self) -> Vec<(RoomContext, Envelope)> {
        lock(&self.state).sent_envelopes.clone()
    }

    /// REST requests the runtime started, in issue order.
    pub fn rest_requests(&self) -> Vec<RestRequest> {
        lock(&self.state).rest_requests.clone()
    }

    /// Notifications shown to the user.
    pub fn notifications(&self) -> Vec<(Severity, String)> {
        lock(&self.state).notifications.clone()
    }

    /// Scroll-anchor requests, one per history prepend.
    pub fn scroll_anchors(&self) -> Vec<usize> {
        lock(&self.state).scroll_anchors.clone()
    }

    /// Server-ready surfacings (port, url).
    pub fn ready_servers(&self) -> Vec<(u16, String)> {
        lock(&self.state).ready_servers.clone()
    }

    /// The most recently rendered view, if any render happened.
    pub fn last_view(&self) -> Option<SessionView> {
        lock(&self.state).views.last().cloned()
    }

    /// Number of renders performed.
    pub fn render_count(&self) -> usize {
        lock(&self.state).views.len()
    }

    /// Whether the runtime stopped the driver.
    pub fn stopped(&self) -> bool {
        lock(&self.state).stopped
    }

    /// True while injected input remains unconsumed.
    pub fn has_pending(&self) -> bool {
        let state = lock(&self.state);
        !state.pending.is_empty() || !state.incoming_envelopes.is_empty()
    }
}

/// Simulation driver for deterministic session tests.
pub struct SimDriver {
    state: Arc<Mutex<SimState>>,
    env: SimEnv,
}

impl SimDriver {
    /// New driver over the session's environment, plus the handle tests
    /// use to script it. The environment must be the same one the store
    /// uses, or virtual-time jumps will not be observed.
    pub fn new(env: SimEnv) -> (Self, SimHandle) {
        let state = Arc::new(Mutex::new(SimState::default()));
        (Self { state: Arc::clone(&state), env }, SimHandle { state })
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        let input = lock(&self.state).pending.pop_front();
        Ok(match input {
            Some(SimInput::Event(event)) => Some(event),
            Some(SimInput::Advance(by)) => {
                self.env.advance(by);
                Some(AppEvent::Tick)
            },
            None => None,
        })
    }

    async fn recv_envelope(&mut self) -> Option<(Namespace, Envelope)> {
        lock(&self.state).incoming_envelopes.pop_front()
    }

    async fn send_envelope(
        &mut self,
        context: &RoomContext,
        envelope: Envelope,
    ) -> Result<(), Self::Error> {
        lock(&self.state).sent_envelopes.push((context.clone(), envelope));
        Ok(())
    }

    async fn execute_rest(&mut self, request: RestRequest) -> Result<(), Self::Error> {
        lock(&self.state).rest_requests.push(request);
        Ok(())
    }

    fn notify(&mut self, severity: Severity, text: &str) {
        lock(&self.state).notifications.push((severity, text.to_string()));
    }

    fn preserve_scroll(&mut self, prepended: usize) {
        lock(&self.state).scroll_anchors.push(prepended);
    }

    fn server_ready(&mut self, port: u16, url: &str) {
        lock(&self.state).ready_servers.push((port, url.to_string()));
    }

    fn render(&mut self, view: &SessionView) -> Result<(), Self::Error> {
        lock(&self.state).views.push(view.clone());
        Ok(())
    }

    fn stop(&mut self) {
        lock(&self.state).stopped = true;
    }
}

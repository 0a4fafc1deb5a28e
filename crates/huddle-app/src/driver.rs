//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the session runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::future::Future;

use huddle_client::RoomContext;
use huddle_proto::{Envelope, Namespace};

use crate::{
    action::{RestRequest, Severity},
    event::AppEvent,
    state::SessionView,
};

/// Abstracts I/O operations for the session runtime.
///
/// Implementations own the broker sockets, the REST client, and the UI
/// surface; the generic [`Runtime`](crate::Runtime) handles orchestration,
/// so the same loop runs against the live broker and in simulation.
///
/// REST requests are fire-and-forget from the runtime's perspective:
/// `execute_rest` starts the call, and the completion comes back later as
/// an [`AppEvent::Rest`] through `poll_event`, carrying the request's tag.
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Poll for the next input event.
    ///
    /// Covers user intents, ticks, transport transitions, REST
    /// completions, and sandbox notifications. Returns `None` when no
    /// event is ready.
    fn poll_event(&mut self) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send;

    /// Receive the next inbound envelope from the broker.
    ///
    /// Returns `None` when no envelope is ready. Per-namespace arrival
    /// order must be preserved.
    fn recv_envelope(&mut self) -> impl Future<Output = Option<(Namespace, Envelope)>> + Send;

    /// Send an envelope on a room channel connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed or the send fails.
    fn send_envelope(
        &mut self,
        context: &RoomContext,
        envelope: Envelope,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Start a REST request. The completion returns through
    /// [`poll_event`](Self::poll_event).
    ///
    /// # Errors
    ///
    /// Returns an error only when the request cannot be started at all;
    /// request-level failures come back as [`crate::RestResult`] events.
    fn execute_rest(
        &mut self,
        request: RestRequest,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Show a transient notification.
    fn notify(&mut self, severity: Severity, text: &str);

    /// Keep the previously-visible message anchored after `prepended`
    /// older messages were inserted above it.
    fn preserve_scroll(&mut self, prepended: usize);

    /// Surface the running workspace server to the UI.
    fn server_ready(&mut self, port: u16, url: &str);

    /// Render the session view.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, view: &SessionView) -> Result<(), Self::Error>;

    /// Stop the connections and clean up resources.
    fn stop(&mut self);
}

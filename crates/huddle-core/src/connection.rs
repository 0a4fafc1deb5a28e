//! Channel connection state machine.
//!
//! Tracks the lifecycle of one broker connection. Pure state machine: the
//! driver owns the socket and feeds transitions in; sends are guarded here
//! so a send issued before the connection is usable is a no-op rather than
//! an error or a buffered write.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ begin_connect ┌────────────┐ established ┌───────────┐ activate ┌────────┐
//! │ Idle │──────────────>│ Connecting │────────────>│ Connected │─────────>│ Active │
//! └──────┘               └────────────┘             └───────────┘          └────────┘
//!    ^                        ^    ^                      │   │ fail           │
//!    │                        │    └──── reconnecting ────┴────────────────────┤
//!    │                        │                               v                │
//!    │                   ┌────────┐                      ┌────────┐   leave    │
//!    └───────────────────│ (same) │                      │ Error  │<── fail ───┤
//!          leave         └────────┘                      └────────┘            v
//!                                                                          ┌──────┐
//!                                                                          │ Idle │
//!                                                                          └──────┘
//! ```
//!
//! Transport-level retry is delegated: `reconnecting` models the underlying
//! transport re-establishing on its own, and sends issued meanwhile are
//! dropped (never enqueued), matching the caller-side no-op contract.

use std::{ops::Sub, time::Duration};

use huddle_proto::Envelope;

use crate::error::ConnectionError;

/// Connection lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection; initial state and the state after an explicit leave.
    Idle,
    /// Transport is establishing (initial connect or delegated reconnect).
    Connecting,
    /// Connected and authenticated; room not yet in use.
    Connected,
    /// Connected and actively serving a room view.
    Active,
    /// Failed; usable only after an explicit reset. Degraded, not fatal.
    Error {
        /// Human-readable failure reason.
        reason: String,
    },
}

impl ConnectionState {
    /// Short name for logs.
    fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Active => "active",
            Self::Error { .. } => "error",
        }
    }
}

/// State machine for one broker connection.
///
/// Generic over `I` (instant type) to support virtual time in simulation.
#[derive(Debug, Clone)]
pub struct ChannelConnection<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    state: ConnectionState,
    /// When the current state was entered.
    entered_at: I,
}

impl<I> ChannelConnection<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// New connection in `Idle`.
    pub fn new(now: I) -> Self {
        Self { state: ConnectionState::Idle, entered_at: now }
    }

    /// Current state.
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// How long the connection has been in its current state.
    pub fn time_in_state(&self, now: I) -> Duration {
        now - self.entered_at
    }

    /// True when sends reach the wire (`Connected` or `Active`).
    pub fn can_send(&self) -> bool {
        matches!(self.state, ConnectionState::Connected | ConnectionState::Active)
    }

    /// Start establishing the transport. `Idle` only.
    pub fn begin_connect(&mut self, now: I) -> Result<(), ConnectionError> {
        match self.state {
            ConnectionState::Idle => {
                self.transition(ConnectionState::Connecting, now);
                Ok(())
            },
            _ => Err(self.invalid("begin_connect")),
        }
    }

    /// Transport established. `Connecting` only.
    pub fn established(&mut self, now: I) -> Result<(), ConnectionError> {
        match self.state {
            ConnectionState::Connecting => {
                self.transition(ConnectionState::Connected, now);
                Ok(())
            },
            _ => Err(self.invalid("established")),
        }
    }

    /// Room view attached; connection now serves live traffic.
    pub fn activate(&mut self, now: I) -> Result<(), ConnectionError> {
        match self.state {
            ConnectionState::Connected => {
                self.transition(ConnectionState::Active, now);
                Ok(())
            },
            _ => Err(self.invalid("activate")),
        }
    }

    /// Transport dropped and is retrying on its own.
    ///
    /// Valid from `Connected` and `Active`. Outbound sends issued while in
    /// `Connecting` are not enqueued.
    pub fn reconnecting(&mut self, now: I) -> Result<(), ConnectionError> {
        match self.state {
            ConnectionState::Connected | ConnectionState::Active => {
                self.transition(ConnectionState::Connecting, now);
                Ok(())
            },
            _ => Err(self.invalid("reconnecting")),
        }
    }

    /// Record a connection failure. Valid from any state; degraded, not
    /// fatal — the session stays usable offline.
    pub fn fail(&mut self, reason: impl Into<String>, now: I) {
        let reason = reason.into();
        tracing::warn!(reason = %reason, "channel connection failed");
        self.transition(ConnectionState::Error { reason }, now);
    }

    /// Explicit leave: release the connection. Valid from `Connected`,
    /// `Active`, and `Error` (recovery path).
    pub fn leave(&mut self, now: I) -> Result<(), ConnectionError> {
        match self.state {
            ConnectionState::Connected
            | ConnectionState::Active
            | ConnectionState::Error { .. } => {
                self.transition(ConnectionState::Idle, now);
                Ok(())
            },
            _ => Err(self.invalid("leave")),
        }
    }

    /// Guard an outbound envelope against the current state.
    ///
    /// Returns the envelope when the connection can carry it, `None`
    /// otherwise. A `None` is a silent no-op by contract (the UI may race
    /// connection setup); it is logged at debug level only.
    pub fn guard_send(&self, envelope: Envelope) -> Option<Envelope> {
        if self.can_send() {
            Some(envelope)
        } else {
            tracing::debug!(
                state = self.state.name(),
                event = %envelope.event,
                "send dropped: connection not ready"
            );
            None
        }
    }

    fn transition(&mut self, next: ConnectionState, now: I) {
        tracing::debug!(from = self.state.name(), to = next.name(), "connection transition");
        self.state = next;
        self.entered_at = now;
    }

    fn invalid(&self, operation: &str) -> ConnectionError {
        ConnectionError::InvalidTransition {
            state: self.state.name(),
            operation: operation.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn envelope() -> Envelope {
        Envelope { event: "typing".into(), payload: serde_json::Value::Null }
    }

    fn connected() -> ChannelConnection<Instant> {
        let now = Instant::now();
        let mut conn = ChannelConnection::new(now);
        let _ = conn.begin_connect(now);
        let _ = conn.established(now);
        conn
    }

    #[test]
    fn happy_path_reaches_active() {
        let now = Instant::now();
        let mut conn = ChannelConnection::new(now);
        assert!(conn.begin_connect(now).is_ok());
        assert!(conn.established(now).is_ok());
        assert!(conn.activate(now).is_ok());
        assert_eq!(conn.state(), &ConnectionState::Active);
    }

    #[test]
    fn send_while_connecting_is_dropped() {
        let now = Instant::now();
        let mut conn = ChannelConnection::new(now);
        let _ = conn.begin_connect(now);
        assert!(conn.guard_send(envelope()).is_none());
    }

    #[test]
    fn send_while_connected_passes() {
        let conn = connected();
        assert!(conn.guard_send(envelope()).is_some());
    }

    #[test]
    fn reconnect_returns_to_connecting_and_drops_sends() {
        let now = Instant::now();
        let mut conn = connected();
        let _ = conn.activate(now);
        assert!(conn.reconnecting(now).is_ok());
        assert_eq!(conn.state(), &ConnectionState::Connecting);
        assert!(conn.guard_send(envelope()).is_none());
    }

    #[test]
    fn leave_returns_to_idle() {
        let now = Instant::now();
        let mut conn = connected();
        let _ = conn.activate(now);
        assert!(conn.leave(now).is_ok());
        assert_eq!(conn.state(), &ConnectionState::Idle);
        // A fresh connect is allowed after leave.
        assert!(conn.begin_connect(now).is_ok());
    }

    #[test]
    fn connect_from_connected_is_invalid() {
        let now = Instant::now();
        let mut conn = connected();
        assert!(matches!(
            conn.begin_connect(now),
            Err(ConnectionError::InvalidTransition { operation, .. }) if operation == "begin_connect"
        ));
    }

    #[test]
    fn failure_is_recoverable_via_leave() {
        let now = Instant::now();
        let mut conn = connected();
        conn.fail("auth rejected", now);
        assert!(matches!(conn.state(), ConnectionState::Error { .. }));
        assert!(conn.guard_send(envelope()).is_none());
        assert!(conn.leave(now).is_ok());
    }
}

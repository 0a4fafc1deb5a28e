//! Observable session state types.
//!
//! These structures are the "view model" for a room: the subset of session
//! state a frontend needs to render, without exposing the channel or store
//! internals.

use std::collections::BTreeSet;

use huddle_proto::{CorrelationId, RoomId, UserId};

/// High-level connection state of the room's channel, for UI feedback.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// Not connected.
    #[default]
    Disconnected,
    /// Transport establishing (initial connect or delegated reconnect).
    Connecting,
    /// Live.
    Connected,
    /// Channel failed; session usable offline until rejoin.
    Degraded {
        /// Failure description.
        reason: String,
    },
}

/// Delivery state of one message as seen by the local user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    /// Optimistic local append, not yet confirmed by backend or echo.
    Pending,
    /// Confirmed by the backend or by the broker echo.
    Confirmed,
}

/// A message in the room's ordered list.
///
/// Append-only within a room; never mutated after insertion except for
/// confirmation, which replaces the locally-synthesized identity with the
/// server-confirmed one in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Backend-assigned id. `None` while the send is pending.
    pub id: Option<String>,
    /// Client-generated correlation id; the dedupe key for echoes.
    pub correlation: CorrelationId,
    /// Sender's user id.
    pub sender_id: UserId,
    /// Sender's display name.
    pub sender_name: String,
    /// Message text.
    pub body: String,
    /// Creation time (ms since epoch). `None` until confirmed.
    pub created_at: Option<u64>,
    /// Delivery state.
    pub delivery: DeliveryState,
}

/// Render snapshot of one session, passed to [`crate::Driver::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    /// Which room this session serves.
    pub room: RoomId,
    /// Channel connection state.
    pub connection: ConnectionStatus,
    /// Messages, oldest first.
    pub messages: Vec<Message>,
    /// Peers currently showing a typing indicator.
    pub typing_peers: BTreeSet<UserId>,
    /// Online users (process-wide roster mirror).
    pub online_users: BTreeSet<UserId>,
    /// Sorted file paths of the shared workspace (project rooms).
    pub file_paths: Vec<String>,
    /// Whether older pages remain to fetch.
    pub has_more: bool,
    /// Whether a page fetch is in flight.
    pub loading_page: bool,
}

//! Presence channel client.
//!
//! Maintains exactly one broker connection per authenticated session and
//! holds the process-wide presence roster: the one piece of state shared
//! read-only across all room views, with this client as its single writer.
//!
//! The connection is an explicitly owned field rather than a module-level
//! singleton, so teardown ordering is visible and tests cannot leak state
//! across each other.

use std::collections::BTreeSet;

use huddle_core::{ChannelConnection, Environment};
use huddle_proto::{PresenceEvent, UserId};

use crate::{SubscriptionId, error::ChannelError};

/// Opaque handle to the presence connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PresenceHandle(u64);

/// Outcome of applying one inbound presence event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceUpdate {
    /// The roster was replaced wholesale.
    RosterReplaced,
    /// A followed user's connectivity changed.
    ConnectionUpdated {
        /// The user whose connectivity changed.
        user_id: UserId,
        /// Whether the local user follows them.
        following: bool,
    },
}

type RosterCallback = Box<dyn FnMut(&BTreeSet<UserId>) + Send>;

struct RosterObserver {
    id: SubscriptionId,
    callback: RosterCallback,
}

struct PresenceSession<I>
where
    I: Copy + Ord + Send + Sync + std::ops::Sub<Output = std::time::Duration>,
{
    handle: PresenceHandle,
    user_id: UserId,
    connection: ChannelConnection<I>,
}

/// Client for the session-wide presence channel.
pub struct PresenceClient<E: Environment> {
    env: E,
    session: Option<PresenceSession<E::Instant>>,
    roster: BTreeSet<UserId>,
    observers: Vec<RosterObserver>,
    next_subscription: u64,
}

impl<E: Environment> PresenceClient<E> {
    /// New client with no connection.
    pub fn new(env: E) -> Self {
        Self {
            env,
            session: None,
            roster: BTreeSet::new(),
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Connect for the given authenticated user.
    ///
    /// Idempotent: a second call for the same user returns the existing
    /// handle without touching the transport. Connecting as a different
    /// user tears the old session down first (logout/login).
    pub fn connect(&mut self, user_id: UserId) -> PresenceHandle {
        if let Some(session) = &self.session {
            if session.user_id == user_id {
                return session.handle;
            }
            tracing::info!(
                old = %session.user_id,
                new = %user_id,
                "presence user changed, rebuilding connection"
            );
            self.session = None;
            self.roster.clear();
        }

        let now = self.env.now();
        let handle = PresenceHandle(self.env.random_u64());
        let mut connection = ChannelConnection::new(now);
        // Fresh connection starts in Idle; begin_connect cannot fail here.
        let _ = connection.begin_connect(now);
        tracing::info!(user = %user_id, "presence channel connecting");

        self.session = Some(PresenceSession { handle, user_id, connection });
        handle
    }

    /// Transport established; the channel now delivers roster events.
    pub fn established(&mut self, handle: PresenceHandle) -> Result<(), ChannelError> {
        let now = self.env.now();
        let session = self.session_mut(handle)?;
        session.connection.established(now)?;
        session.connection.activate(now)?;
        tracing::info!(user = %session.user_id, "presence channel connected");
        Ok(())
    }

    /// Record a transport failure. Non-fatal: the session stays usable in a
    /// degraded offline state; retry is delegated to the transport.
    pub fn transport_error(&mut self, handle: PresenceHandle, reason: &str) {
        let now = self.env.now();
        if let Ok(session) = self.session_mut(handle) {
            tracing::warn!(user = %session.user_id, reason, "presence channel error");
            session.connection.fail(reason, now);
        }
    }

    /// Register a roster observer. Observers are invoked synchronously, in
    /// registration order, on every roster replacement.
    pub fn on_roster_update(
        &mut self,
        callback: impl FnMut(&BTreeSet<UserId>) + Send + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push(RosterObserver { id, callback: Box::new(callback) });
        id
    }

    /// De-register an observer. Returns `false` if already removed.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| o.id != id);
        self.observers.len() != before
    }

    /// Apply one inbound presence event in delivery order.
    ///
    /// Roster events replace the entire set (last roster wins) and notify
    /// every observer before this method returns.
    pub fn apply(&mut self, event: PresenceEvent) -> PresenceUpdate {
        match event {
            PresenceEvent::OnlineUsers(users) => {
                self.roster = users.into_iter().collect();
                for observer in &mut self.observers {
                    (observer.callback)(&self.roster);
                }
                PresenceUpdate::RosterReplaced
            },
            PresenceEvent::ConnectionUpdated { user_id, following } => {
                tracing::debug!(user = %user_id, following, "connection updated");
                PresenceUpdate::ConnectionUpdated { user_id, following }
            },
        }
    }

    /// Current roster of online users.
    pub fn roster(&self) -> &BTreeSet<UserId> {
        &self.roster
    }

    /// True when the user is in the current roster.
    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.roster.contains(user_id)
    }

    /// Handle of the live connection, if any.
    pub fn handle(&self) -> Option<PresenceHandle> {
        self.session.as_ref().map(|s| s.handle)
    }

    /// Release the connection and clear the handle.
    ///
    /// A subsequent [`connect`](Self::connect) issues a fresh connection
    /// with a new handle. Returns `false` when the handle was stale.
    pub fn disconnect(&mut self, handle: PresenceHandle) -> bool {
        match &self.session {
            Some(session) if session.handle == handle => {
                tracing::info!(user = %session.user_id, "presence channel disconnected");
                self.session = None;
                self.roster.clear();
                true
            },
            _ => false,
        }
    }

    fn session_mut(
        &mut self,
        handle: PresenceHandle,
    ) -> Result<&mut PresenceSession<E::Instant>, ChannelError> {
        match &mut self.session {
            Some(session) if session.handle == handle => Ok(session),
            _ => Err(ChannelError::UnknownHandle),
        }
    }
}

//! Room channel manager.
//!
//! One connection per room namespace: all direct chats multiplex over the
//! session's chat connection, each project room gets its own connection
//! authenticated by project id. Within a connection, named events are
//! multiplexed and delivered FIFO; chat and project streams carry no
//! cross-connection ordering guarantee.
//!
//! Sends issued before the connection is usable are silently dropped (the
//! UI may race connection setup), and the subscription registry supports
//! removing a specific callback so a re-subscribing view cannot end up with
//! duplicate handlers.

use std::collections::HashMap;

use huddle_core::{ChannelConnection, Environment};
use huddle_proto::{Envelope, Namespace, ProjectId, RoomEvent, UserId};

use crate::{SubscriptionId, error::ChannelError};

/// Which room namespace a channel serves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomContext {
    /// The session-wide direct-chat namespace for this user.
    Chat {
        /// Authenticated user id.
        user_id: UserId,
    },
    /// A project collaboration room.
    Project {
        /// Project id, also the connection auth payload.
        project_id: ProjectId,
    },
}

impl RoomContext {
    /// Broker namespace this context connects to.
    pub fn namespace(&self) -> Namespace {
        match self {
            Self::Chat { .. } => Namespace::Chat,
            Self::Project { .. } => Namespace::Project,
        }
    }
}

impl std::fmt::Display for RoomContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chat { user_id } => write!(f, "chat[{user_id}]"),
            Self::Project { project_id } => write!(f, "project[{project_id}]"),
        }
    }
}

/// Opaque handle to one joined room channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomHandle(u64);

/// Subscription filter: which multiplexed event a callback wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Direct-chat message.
    UserMessage,
    /// Peer started typing.
    Typing,
    /// Peer stopped typing.
    StopTyping,
    /// Project room message.
    ProjectMessage,
}

impl EventKind {
    /// Kind of a decoded room event.
    pub fn of(event: &RoomEvent) -> Self {
        match event {
            RoomEvent::Chat(huddle_proto::ChatEvent::UserMessage(_)) => Self::UserMessage,
            RoomEvent::Chat(huddle_proto::ChatEvent::Typing { .. }) => Self::Typing,
            RoomEvent::Chat(huddle_proto::ChatEvent::StopTyping { .. }) => Self::StopTyping,
            RoomEvent::Project(huddle_proto::ProjectEvent::ProjectMessage { .. }) => {
                Self::ProjectMessage
            },
        }
    }
}

type RoomCallback = Box<dyn FnMut(&RoomEvent) + Send>;

struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    callback: RoomCallback,
}

struct Channel<I>
where
    I: Copy + Ord + Send + Sync + std::ops::Sub<Output = std::time::Duration>,
{
    handle: RoomHandle,
    connection: ChannelConnection<I>,
    subscriptions: Vec<Subscription>,
}

/// Owns every room channel of one session.
pub struct RoomChannelManager<E: Environment> {
    env: E,
    channels: HashMap<RoomContext, Channel<E::Instant>>,
    /// Reverse index from handle to owning context.
    handles: HashMap<RoomHandle, RoomContext>,
    /// Outbound envelopes awaiting a driver flush.
    outgoing: Vec<(RoomContext, Envelope)>,
    next_subscription: u64,
}

impl<E: Environment> RoomChannelManager<E> {
    /// New manager with no joined channels.
    pub fn new(env: E) -> Self {
        Self {
            env,
            channels: HashMap::new(),
            handles: HashMap::new(),
            outgoing: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Join a room namespace.
    ///
    /// Idempotent per context: joining an already-joined namespace returns
    /// the existing handle and opens no second connection.
    pub fn join(&mut self, context: RoomContext) -> RoomHandle {
        if let Some(channel) = self.channels.get(&context) {
            return channel.handle;
        }

        let now = self.env.now();
        let handle = RoomHandle(self.env.random_u64());
        let mut connection = ChannelConnection::new(now);
        let _ = connection.begin_connect(now);
        tracing::info!(room = %context, "room channel connecting");

        self.channels
            .insert(context.clone(), Channel { handle, connection, subscriptions: Vec::new() });
        self.handles.insert(handle, context);
        handle
    }

    /// Transport established for this channel; sends now reach the wire.
    pub fn established(&mut self, handle: RoomHandle) -> Result<(), ChannelError> {
        let now = self.env.now();
        let context = self.context(handle)?.clone();
        let channel = self.channel_mut(handle)?;
        channel.connection.established(now)?;
        channel.connection.activate(now)?;
        tracing::info!(room = %context, "room channel connected");
        Ok(())
    }

    /// Transport dropped and is retrying; sends are dropped meanwhile.
    pub fn reconnecting(&mut self, handle: RoomHandle) -> Result<(), ChannelError> {
        let now = self.env.now();
        let channel = self.channel_mut(handle)?;
        channel.connection.reconnecting(now)?;
        Ok(())
    }

    /// Record a transport failure for this channel.
    pub fn transport_error(&mut self, handle: RoomHandle, reason: &str) {
        let now = self.env.now();
        if let Ok(channel) = self.channel_mut(handle) {
            channel.connection.fail(reason, now);
        }
    }

    /// Send an event on a joined channel.
    ///
    /// Returns `Ok(true)` when the envelope was queued for the driver and
    /// `Ok(false)` when the connection is not yet usable — a silent no-op
    /// by contract, so a UI racing connection setup never observes an
    /// error. Errors are reserved for stale handles and encode failures.
    pub fn send(&mut self, handle: RoomHandle, event: RoomEvent) -> Result<bool, ChannelError> {
        let context = self.context(handle)?.clone();
        let envelope = event.into_envelope()?;
        let channel = self.channel_mut(handle)?;

        match channel.connection.guard_send(envelope) {
            Some(envelope) => {
                self.outgoing.push((context, envelope));
                Ok(true)
            },
            None => Ok(false),
        }
    }

    /// Register a callback for one event kind on a joined channel.
    pub fn on(
        &mut self,
        handle: RoomHandle,
        kind: EventKind,
        callback: impl FnMut(&RoomEvent) + Send + 'static,
    ) -> Result<SubscriptionId, ChannelError> {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        let channel = self.channel_mut(handle)?;
        channel.subscriptions.push(Subscription { id, kind, callback: Box::new(callback) });
        Ok(id)
    }

    /// De-register a specific callback.
    ///
    /// Returns `false` when the subscription was already gone. Views must
    /// call this on teardown; a leaked handler across re-subscriptions
    /// would double-deliver every message.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        for channel in self.channels.values_mut() {
            let before = channel.subscriptions.len();
            channel.subscriptions.retain(|s| s.id != id);
            if channel.subscriptions.len() != before {
                return true;
            }
        }
        false
    }

    /// Deliver one inbound envelope for a namespace connection.
    ///
    /// Decodes against the context's closed event set, dispatches to
    /// matching subscriptions in registration order, and returns the typed
    /// event for the caller to apply to session state. Envelopes must be
    /// fed in arrival order; delivery is synchronous so per-connection FIFO
    /// is preserved end to end.
    pub fn deliver(
        &mut self,
        context: &RoomContext,
        envelope: &Envelope,
    ) -> Result<RoomEvent, ChannelError> {
        let event = RoomEvent::from_envelope(context.namespace(), envelope)?;
        let kind = EventKind::of(&event);

        let channel = self.channels.get_mut(context).ok_or(ChannelError::UnknownHandle)?;
        for subscription in &mut channel.subscriptions {
            if subscription.kind == kind {
                (subscription.callback)(&event);
            }
        }
        Ok(event)
    }

    /// Leave a channel: release the connection and drop its subscriptions.
    pub fn leave(&mut self, handle: RoomHandle) -> Result<(), ChannelError> {
        let context = self.handles.remove(&handle).ok_or(ChannelError::UnknownHandle)?;
        let now = self.env.now();
        if let Some(mut channel) = self.channels.remove(&context) {
            // Best effort: a connection still mid-connect has nothing to
            // release on the wire.
            if channel.connection.leave(now).is_err() {
                tracing::debug!(room = %context, "left channel before connect completed");
            }
        }
        tracing::info!(room = %context, "room channel left");
        Ok(())
    }

    /// True when a channel for this context is joined.
    pub fn is_joined(&self, context: &RoomContext) -> bool {
        self.channels.contains_key(context)
    }

    /// Context a handle belongs to.
    pub fn context(&self, handle: RoomHandle) -> Result<&RoomContext, ChannelError> {
        self.handles.get(&handle).ok_or(ChannelError::UnknownHandle)
    }

    /// Take the outbound envelopes accumulated since the last flush.
    pub fn take_outgoing(&mut self) -> Vec<(RoomContext, Envelope)> {
        std::mem::take(&mut self.outgoing)
    }

    fn channel_mut(&mut self, handle: RoomHandle) -> Result<&mut Channel<E::Instant>, ChannelError> {
        let context = self.handles.get(&handle).ok_or(ChannelError::UnknownHandle)?;
        self.channels.get_mut(context).ok_or(ChannelError::UnknownHandle)
    }
}

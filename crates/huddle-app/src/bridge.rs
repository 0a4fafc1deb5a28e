//! Translation layer between broker traffic and session events.
//!
//! The bridge owns the channel clients for one session: the presence
//! connection plus the room channel the session's view needs. Inbound
//! envelopes become typed [`AppEvent`]s for the store; store-issued
//! broadcast actions become channel sends queued for the driver to flush.
//!
//! The bridge holds no message state of its own. Everything it produces is
//! derived from one inbound envelope or one action, so it can be dropped
//! and rebuilt on reconnect without loss.

use huddle_client::{
    ChannelError, EventKind, PresenceClient, PresenceHandle, PresenceUpdate,
    RoomChannelManager, RoomContext, RoomHandle,
};
use huddle_core::Environment;
use huddle_proto::{
    Envelope, Namespace, PresenceEvent, RoomEvent, RoomId, UserId,
};

use crate::{
    event::{AppEvent, ChannelTransition},
    state::ConnectionStatus,
};

/// Owns the channel clients of one session and translates between broker
/// envelopes and session events.
pub struct Bridge<E: Environment> {
    presence: PresenceClient<E>,
    rooms: RoomChannelManager<E>,
    presence_handle: Option<PresenceHandle>,
    room_handle: Option<RoomHandle>,
    room_context: Option<RoomContext>,
    /// Namespace whose transitions drive the session's connection status.
    primary: Namespace,
}

impl<E: Environment> Bridge<E> {
    /// New bridge with no connections.
    pub fn new(env: E) -> Self {
        Self {
            presence: PresenceClient::new(env.clone()),
            rooms: RoomChannelManager::new(env),
            presence_handle: None,
            room_handle: None,
            room_context: None,
            primary: Namespace::Chat,
        }
    }

    /// Open the presence connection and join the channel for `room`.
    ///
    /// Idempotent through the underlying clients: reconnecting the same
    /// user and room reuses the live handles.
    pub fn connect(&mut self, user_id: UserId, room: &RoomId) {
        self.presence_handle = Some(self.presence.connect(user_id.clone()));

        let context = match room {
            RoomId::Peer(_) => RoomContext::Chat { user_id },
            RoomId::Project(project_id) => {
                RoomContext::Project { project_id: project_id.clone() }
            },
        };
        self.primary = context.namespace();
        self.room_handle = Some(self.rooms.join(context.clone()));
        self.room_context = Some(context);
    }

    /// Apply a transport transition and derive the store-facing events.
    pub fn handle_transition(&mut self, transition: ChannelTransition) -> Vec<AppEvent> {
        match transition {
            ChannelTransition::Established(namespace) => {
                if let Err(error) = self.mark_established(namespace) {
                    tracing::warn!(%error, "establish for unknown channel");
                    return vec![];
                }
                if namespace == self.primary {
                    vec![AppEvent::ConnectionChanged(ConnectionStatus::Connected)]
                } else {
                    vec![]
                }
            },
            ChannelTransition::Reconnecting(namespace) => {
                if self.room_serves(namespace) {
                    if let Some(handle) = self.room_handle
                        && let Err(error) = self.rooms.reconnecting(handle)
                    {
                        tracing::warn!(%error, "reconnect for unknown channel");
                    }
                } else if namespace != Namespace::Presence {
                    tracing::warn!(%namespace, "reconnect for a room this session does not serve");
                }
                if namespace == self.primary {
                    vec![AppEvent::ConnectionChanged(ConnectionStatus::Connecting)]
                } else {
                    vec![]
                }
            },
            ChannelTransition::Failed { namespace, reason } => {
                match namespace {
                    Namespace::Presence => {
                        if let Some(handle) = self.presence_handle {
                            self.presence.transport_error(handle, &reason);
                        }
                    },
                    Namespace::Chat | Namespace::Project => {
                        if self.room_serves(namespace) {
                            if let Some(handle) = self.room_handle {
                                self.rooms.transport_error(handle, &reason);
                            }
                        } else {
                            tracing::warn!(
                                %namespace,
                                "failure for a room this session does not serve"
                            );
                        }
                    },
                }
                if namespace == self.primary {
                    vec![AppEvent::ConnectionChanged(ConnectionStatus::Degraded { reason })]
                } else {
                    vec![]
                }
            },
        }
    }

    /// Decode one inbound envelope and derive the store-facing events.
    ///
    /// Envelopes must be fed in arrival order per namespace; decode and
    /// dispatch are synchronous, so FIFO is preserved end to end.
    pub fn handle_envelope(
        &mut self,
        namespace: Namespace,
        envelope: &Envelope,
    ) -> Result<Vec<AppEvent>, ChannelError> {
        match namespace {
            Namespace::Presence => {
                let event = PresenceEvent::from_envelope(envelope)?;
                match self.presence.apply(event) {
                    PresenceUpdate::RosterReplaced => {
                        let roster = self.presence.roster().iter().cloned().collect();
                        Ok(vec![AppEvent::RosterReplaced(roster)])
                    },
                    PresenceUpdate::ConnectionUpdated { .. } => Ok(vec![]),
                }
            },
            Namespace::Chat | Namespace::Project => {
                let context =
                    self.room_context.clone().ok_or(ChannelError::UnknownHandle)?;
                let event = self.rooms.deliver(&context, envelope)?;
                Ok(vec![match event {
                    RoomEvent::Chat(chat) => AppEvent::ChatReceived(chat),
                    RoomEvent::Project(project) => AppEvent::ProjectReceived(project),
                }])
            },
        }
    }

    /// Send an event on the session's room channel.
    ///
    /// Returns `Ok(false)` when the channel is not yet usable (the send is
    /// dropped by contract).
    pub fn broadcast(&mut self, event: RoomEvent) -> Result<bool, ChannelError> {
        let handle = self.room_handle.ok_or(ChannelError::UnknownHandle)?;
        self.rooms.send(handle, event)
    }

    /// Register a room-event subscription (view-level callbacks).
    pub fn subscribe(
        &mut self,
        kind: EventKind,
        callback: impl FnMut(&RoomEvent) + Send + 'static,
    ) -> Result<huddle_client::SubscriptionId, ChannelError> {
        let handle = self.room_handle.ok_or(ChannelError::UnknownHandle)?;
        self.rooms.on(handle, kind, callback)
    }

    /// Remove a room-event subscription.
    pub fn unsubscribe(&mut self, id: huddle_client::SubscriptionId) -> bool {
        self.rooms.off(id)
    }

    /// Queued outbound envelopes for the driver to flush, in send order.
    pub fn take_outgoing(&mut self) -> Vec<(RoomContext, Envelope)> {
        self.rooms.take_outgoing()
    }

    /// Presence roster, read-only.
    pub fn roster(&self) -> &std::collections::BTreeSet<UserId> {
        self.presence.roster()
    }

    /// Tear down every connection this bridge owns.
    pub fn disconnect(&mut self) {
        if let Some(handle) = self.room_handle.take() {
            if let Err(error) = self.rooms.leave(handle) {
                tracing::debug!(%error, "room channel already gone");
            }
            self.room_context = None;
        }
        if let Some(handle) = self.presence_handle.take() {
            self.presence.disconnect(handle);
        }
    }

    fn mark_established(&mut self, namespace: Namespace) -> Result<(), ChannelError> {
        match namespace {
            Namespace::Presence => {
                let handle = self.presence_handle.ok_or(ChannelError::UnknownHandle)?;
                self.presence.established(handle)
            },
            Namespace::Chat | Namespace::Project => {
                // A chat establish must not touch a project session's
                // channel (or vice versa); both share one room slot here.
                if !self.room_serves(namespace) {
                    tracing::warn!(
                        %namespace,
                        "establish for a room this session does not serve"
                    );
                    return Ok(());
                }
                let handle = self.room_handle.ok_or(ChannelError::UnknownHandle)?;
                self.rooms.established(handle)
            },
        }
    }

    /// True when `namespace` is the room namespace this session joined.
    fn room_serves(&self, namespace: Namespace) -> bool {
        self.room_context.as_ref().is_some_and(|context| context.namespace() == namespace)
    }
}

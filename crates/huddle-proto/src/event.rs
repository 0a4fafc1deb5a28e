//! Closed per-namespace event enums.
//!
//! The original client dispatched on raw event-name strings
//! (`socket.on("user-message", cb)`), which silently drops typos and
//! unhandled events. Here each namespace carries a closed enum: decoding
//! matches the wire name exhaustively and unknown names surface as
//! [`ProtocolError::UnknownEvent`].

use serde::{Deserialize, Serialize};

use crate::{
    envelope::{Envelope, Namespace},
    errors::ProtocolError,
    types::{ChatMessage, CorrelationId, FileTree, UserId, UserSummary},
};

/// Wire name of the roster event.
const ONLINE_USERS: &str = "onlineUsers";
/// Wire name of the followed-user connectivity event.
const CONNECTION_UPDATED: &str = "connection-updated";
/// Wire name of the direct-chat message event.
const USER_MESSAGE: &str = "user-message";
/// Wire name of the typing-start event.
const TYPING: &str = "typing";
/// Wire name of the typing-stop event.
const STOP_TYPING: &str = "stopTyping";
/// Wire name of the project room message event.
const PROJECT_MESSAGE: &str = "project-message";

/// Events on the presence namespace (server to client only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceEvent {
    /// Full replacement roster of online user ids.
    OnlineUsers(Vec<UserId>),
    /// A followed user's connectivity changed.
    ConnectionUpdated {
        /// The user whose connectivity changed.
        user_id: UserId,
        /// Whether the local user follows them.
        following: bool,
    },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionUpdatedPayload {
    user_id: UserId,
    following: bool,
}

impl PresenceEvent {
    /// Decode from a presence-namespace envelope.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, ProtocolError> {
        match envelope.event.as_str() {
            ONLINE_USERS => Ok(Self::OnlineUsers(envelope.payload_as()?)),
            CONNECTION_UPDATED => {
                let p: ConnectionUpdatedPayload = envelope.payload_as()?;
                Ok(Self::ConnectionUpdated { user_id: p.user_id, following: p.following })
            },
            other => Err(ProtocolError::UnknownEvent {
                namespace: Namespace::Presence,
                name: other.to_string(),
            }),
        }
    }

    /// Encode into a presence-namespace envelope.
    pub fn into_envelope(self) -> Result<Envelope, ProtocolError> {
        match self {
            Self::OnlineUsers(users) => Envelope::new(ONLINE_USERS, &users),
            Self::ConnectionUpdated { user_id, following } => {
                Envelope::new(CONNECTION_UPDATED, &ConnectionUpdatedPayload { user_id, following })
            },
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypingPayload {
    sender_id: UserId,
    recipient_id: UserId,
}

/// Events on the direct-chat namespace (both directions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A chat message broadcast through the broker.
    UserMessage(ChatMessage),
    /// Peer started typing.
    Typing {
        /// Who is typing.
        sender_id: UserId,
        /// Who they are typing to.
        recipient_id: UserId,
    },
    /// Peer stopped typing.
    StopTyping {
        /// Who stopped typing.
        sender_id: UserId,
        /// Who they were typing to.
        recipient_id: UserId,
    },
}

impl ChatEvent {
    /// Decode from a chat-namespace envelope.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, ProtocolError> {
        match envelope.event.as_str() {
            USER_MESSAGE => Ok(Self::UserMessage(envelope.payload_as()?)),
            TYPING => {
                let p: TypingPayload = envelope.payload_as()?;
                Ok(Self::Typing { sender_id: p.sender_id, recipient_id: p.recipient_id })
            },
            STOP_TYPING => {
                let p: TypingPayload = envelope.payload_as()?;
                Ok(Self::StopTyping { sender_id: p.sender_id, recipient_id: p.recipient_id })
            },
            other => Err(ProtocolError::UnknownEvent {
                namespace: Namespace::Chat,
                name: other.to_string(),
            }),
        }
    }

    /// Encode into a chat-namespace envelope.
    pub fn into_envelope(self) -> Result<Envelope, ProtocolError> {
        match self {
            Self::UserMessage(msg) => Envelope::new(USER_MESSAGE, &msg),
            Self::Typing { sender_id, recipient_id } => {
                Envelope::new(TYPING, &TypingPayload { sender_id, recipient_id })
            },
            Self::StopTyping { sender_id, recipient_id } => {
                Envelope::new(STOP_TYPING, &TypingPayload { sender_id, recipient_id })
            },
        }
    }
}

/// Body of a project-room message.
///
/// The wire field is a plain string; AI-generated messages embed a JSON
/// object `{ "text": ..., "fileTree": ... }` in it. Decoding first attempts
/// the structured form and falls back to plain text, matching the original
/// client's try-parse behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectBody {
    /// Plain text message.
    Text(String),
    /// Structured message carrying an optional file-tree delta.
    Structured {
        /// Rendered text portion.
        text: String,
        /// File-tree delta to merge, if any.
        file_tree: Option<FileTree>,
    },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructuredBody {
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_tree: Option<FileTree>,
}

impl ProjectBody {
    /// Parse a wire message string into a body.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<StructuredBody>(raw) {
            Ok(s) => Self::Structured { text: s.text, file_tree: s.file_tree },
            Err(_) => Self::Text(raw.to_string()),
        }
    }

    /// Render back to the wire string form.
    pub fn to_wire(&self) -> Result<String, ProtocolError> {
        match self {
            Self::Text(text) => Ok(text.clone()),
            Self::Structured { text, file_tree } => {
                let body =
                    StructuredBody { text: text.clone(), file_tree: file_tree.clone() };
                serde_json::to_string(&body).map_err(ProtocolError::from)
            },
        }
    }

    /// Text portion of the body.
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) | Self::Structured { text, .. } => text,
        }
    }

    /// File-tree delta, if the body carries one.
    pub fn file_tree(&self) -> Option<&FileTree> {
        match self {
            Self::Text(_) => None,
            Self::Structured { file_tree, .. } => file_tree.as_ref(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ProjectMessagePayload {
    message: String,
    sender: UserSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation: Option<CorrelationId>,
}

/// Events on the project namespace (both directions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectEvent {
    /// A message in the project room, possibly carrying a file-tree delta.
    ProjectMessage {
        /// Who sent it.
        sender: UserSummary,
        /// Parsed message body.
        body: ProjectBody,
        /// Sender-generated correlation id for echo deduplication.
        correlation: Option<CorrelationId>,
    },
}

impl ProjectEvent {
    /// Decode from a project-namespace envelope.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, ProtocolError> {
        match envelope.event.as_str() {
            PROJECT_MESSAGE => {
                let p: ProjectMessagePayload = envelope.payload_as()?;
                Ok(Self::ProjectMessage {
                    sender: p.sender,
                    body: ProjectBody::parse(&p.message),
                    correlation: p.correlation,
                })
            },
            other => Err(ProtocolError::UnknownEvent {
                namespace: Namespace::Project,
                name: other.to_string(),
            }),
        }
    }

    /// Encode into a project-namespace envelope.
    pub fn into_envelope(self) -> Result<Envelope, ProtocolError> {
        match self {
            Self::ProjectMessage { sender, body, correlation } => {
                let payload = ProjectMessagePayload {
                    message: body.to_wire()?,
                    sender,
                    correlation,
                };
                Envelope::new(PROJECT_MESSAGE, &payload)
            },
        }
    }
}

/// An event on either room namespace.
///
/// Room channels multiplex chat and project streams; this is the union type
/// the channel layer delivers to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// Direct-chat namespace event.
    Chat(ChatEvent),
    /// Project namespace event.
    Project(ProjectEvent),
}

impl RoomEvent {
    /// Encode into an envelope for the owning namespace.
    pub fn into_envelope(self) -> Result<Envelope, ProtocolError> {
        match self {
            Self::Chat(event) => event.into_envelope(),
            Self::Project(event) => event.into_envelope(),
        }
    }

    /// Decode an envelope received on the given namespace.
    pub fn from_envelope(
        namespace: Namespace,
        envelope: &Envelope,
    ) -> Result<Self, ProtocolError> {
        match namespace {
            Namespace::Chat => ChatEvent::from_envelope(envelope).map(Self::Chat),
            Namespace::Project => ProjectEvent::from_envelope(envelope).map(Self::Project),
            Namespace::Presence => Err(ProtocolError::UnknownEvent {
                namespace,
                name: envelope.event.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_event_name_is_an_error() {
        let envelope = Envelope { event: "user-mesage".into(), payload: serde_json::Value::Null };
        let err = ChatEvent::from_envelope(&envelope);
        assert!(matches!(err, Err(ProtocolError::UnknownEvent { .. })));
    }

    #[test]
    fn typing_round_trip() {
        let event = ChatEvent::Typing {
            sender_id: UserId::new("u1"),
            recipient_id: UserId::new("u2"),
        };
        let envelope = event.clone().into_envelope().ok();
        let decoded = envelope.as_ref().map(ChatEvent::from_envelope);
        assert_eq!(decoded, Some(Ok(event)));
    }

    #[test]
    fn project_body_falls_back_to_text() {
        let body = ProjectBody::parse("just a plain message");
        assert_eq!(body, ProjectBody::Text("just a plain message".into()));
        assert!(body.file_tree().is_none());
    }

    #[test]
    fn project_body_parses_structured_form() {
        let raw = r#"{"text":"added server","fileTree":{"app.js":{"contents":"x"}}}"#;
        let body = ProjectBody::parse(raw);
        assert_eq!(body.text(), "added server");
        assert_eq!(body.file_tree().map(FileTree::len), Some(1));
    }

    #[test]
    fn roster_event_decodes_full_list() {
        let users = vec![UserId::new("a"), UserId::new("b")];
        let envelope = PresenceEvent::OnlineUsers(users.clone()).into_envelope().ok();
        let decoded = envelope.as_ref().map(PresenceEvent::from_envelope);
        assert_eq!(decoded, Some(Ok(PresenceEvent::OnlineUsers(users))));
    }

    #[test]
    fn presence_envelope_rejected_on_room_namespaces() {
        let envelope = Envelope { event: "onlineUsers".into(), payload: serde_json::Value::Null };
        assert!(RoomEvent::from_envelope(Namespace::Chat, &envelope).is_err());
    }
}

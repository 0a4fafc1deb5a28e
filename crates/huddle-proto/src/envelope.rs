//! Transport-layer envelope: named event plus raw JSON payload.
//!
//! The broker routes on the event name without inspecting the payload, so
//! the envelope keeps the payload as an unparsed [`serde_json::Value`].
//! Typed decoding happens later via the per-namespace event enums.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::errors::ProtocolError;

/// Channel namespaces exposed by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    /// Session-wide presence channel (`/user-chat` roster events).
    Presence,
    /// Direct-chat room channel.
    Chat,
    /// Project room channel (`/project-chat`).
    Project,
}

impl Namespace {
    /// Broker path for this namespace.
    pub fn path(self) -> &'static str {
        match self {
            Self::Presence | Self::Chat => "/user-chat",
            Self::Project => "/project-chat",
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Presence => f.write_str("presence"),
            Self::Chat => f.write_str("chat"),
            Self::Project => f.write_str("project"),
        }
    }
}

/// One broker event: name plus JSON payload.
///
/// # Invariants
///
/// - `event` is never empty; [`Envelope::decode`] rejects envelopes without
///   a name so routing can never dispatch on the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Wire event name (e.g. `user-message`).
    pub event: String,
    /// Unparsed JSON payload.
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Build an envelope from a typed payload.
    pub fn new<T: Serialize>(event: &str, payload: &T) -> Result<Self, ProtocolError> {
        Ok(Self { event: event.to_string(), payload: serde_json::to_value(payload)? })
    }

    /// Deserialize the payload into a concrete type.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        serde_json::from_value(self.payload.clone()).map_err(ProtocolError::from)
    }

    /// Encode to the wire string form.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::from)
    }

    /// Decode from the wire string form.
    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        let envelope: Self = serde_json::from_str(raw)?;
        if envelope.event.is_empty() {
            return Err(ProtocolError::EmptyEventName);
        }
        Ok(envelope)
    }
}

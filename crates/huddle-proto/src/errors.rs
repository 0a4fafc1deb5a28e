//! Wire-level error types.

use thiserror::Error;

use crate::envelope::Namespace;

/// Errors produced while encoding or decoding broker events.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Event name not part of the namespace's closed event set.
    #[error("unknown event {name:?} on {namespace} namespace")]
    UnknownEvent {
        /// Namespace the envelope arrived on.
        namespace: Namespace,
        /// Offending wire event name.
        name: String,
    },

    /// Envelope carried an empty event name.
    #[error("envelope has empty event name")]
    EmptyEventName,

    /// Payload failed to (de)serialize.
    #[error("payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

impl PartialEq for ProtocolError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::UnknownEvent { namespace: a, name: b },
                Self::UnknownEvent { namespace: c, name: d },
            ) => a == c && b == d,
            (Self::EmptyEventName, Self::EmptyEventName) => true,
            // serde_json errors compare by rendered message
            (Self::Payload(a), Self::Payload(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

//! Wire model for the Huddle collaboration channels.
//!
//! The external broker multiplexes named JSON events over per-namespace
//! connections. This crate defines:
//!
//! - [`Envelope`]: the transport-layer unit (event name + raw JSON payload)
//! - Closed per-namespace event enums ([`PresenceEvent`], [`ChatEvent`],
//!   [`ProjectEvent`]) so every wire event is handled exhaustively instead of
//!   dispatched on string names
//! - Core data types: identifiers, [`ChatMessage`], [`FileTree`]
//!
//! Decoding an unknown event name is a [`ProtocolError`], never a silent
//! drop.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod envelope;
mod errors;
mod event;
mod types;

pub use envelope::{Envelope, Namespace};
pub use errors::ProtocolError;
pub use event::{ChatEvent, PresenceEvent, ProjectBody, ProjectEvent, RoomEvent};
pub use types::{
    ChatMessage, CorrelationId, FileEntry, FileTree, ProjectId, RoomId, UserId, UserSummary,
};

//! Channel clients for the Huddle broker.
//!
//! Two clients, mirroring the broker's namespace split:
//!
//! - [`PresenceClient`]: one connection per authenticated session; receives
//!   roster and connectivity events, never sends. Connect is idempotent and
//!   teardown clears the handle so a later connect builds fresh.
//! - [`RoomChannelManager`]: one connection per room namespace (direct chat
//!   vs. project); multiplexes named events, guards sends issued before the
//!   connection is usable, and keeps a subscription registry with working
//!   `off` so re-subscribing across view re-renders cannot double-deliver.
//!
//! Both are sans-IO: drivers own the sockets, feed inbound envelopes in,
//! and flush the outgoing buffer.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod presence;
mod room;

pub use error::ChannelError;
pub use presence::{PresenceClient, PresenceHandle, PresenceUpdate};
pub use room::{EventKind, RoomChannelManager, RoomContext, RoomHandle};

/// Identifier for a registered callback, used to de-register it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

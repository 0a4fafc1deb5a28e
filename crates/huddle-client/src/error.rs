//! Channel client errors.

use huddle_core::ConnectionError;
use huddle_proto::ProtocolError;
use thiserror::Error;

/// Errors from the presence and room channel clients.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Handle does not name a live channel (already left, or forged).
    #[error("unknown channel handle")]
    UnknownHandle,

    /// Wire-level encode/decode failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Connection state machine rejected the operation.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

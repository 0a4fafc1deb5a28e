//! Core state machines for Huddle channel connections.
//!
//! Sans-IO building blocks shared by the channel clients:
//!
//! - [`connection::ChannelConnection`]: lifecycle state machine for one
//!   broker connection (`Idle → Connecting → Connected → {Active | Error}`)
//! - [`env::Environment`]: time and randomness abstraction enabling
//!   deterministic simulation with virtual clocks and seeded RNG
//! - [`error::ConnectionError`]: typed connection failures with transience
//!   classification
//!
//! No I/O happens here; drivers own sockets and feed transitions in.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod connection;
pub mod env;
pub mod error;

pub use connection::{ChannelConnection, ConnectionState};
pub use env::{Environment, SystemEnv};
pub use error::ConnectionError;

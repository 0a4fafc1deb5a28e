//! Application layer for Huddle collaboration sessions.
//!
//! Pure state machines and a generic runtime for one open room view,
//! enabling deterministic simulation testing with the same code that runs
//! against the live broker.
//!
//! # Components
//!
//! - [`SessionStore`]: authoritative client-side room state (messages,
//!   typing, roster mirror, shared file tree) as an event-in/actions-out
//!   reducer
//! - [`WorkspaceMounter`]: reconciles the file tree into the sandboxed
//!   execution environment and supervises the single run process
//! - [`Bridge`]: translates broker envelopes to app events and app actions
//!   to channel sends
//! - [`Driver`]: trait for platform-specific I/O (sockets, REST, sandbox
//!   plumbing, rendering)
//! - [`Runtime`]: orchestration loop tying the above together

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod bridge;
mod driver;
mod event;
mod mounter;
mod runtime;
mod state;
mod store;

pub use action::{AppAction, RequestTag, RestRequest, Severity};
pub use bridge::Bridge;
pub use driver::Driver;
pub use event::{AppEvent, ChannelTransition, RestResult, SandboxEvent, UserIntent};
pub use mounter::{MounterError, ProcessId, RunPhase, Sandbox, WorkspaceMounter, MANIFEST};
pub use runtime::Runtime;
pub use state::{ConnectionStatus, DeliveryState, Message, SessionView};
pub use store::{SessionConfig, SessionStore};

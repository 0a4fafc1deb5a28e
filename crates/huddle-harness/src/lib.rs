//! Deterministic simulation harness for Huddle session testing.
//!
//! The harness swaps every I/O edge of a session for an in-memory,
//! scriptable stand-in while the production state machines and runtime run
//! unchanged:
//!
//! - [`SimEnv`]: virtual clock and seeded RNG behind
//!   [`huddle_core::Environment`], so time-driven behavior (typing expiry)
//!   and id generation are reproducible from a seed
//! - [`SimDriver`]: implements [`huddle_app::Driver`]; tests inject events
//!   and broker envelopes through a [`SimHandle`] and inspect everything
//!   the runtime sent, rendered, or surfaced
//! - [`FakeSandbox`]: records mounts, spawns, and kills with predictable
//!   process ids

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod fake_sandbox;
pub mod sim_driver;
pub mod sim_env;

pub use fake_sandbox::{FakeSandbox, FakeSandboxError};
pub use sim_driver::{SimDriver, SimDriverError, SimHandle};
pub use sim_env::SimEnv;

//! Error types for channel connections.
//!
//! Connection failures are never fatal to the session: at worst a room is
//! left in a degraded offline state recoverable by leaving and rejoining.
//! The taxonomy distinguishes failures worth retrying (transport) from ones
//! that are not (auth rejection, invalid transitions).

use thiserror::Error;

/// Errors from the connection state machine and its callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Operation not valid in the current state.
    #[error("invalid transition: cannot {operation} from {state} state")]
    InvalidTransition {
        /// State the connection was in.
        state: &'static str,
        /// Operation that was attempted.
        operation: String,
    },

    /// Broker rejected the connection auth payload.
    #[error("channel auth rejected: {reason}")]
    AuthRejected {
        /// Broker-supplied reason.
        reason: String,
    },

    /// Underlying transport failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ConnectionError {
    /// True when the failure is transient and the delegated transport retry
    /// may succeed. Auth rejections and state-machine misuse never are.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_transient() {
        assert!(ConnectionError::Transport("socket closed".into()).is_transient());
    }

    #[test]
    fn auth_and_misuse_are_not_transient() {
        assert!(
            !ConnectionError::AuthRejected { reason: "bad session".into() }.is_transient()
        );
        assert!(
            !ConnectionError::InvalidTransition {
                state: "idle",
                operation: "established".into()
            }
            .is_transient()
        );
    }
}

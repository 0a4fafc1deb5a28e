//! Property-based tests for the connection state machine.
//!
//! Three invariants hold under any operation sequence: the send guard
//! tracks usability exactly, rejected transitions never move the machine,
//! and a wedged connection always recovers through fail-then-leave.

use std::time::Instant;

use huddle_core::{ChannelConnection, ConnectionState};
use huddle_proto::Envelope;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Connect,
    Establish,
    Activate,
    Reconnect,
    Fail,
    Leave,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Connect),
        Just(Op::Establish),
        Just(Op::Activate),
        Just(Op::Reconnect),
        Just(Op::Fail),
        Just(Op::Leave),
    ]
}

/// Apply one operation; returns whether the machine accepted it.
fn apply(conn: &mut ChannelConnection<Instant>, op: Op, now: Instant) -> bool {
    match op {
        Op::Connect => conn.begin_connect(now).is_ok(),
        Op::Establish => conn.established(now).is_ok(),
        Op::Activate => conn.activate(now).is_ok(),
        Op::Reconnect => conn.reconnecting(now).is_ok(),
        Op::Fail => {
            conn.fail("transport dropped", now);
            true
        },
        Op::Leave => conn.leave(now).is_ok(),
    }
}

fn envelope() -> Envelope {
    Envelope { event: "typing".into(), payload: serde_json::Value::Null }
}

proptest! {
    /// Sends pass the guard exactly in `Connected` and `Active`, never in
    /// any other state, whatever path led there.
    #[test]
    fn guard_send_tracks_usability(ops in proptest::collection::vec(op(), 0..32)) {
        let now = Instant::now();
        let mut conn = ChannelConnection::new(now);
        for op in ops {
            apply(&mut conn, op, now);
            let usable = matches!(
                conn.state(),
                ConnectionState::Connected | ConnectionState::Active
            );
            prop_assert_eq!(conn.can_send(), usable);
            prop_assert_eq!(conn.guard_send(envelope()).is_some(), usable);
        }
    }

    /// A rejected transition leaves the state untouched.
    #[test]
    fn rejected_transitions_do_not_move_the_machine(
        ops in proptest::collection::vec(op(), 1..32),
    ) {
        let now = Instant::now();
        let mut conn = ChannelConnection::new(now);
        for op in ops {
            let before = conn.state().clone();
            if !apply(&mut conn, op, now) {
                prop_assert_eq!(conn.state(), &before);
            }
        }
    }

    /// However the connection got wedged, fail-then-leave reaches `Idle`
    /// and a fresh connect is accepted. Degraded is never terminal.
    #[test]
    fn fail_then_leave_always_recovers(ops in proptest::collection::vec(op(), 0..32)) {
        let now = Instant::now();
        let mut conn = ChannelConnection::new(now);
        for op in ops {
            apply(&mut conn, op, now);
        }
        if conn.leave(now).is_err() {
            conn.fail("forced teardown", now);
            prop_assert!(conn.leave(now).is_ok());
        }
        prop_assert_eq!(conn.state(), &ConnectionState::Idle);
        prop_assert!(conn.begin_connect(now).is_ok());
    }
}

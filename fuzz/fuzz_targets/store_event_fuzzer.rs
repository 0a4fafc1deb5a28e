//! Fuzz target for the session store state machine.
//!
//! Drives a chat-room store with arbitrary interleavings of local intents,
//! inbound channel events, REST completions (including replays against
//! stale tags), and clock ticks.
//!
//! # Invariants
//!
//! - The store never panics, whatever the interleaving
//! - No two messages share a correlation id (echo dedupe)
//! - No two messages share a backend id (page dedupe)

#![no_main]

use std::collections::HashSet;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;

use arbitrary::Arbitrary;
use huddle_app::{
    AppAction, AppEvent, RequestTag, RestRequest, RestResult, SessionConfig, SessionStore,
    UserIntent,
};
use huddle_core::Environment;
use huddle_proto::{ChatEvent, ChatMessage, CorrelationId, UserId, UserSummary};
use libfuzzer_sys::fuzz_target;

#[derive(Clone)]
struct FuzzEnv {
    clock: Arc<Mutex<Duration>>,
    counter: Arc<AtomicU64>,
}

impl FuzzEnv {
    fn new() -> Self {
        Self {
            clock: Arc::new(Mutex::new(Duration::ZERO)),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }

    fn advance(&self, by: Duration) {
        let mut clock = self.clock.lock().unwrap_or_else(|e| e.into_inner());
        *clock += by;
    }
}

impl Environment for FuzzEnv {
    type Instant = Duration;

    fn now(&self) -> Duration {
        *self.clock.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn sleep(&self, _duration: Duration) {}

    fn random_bytes(&self, buffer: &mut [u8]) {
        for chunk in buffer.chunks_mut(8) {
            let word = self.counter.fetch_add(1, Ordering::Relaxed).to_be_bytes();
            for (dst, src) in chunk.iter_mut().zip(word.iter()) {
                *dst = *src;
            }
        }
    }
}

#[derive(Debug, Arbitrary)]
enum Op {
    Send { body: String },
    Keypress,
    CancelTyping,
    LoadOlder,
    SelectPeer { peer: u8 },
    PeerTyping,
    PeerStopTyping,
    PeerMessage { body: String },
    EchoLastSend,
    PersistLastSend,
    FailLastSend,
    Roster { users: Vec<u8> },
    Tick { advance_ms: u16 },
    PageLoaded { count: u8, start: u8, has_more: bool },
}

fn me() -> UserSummary {
    UserSummary { id: UserId::new("me"), user_name: "Me".into() }
}

struct Tracker {
    peer: UserId,
    last_send: Option<(CorrelationId, RequestTag)>,
    last_page_tag: Option<RequestTag>,
    /// Live messages get fresh server ids; the broker never replays one.
    live_seq: u64,
}

impl Tracker {
    fn observe(&mut self, actions: &[AppAction]) {
        for action in actions {
            match action {
                AppAction::Rest(RestRequest::PersistSend { tag, correlation, .. }) => {
                    self.last_send = Some((*correlation, tag.clone()));
                }
                AppAction::Rest(RestRequest::FetchPage { tag, .. }) => {
                    self.last_page_tag = Some(tag.clone());
                }
                _ => {}
            }
        }
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let env = FuzzEnv::new();
    let mut store = SessionStore::new(env.clone(), SessionConfig::chat(me(), UserId::new("p0")));
    let mut tracker = Tracker {
        peer: UserId::new("p0"),
        last_send: None,
        last_page_tag: None,
        live_seq: 0,
    };

    let actions = store.enter();
    tracker.observe(&actions);

    for op in ops {
        let actions = match op {
            Op::Send { body } => {
                store.handle(AppEvent::Intent(UserIntent::SendMessage { body }))
            }
            Op::Keypress => store.handle(AppEvent::Intent(UserIntent::Keypress)),
            Op::CancelTyping => store.handle(AppEvent::Intent(UserIntent::CancelTyping)),
            Op::LoadOlder => store.handle(AppEvent::Intent(UserIntent::LoadOlder)),
            Op::SelectPeer { peer } => {
                tracker.peer = UserId::new(format!("p{}", peer % 4));
                store.handle(AppEvent::Intent(UserIntent::SelectPeer {
                    peer: tracker.peer.clone(),
                }))
            }
            Op::PeerTyping => store.handle(AppEvent::ChatReceived(ChatEvent::Typing {
                sender_id: tracker.peer.clone(),
                recipient_id: me().id,
            })),
            Op::PeerStopTyping => {
                store.handle(AppEvent::ChatReceived(ChatEvent::StopTyping {
                    sender_id: tracker.peer.clone(),
                    recipient_id: me().id,
                }))
            }
            Op::PeerMessage { body } => {
                tracker.live_seq += 1;
                store.handle(AppEvent::ChatReceived(ChatEvent::UserMessage(ChatMessage {
                    id: Some(format!("live-{}", tracker.live_seq)),
                    sender_id: tracker.peer.clone(),
                    recipient_id: me().id,
                    body,
                    created_at: 1,
                    correlation: None,
                })))
            }
            Op::EchoLastSend => match &tracker.last_send {
                Some((correlation, _)) => {
                    store.handle(AppEvent::ChatReceived(ChatEvent::UserMessage(ChatMessage {
                        id: Some(format!("echo-{}", correlation.0)),
                        sender_id: me().id,
                        recipient_id: tracker.peer.clone(),
                        body: "echo".into(),
                        created_at: 2,
                        correlation: Some(*correlation),
                    })))
                }
                None => vec![],
            },
            Op::PersistLastSend => match &tracker.last_send {
                Some((correlation, tag)) => store.handle(AppEvent::Rest(
                    RestResult::SendPersisted {
                        tag: tag.clone(),
                        message: ChatMessage {
                            id: Some(format!("echo-{}", correlation.0)),
                            sender_id: me().id,
                            recipient_id: tracker.peer.clone(),
                            body: "persisted".into(),
                            created_at: 3,
                            correlation: Some(*correlation),
                        },
                    },
                )),
                None => vec![],
            },
            Op::FailLastSend => match &tracker.last_send {
                Some((correlation, tag)) => {
                    store.handle(AppEvent::Rest(RestResult::SendFailed {
                        tag: tag.clone(),
                        correlation: *correlation,
                        reason: "injected".into(),
                    }))
                }
                None => vec![],
            },
            Op::Roster { users } => store.handle(AppEvent::RosterReplaced(
                users.iter().map(|u| UserId::new(format!("u{u}"))).collect(),
            )),
            Op::Tick { advance_ms } => {
                env.advance(Duration::from_millis(u64::from(advance_ms)));
                store.handle(AppEvent::Tick)
            }
            Op::PageLoaded { count, start, has_more } => match &tracker.last_page_tag {
                Some(tag) => {
                    let messages = (0..count.min(32))
                        .map(|i| ChatMessage {
                            id: Some(format!("srv-{}", start.wrapping_add(i))),
                            sender_id: tracker.peer.clone(),
                            recipient_id: me().id,
                            body: format!("h{i}"),
                            created_at: u64::from(i),
                            correlation: None,
                        })
                        .collect();
                    store.handle(AppEvent::Rest(RestResult::PageLoaded {
                        tag: tag.clone(),
                        messages,
                        has_more,
                    }))
                }
                None => vec![],
            },
        };
        tracker.observe(&actions);

        let mut correlations = HashSet::new();
        let mut ids = HashSet::new();
        for message in store.messages() {
            assert!(
                correlations.insert(message.correlation),
                "duplicate correlation in message list"
            );
            if let Some(id) = &message.id {
                assert!(ids.insert(id.clone()), "duplicate backend id in message list");
            }
        }
    }
});

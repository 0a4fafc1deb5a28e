//! Property tests for the session store's deduplication and roster
//! contracts.
//!
//! The oracle for send confirmation is simple: however the broker echo and
//! the REST completion interleave, a sent message appears exactly once and
//! ends confirmed. The roster oracle is the last replacement wins.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use huddle_app::{
    AppAction, AppEvent, DeliveryState, RequestTag, RestRequest, RestResult, SessionConfig,
    SessionStore, UserIntent,
};
use huddle_core::Environment;
use huddle_proto::{ChatEvent, ChatMessage, CorrelationId, UserId, UserSummary};
use proptest::prelude::*;

#[derive(Clone)]
struct TestEnv {
    clock: Arc<Mutex<Duration>>,
    counter: Arc<AtomicU64>,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            clock: Arc::new(Mutex::new(Duration::ZERO)),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Environment for TestEnv {
    type Instant = Duration;

    fn now(&self) -> Duration {
        *self.clock.lock().expect("clock lock")
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

fn me() -> UserSummary {
    UserSummary { id: UserId::new("me"), user_name: "Me".into() }
}

fn peer() -> UserId {
    UserId::new("peer")
}

fn chat_store() -> SessionStore<TestEnv> {
    SessionStore::new(TestEnv::new(), SessionConfig::chat(me(), peer()))
}

/// Confirmation events for one send, in the order they will be applied.
fn confirmations(
    correlation: CorrelationId,
    tag: RequestTag,
    echo_first: bool,
    include_echo: bool,
) -> Vec<AppEvent> {
    let echo = AppEvent::ChatReceived(ChatEvent::UserMessage(ChatMessage {
        id: Some(format!("srv-{correlation}")),
        sender_id: me().id,
        recipient_id: peer(),
        body: "payload".into(),
        created_at: 42,
        correlation: Some(correlation),
    }));
    let persisted = AppEvent::Rest(RestResult::SendPersisted {
        tag,
        message: ChatMessage {
            id: Some(format!("srv-{correlation}")),
            sender_id: me().id,
            recipient_id: peer(),
            body: "payload".into(),
            created_at: 42,
            correlation: Some(correlation),
        },
    });
    match (include_echo, echo_first) {
        (false, _) => vec![persisted],
        (true, true) => vec![echo, persisted],
        (true, false) => vec![persisted, echo],
    }
}

fn sent_correlation_and_tag(actions: &[AppAction]) -> (CorrelationId, RequestTag) {
    let correlation = actions
        .iter()
        .find_map(|a| match a {
            AppAction::Broadcast(huddle_proto::RoomEvent::Chat(ChatEvent::UserMessage(m))) => {
                m.correlation
            },
            _ => None,
        })
        .expect("broadcast carries a correlation");
    let tag = actions
        .iter()
        .find_map(|a| match a {
            AppAction::Rest(RestRequest::PersistSend { tag, .. }) => Some(tag.clone()),
            _ => None,
        })
        .expect("persist was issued");
    (correlation, tag)
}

proptest! {
    /// However echoes and persistence completions interleave across any
    /// number of sends, each send yields exactly one confirmed message.
    #[test]
    fn every_send_lands_exactly_once(
        sends in 1usize..6,
        echo_first in proptest::collection::vec(any::<bool>(), 6),
        include_echo in proptest::collection::vec(any::<bool>(), 6),
    ) {
        let mut store = chat_store();

        let mut pending = Vec::new();
        for i in 0..sends {
            let actions = store.handle(AppEvent::Intent(UserIntent::SendMessage {
                body: format!("msg {i}"),
            }));
            pending.push(sent_correlation_and_tag(&actions));
        }

        for (i, (correlation, tag)) in pending.iter().enumerate() {
            for event in confirmations(*correlation, tag.clone(), echo_first[i], include_echo[i]) {
                store.handle(event);
            }
        }

        prop_assert_eq!(store.messages().len(), sends);
        for message in store.messages() {
            prop_assert_eq!(message.delivery, DeliveryState::Confirmed);
        }

        let mut correlations: Vec<_> =
            store.messages().iter().map(|m| m.correlation).collect();
        correlations.sort();
        correlations.dedup();
        prop_assert_eq!(correlations.len(), sends);
    }

    /// The roster equals exactly the last replacement, never a union.
    #[test]
    fn roster_equals_last_replacement(
        rosters in proptest::collection::vec(
            proptest::collection::btree_set("u[0-9]{1,2}", 0..8),
            1..10,
        ),
    ) {
        let mut store = chat_store();
        for roster in &rosters {
            let users = roster.iter().map(UserId::new).collect();
            store.handle(AppEvent::RosterReplaced(users));
        }

        let last = rosters.last().expect("at least one roster");
        prop_assert_eq!(store.roster().len(), last.len());
        for name in last {
            prop_assert!(store.roster().contains(&UserId::new(name.as_str())));
        }
    }

    /// History pages overlapping already-present ids never duplicate.
    #[test]
    fn pages_never_duplicate_ids(
        first_start in 0u32..20,
        overlap in 0u32..10,
    ) {
        let mut store = chat_store();
        let make = |range: std::ops::Range<u32>| -> Vec<ChatMessage> {
            range
                .map(|i| ChatMessage {
                    id: Some(format!("m-{i}")),
                    sender_id: peer(),
                    recipient_id: me().id,
                    body: format!("msg {i}"),
                    created_at: u64::from(i),
                    correlation: None,
                })
                .collect()
        };

        let actions = store.enter();
        let tag = actions
            .iter()
            .find_map(|a| match a {
                AppAction::Rest(RestRequest::FetchPage { tag, .. }) => Some(tag.clone()),
                _ => None,
            })
            .expect("page fetch issued");
        store.handle(AppEvent::Rest(RestResult::PageLoaded {
            tag,
            messages: make(first_start..first_start + 10),
            has_more: true,
        }));

        let actions = store.handle(AppEvent::Intent(UserIntent::LoadOlder));
        let tag = actions
            .iter()
            .find_map(|a| match a {
                AppAction::Rest(RestRequest::FetchPage { tag, .. }) => Some(tag.clone()),
                _ => None,
            })
            .expect("second page fetch issued");
        // Second page deliberately overlaps the tail of the first.
        let second_start = (first_start + 10).saturating_sub(overlap);
        store.handle(AppEvent::Rest(RestResult::PageLoaded {
            tag,
            messages: make(second_start..second_start + 10),
            has_more: false,
        }));

        let mut ids: Vec<_> =
            store.messages().iter().filter_map(|m| m.id.clone()).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), total, "duplicate message id after paging");
    }
}

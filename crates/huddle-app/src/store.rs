//! Session state store.
//!
//! The authoritative client-side view of one open room: the ordered message
//! list, typing presence, a read-only mirror of the process-wide roster,
//! and (for project rooms) the shared file tree.
//!
//! This is a reducer: local intents and inbound events go in, state
//! mutates, and [`AppAction`] instructions come out for the runtime to
//! execute. The store never performs I/O. Events must be fed one at a time
//! in arrival order; every transition completes before the next event is
//! applied, which is what gives the room its single-consumer ordering.
//!
//! # Deduplication
//!
//! Every message the local user sends carries a client-generated
//! correlation id, on the optimistic local entry and on the wire. When the
//! broker echoes the sender's own message back, the echo confirms the
//! existing entry in place instead of appending, so a message appears
//! exactly once per viewer regardless of echo behavior.
//!
//! # Stale guard
//!
//! Every REST request is tagged with the room and the store generation at
//! issue time. Switching conversations bumps the generation; a completion
//! whose tag no longer matches is discarded, never applied.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use huddle_core::Environment;
use huddle_proto::{
    ChatEvent, ChatMessage, CorrelationId, FileTree, ProjectBody, ProjectEvent, ProjectId,
    RoomEvent, RoomId, UserId, UserSummary,
};

use crate::{
    action::{AppAction, RequestTag, RestRequest, Severity},
    event::{AppEvent, RestResult, UserIntent},
    state::{ConnectionStatus, DeliveryState, Message, SessionView},
};

/// Default history page size.
const DEFAULT_PAGE_SIZE: usize = 20;

/// Typing indicator lifetime without renewal.
const DEFAULT_TYPING_TIMEOUT: Duration = Duration::from_millis(1000);

/// Static configuration of one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Room this session serves.
    pub room: RoomId,
    /// The authenticated local user.
    pub local_user: UserSummary,
    /// History page size.
    pub page_size: usize,
    /// Typing indicator lifetime without renewal.
    pub typing_timeout: Duration,
}

impl SessionConfig {
    /// Session for a direct chat with `peer`.
    pub fn chat(local_user: UserSummary, peer: UserId) -> Self {
        Self {
            room: RoomId::Peer(peer),
            local_user,
            page_size: DEFAULT_PAGE_SIZE,
            typing_timeout: DEFAULT_TYPING_TIMEOUT,
        }
    }

    /// Session for a project room.
    pub fn project(local_user: UserSummary, project_id: ProjectId) -> Self {
        Self {
            room: RoomId::Project(project_id),
            local_user,
            page_size: DEFAULT_PAGE_SIZE,
            typing_timeout: DEFAULT_TYPING_TIMEOUT,
        }
    }
}

/// Pre-state record for one optimistic send, written at apply time.
///
/// Rollback removes exactly the entry this record describes; it is never
/// reconstructed after the fact.
#[derive(Debug, Clone, Copy)]
struct PendingSend;

/// Authoritative client-side state of one open room.
pub struct SessionStore<E: Environment> {
    env: E,
    config: SessionConfig,
    /// Current room. Starts as `config.room`; chat sessions may switch
    /// conversation peers, which bumps the generation.
    room: RoomId,
    /// Stale-guard generation, bumped on every conversation switch.
    generation: u64,
    next_request: u64,
    connection: ConnectionStatus,
    messages: Vec<Message>,
    pending_sends: HashMap<CorrelationId, PendingSend>,
    /// Peer typing indicators: user to the instant the indicator started
    /// or was last renewed.
    peer_typing: BTreeMap<UserId, E::Instant>,
    /// When the local user last pressed a key, for auto stop-typing.
    local_typing_since: Option<E::Instant>,
    /// Read-only mirror of the process-wide presence roster.
    roster: BTreeSet<UserId>,
    /// Chat directory (all users except the local one).
    directory: Vec<UserSummary>,
    /// Project participants.
    participants: Vec<UserId>,
    file_tree: FileTree,
    next_page: u32,
    has_more: bool,
    loading_page: bool,
}

impl<E: Environment> SessionStore<E> {
    /// New store for the configured room. Call [`enter`](Self::enter) to
    /// issue the initial fetches.
    pub fn new(env: E, config: SessionConfig) -> Self {
        let room = config.room.clone();
        Self {
            env,
            config,
            room,
            generation: 0,
            next_request: 0,
            connection: ConnectionStatus::Disconnected,
            messages: Vec::new(),
            pending_sends: HashMap::new(),
            peer_typing: BTreeMap::new(),
            local_typing_since: None,
            roster: BTreeSet::new(),
            directory: Vec::new(),
            participants: Vec::new(),
            file_tree: FileTree::new(),
            next_page: 1,
            has_more: true,
            loading_page: false,
        }
    }

    /// Issue the initial fetches for the room view.
    pub fn enter(&mut self) -> Vec<AppAction> {
        match self.room.clone() {
            RoomId::Peer(peer) => {
                self.loading_page = true;
                let users = RestRequest::FetchUsers { tag: self.tag() };
                let page = RestRequest::FetchPage {
                    tag: self.tag(),
                    peer,
                    page: self.next_page,
                    limit: self.config.page_size,
                };
                vec![AppAction::Rest(users), AppAction::Rest(page), AppAction::Render]
            },
            RoomId::Project(project_id) => {
                let fetch = RestRequest::FetchProject { tag: self.tag(), project_id };
                vec![AppAction::Rest(fetch), AppAction::Render]
            },
        }
    }

    /// Process one event and return the resulting actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Intent(intent) => self.apply_intent(intent),
            AppEvent::Tick => self.tick(),
            AppEvent::ChatReceived(event) => self.apply_chat(event),
            AppEvent::ProjectReceived(event) => self.apply_project(event),
            AppEvent::RosterReplaced(users) => {
                self.roster = users.into_iter().collect();
                vec![AppAction::Render]
            },
            AppEvent::ConnectionChanged(status) => self.apply_connection(status),
            AppEvent::Rest(result) => self.apply_rest(result),
            // Channel transitions and sandbox notifications are routed by
            // the runtime to the bridge and mounter respectively.
            AppEvent::Channel(_) | AppEvent::Sandbox(_) => vec![],
        }
    }

    /// Snapshot for rendering.
    pub fn view(&self) -> SessionView {
        SessionView {
            room: self.room.clone(),
            connection: self.connection.clone(),
            messages: self.messages.clone(),
            typing_peers: self.peer_typing.keys().cloned().collect(),
            online_users: self.roster.clone(),
            file_paths: self.file_tree.paths().map(str::to_string).collect(),
            has_more: self.has_more,
            loading_page: self.loading_page,
        }
    }

    // ---- local intents -------------------------------------------------

    fn apply_intent(&mut self, intent: UserIntent) -> Vec<AppAction> {
        match intent {
            UserIntent::SendMessage { body } => self.send_message(&body),
            UserIntent::Keypress => self.keypress(),
            UserIntent::CancelTyping => {
                self.local_typing_since = None;
                vec![]
            },
            UserIntent::LoadOlder => self.load_older(),
            UserIntent::SelectPeer { peer } => self.select_peer(peer),
            UserIntent::UploadFile { path, contents } => self.upload_file(path, &contents),
            UserIntent::EditFile { path, contents } => self.edit_file(path, &contents),
            UserIntent::DeleteFile { path } => self.delete_file(&path),
            UserIntent::AddCollaborators { users } => self.add_collaborators(users),
            // Sandbox runs and shutdown are orchestrated by the runtime.
            UserIntent::InstallAndRun | UserIntent::Quit => vec![],
        }
    }

    /// Optimistically append an outgoing message and issue its side
    /// effects: REST persistence (chat) and a channel broadcast.
    fn send_message(&mut self, body: &str) -> Vec<AppAction> {
        let body = body.trim();
        if body.is_empty() {
            return vec![];
        }

        let correlation = CorrelationId(self.env.random_u64());
        match self.room.clone() {
            RoomId::Peer(peer) => {
                self.messages.push(Message {
                    id: None,
                    correlation,
                    sender_id: self.config.local_user.id.clone(),
                    sender_name: self.config.local_user.user_name.clone(),
                    body: body.to_string(),
                    created_at: None,
                    delivery: DeliveryState::Pending,
                });
                self.pending_sends.insert(correlation, PendingSend);

                let persist = RestRequest::PersistSend {
                    tag: self.tag(),
                    peer: peer.clone(),
                    body: body.to_string(),
                    correlation,
                };
                let broadcast = RoomEvent::Chat(ChatEvent::UserMessage(ChatMessage {
                    id: None,
                    sender_id: self.config.local_user.id.clone(),
                    recipient_id: peer,
                    body: body.to_string(),
                    // Authoritative timestamp comes from the backend.
                    created_at: 0,
                    correlation: Some(correlation),
                }));
                vec![
                    AppAction::Rest(persist),
                    AppAction::Broadcast(broadcast),
                    AppAction::Render,
                ]
            },
            RoomId::Project(_) => {
                // Project chat has no persistence call; the append is
                // final, not optimistic.
                self.messages.push(Message {
                    id: None,
                    correlation,
                    sender_id: self.config.local_user.id.clone(),
                    sender_name: self.config.local_user.user_name.clone(),
                    body: body.to_string(),
                    created_at: None,
                    delivery: DeliveryState::Confirmed,
                });
                let broadcast = RoomEvent::Project(ProjectEvent::ProjectMessage {
                    sender: self.config.local_user.clone(),
                    body: ProjectBody::Text(body.to_string()),
                    correlation: Some(correlation),
                });
                vec![AppAction::Broadcast(broadcast), AppAction::Render]
            },
        }
    }

    /// Keypress in the message input: broadcast typing presence and reset
    /// the stop-typing timer.
    fn keypress(&mut self) -> Vec<AppAction> {
        let RoomId::Peer(peer) = self.room.clone() else {
            return vec![];
        };
        self.local_typing_since = Some(self.env.now());
        vec![AppAction::Broadcast(RoomEvent::Chat(ChatEvent::Typing {
            sender_id: self.config.local_user.id.clone(),
            recipient_id: peer,
        }))]
    }

    /// Expire typing indicators and auto-emit the local stop-typing.
    fn tick(&mut self) -> Vec<AppAction> {
        let now = self.env.now();
        let timeout = self.config.typing_timeout;

        let before = self.peer_typing.len();
        self.peer_typing.retain(|_, since| now - *since < timeout);
        let peers_expired = self.peer_typing.len() != before;

        let mut actions = Vec::new();
        if let Some(since) = self.local_typing_since
            && now - since >= timeout
        {
            self.local_typing_since = None;
            if let RoomId::Peer(peer) = self.room.clone() {
                actions.push(AppAction::Broadcast(RoomEvent::Chat(ChatEvent::StopTyping {
                    sender_id: self.config.local_user.id.clone(),
                    recipient_id: peer,
                })));
            }
        }
        if peers_expired {
            actions.push(AppAction::Render);
        }
        actions
    }

    /// Request the next page of older messages.
    fn load_older(&mut self) -> Vec<AppAction> {
        let RoomId::Peer(peer) = self.room.clone() else {
            return vec![];
        };
        if self.loading_page || !self.has_more {
            return vec![];
        }
        self.loading_page = true;
        let fetch = RestRequest::FetchPage {
            tag: self.tag(),
            peer,
            page: self.next_page,
            limit: self.config.page_size,
        };
        vec![AppAction::Rest(fetch), AppAction::Render]
    }

    /// Switch the chat view to a different conversation peer.
    ///
    /// Bumps the stale-guard generation and resets all room-scoped state;
    /// in-flight completions for the previous conversation will be
    /// discarded on arrival.
    fn select_peer(&mut self, peer: UserId) -> Vec<AppAction> {
        if !matches!(self.room, RoomId::Peer(_)) {
            tracing::warn!("peer switch ignored in project room");
            return vec![];
        }
        self.generation += 1;
        self.room = RoomId::Peer(peer.clone());
        self.messages.clear();
        self.pending_sends.clear();
        self.peer_typing.clear();
        self.local_typing_since = None;
        self.next_page = 1;
        self.has_more = true;
        self.loading_page = true;

        let fetch = RestRequest::FetchPage {
            tag: self.tag(),
            peer,
            page: self.next_page,
            limit: self.config.page_size,
        };
        vec![AppAction::Rest(fetch), AppAction::Render]
    }

    // ---- workspace files -----------------------------------------------

    /// Upload a new file. Duplicate paths are rejected, matching the
    /// original upload flow; use [`UserIntent::EditFile`] to overwrite.
    fn upload_file(&mut self, path: String, contents: &str) -> Vec<AppAction> {
        let Some(project_id) = self.project_id() else {
            return vec![];
        };
        if self.file_tree.contains(&path) {
            return vec![AppAction::Notify {
                severity: Severity::Error,
                text: format!("file '{path}' already exists"),
            }];
        }
        self.file_tree.insert(path.clone(), contents);
        vec![
            AppAction::Rest(RestRequest::SaveFileTree {
                tag: self.tag(),
                project_id,
                tree: self.file_tree.clone(),
            }),
            AppAction::Notify {
                severity: Severity::Info,
                text: format!("file '{path}' uploaded"),
            },
            AppAction::Render,
        ]
    }

    /// Save an edited file (overwrite allowed).
    fn edit_file(&mut self, path: String, contents: &str) -> Vec<AppAction> {
        let Some(project_id) = self.project_id() else {
            return vec![];
        };
        self.file_tree.insert(path, contents);
        vec![AppAction::Rest(RestRequest::SaveFileTree {
            tag: self.tag(),
            project_id,
            tree: self.file_tree.clone(),
        })]
    }

    /// Delete a file from the shared workspace.
    fn delete_file(&mut self, path: &str) -> Vec<AppAction> {
        let Some(project_id) = self.project_id() else {
            return vec![];
        };
        if self.file_tree.remove(path).is_none() {
            return vec![AppAction::Notify {
                severity: Severity::Error,
                text: format!("file '{path}' not found"),
            }];
        }
        vec![
            AppAction::Rest(RestRequest::SaveFileTree {
                tag: self.tag(),
                project_id,
                tree: self.file_tree.clone(),
            }),
            AppAction::Notify {
                severity: Severity::Info,
                text: format!("file '{path}' deleted"),
            },
            AppAction::Render,
        ]
    }

    fn add_collaborators(&mut self, users: Vec<UserId>) -> Vec<AppAction> {
        let Some(project_id) = self.project_id() else {
            return vec![];
        };
        if users.is_empty() {
            return vec![];
        }
        vec![AppAction::Rest(RestRequest::AddCollaborators {
            tag: self.tag(),
            project_id,
            users,
        })]
    }

    // ---- inbound channel events ----------------------------------------

    fn apply_chat(&mut self, event: ChatEvent) -> Vec<AppAction> {
        let RoomId::Peer(peer) = self.room.clone() else {
            return vec![];
        };
        match event {
            ChatEvent::UserMessage(msg) => self.apply_chat_message(&peer, msg),
            ChatEvent::Typing { sender_id, .. } => {
                if sender_id == peer {
                    self.peer_typing.insert(sender_id, self.env.now());
                    vec![AppAction::Render]
                } else {
                    vec![]
                }
            },
            ChatEvent::StopTyping { sender_id, .. } => {
                if self.peer_typing.remove(&sender_id).is_some() {
                    vec![AppAction::Render]
                } else {
                    vec![]
                }
            },
        }
    }

    fn apply_chat_message(&mut self, peer: &UserId, msg: ChatMessage) -> Vec<AppAction> {
        let me = &self.config.local_user.id;
        let inbound = msg.sender_id == *peer && msg.recipient_id == *me;
        let echo = msg.sender_id == *me && msg.recipient_id == *peer;
        if !inbound && !echo {
            // The chat namespace carries every conversation of this user;
            // messages for other peers are not this room's state.
            tracing::debug!(sender = %msg.sender_id, "message for another conversation ignored");
            return vec![];
        }

        if let Some(correlation) = msg.correlation
            && self.confirm(correlation, msg.id.clone(), Some(msg.created_at))
        {
            return vec![AppAction::Render];
        }

        let correlation =
            msg.correlation.unwrap_or_else(|| CorrelationId(self.env.random_u64()));
        let sender_name = self.name_of(&msg.sender_id);
        self.messages.push(Message {
            id: msg.id,
            correlation,
            sender_id: msg.sender_id,
            sender_name,
            body: msg.body,
            created_at: Some(msg.created_at),
            delivery: DeliveryState::Confirmed,
        });
        vec![AppAction::Render]
    }

    fn apply_project(&mut self, event: ProjectEvent) -> Vec<AppAction> {
        let Some(project_id) = self.project_id() else {
            return vec![];
        };
        let ProjectEvent::ProjectMessage { sender, body, correlation } = event;

        if let Some(correlation) = correlation
            && self.confirm(correlation, None, None)
        {
            return vec![AppAction::Render];
        }

        let correlation =
            correlation.unwrap_or_else(|| CorrelationId(self.env.random_u64()));
        self.messages.push(Message {
            id: None,
            correlation,
            sender_id: sender.id.clone(),
            sender_name: sender.user_name.clone(),
            body: body.text().to_string(),
            created_at: None,
            delivery: DeliveryState::Confirmed,
        });

        let mut actions = Vec::new();
        if let Some(delta) = body.file_tree() {
            // Last write wins per path; concurrent edits from other
            // collaborators are not reconciled beyond that.
            self.file_tree.merge(delta.clone());
            actions.push(AppAction::Mount(self.file_tree.clone()));
            actions.push(AppAction::Rest(RestRequest::SaveFileTree {
                tag: self.tag(),
                project_id,
                tree: self.file_tree.clone(),
            }));
        }
        actions.push(AppAction::Render);
        actions
    }

    fn apply_connection(&mut self, status: ConnectionStatus) -> Vec<AppAction> {
        let mut actions = Vec::new();
        if let ConnectionStatus::Degraded { reason } = &status {
            actions.push(AppAction::Notify {
                severity: Severity::Warning,
                text: format!("connection lost: {reason}"),
            });
        }
        self.connection = status;
        actions.push(AppAction::Render);
        actions
    }

    // ---- REST completions ----------------------------------------------

    fn apply_rest(&mut self, result: RestResult) -> Vec<AppAction> {
        match result {
            RestResult::UsersLoaded { tag, users } => {
                if !self.tag_current(&tag) {
                    return vec![];
                }
                let me = self.config.local_user.id.clone();
                self.directory = users.into_iter().filter(|u| u.id != me).collect();
                vec![AppAction::Render]
            },
            RestResult::PageLoaded { tag, messages, has_more } => {
                self.apply_page(&tag, messages, has_more)
            },
            RestResult::SendPersisted { tag, message } => {
                if !self.tag_current(&tag) {
                    return vec![];
                }
                if let Some(correlation) = message.correlation {
                    self.pending_sends.remove(&correlation);
                    if self.confirm(correlation, message.id, Some(message.created_at)) {
                        return vec![AppAction::Render];
                    }
                }
                tracing::debug!("persisted send has no matching local entry");
                vec![]
            },
            RestResult::SendFailed { tag, correlation, reason } => {
                self.rollback_send(&tag, correlation, &reason)
            },
            RestResult::ProjectLoaded { tag, file_tree, participants } => {
                if !self.tag_current(&tag) {
                    return vec![];
                }
                self.file_tree = file_tree;
                self.participants = participants;
                vec![AppAction::Render]
            },
            RestResult::TreeSaved { tag } => {
                if self.tag_current(&tag) {
                    tracing::debug!("file tree saved");
                }
                vec![]
            },
            RestResult::TreeSaveFailed { tag, reason } => {
                if !self.tag_current(&tag) {
                    return vec![];
                }
                vec![AppAction::Notify {
                    severity: Severity::Error,
                    text: format!("failed to save file tree: {reason}"),
                }]
            },
            RestResult::CollaboratorsAdded { tag, users } => {
                if !self.tag_current(&tag) {
                    return vec![];
                }
                for user in users {
                    if !self.participants.contains(&user) {
                        self.participants.push(user);
                    }
                }
                vec![
                    AppAction::Notify {
                        severity: Severity::Info,
                        text: "collaborators added".into(),
                    },
                    AppAction::Render,
                ]
            },
            RestResult::RequestFailed { tag, reason } => {
                if !self.tag_current(&tag) {
                    return vec![];
                }
                vec![AppAction::Notify { severity: Severity::Error, text: reason }]
            },
        }
    }

    /// Prepend one page of older history.
    ///
    /// Messages already present (same backend id or correlation) are
    /// skipped so a page overlapping live inserts cannot duplicate. The
    /// scroll-anchor action reports exactly how many entries were
    /// prepended.
    fn apply_page(
        &mut self,
        tag: &RequestTag,
        messages: Vec<ChatMessage>,
        has_more: bool,
    ) -> Vec<AppAction> {
        if !self.tag_current(tag) {
            tracing::debug!(room = %tag.room, "stale page discarded");
            return vec![];
        }
        self.loading_page = false;
        self.has_more = has_more;
        self.next_page += 1;

        let known_ids: BTreeSet<String> =
            self.messages.iter().filter_map(|m| m.id.clone()).collect();
        let known_corr: BTreeSet<CorrelationId> =
            self.messages.iter().map(|m| m.correlation).collect();

        let had_messages = !self.messages.is_empty();
        let page: Vec<Message> = messages
            .into_iter()
            .filter(|m| m.id.as_ref().is_none_or(|id| !known_ids.contains(id)))
            .filter(|m| m.correlation.is_none_or(|c| !known_corr.contains(&c)))
            .map(|m| {
                let correlation =
                    m.correlation.unwrap_or_else(|| CorrelationId(self.env.random_u64()));
                let sender_name = self.name_of(&m.sender_id);
                Message {
                    id: m.id,
                    correlation,
                    sender_id: m.sender_id,
                    sender_name,
                    body: m.body,
                    created_at: Some(m.created_at),
                    delivery: DeliveryState::Confirmed,
                }
            })
            .collect();

        let prepended = page.len();
        self.messages.splice(0..0, page);

        if had_messages && prepended > 0 {
            vec![AppAction::PreserveScroll { prepended }, AppAction::Render]
        } else {
            vec![AppAction::Render]
        }
    }

    /// Roll an optimistic send back to its recorded pre-state.
    fn rollback_send(
        &mut self,
        tag: &RequestTag,
        correlation: CorrelationId,
        reason: &str,
    ) -> Vec<AppAction> {
        if !self.tag_current(tag) {
            return vec![];
        }
        self.pending_sends.remove(&correlation);
        let before = self.messages.len();
        // Only a still-pending entry rolls back; an entry the echo already
        // confirmed is real and stays.
        self.messages.retain(|m| {
            m.correlation != correlation || m.delivery != DeliveryState::Pending
        });
        if self.messages.len() == before {
            tracing::debug!(%correlation, "send failure with nothing to roll back");
        }
        vec![
            AppAction::Notify {
                severity: Severity::Error,
                text: format!("message not sent: {reason}"),
            },
            AppAction::Render,
        ]
    }

    // ---- accessors ------------------------------------------------------

    /// Messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Current shared file tree.
    pub fn file_tree(&self) -> &FileTree {
        &self.file_tree
    }

    /// Online users (roster mirror).
    pub fn roster(&self) -> &BTreeSet<UserId> {
        &self.roster
    }

    /// Peers with a live typing indicator.
    pub fn typing_peers(&self) -> Vec<UserId> {
        self.peer_typing.keys().cloned().collect()
    }

    /// Chat directory, excluding the local user.
    pub fn directory(&self) -> &[UserSummary] {
        &self.directory
    }

    /// Project participants.
    pub fn participants(&self) -> &[UserId] {
        &self.participants
    }

    /// Current room.
    pub fn room(&self) -> &RoomId {
        &self.room
    }

    /// Whether older pages remain.
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Whether a page fetch is in flight.
    pub fn loading_page(&self) -> bool {
        self.loading_page
    }

    /// The authenticated local user.
    pub fn local_user(&self) -> &UserSummary {
        &self.config.local_user
    }

    // ---- internals -----------------------------------------------------

    fn tag(&mut self) -> RequestTag {
        self.next_request += 1;
        RequestTag {
            room: self.room.clone(),
            generation: self.generation,
            request_id: self.next_request,
        }
    }

    fn tag_current(&self, tag: &RequestTag) -> bool {
        let current = tag.room == self.room && tag.generation == self.generation;
        if !current {
            tracing::debug!(room = %tag.room, "discarding completion for stale request");
        }
        current
    }

    /// Confirm a pending or already-appended entry by correlation id.
    /// Returns `true` when an entry existed (the event is a duplicate of
    /// local state and must not append).
    fn confirm(
        &mut self,
        correlation: CorrelationId,
        id: Option<String>,
        created_at: Option<u64>,
    ) -> bool {
        let Some(entry) = self.messages.iter_mut().find(|m| m.correlation == correlation)
        else {
            return false;
        };
        if entry.id.is_none() {
            entry.id = id;
        }
        if entry.created_at.is_none() {
            entry.created_at = created_at;
        }
        entry.delivery = DeliveryState::Confirmed;
        true
    }

    fn name_of(&self, user_id: &UserId) -> String {
        if *user_id == self.config.local_user.id {
            return self.config.local_user.user_name.clone();
        }
        self.directory
            .iter()
            .find(|u| u.id == *user_id)
            .map_or_else(|| user_id.to_string(), |u| u.user_name.clone())
    }

    fn project_id(&self) -> Option<ProjectId> {
        match &self.room {
            RoomId::Project(id) => Some(id.clone()),
            RoomId::Peer(_) => None,
        }
    }
}

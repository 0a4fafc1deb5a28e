//! Session input events.
//!
//! Everything that drives the [`crate::SessionStore`] and
//! [`crate::Runtime`]: user intents, channel deliveries (translated by the
//! [`crate::Bridge`]), REST completions, sandbox process notifications, and
//! time ticks.

use huddle_proto::{
    ChatEvent, ChatMessage, FileTree, Namespace, ProjectEvent, UserId, UserSummary,
};

use crate::{action::RequestTag, mounter::ProcessId, state::ConnectionStatus};

/// Local user intents, fed in by the frontend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIntent {
    /// Send a message in the current room.
    SendMessage {
        /// Message text.
        body: String,
    },
    /// A keypress in the message input (drives typing presence).
    Keypress,
    /// Input lost focus; stop the typing timer without emitting.
    CancelTyping,
    /// Load the next page of older messages.
    LoadOlder,
    /// Switch the chat view to a different conversation peer.
    SelectPeer {
        /// New conversation peer.
        peer: UserId,
    },
    /// Upload a new file into the shared workspace.
    UploadFile {
        /// File path.
        path: String,
        /// File contents.
        contents: String,
    },
    /// Save an edited file.
    EditFile {
        /// File path.
        path: String,
        /// New contents.
        contents: String,
    },
    /// Delete a file from the shared workspace.
    DeleteFile {
        /// File path.
        path: String,
    },
    /// Add collaborators to the project.
    AddCollaborators {
        /// Users to add.
        users: Vec<UserId>,
    },
    /// Install dependencies and (re)start the run process.
    InstallAndRun,
    /// Close the session.
    Quit,
}

/// Transport-level transitions observed by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelTransition {
    /// Connection established for a namespace.
    Established(Namespace),
    /// Transport dropped and is retrying on its own.
    Reconnecting(Namespace),
    /// Connection failed.
    Failed {
        /// Namespace that failed.
        namespace: Namespace,
        /// Failure description.
        reason: String,
    },
}

/// REST completion events. Every variant carries the tag of the request
/// that produced it; the store discards tags that no longer match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestResult {
    /// Directory fetch completed.
    UsersLoaded {
        /// Originating request tag.
        tag: RequestTag,
        /// All users, including the local one (filtered by the store).
        users: Vec<UserSummary>,
    },
    /// One page of history arrived, oldest first.
    PageLoaded {
        /// Originating request tag.
        tag: RequestTag,
        /// Messages in the page.
        messages: Vec<ChatMessage>,
        /// Whether older pages remain.
        has_more: bool,
    },
    /// Message persisted; carries the backend-assigned identity.
    SendPersisted {
        /// Originating request tag.
        tag: RequestTag,
        /// Confirmed message (id and timestamp filled in).
        message: ChatMessage,
    },
    /// Message persistence failed; the optimistic entry must roll back.
    SendFailed {
        /// Originating request tag.
        tag: RequestTag,
        /// Correlation id of the entry to roll back.
        correlation: huddle_proto::CorrelationId,
        /// Failure description.
        reason: String,
    },
    /// Project fetch completed.
    ProjectLoaded {
        /// Originating request tag.
        tag: RequestTag,
        /// Persisted file tree.
        file_tree: FileTree,
        /// Project participants.
        participants: Vec<UserId>,
    },
    /// File-tree save acknowledged.
    TreeSaved {
        /// Originating request tag.
        tag: RequestTag,
    },
    /// File-tree save failed.
    TreeSaveFailed {
        /// Originating request tag.
        tag: RequestTag,
        /// Failure description.
        reason: String,
    },
    /// Collaborators added server-side.
    CollaboratorsAdded {
        /// Originating request tag.
        tag: RequestTag,
        /// Users that were added.
        users: Vec<UserId>,
    },
    /// A request failed with no state to roll back.
    RequestFailed {
        /// Originating request tag.
        tag: RequestTag,
        /// Failure description.
        reason: String,
    },
}

/// Notifications from the sandbox collaborator, relayed by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxEvent {
    /// A spawned process wrote a chunk of output.
    Output {
        /// Process that produced the output.
        process: ProcessId,
        /// Raw output chunk.
        chunk: String,
    },
    /// A spawned process exited.
    Exited {
        /// Process that exited.
        process: ProcessId,
        /// Exit code.
        code: i32,
    },
    /// The run process bound a port and is serving.
    ServerReady {
        /// Process serving the port.
        process: ProcessId,
        /// Bound port.
        port: u16,
        /// URL the UI can embed.
        url: String,
    },
}

/// Events processed by the session runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Local user intent.
    Intent(UserIntent),

    /// Periodic tick; drives typing expiry.
    Tick,

    /// Transport transition for one namespace.
    Channel(ChannelTransition),

    /// Decoded chat-namespace event (produced by the bridge).
    ChatReceived(ChatEvent),

    /// Decoded project-namespace event (produced by the bridge).
    ProjectReceived(ProjectEvent),

    /// Presence roster replaced (produced by the bridge).
    RosterReplaced(Vec<UserId>),

    /// Connection status view update.
    ConnectionChanged(ConnectionStatus),

    /// REST completion.
    Rest(RestResult),

    /// Sandbox process notification.
    Sandbox(SandboxEvent),
}

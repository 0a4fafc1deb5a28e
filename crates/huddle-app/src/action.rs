//! Session side-effects and intents.
//!
//! The store produces [`AppAction`] instructions for the runtime to
//! execute. REST calls are typed requests tagged with the issuing room and
//! generation so late completions can be discarded instead of mutating a
//! newer room's state.

use huddle_proto::{FileTree, ProjectId, RoomEvent, RoomId, UserId};

/// Tag carried by every asynchronous request the store issues.
///
/// A completion is applied only when both the room and the generation still
/// match; a fast room switch bumps the generation, so a stale response can
/// never land in the wrong room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTag {
    /// Room the request was issued for.
    pub room: RoomId,
    /// Store generation at issue time.
    pub generation: u64,
    /// Unique id of this request.
    pub request_id: u64,
}

/// Typed REST requests against the backend API.
///
/// The driver owns the HTTP client and endpoint layout; completions come
/// back as [`crate::RestResult`] events carrying the same tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestRequest {
    /// `GET /render/users` — chat directory.
    FetchUsers {
        /// Stale-guard tag.
        tag: RequestTag,
    },
    /// `GET /messages/all/:peer?page=&limit=` — one page of history.
    FetchPage {
        /// Stale-guard tag.
        tag: RequestTag,
        /// Conversation peer.
        peer: UserId,
        /// 1-based page number.
        page: u32,
        /// Page size.
        limit: usize,
    },
    /// `POST /messages/send/:peer` — persist an outgoing message.
    PersistSend {
        /// Stale-guard tag.
        tag: RequestTag,
        /// Conversation peer.
        peer: UserId,
        /// Message text.
        body: String,
        /// Correlation id of the optimistic local entry.
        correlation: huddle_proto::CorrelationId,
    },
    /// `GET /projects/get-project/:id` — project metadata and file tree.
    FetchProject {
        /// Stale-guard tag.
        tag: RequestTag,
        /// Project to fetch.
        project_id: ProjectId,
    },
    /// `PUT /projects/update-file-tree` — persist the shared tree.
    SaveFileTree {
        /// Stale-guard tag.
        tag: RequestTag,
        /// Project owning the tree.
        project_id: ProjectId,
        /// Full tree to persist.
        tree: FileTree,
    },
    /// `PUT /projects/add-user` — add collaborators to the project.
    AddCollaborators {
        /// Stale-guard tag.
        tag: RequestTag,
        /// Project to extend.
        project_id: ProjectId,
        /// Users to add.
        users: Vec<UserId>,
    },
}

/// Notification severity for user-visible toasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational.
    Info,
    /// Something degraded but recoverable.
    Warning,
    /// Operation failed.
    Error,
}

/// Actions produced by the session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Send an event on this room's channel.
    Broadcast(RoomEvent),

    /// Execute a REST request; the completion returns as an event.
    Rest(RestRequest),

    /// Reflect the current full file tree into the sandbox.
    Mount(FileTree),

    /// Keep the previously-visible message in place after a prepend of
    /// this many older messages.
    PreserveScroll {
        /// Number of messages prepended.
        prepended: usize,
    },

    /// Show a transient user notification.
    Notify {
        /// Severity.
        severity: Severity,
        /// Text to display.
        text: String,
    },

    /// Re-render the session view.
    Render,
}

//! Core identifier and payload types shared across channels.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Stable user identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Construct from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable project identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl ProjectId {
    /// Construct from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-generated correlation id for optimistic sends.
///
/// Carried on the wire so the sender can match the broker echo of its own
/// message against the locally-queued copy and keep exactly one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub u64);

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Identifies one room: a peer-to-peer chat thread or a project space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoomId {
    /// Direct chat with a peer.
    Peer(UserId),
    /// Project collaboration space.
    Project(ProjectId),
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Peer(id) => write!(f, "peer:{id}"),
            Self::Project(id) => write!(f, "project:{id}"),
        }
    }
}

/// A chat message as it travels on the wire (broker event and REST body).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Backend-assigned id. `None` until the send is persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Sender's user id.
    pub sender_id: UserId,
    /// Recipient's user id.
    pub recipient_id: UserId,
    /// Message text.
    pub body: String,
    /// Creation time, milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Sender-generated correlation id for echo deduplication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation: Option<CorrelationId>,
}

/// Directory entry for the chat user list (`GET /render/users`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    /// User id.
    pub id: UserId,
    /// Display name.
    pub user_name: String,
}

/// One file in the shared workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Full file contents.
    pub contents: String,
}

/// Shared project file tree: path to contents.
///
/// The tree is the union of every entry ever added, minus explicit
/// deletions. Concurrent edits are resolved last-write-wins per path; there
/// is no merge or CRDT reconciliation. This is a known consistency gap
/// carried over from the original system, kept deliberately.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileTree(pub BTreeMap<String, FileEntry>);

impl FileTree {
    /// Empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the tree holds no files.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `path` exists in the tree.
    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    /// Contents at `path`, if present.
    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.0.get(path)
    }

    /// Insert or overwrite a single file.
    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        self.0.insert(path.into(), FileEntry { contents: contents.into() });
    }

    /// Remove a file. Returns the removed entry if it existed.
    pub fn remove(&mut self, path: &str) -> Option<FileEntry> {
        self.0.remove(path)
    }

    /// Shallow key-wise merge: every path in `delta` overwrites the local
    /// entry (last write wins); paths absent from `delta` are untouched.
    pub fn merge(&mut self, delta: FileTree) {
        self.0.extend(delta.0);
    }

    /// Iterate paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl FromIterator<(String, FileEntry)> for FileTree {
    fn from_iter<T: IntoIterator<Item = (String, FileEntry)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

//! Participant directories feeding the mention autocomplete.
//!
//! A [`DirectoryProvider`] answers "who can be mentioned in this conversation". Group
//! conversations usually have a fixed roster that is read once when composition starts
//! ([`StaticRoster`]); public conversations have changing membership and are polled on a fixed
//! interval by a [`DirectoryPoller`].

mod poller;

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use mention_protocol::ConversationId;
use mention_protocol::DirectoryEntry;

pub use poller::DirectoryPoller;

/// Source of mention candidates for a conversation.
///
/// Implementations may block (file or network IO); the poller runs them on the blocking pool.
pub trait DirectoryProvider: Send + Sync + 'static {
    /// Return the participants of `conversation_id` in provider order.
    ///
    /// An unknown conversation is an empty list, not an error.
    fn list_members(&self, conversation_id: &ConversationId) -> anyhow::Result<Vec<DirectoryEntry>>;
}

/// An in-memory roster keyed by conversation.
#[derive(Debug, Clone, Default)]
pub struct StaticRoster {
    conversations: HashMap<ConversationId, Vec<DirectoryEntry>>,
}

impl StaticRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conversation(
        mut self,
        conversation_id: ConversationId,
        entries: Vec<DirectoryEntry>,
    ) -> Self {
        self.conversations.insert(conversation_id, entries);
        self
    }

    pub fn set_members(&mut self, conversation_id: ConversationId, entries: Vec<DirectoryEntry>) {
        self.conversations.insert(conversation_id, entries);
    }
}

impl DirectoryProvider for StaticRoster {
    fn list_members(&self, conversation_id: &ConversationId) -> anyhow::Result<Vec<DirectoryEntry>> {
        Ok(self
            .conversations
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// A roster stored as JSON on disk and re-read on every request.
///
/// The file maps conversation ids to entry lists:
///
/// ```json
/// { "lobby": [ { "id": "05aa", "display_name": "alice" }, { "id": "05bb" } ] }
/// ```
///
/// A missing file is an empty roster, which lets a poller start before the file is written.
#[derive(Debug, Clone)]
pub struct JsonFileRoster {
    path: PathBuf,
}

impl JsonFileRoster {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> anyhow::Result<HashMap<ConversationId, Vec<DirectoryEntry>>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(err) => {
                return Err(anyhow::Error::new(err))
                    .with_context(|| format!("read roster {}", self.path.display()));
            }
        };
        serde_json::from_str(&contents)
            .with_context(|| format!("parse roster {}", self.path.display()))
    }
}

impl DirectoryProvider for JsonFileRoster {
    fn list_members(&self, conversation_id: &ConversationId) -> anyhow::Result<Vec<DirectoryEntry>> {
        let mut conversations = self.load()?;
        Ok(conversations.remove(conversation_id).unwrap_or_default())
    }
}

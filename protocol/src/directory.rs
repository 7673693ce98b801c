use serde::Deserialize;
use serde::Serialize;

use crate::ConversationId;
use crate::ParticipantId;

/// A participant that may be mentioned in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DirectoryEntry {
    pub id: ParticipantId,
    /// Human-readable name used to build the mention handle.
    ///
    /// Entries without a display name are kept in snapshots but are never offered as
    /// autocomplete candidates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl DirectoryEntry {
    pub fn new(id: impl Into<ParticipantId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: Some(display_name.into()),
        }
    }

    pub fn anonymous(id: impl Into<ParticipantId>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }
}

/// The result of one directory refresh.
///
/// `sequence` increases with every request issued by a poller. Snapshots are applied in arrival
/// order, so a slow response can replace a newer one; callers that need strict ordering can
/// compare sequences themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySnapshot {
    pub conversation_id: ConversationId,
    pub sequence: u64,
    pub entries: Vec<DirectoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn entry_without_display_name_deserializes() {
        let entry: DirectoryEntry =
            serde_json::from_str(r#"{"id":"05ab"}"#).expect("parse entry");
        assert_eq!(entry, DirectoryEntry::anonymous("05ab"));
    }

    #[test]
    fn entry_serializes_id_transparently() {
        let json = serde_json::to_string(&DirectoryEntry::new("p1", "alice")).expect("serialize");
        assert_eq!(json, r#"{"id":"p1","display_name":"alice"}"#);
    }
}

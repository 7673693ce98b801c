use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::ConversationId;

/// A message handed to the outbound send path.
///
/// `text` is already in wire form: every mention handle that was still present in the buffer has
/// been replaced by its transmission token (see [`crate::wire`]).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutgoingMessage {
    pub conversation_id: ConversationId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<QuoteRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_preview: Option<LinkPreview>,
}

/// A file the user attached to the draft. The composer only carries it through to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AttachmentRef {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// The message being replied to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuoteRef {
    pub message_id: String,
    pub author: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LinkPreview {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Failure reported by the outbound send collaborator.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("message rejected: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_context_is_omitted_from_json() {
        let message = OutgoingMessage {
            conversation_id: ConversationId::new("c1"),
            text: "hi @p1".to_string(),
            attachments: Vec::new(),
            quote: None,
            link_preview: None,
        };
        let json = serde_json::to_string(&message).expect("serialize");
        assert_eq!(json, r#"{"conversation_id":"c1","text":"hi @p1"}"#);
    }
}

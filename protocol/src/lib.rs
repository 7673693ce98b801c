//! Types shared by the mention composer, its directory providers and whoever
//! consumes outgoing messages.

mod directory;
mod ids;
mod message;
mod selection;
pub mod wire;

pub use directory::DirectoryEntry;
pub use directory::DirectorySnapshot;
pub use ids::ConversationId;
pub use ids::ParticipantId;
pub use message::AttachmentRef;
pub use message::LinkPreview;
pub use message::OutgoingMessage;
pub use message::QuoteRef;
pub use message::SendError;
pub use selection::Selection;
pub use selection::SelectionDirection;
pub use selection::clamp_to_char_boundary;

/// Character that introduces a mention query or handle unless configured otherwise.
pub const DEFAULT_MARKER: char = '@';

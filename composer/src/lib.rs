//! Mention-aware message composer.
//!
//! The [`Composer`] sits between a text surface and the send path of a chat client. Typing the
//! mention marker opens an autocomplete list fed by the conversation directory; committing a
//! candidate inserts a handle (`@alice`) that then behaves as a single glyph for caret movement
//! and deletion. On send every handle still present in the text is rewritten to the participant's
//! transmission token.

// Forbid accidental stdout/stderr writes in the library portion of the composer.
#![deny(clippy::print_stdout, clippy::print_stderr)]

mod autocomplete;
mod composer;
mod config;
pub mod cursor;
mod event;
mod popup;
mod registry;
mod session;
mod surface;
mod text_formatting;
mod word_boundary;

pub use autocomplete::AutocompleteController;
pub use autocomplete::AutocompleteState;
pub use autocomplete::CommitEdit;
pub use autocomplete::OpenState;
pub use autocomplete::QuerySpan;
pub use autocomplete::extract_query;
pub use autocomplete::filter_candidates;
pub use composer::Composer;
pub use composer::ComposerError;
pub use composer::InputResult;
pub use composer::MessageSink;
pub use config::ComposerConfig;
pub use config::ConfigError;
pub use config::DEFAULT_PLACEHOLDER_NAME;
pub use config::DEFAULT_POLL_INTERVAL_SECS;
pub use config::DEFAULT_SEPARATOR;
pub use event::ComposerEvent;
pub use popup::MAX_POPUP_ROWS;
pub use popup::MentionPopup;
pub use registry::ActiveMentions;
pub use registry::Mention;
pub use registry::MentionRegistry;
pub use session::ComposerSession;
pub use session::DirectorySource;
pub use surface::TextBuffer;
pub use surface::TextSurface;

//! Inputs that drive a [`crate::Composer`].

use crossterm::event::KeyEvent;
use mention_protocol::DirectorySnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerEvent {
    Key(KeyEvent),

    /// Bracketed paste or another bulk insertion at the caret.
    Paste(String),

    /// The surface text was edited outside the composer (IME commit, programmatic edit).
    TextChanged,

    /// The selection moved outside the composer (mouse, programmatic selection).
    SelectionChanged,

    /// A directory refresh finished. Applied in arrival order.
    Directory(DirectorySnapshot),

    /// Explicit send request, e.g. from a send button.
    Submit,
}

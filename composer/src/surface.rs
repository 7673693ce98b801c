//! The editable text surface the composer drives.
//!
//! A surface is whatever widget holds the buffer on screen. The composer reads the text and
//! selection from it, writes edits back, and hands it every key it does not consume so the
//! widget's default editing behavior applies. [`TextBuffer`] is the in-memory implementation used
//! by the terminal front end and by tests.

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use mention_protocol::Selection;

use crate::word_boundary::next_grapheme_boundary;
use crate::word_boundary::previous_grapheme_boundary;

pub trait TextSurface {
    fn text(&self) -> &str;

    /// Replace the whole buffer. The caret moves to the end of the new text.
    fn set_text(&mut self, text: &str);

    fn selection(&self) -> Selection;

    fn set_selection(&mut self, selection: Selection);

    /// Replace the current selection with `text` and place the caret after it.
    fn insert_str(&mut self, text: &str);

    /// Apply the default editing behavior for a key the composer did not consume.
    fn input(&mut self, key: KeyEvent);
}

/// A plain string buffer with a byte-offset selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    text: String,
    selection: Selection,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let selection = Selection::caret(text.len());
        Self { text, selection }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn replace_selection(&mut self, replacement: &str) {
        let Selection { start, end, .. } = self.selection;
        self.text.replace_range(start..end, replacement);
        self.selection = Selection::caret(start + replacement.len());
    }

    fn delete_backward(&mut self) {
        if self.selection.is_collapsed() {
            let end = self.selection.start;
            let start = previous_grapheme_boundary(&self.text, end);
            self.selection = Selection::new(start, end, self.selection.direction);
        }
        self.replace_selection("");
    }

    fn delete_forward(&mut self) {
        if self.selection.is_collapsed() {
            let start = self.selection.start;
            let end = next_grapheme_boundary(&self.text, start);
            self.selection = Selection::new(start, end, self.selection.direction);
        }
        self.replace_selection("");
    }
}

impl TextSurface for TextBuffer {
    fn text(&self) -> &str {
        &self.text
    }

    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.selection = Selection::caret(self.text.len());
    }

    fn selection(&self) -> Selection {
        self.selection
    }

    fn set_selection(&mut self, selection: Selection) {
        self.selection = selection.normalized(&self.text);
    }

    fn insert_str(&mut self, text: &str) {
        self.replace_selection(text);
    }

    fn input(&mut self, key: KeyEvent) {
        if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
            return;
        }
        match key.code {
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                let mut buf = [0u8; 4];
                self.replace_selection(ch.encode_utf8(&mut buf));
            }
            KeyCode::Enter => self.replace_selection("\n"),
            KeyCode::Tab => self.replace_selection("\t"),
            KeyCode::Backspace => self.delete_backward(),
            KeyCode::Delete => self.delete_forward(),
            KeyCode::Home => self.selection = Selection::caret(0),
            KeyCode::End => self.selection = Selection::caret(self.text.len()),
            KeyCode::Left => {
                let pos = previous_grapheme_boundary(&self.text, self.selection.start);
                self.selection = Selection::caret(pos);
            }
            KeyCode::Right => {
                let pos = next_grapheme_boundary(&self.text, self.selection.end);
                self.selection = Selection::caret(pos);
            }
            _ => {}
        }
    }
}

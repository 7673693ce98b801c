//! Mention-aware caret movement and deletion.
//!
//! Mention handles behave as single glyphs: a caret step that would land inside a handle snaps to
//! the handle's far edge, and a backspace or delete touching a handle removes it entirely. Both
//! operations are pure functions over the text, the current selection and the mentions active in
//! that text; the composer applies the result to its text surface.
//!
//! Offsets are byte offsets into the buffer. A plain (non-mention) step advances one grapheme
//! cluster.

use std::ops::Range;

use crossterm::event::KeyModifiers;
use mention_protocol::ParticipantId;
use mention_protocol::Selection;
use mention_protocol::SelectionDirection;

use crate::registry::ActiveMentions;
use crate::word_boundary::next_grapheme_boundary;
use crate::word_boundary::next_word_boundary;
use crate::word_boundary::previous_grapheme_boundary;
use crate::word_boundary::previous_word_boundary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteDirection {
    /// Backspace.
    Backward,
    /// Delete.
    Forward,
}

/// Modifier semantics for a horizontal caret move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveModifiers {
    /// Extend the selection instead of collapsing it.
    pub extend: bool,
    /// Jump a word at a time.
    pub word: bool,
    /// Jump to the start or end of the buffer.
    pub line: bool,
}

impl MoveModifiers {
    pub fn from_key_modifiers(modifiers: KeyModifiers) -> Self {
        Self {
            extend: modifiers.contains(KeyModifiers::SHIFT),
            word: modifiers.intersects(KeyModifiers::ALT | KeyModifiers::CONTROL),
            line: modifiers.intersects(KeyModifiers::SUPER | KeyModifiers::META),
        }
    }
}

impl From<KeyModifiers> for MoveModifiers {
    fn from(modifiers: KeyModifiers) -> Self {
        Self::from_key_modifiers(modifiers)
    }
}

/// Compute the selection after a horizontal move.
pub fn move_caret(
    text: &str,
    selection: Selection,
    direction: MoveDirection,
    modifiers: MoveModifiers,
    mentions: &ActiveMentions,
) -> Selection {
    let selection = selection.normalized(text);

    // `origin` is the edge that moves, `fixed` the edge a shift-extension keeps.
    let (origin, fixed) = if modifiers.extend {
        match (selection.direction, direction) {
            (SelectionDirection::Forward, _) => (selection.end, selection.start),
            (SelectionDirection::Backward, _) => (selection.start, selection.end),
            (SelectionDirection::None, MoveDirection::Left) => (selection.start, selection.end),
            (SelectionDirection::None, MoveDirection::Right) => (selection.end, selection.start),
        }
    } else {
        let origin = match direction {
            MoveDirection::Left => selection.start,
            MoveDirection::Right => selection.end,
        };
        (origin, origin)
    };

    let runs = mentions.runs(text);
    let target = if modifiers.line {
        match direction {
            MoveDirection::Left => 0,
            MoveDirection::Right => text.len(),
        }
    } else if modifiers.word {
        match direction {
            MoveDirection::Left => previous_word_boundary(text, origin, &runs),
            MoveDirection::Right => next_word_boundary(text, origin, &runs),
        }
    } else {
        step(text, origin, direction, &runs)
    };

    if !modifiers.extend {
        return Selection::caret(target);
    }
    if target == fixed {
        Selection::caret(target)
    } else if target > fixed {
        Selection::new(fixed, target, SelectionDirection::Forward)
    } else {
        Selection::new(target, fixed, SelectionDirection::Backward)
    }
}

/// One grapheme to the left or right, snapping across any mention run the step touches.
fn step(text: &str, origin: usize, direction: MoveDirection, runs: &[Range<usize>]) -> usize {
    match direction {
        MoveDirection::Right => {
            if origin >= text.len() {
                return text.len();
            }
            let next = next_grapheme_boundary(text, origin);
            runs.iter()
                .find(|run| run.start < next && origin < run.end)
                .map_or(next, |run| run.end.max(next))
        }
        MoveDirection::Left => {
            if origin == 0 {
                return 0;
            }
            let previous = previous_grapheme_boundary(text, origin);
            runs.iter()
                .find(|run| run.start < origin && previous < run.end)
                .map_or(previous, |run| run.start.min(previous))
        }
    }
}

/// The result of removing a whole mention handle from the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicDeletion {
    pub text: String,
    pub caret: usize,
    pub handle: String,
    pub id: ParticipantId,
    pub range: Range<usize>,
}

/// If a backspace or delete at the caret touches an active handle, remove the whole handle.
///
/// Returns `None` when the selection is not collapsed or no handle is adjacent on the deleting
/// side; the caller falls back to ordinary deletion.
pub fn delete_mention(
    text: &str,
    selection: Selection,
    direction: DeleteDirection,
    mentions: &ActiveMentions,
) -> Option<AtomicDeletion> {
    let selection = selection.normalized(text);
    if !selection.is_collapsed() {
        return None;
    }
    let pos = selection.start;

    let (mention, range) = match direction {
        DeleteDirection::Backward => {
            let mention = mentions.ending_at(text, pos)?;
            (mention, pos - mention.handle.len()..pos)
        }
        DeleteDirection::Forward => {
            let mention = mentions.starting_at(text, pos)?;
            (mention, pos..pos + mention.handle.len())
        }
    };

    let mut remaining = String::with_capacity(text.len() - range.len());
    remaining.push_str(&text[..range.start]);
    remaining.push_str(&text[range.end..]);

    Some(AtomicDeletion {
        text: remaining,
        caret: range.start,
        handle: mention.handle.clone(),
        id: mention.id.clone(),
        range,
    })
}

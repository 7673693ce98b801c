use serde::Deserialize;
use serde::Serialize;
use strum_macros::Display;

/// Which edge of a selection moves when it is extended.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SelectionDirection {
    #[default]
    None,
    Forward,
    Backward,
}

/// A selection over a UTF-8 text buffer, expressed in byte offsets.
///
/// `start == end` is a collapsed caret. Values received from outside are not trusted:
/// [`Selection::normalized`] swaps reversed edges and clamps both to the text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub direction: SelectionDirection,
}

impl Selection {
    pub fn new(start: usize, end: usize, direction: SelectionDirection) -> Self {
        Self {
            start,
            end,
            direction,
        }
    }

    pub fn caret(pos: usize) -> Self {
        Self::new(pos, pos, SelectionDirection::None)
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Return a selection with `start <= end <= text.len()`, both on char boundaries.
    pub fn normalized(self, text: &str) -> Self {
        let mut start = clamp_to_char_boundary(text, self.start);
        let mut end = clamp_to_char_boundary(text, self.end);
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }
        let direction = if start == end {
            SelectionDirection::None
        } else {
            self.direction
        };
        Self {
            start,
            end,
            direction,
        }
    }
}

/// Clamp `pos` to the text length, then back to the nearest char boundary at or before it.
pub fn clamp_to_char_boundary(text: &str, pos: usize) -> usize {
    let mut pos = pos.min(text.len());
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reversed_selection_is_swapped() {
        let sel = Selection::new(5, 2, SelectionDirection::Forward).normalized("hello world");
        assert_eq!(sel, Selection::new(2, 5, SelectionDirection::Forward));
    }

    #[test]
    fn out_of_range_offsets_are_clamped() {
        let sel = Selection::new(3, 40, SelectionDirection::Backward).normalized("abcd");
        assert_eq!(sel, Selection::new(3, 4, SelectionDirection::Backward));
    }

    #[test]
    fn offsets_inside_a_multibyte_char_move_back() {
        // 'é' occupies bytes 1..3.
        let sel = Selection::caret(2).normalized("héllo");
        assert_eq!(sel, Selection::caret(1));
    }

    #[test]
    fn collapsed_selection_drops_direction() {
        let sel = Selection::new(2, 2, SelectionDirection::Forward).normalized("abcd");
        assert_eq!(sel.direction, SelectionDirection::None);
    }

    #[test]
    fn direction_displays_and_deserializes_lowercase() {
        assert_eq!(SelectionDirection::Backward.to_string(), "backward");
        assert_eq!(
            serde_json::from_str::<SelectionDirection>("\"forward\"").expect("parse direction"),
            SelectionDirection::Forward
        );
    }
}

//! Mention autocomplete.
//!
//! The controller is opened by typing the marker and follows the caret: after every text or
//! selection change the composer calls [`AutocompleteController::sync`], which re-extracts the
//! in-progress query and re-filters the directory. There is no explicit dismiss; the list closes as
//! soon as the caret no longer sits in a valid query.

use derive_more::IsVariant;
use itertools::Itertools;
use mention_protocol::DirectoryEntry;
use mention_protocol::clamp_to_char_boundary;

use crate::registry::MentionRegistry;

/// The marker-prefixed text between the last marker before the caret and the caret itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpan {
    /// Byte offset of the marker.
    pub start: usize,
    /// Byte offset of the caret.
    pub end: usize,
    /// Text typed after the marker, possibly empty.
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenState {
    pub query: String,
    pub candidates: Vec<DirectoryEntry>,
    pub selected: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, IsVariant)]
pub enum AutocompleteState {
    #[default]
    Closed,
    Open(OpenState),
}

/// Edit produced by committing a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEdit {
    pub text: String,
    pub caret: usize,
    pub handle: String,
}

#[derive(Debug, Clone)]
pub struct AutocompleteController {
    marker: char,
    placeholder_name: String,
    state: AutocompleteState,
}

impl AutocompleteController {
    pub fn new(marker: char, placeholder_name: impl Into<String>) -> Self {
        Self {
            marker,
            placeholder_name: placeholder_name.into(),
            state: AutocompleteState::Closed,
        }
    }

    pub fn state(&self) -> &AutocompleteState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn query(&self) -> Option<&str> {
        match &self.state {
            AutocompleteState::Open(open) => Some(open.query.as_str()),
            AutocompleteState::Closed => None,
        }
    }

    pub fn candidates(&self) -> &[DirectoryEntry] {
        match &self.state {
            AutocompleteState::Open(open) => &open.candidates,
            AutocompleteState::Closed => &[],
        }
    }

    pub fn selected_index(&self) -> Option<usize> {
        match &self.state {
            AutocompleteState::Open(open) if !open.candidates.is_empty() => Some(open.selected),
            _ => None,
        }
    }

    pub fn selected_candidate(&self) -> Option<&DirectoryEntry> {
        match &self.state {
            AutocompleteState::Open(open) => open.candidates.get(open.selected),
            AutocompleteState::Closed => None,
        }
    }

    /// True while the candidate list is shown and navigation keys belong to it.
    pub fn is_presenting(&self) -> bool {
        !self.candidates().is_empty()
    }

    /// Recompute the state for `text` with the caret at `caret`.
    ///
    /// `caret` is `None` for a non-collapsed selection, which closes the controller. The selected
    /// index survives when neither the query nor the candidate list changed; otherwise it resets
    /// to the first candidate.
    pub fn sync(&mut self, text: &str, caret: Option<usize>, directory: &[DirectoryEntry]) {
        let Some(span) = caret.and_then(|caret| extract_query(text, caret, self.marker)) else {
            self.reset();
            return;
        };

        let candidates = filter_candidates(directory, &span.query, &self.placeholder_name);
        let selected = match &self.state {
            AutocompleteState::Open(open)
                if open.query == span.query && open.candidates == candidates =>
            {
                open.selected
            }
            _ => 0,
        };
        if !self.state.is_open() {
            tracing::trace!(query = %span.query, "mention autocomplete opened");
        }
        self.state = AutocompleteState::Open(OpenState {
            query: span.query,
            candidates,
            selected,
        });
    }

    pub fn move_up(&mut self) {
        if let AutocompleteState::Open(open) = &mut self.state {
            open.selected = open.selected.saturating_sub(1);
        }
    }

    pub fn move_down(&mut self) {
        if let AutocompleteState::Open(open) = &mut self.state
            && open.selected + 1 < open.candidates.len()
        {
            open.selected += 1;
        }
    }

    /// Replace the in-progress query with the handle of `entry` and register it.
    ///
    /// A separator is inserted after the handle unless the text after the caret already starts
    /// with whitespace. The returned caret sits right after the handle and any inserted
    /// separator. The controller is closed afterwards. Returns `None`, leaving the registry
    /// untouched, when there is no query at the caret or `entry` has no display name.
    pub fn commit(
        &mut self,
        entry: &DirectoryEntry,
        registry: &mut MentionRegistry,
        text: &str,
        caret: usize,
        separator: char,
    ) -> Option<CommitEdit> {
        self.reset();
        let span = extract_query(text, caret, self.marker)?;
        let display_name = entry.display_name.as_deref()?;
        let handle = registry.register(display_name, entry.id.clone());

        let before = &text[..span.start];
        let after = &text[span.end..];
        let mut edited = String::with_capacity(text.len() + handle.len() + separator.len_utf8());
        edited.push_str(before);
        edited.push_str(&handle);
        let caret = match after.chars().next() {
            Some(ch) if ch.is_whitespace() => before.len() + handle.len(),
            _ => {
                edited.push(separator);
                before.len() + handle.len() + separator.len_utf8()
            }
        };
        edited.push_str(after);

        tracing::debug!(handle = %handle, id = %entry.id, "committed mention");
        Some(CommitEdit {
            text: edited,
            caret,
            handle,
        })
    }

    pub fn reset(&mut self) {
        self.state = AutocompleteState::Closed;
    }
}

/// Find the in-progress mention query ending at `caret`.
///
/// The query starts at the last marker before the caret. There is no query when that marker is
/// glued to a preceding word character (`mail@example`) or when whitespace sits between the
/// marker and the caret.
pub fn extract_query(text: &str, caret: usize, marker: char) -> Option<QuerySpan> {
    let caret = clamp_to_char_boundary(text, caret);
    let before = &text[..caret];
    let start = before.rfind(marker)?;

    if before[..start].chars().next_back().is_some_and(is_word_char) {
        return None;
    }
    let query = &before[start + marker.len_utf8()..];
    if query.chars().any(char::is_whitespace) {
        return None;
    }

    Some(QuerySpan {
        start,
        end: caret,
        query: query.to_string(),
    })
}

/// Directory entries offered for `query`, in directory order.
///
/// Entries without a usable display name (missing, empty or equal to `placeholder_name`) are never
/// offered. Duplicate ids keep their first occurrence. The query matches case-insensitively as a
/// substring of either the display name or the id; an empty query matches everything.
pub fn filter_candidates(
    entries: &[DirectoryEntry],
    query: &str,
    placeholder_name: &str,
) -> Vec<DirectoryEntry> {
    let query = query.to_lowercase();
    entries
        .iter()
        .filter(|entry| {
            entry
                .display_name
                .as_deref()
                .is_some_and(|name| !name.is_empty() && name != placeholder_name)
        })
        .unique_by(|entry| entry.id.clone())
        .filter(|entry| {
            query.is_empty()
                || entry.id.as_str().to_lowercase().contains(&query)
                || entry
                    .display_name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(&query))
        })
        .cloned()
        .collect()
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use mention_protocol::ParticipantId;
    use pretty_assertions::assert_eq;

    fn directory() -> Vec<DirectoryEntry> {
        vec![
            DirectoryEntry::new("p1", "alice"),
            DirectoryEntry::new("p2", "bob"),
            DirectoryEntry::new("p3", "Alan"),
        ]
    }

    fn controller() -> AutocompleteController {
        AutocompleteController::new('@', "Anonymous")
    }

    #[test]
    fn extract_query_cases() {
        let cases: Vec<(&str, usize, Option<(usize, &str)>)> = vec![
            ("hi @al", 6, Some((3, "al"))),
            ("@", 1, Some((0, ""))),
            ("(@bo", 4, Some((1, "bo"))),
            ("mail@example", 12, None),
            ("hi @al ice", 10, None),
            ("hi @al", 2, None),
            ("no marker", 9, None),
            ("@al and @bo", 3, Some((0, "al"))),
            ("héllo @zoë", "héllo @zoë".len(), Some((7, "zoë"))),
        ];
        for (text, caret, expected) in cases {
            let got = extract_query(text, caret, '@').map(|span| (span.start, span.query));
            let expected = expected.map(|(start, query)| (start, query.to_string()));
            assert_eq!(got, expected, "text {text:?} caret {caret}");
        }
    }

    #[test]
    fn filter_matches_name_or_id_case_insensitively() {
        let entries = directory();
        let names = |query: &str| -> Vec<String> {
            filter_candidates(&entries, query, "Anonymous")
                .into_iter()
                .filter_map(|entry| entry.display_name)
                .collect()
        };
        assert_eq!(names("AL"), vec!["alice", "Alan"]);
        assert_eq!(names("p2"), vec!["bob"]);
        assert_eq!(names(""), vec!["alice", "bob", "Alan"]);
        assert!(names("zzz").is_empty());
    }

    #[test]
    fn filter_skips_placeholder_names_and_duplicates() {
        let entries = vec![
            DirectoryEntry::new("p1", "alice"),
            DirectoryEntry::anonymous("p4"),
            DirectoryEntry::new("p5", "Anonymous"),
            DirectoryEntry::new("p6", ""),
            DirectoryEntry::new("p1", "alice again"),
        ];
        assert_eq!(
            filter_candidates(&entries, "", "Anonymous"),
            vec![DirectoryEntry::new("p1", "alice")]
        );
    }

    #[test]
    fn sync_opens_and_closes_with_the_caret() {
        let mut controller = controller();
        controller.sync("hi @al", Some(6), &directory());
        assert_eq!(controller.query(), Some("al"));
        assert_eq!(controller.candidates().len(), 2);
        assert_eq!(controller.selected_index(), Some(0));

        controller.sync("hi @al ", Some(7), &directory());
        assert_eq!(controller.state(), &AutocompleteState::Closed);
    }

    #[test]
    fn open_with_no_matches_is_not_presenting() {
        let mut controller = controller();
        controller.sync("@zzz", Some(4), &directory());
        assert!(controller.is_open());
        assert!(!controller.is_presenting());
        assert_eq!(controller.selected_index(), None);
    }

    #[test]
    fn non_collapsed_selection_closes() {
        let mut controller = controller();
        controller.sync("@al", Some(3), &directory());
        controller.sync("@al", None, &directory());
        assert!(controller.state().is_closed());
    }

    #[test]
    fn selection_clamps_at_both_ends() {
        let mut controller = controller();
        controller.sync("@", Some(1), &directory());
        controller.move_up();
        assert_eq!(controller.selected_index(), Some(0));
        for _ in 0..5 {
            controller.move_down();
        }
        assert_eq!(controller.selected_index(), Some(2));
        controller.move_up();
        assert_eq!(controller.selected_index(), Some(1));
    }

    #[test]
    fn identical_resync_keeps_selection_but_new_query_resets_it() {
        let mut controller = controller();
        controller.sync("@a", Some(2), &directory());
        controller.move_down();
        assert_eq!(controller.selected_index(), Some(1));

        controller.sync("@a", Some(2), &directory());
        assert_eq!(controller.selected_index(), Some(1));

        controller.sync("@al", Some(3), &directory());
        assert_eq!(controller.selected_index(), Some(0));
    }

    #[test]
    fn commit_replaces_query_and_appends_separator() {
        let mut controller = controller();
        let mut registry = MentionRegistry::new('@');
        controller.sync("hi @al", Some(6), &directory());
        let entry = controller.selected_candidate().cloned().expect("candidate");

        let edit = controller
            .commit(&entry, &mut registry, "hi @al", 6, ' ')
            .expect("commit");
        assert_eq!(
            edit,
            CommitEdit {
                text: "hi @alice ".to_string(),
                caret: 10,
                handle: "@alice".to_string(),
            }
        );
        assert_eq!(registry.get("@alice"), Some(&ParticipantId::new("p1")));
        assert!(controller.state().is_closed());
    }

    #[test]
    fn commit_reuses_existing_whitespace_after_the_caret() {
        let mut controller = controller();
        let mut registry = MentionRegistry::new('@');
        let entry = DirectoryEntry::new("p2", "bob");

        let edit = controller
            .commit(&entry, &mut registry, "@b and more", 2, ' ')
            .expect("commit");
        assert_eq!(edit.text, "@bob and more");
        assert_eq!(edit.caret, 4);
        assert!(controller.state().is_closed());
    }

    #[test]
    fn commit_without_query_is_a_noop() {
        let mut controller = controller();
        let mut registry = MentionRegistry::new('@');
        let entry = DirectoryEntry::new("p2", "bob");
        assert_eq!(
            controller.commit(&entry, &mut registry, "plain", 5, ' '),
            None
        );
        assert!(registry.is_empty());
    }
}

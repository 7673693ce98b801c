//! Transmission tokens for mentions.
//!
//! In the composer a mention is displayed as its handle (`@alice`). Before a message leaves the
//! composer every still-registered handle is rewritten to a token made of the marker followed by
//! the participant id (`@05ab…`). Any other marker-prefixed text is copied through untouched, so
//! an unresolved `@text` typed by the user never turns into a mention.
//!
//! When several handles match at the same offset the longest one wins, which keeps `@al` from
//! shadowing `@alice`.

use crate::ParticipantId;

/// Replace every occurrence of each `(handle, id)` pair in `text` with `marker` + id.
pub fn encode_tokens<'a, I>(text: &str, marker: char, handles: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a ParticipantId)>,
{
    let mut handles: Vec<(&str, &ParticipantId)> = handles
        .into_iter()
        .filter(|(handle, _)| handle.starts_with(marker))
        .collect();
    if handles.is_empty() || text.is_empty() {
        return text.to_string();
    }
    handles.sort_by_key(|(handle, _)| std::cmp::Reverse(handle.len()));

    let mut out = String::with_capacity(text.len());
    let mut index = 0usize;
    while index < text.len() {
        let rest = &text[index..];
        if rest.starts_with(marker)
            && let Some((handle, id)) = handles.iter().find(|(handle, _)| rest.starts_with(handle))
        {
            out.push(marker);
            out.push_str(id.as_str());
            index += handle.len();
            continue;
        }

        let Some(ch) = rest.chars().next() else {
            break;
        };
        out.push(ch);
        index += ch.len_utf8();
    }

    out
}

/// Inverse of [`encode_tokens`] for a receiver that knows the display names of the ids.
///
/// Tokens whose id is unknown are left as they are.
pub fn decode_tokens<'a, I>(text: &str, marker: char, names: I) -> String
where
    I: IntoIterator<Item = (&'a ParticipantId, &'a str)>,
{
    let mut names: Vec<(&ParticipantId, &str)> = names
        .into_iter()
        .filter(|(id, _)| !id.as_str().is_empty())
        .collect();
    if names.is_empty() || text.is_empty() {
        return text.to_string();
    }
    names.sort_by_key(|(id, _)| std::cmp::Reverse(id.as_str().len()));

    let mut out = String::with_capacity(text.len());
    let mut index = 0usize;
    while index < text.len() {
        let rest = &text[index..];
        if let Some(after_marker) = rest.strip_prefix(marker)
            && let Some((id, name)) = names
                .iter()
                .find(|(id, _)| after_marker.starts_with(id.as_str()))
        {
            out.push(marker);
            out.push_str(name);
            index += marker.len_utf8() + id.as_str().len();
            continue;
        }

        let Some(ch) = rest.chars().next() else {
            break;
        };
        out.push(ch);
        index += ch.len_utf8();
    }

    out
}

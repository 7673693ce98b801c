//! Word-boundary helpers used by the cursor engine for word-wise navigation.
//!
//! The buffer is split into segments: whitespace runs, mention runs and the plain words in
//! between. A word jump never stops inside a mention run: a run is always crossed as a whole, and
//! a plain word that runs into a mention ends at the mention's edge.

use std::ops::Range;

use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentKind {
    Word,
    Whitespace,
    Mention,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    start: usize,
    end: usize,
    kind: SegmentKind,
}

/// Return the byte index where a word jump to the right from `pos` lands.
pub(crate) fn next_word_boundary(text: &str, pos: usize, runs: &[Range<usize>]) -> usize {
    let mut pos = pos.min(text.len());
    if let Some(ch) = text[pos..].chars().next()
        && ch.is_whitespace()
    {
        pos += ch.len_utf8();
    }
    if pos >= text.len() {
        return text.len();
    }

    let segments = segments(text, runs);
    let Some(segment) = segments.iter().find(|s| pos >= s.start && pos < s.end) else {
        return text.len();
    };
    match segment.kind {
        SegmentKind::Word | SegmentKind::Mention => segment.end,
        SegmentKind::Whitespace => next_grapheme_boundary(text, pos),
    }
}

/// Return the byte index where a word jump to the left from `pos` lands.
pub(crate) fn previous_word_boundary(text: &str, pos: usize, runs: &[Range<usize>]) -> usize {
    let mut pos = pos.min(text.len());
    if let Some(ch) = text[..pos].chars().next_back()
        && ch.is_whitespace()
    {
        pos -= ch.len_utf8();
    }
    if pos == 0 {
        return 0;
    }

    let segments = segments(text, runs);
    let Some(segment) = segments.iter().find(|s| pos > s.start && pos <= s.end) else {
        return 0;
    };
    match segment.kind {
        SegmentKind::Word | SegmentKind::Mention => segment.start,
        SegmentKind::Whitespace => previous_grapheme_boundary(text, pos),
    }
}

pub(crate) fn next_grapheme_boundary(text: &str, pos: usize) -> usize {
    text.get(pos..)
        .and_then(|rest| rest.graphemes(true).next())
        .map_or(text.len(), |grapheme| pos + grapheme.len())
}

pub(crate) fn previous_grapheme_boundary(text: &str, pos: usize) -> usize {
    text.get(..pos)
        .and_then(|head| head.graphemes(true).next_back())
        .map_or(0, |grapheme| pos - grapheme.len())
}

/// Split `text` into segments. `runs` must be sorted and non-overlapping.
fn segments(text: &str, runs: &[Range<usize>]) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut cursor = 0usize;
    for run in runs {
        if run.start < cursor || run.end > text.len() {
            continue;
        }
        push_plain(text, cursor..run.start, &mut segments);
        segments.push(Segment {
            start: run.start,
            end: run.end,
            kind: SegmentKind::Mention,
        });
        cursor = run.end;
    }
    push_plain(text, cursor..text.len(), &mut segments);
    segments
}

fn push_plain(text: &str, range: Range<usize>, out: &mut Vec<Segment>) {
    if range.start >= range.end {
        return;
    }

    let slice = &text[range.clone()];
    let mut run_start = range.start;
    let mut run_is_whitespace = None;
    for (idx, ch) in slice.char_indices() {
        let is_whitespace = ch.is_whitespace();
        match run_is_whitespace {
            None => run_is_whitespace = Some(is_whitespace),
            Some(prev) if prev != is_whitespace => {
                out.push(plain_segment(run_start, range.start + idx, prev));
                run_start = range.start + idx;
                run_is_whitespace = Some(is_whitespace);
            }
            Some(_) => {}
        }
    }
    if let Some(is_whitespace) = run_is_whitespace {
        out.push(plain_segment(run_start, range.end, is_whitespace));
    }
}

fn plain_segment(start: usize, end: usize, is_whitespace: bool) -> Segment {
    Segment {
        start,
        end,
        kind: if is_whitespace {
            SegmentKind::Whitespace
        } else {
            SegmentKind::Word
        },
    }
}

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Truncate `text` to at most `max_width` terminal columns, ending with a single ellipsis when
/// anything was cut. Grapheme clusters are never split.
pub(crate) fn truncate_text(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }

    let budget = max_width - 1;
    let mut out = String::new();
    let mut width = 0usize;
    for grapheme in text.graphemes(true) {
        let grapheme_width = UnicodeWidthStr::width(grapheme);
        if width + grapheme_width > budget {
            break;
        }
        width += grapheme_width;
        out.push_str(grapheme);
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_text("alice", 10), "alice");
        assert_eq!(truncate_text("alice", 5), "alice");
    }

    #[test]
    fn long_text_ends_with_ellipsis() {
        assert_eq!(truncate_text("alexandria", 5), "alex…");
        assert_eq!(truncate_text("alexandria", 1), "…");
        assert_eq!(truncate_text("alexandria", 0), "");
    }

    #[test]
    fn wide_characters_count_double() {
        // Each ideograph is two columns wide.
        assert_eq!(truncate_text("日本語の名前", 5), "日本…");
    }
}

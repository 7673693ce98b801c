//! Candidate list for the mention autocomplete.
//!
//! Renders one row per candidate (`display name  id`), highlights the selected row and keeps it
//! scrolled into view. Nothing is drawn while the controller is closed.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Widget;
use ratatui::widgets::WidgetRef;

use crate::autocomplete::AutocompleteController;
use crate::text_formatting::truncate_text;

pub const MAX_POPUP_ROWS: usize = 8;

const NAME_MAX_WIDTH: usize = 21;

pub struct MentionPopup<'a> {
    controller: &'a AutocompleteController,
}

impl<'a> MentionPopup<'a> {
    pub fn new(controller: &'a AutocompleteController) -> Self {
        Self { controller }
    }

    /// Rows needed to draw the popup; zero while the controller is closed.
    pub fn desired_height(&self) -> u16 {
        if !self.controller.is_open() {
            return 0;
        }
        self.controller.candidates().len().clamp(1, MAX_POPUP_ROWS) as u16
    }

    /// First candidate index to draw so that the selection stays visible.
    fn scroll_top(&self, visible: usize) -> usize {
        let selected = self.controller.selected_index().unwrap_or(0);
        selected.saturating_sub(visible.saturating_sub(1))
    }
}

impl WidgetRef for &MentionPopup<'_> {
    fn render_ref(&self, area: Rect, buf: &mut Buffer) {
        if !self.controller.is_open() || area.is_empty() {
            return;
        }

        let candidates = self.controller.candidates();
        if candidates.is_empty() {
            Line::from("  no matches".dim().italic()).render(
                Rect {
                    height: 1,
                    ..area
                },
                buf,
            );
            return;
        }

        let visible = (area.height as usize).min(MAX_POPUP_ROWS);
        let top = self.scroll_top(visible);
        let selected = self.controller.selected_index();
        for (row, idx) in (top..candidates.len()).take(visible).enumerate() {
            let entry = &candidates[idx];
            let name = truncate_text(
                entry.display_name.as_deref().unwrap_or_default(),
                NAME_MAX_WIDTH,
            );
            let is_selected = selected == Some(idx);
            let line = Line::from(vec![
                Span::from(if is_selected { "› " } else { "  " }),
                if is_selected {
                    Span::from(name).bold()
                } else {
                    Span::from(name)
                },
                "  ".into(),
                Span::from(entry.id.to_string()).dim(),
            ]);
            line.render(
                Rect {
                    y: area.y + row as u16,
                    height: 1,
                    ..area
                },
                buf,
            );
        }
    }
}

//! Clickable UI building blocks shared by the game renderers.
//!
//! Each component draws itself and registers its own click targets, so the
//! hit regions always match what is on screen.

use ratzilla::ratatui::layout::Rect;
use ratzilla::ratatui::style::{Color, Style};
use ratzilla::ratatui::text::{Line, Span};
use ratzilla::ratatui::widgets::{Block, Paragraph};
use ratzilla::ratatui::Frame;

use crate::input::ClickState;

// ── TabBar ─────────────────────────────────────────────────────

/// One row of labelled buttons separated by `separator`.
///
/// ```ignore
/// TabBar::new("│")
///     .tab("Team", style, TAB_TEAM)
///     .tab("Shop", style, TAB_SHOP)
///     .render(f, area, &mut cs);
/// ```
pub struct TabBar<'a> {
    tabs: Vec<(String, Style, u16)>,
    separator: &'a str,
    block: Option<Block<'a>>,
}

impl<'a> TabBar<'a> {
    pub fn new(separator: &'a str) -> Self {
        Self {
            tabs: Vec::new(),
            separator,
            block: None,
        }
    }

    pub fn tab(mut self, label: impl Into<String>, style: Style, action_id: u16) -> Self {
        self.tabs.push((label.into(), style, action_id));
        self
    }

    /// Targets are placed inside the block's borders.
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    pub fn render(self, f: &mut Frame, area: Rect, cs: &mut ClickState) {
        let separator_width = Line::from(self.separator).width() as u16;
        let mut spans = Vec::with_capacity(self.tabs.len() * 2);
        let mut widths = Vec::with_capacity(self.tabs.len());
        for (i, (label, style, action_id)) in self.tabs.into_iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(self.separator, Style::default().fg(Color::DarkGray)));
            }
            let padded = format!(" {label} ");
            widths.push((Line::from(padded.as_str()).width() as u16, action_id));
            spans.push(Span::styled(padded, style));
        }

        let inner = self.block.as_ref().map_or(area, |b| b.inner(area));
        let mut paragraph = Paragraph::new(Line::from(spans));
        if let Some(block) = self.block {
            paragraph = paragraph.block(block);
        }
        f.render_widget(paragraph, area);

        // Full outer height so taps on the border still land.
        cs.register_tab_targets(&widths, separator_width, inner.x, area.y, inner.width, area.height.max(1));
    }
}

// ── ClickableList ──────────────────────────────────────────────

/// Lines paired with the action each one triggers. Rows are resolved when
/// targets are registered, so inserting lines never desynchronizes clicks.
pub struct ClickableList<'a> {
    lines: Vec<Line<'a>>,
    /// `(line index, action id)`
    actions: Vec<(u16, u16)>,
}

impl<'a> ClickableList<'a> {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn push_clickable(&mut self, line: Line<'a>, action_id: u16) {
        self.actions.push((self.lines.len() as u16, action_id));
        self.lines.push(line);
    }

    pub fn into_lines(self) -> Vec<Line<'a>> {
        self.lines
    }

    /// One row per line; lines past the bottom offset are clipped.
    pub fn register_targets(&self, area: Rect, cs: &mut ClickState, top_offset: u16, bottom_offset: u16) {
        let first_row = area.y + top_offset;
        let end = area.y + area.height.saturating_sub(bottom_offset);
        for &(line, action_id) in &self.actions {
            let row = first_row + line;
            if row < end {
                cs.add_row_target(area, row, action_id);
            }
        }
    }
}

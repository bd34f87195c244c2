//! Input plumbing shared by the shell and the game: normalized events,
//! click targets and DOM pixel → terminal cell conversion.

use ratzilla::ratatui::layout::Rect;

/// Keyboard and pointer input after normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key(char),
    /// Tap or click on a registered target; carries the game's action id.
    Click(u16),
}

/// A tappable region in terminal cell coordinates.
#[derive(Debug, Clone)]
pub struct ClickTarget {
    pub rect: Rect,
    pub action_id: u16,
}

/// Targets registered by the last render, read by the mouse handler.
pub struct ClickState {
    pub targets: Vec<ClickTarget>,
    pub terminal_cols: u16,
    pub terminal_rows: u16,
}

impl ClickState {
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
            terminal_cols: 0,
            terminal_rows: 0,
        }
    }

    pub fn clear_targets(&mut self) {
        self.targets.clear();
    }

    pub fn add_click_target(&mut self, rect: Rect, action_id: u16) {
        self.targets.push(ClickTarget { rect, action_id });
    }

    /// Full-width target on `row`, ignored when the row is outside `area`.
    pub fn add_row_target(&mut self, area: Rect, row: u16, action_id: u16) {
        if row >= area.y && row < area.y + area.height {
            self.add_click_target(Rect::new(area.x, row, area.width, 1), action_id);
        }
    }

    /// Targets for a row of tabs laid out left to right.
    ///
    /// `tab_widths` holds `(display width, action id)` per padded label. Each
    /// target extends to the middle of its neighbouring separators; the first
    /// and last reach the edges of `total_width`, so the bar has no dead
    /// columns.
    pub fn register_tab_targets(
        &mut self,
        tab_widths: &[(u16, u16)],
        separator_width: u16,
        x: u16,
        y: u16,
        total_width: u16,
        height: u16,
    ) {
        if tab_widths.is_empty() || total_width == 0 {
            return;
        }
        let mut spans: Vec<(u16, u16)> = Vec::with_capacity(tab_widths.len());
        let mut cursor = 0u16;
        for &(width, _) in tab_widths {
            spans.push((cursor, cursor + width));
            cursor += width + separator_width;
        }

        let last = spans.len() - 1;
        for (i, &(_, action_id)) in tab_widths.iter().enumerate() {
            let left = if i == 0 {
                0
            } else {
                let gap_start = spans[i - 1].1;
                gap_start + (spans[i].0 - gap_start) / 2
            };
            let right = if i == last {
                total_width
            } else {
                let gap_start = spans[i].1;
                gap_start + (spans[i + 1].0 - gap_start) / 2
            };
            let width = right.min(total_width).saturating_sub(left);
            if width > 0 {
                self.add_click_target(Rect::new(x + left, y, width, height), action_id);
            }
        }
    }

    /// Action id at a cell. Later targets sit on top of earlier ones.
    pub fn hit_test(&self, col: u16, row: u16) -> Option<u16> {
        self.targets.iter().rev().find_map(|t| {
            let r = t.rect;
            let inside = col >= r.x && col < r.x + r.width && row >= r.y && row < r.y + r.height;
            inside.then_some(t.action_id)
        })
    }
}

pub fn is_narrow_layout(width: u16) -> bool {
    width < 60
}

/// Map an offset within the grid container (px) onto one of `cells` equal
/// slices of `extent` px.
fn pixel_to_cell(offset: f64, extent: f64, cells: u16) -> Option<u16> {
    if extent <= 0.0 || cells == 0 || offset < 0.0 {
        return None;
    }
    let cell = (offset / (extent / cells as f64)) as u16;
    (cell < cells).then_some(cell)
}

pub fn pixel_y_to_row(click_y: f64, grid_height: f64, terminal_rows: u16) -> Option<u16> {
    pixel_to_cell(click_y, grid_height, terminal_rows)
}

pub fn pixel_x_to_col(click_x: f64, grid_width: f64, terminal_cols: u16) -> Option<u16> {
    pixel_to_cell(click_x, grid_width, terminal_cols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_test_prefers_topmost() {
        let mut cs = ClickState::new();
        cs.add_click_target(Rect::new(0, 5, 80, 1), 1);
        cs.add_click_target(Rect::new(5, 5, 10, 1), 2);
        assert_eq!(cs.hit_test(7, 5), Some(2));
        assert_eq!(cs.hit_test(0, 5), Some(1));
        assert_eq!(cs.hit_test(0, 6), None);
    }

    #[test]
    fn multi_row_target() {
        let mut cs = ClickState::new();
        cs.add_click_target(Rect::new(0, 5, 40, 3), 42);
        assert_eq!(cs.hit_test(10, 4), None);
        assert_eq!(cs.hit_test(10, 7), Some(42));
        assert_eq!(cs.hit_test(10, 8), None);
        cs.clear_targets();
        assert_eq!(cs.hit_test(10, 5), None);
    }

    #[test]
    fn row_target_outside_area_ignored() {
        let mut cs = ClickState::new();
        let area = Rect::new(5, 10, 30, 5);
        cs.add_row_target(area, 9, 1);
        cs.add_row_target(area, 15, 2);
        assert!(cs.targets.is_empty());
        cs.add_row_target(area, 12, 3);
        assert_eq!(cs.hit_test(6, 12), Some(3));
    }

    #[test]
    fn narrow_layout_threshold() {
        assert!(is_narrow_layout(59));
        assert!(!is_narrow_layout(60));
    }

    #[test]
    fn pixel_conversion() {
        assert_eq!(pixel_y_to_row(0.0, 450.0, 30), Some(0));
        assert_eq!(pixel_y_to_row(15.0, 450.0, 30), Some(1));
        assert_eq!(pixel_y_to_row(449.0, 450.0, 30), Some(29));
        assert_eq!(pixel_y_to_row(450.0, 450.0, 30), None);
        assert_eq!(pixel_y_to_row(-1.0, 450.0, 30), None);
        assert_eq!(pixel_y_to_row(10.0, 0.0, 30), None);
        assert_eq!(pixel_x_to_col(10.0, 800.0, 80), Some(1));
        assert_eq!(pixel_x_to_col(10.0, 800.0, 0), None);
    }

    #[test]
    fn tab_targets_split_separators() {
        // Labels 6 wide, separator 3: tabs at 0..6, 9..15, 18..24.
        let mut cs = ClickState::new();
        cs.register_tab_targets(&[(6, 10), (6, 11), (6, 12)], 3, 0, 5, 80, 1);
        assert_eq!(cs.targets.len(), 3);
        assert_eq!(cs.hit_test(6, 5), Some(10));
        assert_eq!(cs.hit_test(7, 5), Some(11));
        assert_eq!(cs.hit_test(15, 5), Some(11));
        assert_eq!(cs.hit_test(16, 5), Some(12));
        assert_eq!(cs.hit_test(79, 5), Some(12));
    }

    #[test]
    fn tab_targets_respect_offset_and_height() {
        let mut cs = ClickState::new();
        cs.register_tab_targets(&[(6, 10), (6, 11)], 1, 5, 3, 30, 2);
        assert_eq!(cs.hit_test(5, 4), Some(10));
        assert_eq!(cs.hit_test(4, 3), None);
        cs.clear_targets();
        cs.register_tab_targets(&[], 1, 0, 0, 30, 1);
        assert!(cs.targets.is_empty());
    }

    #[test]
    fn tap_at_cell_center_hits_its_row() {
        let mut cs = ClickState::new();
        cs.terminal_rows = 50;
        cs.add_click_target(Rect::new(0, 9, 37, 1), 1);
        cs.add_click_target(Rect::new(0, 10, 37, 1), 2);
        let grid_height = 50.0 * 15.0;
        for (row, id) in [(9u16, 1u16), (10, 2)] {
            let y = row as f64 * 15.0 + 7.5;
            let hit = pixel_y_to_row(y, grid_height, cs.terminal_rows).and_then(|r| cs.hit_test(0, r));
            assert_eq!(hit, Some(id));
        }
    }
}

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::Widget;

/// Width of one pad in cells.
pub const PAD_WIDTH: u16 = 4;
/// Height of one pad in cells.
pub const PAD_HEIGHT: u16 = 2;
/// Gap between neighbouring pads.
pub const PAD_GAP: u16 = 1;

/// A grid of coloured pads, row 0 drawn at the bottom.
///
/// `colors` is indexed `row * columns + col`. Missing entries draw dark.
pub struct PadGrid<'a> {
    columns: usize,
    rows: usize,
    colors: &'a [Color],
    off: Color,
    outline: Option<(usize, Color)>,
}

impl<'a> PadGrid<'a> {
    pub fn new(columns: usize, rows: usize, colors: &'a [Color]) -> Self {
        Self {
            columns,
            rows,
            colors,
            off: Color::Rgb(24, 24, 24),
            outline: None,
        }
    }

    /// Colour used for pads that are switched off.
    pub fn off_color(mut self, color: Color) -> Self {
        self.off = color;
        self
    }

    /// Mark one pad (e.g. under the mouse) with a glyph in `color`.
    pub fn outline(mut self, index: usize, color: Color) -> Self {
        self.outline = Some((index, color));
        self
    }

    /// Cells needed to draw a `columns`×`rows` grid.
    pub fn size(columns: usize, rows: usize) -> (u16, u16) {
        let span = |n: usize, cell: u16| {
            let n = n as u16;
            (n * cell + n.saturating_sub(1) * PAD_GAP).max(1)
        };
        (span(columns, PAD_WIDTH), span(rows, PAD_HEIGHT))
    }

    /// Hit-test: the pad index under (x, y), or `None` for gaps and
    /// outside clicks. `area` is the Rect the grid was rendered into.
    pub fn pad_at(x: u16, y: u16, area: Rect, columns: usize, rows: usize) -> Option<usize> {
        if !area.contains((x, y).into()) {
            return None;
        }
        let (rel_x, rel_y) = (x - area.x, y - area.y);
        let (step_x, step_y) = (PAD_WIDTH + PAD_GAP, PAD_HEIGHT + PAD_GAP);
        if rel_x % step_x >= PAD_WIDTH || rel_y % step_y >= PAD_HEIGHT {
            return None;
        }
        let col = (rel_x / step_x) as usize;
        let line = (rel_y / step_y) as usize;
        if col >= columns || line >= rows {
            return None;
        }
        let row = rows - 1 - line;
        Some(row * columns + col)
    }
}

impl Widget for PadGrid<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        for line in 0..self.rows {
            let row = self.rows - 1 - line;
            let y0 = area.y + line as u16 * (PAD_HEIGHT + PAD_GAP);
            for col in 0..self.columns {
                let index = row * self.columns + col;
                let color = self.colors.get(index).copied().unwrap_or(self.off);
                let color = if color == Color::Rgb(0, 0, 0) { self.off } else { color };
                let x0 = area.x + col as u16 * (PAD_WIDTH + PAD_GAP);
                for dy in 0..PAD_HEIGHT {
                    for dx in 0..PAD_WIDTH {
                        let (x, y) = (x0 + dx, y0 + dy);
                        if x >= area.right() || y >= area.bottom() {
                            continue;
                        }
                        if let Some(cell) = buf.cell_mut((x, y)) {
                            cell.set_char(' ');
                            cell.set_style(Style::default().bg(color));
                        }
                    }
                }
                if let Some((marked, fg)) = self.outline {
                    if marked == index && x0 + 1 < area.right() && y0 < area.bottom() {
                        if let Some(cell) = buf.cell_mut((x0 + 1, y0)) {
                            cell.set_char('•');
                            cell.set_style(Style::default().fg(fg).bg(color));
                        }
                    }
                }
            }
        }
    }
}

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::Widget;

/// A single row of labelled, coloured buttons.
///
/// Buttons share the available width evenly; a label that does not fit is
/// cut.
pub struct ButtonRow<'a> {
    labels: &'a [&'a str],
    colors: &'a [Color],
    fg: Color,
}

impl<'a> ButtonRow<'a> {
    pub fn new(labels: &'a [&'a str], colors: &'a [Color]) -> Self {
        Self {
            labels,
            colors,
            fg: Color::Black,
        }
    }

    pub fn fg(mut self, color: Color) -> Self {
        self.fg = color;
        self
    }

    fn button_width(area: Rect, count: usize) -> u16 {
        if count == 0 {
            return 0;
        }
        area.width / count as u16
    }

    /// Hit-test: the button under (x, y).
    pub fn button_at(x: u16, y: u16, area: Rect, count: usize) -> Option<usize> {
        if !area.contains((x, y).into()) {
            return None;
        }
        let width = Self::button_width(area, count);
        if width == 0 {
            return None;
        }
        let index = ((x - area.x) / width) as usize;
        (index < count).then_some(index)
    }
}

impl Widget for ButtonRow<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let width = Self::button_width(area, self.labels.len());
        if area.height == 0 || width == 0 {
            return;
        }

        for (i, label) in self.labels.iter().enumerate() {
            let x0 = area.x + i as u16 * width;
            let bg = self.colors.get(i).copied().unwrap_or(Color::Reset);
            let style = Style::default().fg(self.fg).bg(bg);
            // Leave the last column of each button as a separator.
            let inner = width.saturating_sub(1);
            let pad = inner.saturating_sub(label.chars().count() as u16) / 2;
            let mut chars = label.chars();
            for dx in 0..inner {
                let ch = if dx >= pad { chars.next().unwrap_or(' ') } else { ' ' };
                if let Some(cell) = buf.cell_mut((x0 + dx, area.y)) {
                    cell.set_char(ch);
                    cell.set_style(style);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_test() {
        let area = Rect::new(2, 1, 40, 1);
        assert_eq!(ButtonRow::button_at(2, 1, area, 8), Some(0));
        assert_eq!(ButtonRow::button_at(41, 1, area, 8), Some(7));
        assert_eq!(ButtonRow::button_at(41, 2, area, 8), None);
        assert_eq!(ButtonRow::button_at(1, 1, area, 8), None);
    }

    #[test]
    fn labels_are_centred() {
        let area = Rect::new(0, 0, 12, 1);
        let mut buf = Buffer::empty(area);
        let colors = [Color::Red, Color::Blue];
        ButtonRow::new(&["ab", "c"], &colors).render(area, &mut buf);
        assert_eq!(buf[(1, 0)].symbol(), "a");
        assert_eq!(buf[(2, 0)].symbol(), "b");
        assert_eq!(buf[(0, 0)].bg, Color::Red);
        assert_eq!(buf[(8, 0)].symbol(), "c");
        assert_eq!(buf[(6, 0)].bg, Color::Blue);
    }
}

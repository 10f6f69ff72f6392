use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Widget;

/// One-line bar listing selectable modes, the active one highlighted, with
/// an optional right-aligned status (e.g. "REC").
pub struct ModeBar<'a> {
    modes: &'a [&'a str],
    active: usize,
    status: Option<(&'a str, Style)>,
    style: Style,
    active_style: Style,
}

const SEPARATOR: &str = "  ";

impl<'a> ModeBar<'a> {
    pub fn new(modes: &'a [&'a str], active: usize) -> Self {
        Self {
            modes,
            active,
            status: None,
            style: Style::default().fg(Color::DarkGray),
            active_style: Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD),
        }
    }

    pub fn status(mut self, text: &'a str, style: Style) -> Self {
        self.status = Some((text, style));
        self
    }

    /// Hit-test: given a click at (x, y), return which mode was clicked.
    pub fn mode_at(x: u16, y: u16, area: Rect, modes: &[&str]) -> Option<usize> {
        if y != area.y || x < area.x || x >= area.right() {
            return None;
        }
        let rel_x = (x - area.x) as usize;
        let mut pos = 0;
        for (i, mode) in modes.iter().enumerate() {
            let len = mode.chars().count() + 2;
            if rel_x >= pos && rel_x < pos + len {
                return Some(i);
            }
            pos += len + SEPARATOR.len();
        }
        None
    }
}

impl Widget for ModeBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let y = area.y;
        let mut x = area.x;
        for (i, mode) in self.modes.iter().enumerate() {
            if i > 0 {
                x += SEPARATOR.len() as u16;
            }
            let style = if i == self.active {
                self.active_style
            } else {
                self.style
            };
            for ch in std::iter::once(' ').chain(mode.chars()).chain(std::iter::once(' ')) {
                if x >= area.right() {
                    break;
                }
                if let Some(cell) = buf.cell_mut((x, y)) {
                    cell.set_char(ch);
                    cell.set_style(style);
                }
                x += 1;
            }
        }

        if let Some((text, style)) = self.status {
            let len = text.chars().count() as u16;
            if len < area.width && area.right() - len >= x {
                let sx = area.right() - len;
                for (i, ch) in text.chars().enumerate() {
                    if let Some(cell) = buf.cell_mut((sx + i as u16, y)) {
                        cell.set_char(ch);
                        cell.set_style(style);
                    }
                }
            }
        }
    }
}

pub mod button_row;
pub mod mode_bar;
pub mod pad_grid;

pub use button_row::ButtonRow;
pub use mode_bar::ModeBar;
pub use pad_grid::PadGrid;

use ratatui::layout::Rect;

/// Compute a centered rectangle within `area`.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    Rect::new(x, y, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_is_clamped() {
        let area = Rect::new(0, 0, 10, 4);
        assert_eq!(centered_rect(4, 2, area), Rect::new(3, 1, 4, 2));
        assert_eq!(centered_rect(20, 20, area), area);
    }
}

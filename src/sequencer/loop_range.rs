use crate::clip::{DrumPadBank, NoteClip};
use crate::grid::PadPosition;

use super::SequencerView;

impl<C: NoteClip, B: DrumPadBank> SequencerView<C, B> {
    /// Page pads: a single tap shows that page, pressing two pads sets the
    /// loop to the pages between them.
    pub(super) fn handle_loop(&mut self, pos: PadPosition, velocity: u8) {
        let Some(page) = self.layout.loop_page(pos) else {
            return;
        };

        if velocity > 0 {
            if self.cursor.loop_pad_pressed.is_none() {
                self.cursor.loop_pad_pressed = Some(page);
            }
            return;
        }

        let Some(first) = self.cursor.loop_pad_pressed.take() else {
            return;
        };

        // Tapping another page shows it; tapping the shown page loops it.
        if first == page && page != self.clip.edit_page() {
            self.clip.scroll_to_page(page);
            log::debug!("Showing page {page}");
            return;
        }

        if self.pages.page_length() <= 0.0 {
            log::debug!("Loop gesture ignored: page shorter than a beat");
            return;
        }
        let (start, length) = self.pages.loop_bounds(first, page);
        self.clip.set_loop_start(start);
        self.clip.set_loop_length(length);
        self.clip.set_play_range(start, start + length);
        log::info!("Loop set to pages {}..={}: {start} + {length} beats", first.min(page), first.max(page));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use crate::clip::{MemoryClip, MemoryDrumBank, NoteClip};
    use crate::grid::GridLayout;
    use crate::sequencer::tests::{options, view, TestView};
    use crate::sequencer::{SequencerView, ViewKind, ViewOptions};

    /// Grid index of a page pad.
    fn page_pad(v: &TestView, page: usize) -> usize {
        let (col, row) = v.layout().page_position(page).unwrap();
        v.layout().index(col, row).unwrap()
    }

    #[test]
    fn tap_selects_page() {
        let mut v = view(ViewKind::Note);
        let t0 = Instant::now();
        let pad = page_pad(&v, 3);
        v.handle_pad(pad, 100, t0);
        v.handle_pad(pad, 0, t0);
        assert_eq!(v.clip().edit_page(), 3);
        assert_eq!(v.clip().loop_length(), 8.0);
        assert!(v.cursor().loop_pad_pressed.is_none());
    }

    #[test]
    fn two_pads_set_loop() {
        let mut v = view(ViewKind::Note);
        let t0 = Instant::now();
        // 32 steps of 1/16 = 8 beats per page.
        let (a, b) = (page_pad(&v, 3), page_pad(&v, 1));
        v.handle_pad(a, 100, t0);
        v.handle_pad(b, 100, t0);
        v.handle_pad(b, 0, t0);
        assert_eq!(v.clip().loop_start(), 8.0);
        assert_eq!(v.clip().loop_length(), 24.0);
        assert_eq!(v.clip().play_range(), (8.0, 32.0));
        assert_eq!(v.clip().edit_page(), 0);

        // The first pad's own release finds nothing recorded.
        v.handle_pad(a, 0, t0);
        assert_eq!(v.clip().loop_length(), 24.0);
        assert_eq!(v.clip().edit_page(), 0);
    }

    #[test]
    fn first_pressed_pad_wins() {
        let mut v = view(ViewKind::Note);
        let t0 = Instant::now();
        let (a, b, c) = (page_pad(&v, 0), page_pad(&v, 5), page_pad(&v, 2));
        v.handle_pad(a, 100, t0);
        v.handle_pad(b, 100, t0);
        v.handle_pad(c, 100, t0);
        v.handle_pad(c, 0, t0);
        assert_eq!(v.clip().loop_start(), 0.0);
        assert_eq!(v.clip().loop_length(), 24.0);
    }

    #[test]
    fn sub_beat_pages_ignore_loop_gesture() {
        // Two steps of 1/32 floor to a zero-length page.
        let layout = GridLayout::new(2, 3, 1, 1).unwrap();
        let clip = MemoryClip::new(2, 0.125, 4.0);
        let bank = MemoryDrumBank::new(16, 0, 36);
        let options = ViewOptions {
            resolution: 7,
            ..options()
        };
        let mut v = SequencerView::new(ViewKind::Note, layout, options, clip, bank).unwrap();
        assert_eq!(v.pages().page_length(), 0.0);

        let t0 = Instant::now();
        let (a, b) = (page_pad(&v, 0), page_pad(&v, 1));
        v.handle_pad(a, 100, t0);
        v.handle_pad(b, 100, t0);
        v.handle_pad(b, 0, t0);
        assert_eq!(v.clip().loop_length(), 4.0);
        assert!(v.cursor().loop_pad_pressed.is_none());
    }

    #[test]
    fn tapping_the_shown_page_loops_it() {
        let mut v = view(ViewKind::Note);
        let t0 = Instant::now();
        let pad = page_pad(&v, 2);
        v.handle_pad(pad, 100, t0);
        v.handle_pad(pad, 0, t0);
        assert_eq!(v.clip().edit_page(), 2);
        assert_eq!(v.clip().loop_start(), 0.0);

        v.handle_pad(pad, 100, t0);
        v.handle_pad(pad, 0, t0);
        assert_eq!(v.clip().edit_page(), 2);
        assert_eq!(v.clip().loop_start(), 16.0);
        assert_eq!(v.clip().loop_length(), 8.0);
        assert_eq!(v.clip().play_range(), (16.0, 24.0));
    }
}

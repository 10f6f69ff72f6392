use crate::clip::{DrumPadBank, NoteClip};

use super::{Modifier, SequencerView};

const MIN_OFFSET: i8 = -2;
const MAX_OFFSET: i8 = 1;
/// Note of the first drum pad at offset 0 (GM kick).
const DRUM_BASE_NOTE: i16 = 36;

/// Octave window over the drum bank, counted in blocks of 16 pads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrumOffset(i8);

impl DrumOffset {
    pub fn value(self) -> i8 {
        self.0
    }

    /// Returns whether the offset changed.
    pub fn up(&mut self) -> bool {
        let next = (self.0 + 1).min(MAX_OFFSET);
        std::mem::replace(&mut self.0, next) != next
    }

    pub fn down(&mut self) -> bool {
        let next = (self.0 - 1).max(MIN_OFFSET);
        std::mem::replace(&mut self.0, next) != next
    }

    pub fn base_note(self) -> u8 {
        (DRUM_BASE_NOTE + 16 * self.0 as i16) as u8
    }

    /// Note for the `index`th drum pad, `None` past the MIDI range.
    pub fn note_for(self, index: usize) -> Option<u8> {
        let note = self.base_note() as usize + index;
        u8::try_from(note).ok().filter(|&n| n <= 127)
    }
}

/// Page the bank over `pads` drum pads starting at the default offset's
/// base note. A bank that cannot reach that note is left as it was.
pub fn sync_drum_bank<B: DrumPadBank>(bank: &mut B, pads: usize) -> anyhow::Result<()> {
    let (page, position) = (bank.page_size(), bank.position());
    let base = DrumOffset::default().base_note() as usize;
    bank.set_page_size(pads);
    bank.scroll_to(base);
    if bank.position() != base {
        let reached = bank.position();
        bank.set_page_size(page);
        bank.scroll_to(position);
        anyhow::bail!("a drum bank page of {pads} pads cannot start at note {base} (stops at {reached})");
    }
    Ok(())
}

impl<C: NoteClip, B: DrumPadBank> SequencerView<C, B> {
    /// Move the drum window one block. The bank is scrolled by the same
    /// amount so its item indices keep matching the pads; a shift the bank
    /// cannot follow is refused.
    pub(super) fn shift_drum_offset(&mut self, up: bool) -> bool {
        let previous = self.drum;
        let changed = if up { self.drum.up() } else { self.drum.down() };
        if !changed {
            return false;
        }
        let block = self.layout.block_size();
        if up {
            self.bank.scroll_forwards(block);
        } else {
            self.bank.scroll_backwards(block);
        }
        if self.bank.position() != self.drum.base_note() as usize {
            log::warn!(
                "Drum bank stops at {}, keeping pads at note {}",
                self.bank.position(),
                previous.base_note()
            );
            self.drum = previous;
            self.bank.scroll_to(previous.base_note() as usize);
            return false;
        }
        log::info!(
            "Drum offset {} (pads start at note {}, bank at {})",
            self.drum.value(),
            self.drum.base_note(),
            self.bank.position()
        );
        true
    }

    /// A drum pad press. A held modifier turns the press into a bank
    /// command and the pad stops counting as held.
    pub(super) fn press_drum_pad(&mut self, index: usize, play_index: usize) {
        let modifier = [
            Modifier::Delete,
            Modifier::Duplicate,
            Modifier::Mute,
            Modifier::Solo,
            Modifier::Select,
        ]
        .into_iter()
        .find(|m| self.modifiers.contains(m));

        match modifier {
            Some(Modifier::Delete) => {
                if let Some(note) = self.play_note(play_index) {
                    self.clip.clear_row(self.channel, note);
                    log::info!("Cleared drum row {note}");
                }
            }
            Some(Modifier::Duplicate) => self.bank.duplicate(play_index),
            Some(Modifier::Mute) => self.bank.toggle_mute(play_index),
            Some(Modifier::Solo) => self.bank.toggle_solo(play_index),
            Some(Modifier::Select) | None => {
                self.bank.select(play_index);
                self.cursor.selected_pad = Some(play_index);
            }
        }

        if let Some(m) = modifier {
            log::debug!("Drum pad {play_index}: {m:?}");
            self.buttons.clear([index]);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::clip::{MemoryClip, MemoryDrumBank, StepState};
    use crate::grid::GridLayout;
    use crate::sequencer::tests::{TestView, options, step_pad, tap, view};
    use crate::sequencer::{Control, ViewKind};

    #[test]
    fn offset_is_clamped() {
        let mut d = DrumOffset::default();
        assert!(d.up());
        assert!(!d.up());
        assert_eq!(d.value(), 1);
        assert!(d.down());
        assert!(d.down());
        assert!(d.down());
        assert!(!d.down());
        assert_eq!(d.value(), -2);
        assert_eq!(d.base_note(), 4);
    }

    #[test]
    fn notes_stop_at_midi_range() {
        let mut d = DrumOffset::default();
        d.up();
        assert_eq!(d.base_note(), 52);
        assert_eq!(d.note_for(75), Some(127));
        assert_eq!(d.note_for(76), None);
    }

    #[test]
    fn octave_shift_scrolls_bank_in_step() {
        let mut v = view(ViewKind::Drum);
        let t0 = Instant::now();
        assert_eq!(v.bank().position(), 36);
        v.handle_control(Control::OctaveUp, t0);
        assert_eq!(v.drum_offset(), 1);
        assert_eq!(v.bank().position(), 52);
        v.handle_control(Control::OctaveUp, t0);
        assert_eq!(v.drum_offset(), 1);
        assert_eq!(v.bank().position(), 52);
        v.handle_control(Control::OctaveDown, t0);
        assert_eq!(v.drum_offset(), 0);
        assert_eq!(v.bank().position(), 36);
    }

    #[test]
    fn octave_shift_drops_held_pads_and_remaps() {
        let mut v = view(ViewKind::Drum);
        let t0 = Instant::now();
        v.handle_pad(3, 100, t0);
        assert!(v.buttons().is_pressed(3));
        v.handle_control(Control::OctaveDown, t0);
        assert!(!v.buttons().is_pressed(3));
        assert_eq!(v.play_note(3), Some(23));
        assert_eq!(v.note_for_pad(3), Some(39));
        v.tick(t0 + Duration::from_millis(10));
        assert_eq!(v.note_for_pad(3), Some(23));
    }

    #[test]
    fn bottom_offset_does_not_scroll() {
        let mut v = view(ViewKind::Drum);
        let t0 = Instant::now();
        v.handle_control(Control::OctaveDown, t0);
        v.handle_control(Control::OctaveDown, t0);
        assert_eq!(v.bank().position(), 4);
        v.handle_control(Control::OctaveDown, t0);
        assert_eq!(v.drum_offset(), -2);
        assert_eq!(v.bank().position(), 4);
    }

    #[test]
    fn pad_press_selects_and_drives_sequencer_row() {
        let mut v = view(ViewKind::Drum);
        let t0 = Instant::now();
        tap(&mut v, 5, t0);
        assert_eq!(v.cursor().selected_pad, Some(5));
        assert_eq!(v.bank().selected_lane(), Some(41));
        let pad = step_pad(&v, 0);
        tap(&mut v, pad, t0);
        assert_eq!(v.clip().step(0, 0, 41).state, StepState::Start);
    }

    #[test]
    fn modifier_precedence() {
        let mut v = view(ViewKind::Drum);
        let t0 = Instant::now();
        for m in [Modifier::Select, Modifier::Solo, Modifier::Mute, Modifier::Duplicate] {
            v.handle_control(Control::Modifier(m, true), t0);
        }
        v.handle_pad(2, 100, t0);
        // Duplicate wins: lane 38 is copied onto 39, nothing else happens.
        assert!(!v.bank().item(2).mute);
        assert!(!v.bank().item(2).solo);
        assert_eq!(v.cursor().selected_pad, Some(0));
        assert!(!v.buttons().is_pressed(2));

        v.handle_control(Control::Modifier(Modifier::Duplicate, false), t0);
        v.handle_pad(2, 100, t0);
        assert!(v.bank().item(2).mute);
        assert!(!v.bank().item(2).solo);

        v.handle_control(Control::Modifier(Modifier::Mute, false), t0);
        v.handle_pad(2, 100, t0);
        assert!(v.bank().item(2).solo);

        v.handle_control(Control::Modifier(Modifier::Solo, false), t0);
        v.handle_pad(2, 100, t0);
        assert_eq!(v.cursor().selected_pad, Some(2));
    }

    #[test]
    fn delete_clears_the_pad_row() {
        let mut v = view(ViewKind::Drum);
        v.clip_mut().set_step(0, 0, 36, 100, 0.25);
        v.clip_mut().set_step(0, 4, 36, 100, 0.25);
        v.clip_mut().set_step(0, 4, 37, 100, 0.25);
        let t0 = Instant::now();
        v.handle_control(Control::Modifier(Modifier::Delete, true), t0);
        v.handle_pad(0, 100, t0);
        assert_eq!(v.clip().step(0, 0, 36).state, StepState::Off);
        assert_eq!(v.clip().step(0, 4, 37).state, StepState::Start);
        assert_eq!(v.clip().note_count(), 1);
    }

    #[test]
    fn block_grid_maps_pads_through_blocks() {
        let v = view(ViewKind::Drum64);
        // (4, 0) starts the third block: two blocks per block column.
        let pad = v.layout().index(4, 0).unwrap();
        assert_eq!(v.note_for_pad(pad), Some(36 + 32));
        let pad = v.layout().index(1, 5).unwrap();
        assert_eq!(v.note_for_pad(pad), Some(36 + 16 + 4 + 1));
    }

    fn wide_view(kind: ViewKind, layout: GridLayout) -> anyhow::Result<TestView> {
        let clip = MemoryClip::new(layout.sequencer_steps(), 0.25, 8.0);
        let bank = MemoryDrumBank::new(16, 0, 36);
        SequencerView::new(kind, layout, options(), clip, bank)
    }

    #[test]
    fn wide_grid_keeps_bank_on_the_kit() {
        let mut v = wide_view(ViewKind::Drum, GridLayout::new(16, 8, 2, 4).unwrap()).unwrap();
        assert_eq!(v.bank().page_size(), 32);
        assert_eq!(v.bank().position(), 36);
        assert_eq!(v.note_for_pad(0), Some(36));
        assert!(v.bank().item(0).active);
        v.handle_control(Control::OctaveUp, Instant::now());
        assert_eq!(v.bank().position(), 52);
        assert_eq!(v.drum_offset(), 1);
    }

    #[test]
    fn shift_the_bank_cannot_follow_is_refused() {
        // 80 pads: the bank stops at lane 48.
        let mut v = wide_view(ViewKind::Drum, GridLayout::new(16, 8, 5, 2).unwrap()).unwrap();
        let t0 = Instant::now();
        assert_eq!(v.bank().position(), 36);
        v.handle_control(Control::OctaveUp, t0);
        assert_eq!(v.drum_offset(), 0);
        assert_eq!(v.bank().position(), 36);
        v.handle_control(Control::OctaveDown, t0);
        assert_eq!(v.drum_offset(), -1);
        assert_eq!(v.bank().position(), 20);
    }

    #[test]
    fn block_view_past_the_kit_is_rejected() {
        let layout = GridLayout::block_remapped(16, 8).unwrap();
        assert!(wide_view(ViewKind::Drum64, layout).is_err());
    }

    #[test]
    fn refused_switch_leaves_the_view_alone() {
        let mut v = view(ViewKind::Drum);
        let pad = step_pad(&v, 0);
        tap(&mut v, pad, Instant::now());
        let layout = GridLayout::block_remapped(16, 8).unwrap();
        assert!(v.switch_to(ViewKind::Drum64, layout, options()).is_err());
        assert_eq!(v.kind(), ViewKind::Drum);
        assert_eq!(v.bank().page_size(), 16);
        assert_eq!(v.bank().position(), 36);
        assert_eq!(v.clip().note_count(), 1);
    }
}

//! The pad-grid sequencer view.
//!
//! One engine serves every view variant. A variant is a [`GridLayout`] plus
//! two policies: how the play zone turns pads into notes
//! ([`NoteAreaPolicy`]) and how sequencer taps edit the clip
//! ([`SequencerAreaPolicy`]). Pad events arrive one at a time from the
//! input callback; every mutation schedules a coalesced redraw which the
//! caller picks up through [`SequencerView::tick`].

pub mod drum;
pub mod loop_range;
pub mod note_memory;
pub mod step_edit;

use std::collections::HashSet;
use std::time::Instant;

use serde::Deserialize;

use crate::button::{ButtonMatrix, ButtonState, PadButton};
use crate::clip::{DrumPadBank, NoteClip, StepInfo};
use crate::config::Timing;
use crate::grid::{GridLayout, PadPosition, Zone};
use crate::resolution::PageController;
use crate::scale::NoteLayout;
use crate::sched::Debounce;

use drum::DrumOffset;
pub use drum::sync_drum_bank;
use note_memory::NoteMemory;

/// Velocity used when a press arrives without one we can use.
const DEFAULT_VELOCITY: u8 = 100;

/// The view variants a session can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    /// Scale keyboard + single-note step sequencer.
    #[default]
    Note,
    /// Drum pads + step sequencer for the selected pad.
    Drum,
    /// Scale keyboard + chord step sequencer.
    Poly,
    /// Whole grid of block-remapped drum pads.
    Drum64,
}

impl ViewKind {
    pub const ALL: [ViewKind; 4] = [ViewKind::Note, ViewKind::Drum, ViewKind::Poly, ViewKind::Drum64];

    pub fn name(self) -> &'static str {
        match self {
            ViewKind::Note => "Note",
            ViewKind::Drum => "Drum",
            ViewKind::Poly => "Poly",
            ViewKind::Drum64 => "Drum 64",
        }
    }

    pub fn note_area(self) -> NoteAreaPolicy {
        match self {
            ViewKind::Note | ViewKind::Poly => NoteAreaPolicy::Scale,
            ViewKind::Drum => NoteAreaPolicy::DrumPads,
            ViewKind::Drum64 => NoteAreaPolicy::DrumBlocks,
        }
    }

    pub fn sequencer_area(self) -> SequencerAreaPolicy {
        match self {
            ViewKind::Poly => SequencerAreaPolicy::Chord,
            _ => SequencerAreaPolicy::SingleNote,
        }
    }
}

impl std::str::FromStr for ViewKind {
    type Err = anyhow::Error;

    /// Accepts the session file spelling (`note`, `drum`, `poly`, `drum64`).
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "note" => Ok(ViewKind::Note),
            "drum" => Ok(ViewKind::Drum),
            "poly" => Ok(ViewKind::Poly),
            "drum64" => Ok(ViewKind::Drum64),
            other => anyhow::bail!("Unknown view '{other}' (expected note, drum, poly or drum64)"),
        }
    }
}

/// How play-zone pads map to notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteAreaPolicy {
    /// In-key keyboard.
    Scale,
    /// Row-major drum pads backed by the drum bank.
    DrumPads,
    /// Drum pads indexed through 4×4 blocks.
    DrumBlocks,
}

impl NoteAreaPolicy {
    pub fn is_drum(self) -> bool {
        !matches!(self, NoteAreaPolicy::Scale)
    }
}

/// What a sequencer tap writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerAreaPolicy {
    /// One note row: the selected note or drum pad.
    SingleNote,
    /// Every row at once, from the captured chord.
    Chord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Delete,
    Duplicate,
    Mute,
    Solo,
    Select,
}

/// Non-pad controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Resolution button 0..8 of the control row.
    Resolution(usize),
    OctaveUp,
    OctaveDown,
    Modifier(Modifier, bool),
}

/// Per-view settings fixed at activation.
#[derive(Debug, Clone, Copy)]
pub struct ViewOptions {
    pub channel: u8,
    pub fixed_velocity: Option<u8>,
    pub resolution: usize,
    pub notes: NoteLayout,
    pub timing: Timing,
}

/// Step content remembered by a duplicate gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct CopiedStep {
    pub page: usize,
    pub step: usize,
    pub notes: Vec<(u8, StepInfo)>,
}

/// Transient editing state. Lives as long as the view and is reset when the
/// track or clip selection changes.
#[derive(Debug, Clone, Default)]
pub struct EditCursor {
    /// Selected drum pad (play index).
    pub selected_pad: Option<usize>,
    /// Selected keyboard note, the row of the single-note sequencer.
    pub selected_note: Option<u8>,
    pub loop_pad_pressed: Option<usize>,
    pub copied_step: Option<CopiedStep>,
    pub note_memory: NoteMemory,
}

pub struct SequencerView<C, B> {
    kind: ViewKind,
    layout: GridLayout,
    note_area: NoteAreaPolicy,
    sequencer_area: SequencerAreaPolicy,
    pages: PageController,
    buttons: ButtonMatrix,
    modifiers: HashSet<Modifier>,
    cursor: EditCursor,
    notes: NoteLayout,
    drum: DrumOffset,
    /// Play index → note, as last published to the hardware.
    key_map: Vec<Option<u8>>,
    rebuild: Debounce,
    redraw: Debounce,
    channel: u8,
    fixed_velocity: Option<u8>,
    clip: C,
    bank: B,
}

impl<C: NoteClip, B: DrumPadBank> SequencerView<C, B> {
    /// Activate a view. Fails if the layout does not suit the variant.
    pub fn new(
        kind: ViewKind,
        layout: GridLayout,
        options: ViewOptions,
        clip: C,
        mut bank: B,
    ) -> anyhow::Result<Self> {
        check_layout(kind, &layout)?;
        if kind.note_area().is_drum() {
            sync_drum_bank(&mut bank, layout.play_pad_count())?;
        }
        Ok(Self::activate(kind, layout, options, clip, bank))
    }

    fn activate(kind: ViewKind, layout: GridLayout, options: ViewOptions, mut clip: C, bank: B) -> Self {
        let note_area = kind.note_area();
        let pages = PageController::new(layout.sequencer_steps(), options.resolution);
        let drum = DrumOffset::default();
        if clip.exists() {
            clip.set_step_length(pages.step_length());
        }

        let cursor = EditCursor {
            selected_pad: note_area.is_drum().then_some(0),
            selected_note: (!note_area.is_drum()).then(|| options.notes.base_note()),
            ..EditCursor::default()
        };

        let mut view = SequencerView {
            kind,
            layout,
            note_area,
            sequencer_area: kind.sequencer_area(),
            pages,
            buttons: ButtonMatrix::new(layout.pad_count(), options.timing.long_press()),
            modifiers: HashSet::new(),
            cursor,
            notes: options.notes,
            drum,
            key_map: Vec::new(),
            rebuild: Debounce::new(options.timing.rebuild_delay()),
            redraw: Debounce::new(options.timing.redraw_delay()),
            channel: options.channel,
            fixed_velocity: options.fixed_velocity,
            clip,
            bank,
        };
        view.rebuild_key_map();
        log::info!(
            "Activated {} view: {}x{} grid, {} steps/page, resolution {}",
            kind.name(),
            layout.columns(),
            layout.total_rows(),
            layout.sequencer_steps(),
            view.pages.resolution().name
        );
        view
    }

    /// Deactivate the view and hand the collaborators back.
    pub fn into_parts(self) -> (C, B) {
        (self.clip, self.bank)
    }

    // -- event entry points --

    /// A pad press (`velocity > 0`) or release (`velocity == 0`).
    pub fn handle_pad(&mut self, index: usize, velocity: u8, now: Instant) {
        if !self.is_active() {
            log::debug!("Pad {index} ignored: no clip");
            return;
        }
        let Some(pos) = self.layout.position(index) else {
            log::warn!("Pad {index} is outside the {}-pad grid", self.layout.pad_count());
            return;
        };

        let released = if velocity > 0 {
            self.buttons.press(index, now, velocity);
            None
        } else {
            let button = self.buttons.get(index);
            let state = self.buttons.release(index, now).unwrap_or(ButtonState::Idle);
            Some((button, state))
        };
        log::debug!(
            "Pad {index} {} zone={} col={} row={} vel={velocity}",
            if velocity > 0 { "down" } else { "up" },
            pos.zone.name(),
            pos.col,
            pos.row
        );

        match pos.zone {
            Zone::Play => self.handle_play(index, pos, velocity),
            Zone::Sequencer => {
                if let Some((button, state)) = released {
                    self.handle_sequencer_release(pos, button, state, now);
                }
            }
            Zone::Loop => self.handle_loop(pos, velocity),
        }
        self.redraw.schedule(now);
    }

    pub fn handle_control(&mut self, control: Control, now: Instant) {
        match control {
            Control::Modifier(m, pressed) => {
                if pressed {
                    self.modifiers.insert(m);
                } else {
                    self.modifiers.remove(&m);
                    if m == Modifier::Duplicate {
                        self.cursor.copied_step = None;
                    }
                }
            }
            _ if !self.is_active() => {
                log::debug!("{control:?} ignored: no clip");
                return;
            }
            Control::Resolution(button) => {
                if self.pages.press_resolution_button(button).is_some() {
                    self.clip.set_step_length(self.pages.step_length());
                    log::info!(
                        "Resolution {} (page = {} beats)",
                        self.pages.resolution().name,
                        self.pages.page_length()
                    );
                }
            }
            Control::OctaveUp => self.shift_octave(true, now),
            Control::OctaveDown => self.shift_octave(false, now),
        }
        self.redraw.schedule(now);
    }

    /// The track or clip selection changed: drop all transient editing state.
    pub fn selection_changed(&mut self) {
        let selected_pad = self.cursor.selected_pad.map(|_| 0);
        let selected_note = self.cursor.selected_note.map(|_| self.notes.base_note());
        self.cursor = EditCursor {
            selected_pad,
            selected_note,
            ..EditCursor::default()
        };
        self.buttons.clear_all();
        log::debug!("Selection changed, edit cursor cleared");
    }

    /// External drum pad selection (e.g. from the host's device chain).
    pub fn drum_selection_changed(&mut self, index: usize) {
        if self.note_area.is_drum() && index < self.layout.play_pad_count() {
            self.cursor.selected_pad = Some(index);
        }
    }

    /// Run deferred work. Returns true when the grid should be redrawn.
    pub fn tick(&mut self, now: Instant) -> bool {
        let rebuilt = self.rebuild.fire(now);
        if rebuilt {
            self.rebuild_key_map();
        }
        let due = self.redraw.fire(now);
        rebuilt || due
    }

    /// Force a redraw on the next tick, e.g. after the clip changed underneath.
    pub fn request_redraw(&mut self, now: Instant) {
        self.redraw.schedule(now);
    }

    // -- accessors --

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.clip.exists()
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn note_area(&self) -> NoteAreaPolicy {
        self.note_area
    }

    pub fn sequencer_area(&self) -> SequencerAreaPolicy {
        self.sequencer_area
    }

    pub fn pages(&self) -> &PageController {
        &self.pages
    }

    pub fn buttons(&self) -> &ButtonMatrix {
        &self.buttons
    }

    pub fn cursor(&self) -> &EditCursor {
        &self.cursor
    }

    pub fn notes(&self) -> &NoteLayout {
        &self.notes
    }

    pub fn drum_offset(&self) -> i8 {
        self.drum.value()
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn modifiers(&self) -> &HashSet<Modifier> {
        &self.modifiers
    }

    pub fn clip(&self) -> &C {
        &self.clip
    }

    pub fn clip_mut(&mut self) -> &mut C {
        &mut self.clip
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    /// The published key→note table entry for a pad, as the hardware uses it
    /// to translate pad presses into notes.
    pub fn note_for_pad(&self, index: usize) -> Option<u8> {
        let pos = self.layout.position(index)?;
        let play_index = self.layout.play_index(pos)?;
        self.key_map.get(play_index).copied().flatten()
    }

    /// Note of a play-zone pad under the current octave / offset.
    pub fn play_note(&self, play_index: usize) -> Option<u8> {
        match self.note_area {
            NoteAreaPolicy::Scale => {
                let (col, row) = self.layout.play_position(play_index)?;
                self.notes.note_at(col, row)
            }
            NoteAreaPolicy::DrumPads | NoteAreaPolicy::DrumBlocks => {
                if play_index >= self.layout.play_pad_count() {
                    return None;
                }
                self.drum.note_for(play_index)
            }
        }
    }

    /// Note row edited by the single-note sequencer. `None` when the selected
    /// note is outside the current key, in which case edits are dropped.
    pub fn sequencer_note(&self) -> Option<u8> {
        match self.note_area {
            NoteAreaPolicy::Scale => self
                .cursor
                .selected_note
                .filter(|&note| self.notes.contains(note)),
            NoteAreaPolicy::DrumPads | NoteAreaPolicy::DrumBlocks => {
                self.cursor.selected_pad.and_then(|pad| self.play_note(pad))
            }
        }
    }

    // -- internals --

    fn handle_play(&mut self, index: usize, pos: PadPosition, velocity: u8) {
        let Some(play_index) = self.layout.play_index(pos) else {
            return;
        };
        match self.note_area {
            NoteAreaPolicy::Scale => {
                if velocity > 0 {
                    if let Some(note) = self.play_note(play_index) {
                        self.cursor.note_memory.key_down(index, note, velocity);
                        self.cursor.selected_note = Some(note);
                    }
                } else {
                    self.cursor.note_memory.key_up(index);
                }
            }
            NoteAreaPolicy::DrumPads | NoteAreaPolicy::DrumBlocks => {
                if velocity > 0 {
                    self.press_drum_pad(index, play_index);
                }
            }
        }
    }

    fn shift_octave(&mut self, up: bool, now: Instant) {
        let changed = if self.note_area.is_drum() {
            self.shift_drum_offset(up)
        } else if up {
            self.notes.octave_up()
        } else {
            self.notes.octave_down()
        };
        if !changed {
            return;
        }
        self.clear_play_presses();
        self.rebuild.schedule(now);
        if !self.note_area.is_drum() {
            log::info!("Keyboard octave {}", self.notes.octave());
        }
    }

    /// Forget held play-zone pads so no highlight survives a remap.
    fn clear_play_presses(&mut self) {
        let play_pads = 0..self.layout.play_pad_count();
        self.buttons.clear(play_pads);
        self.cursor.note_memory.clear();
    }

    fn rebuild_key_map(&mut self) {
        self.key_map = (0..self.layout.play_pad_count())
            .map(|i| self.play_note(i))
            .collect();
        log::debug!("Rebuilt key map ({} pads)", self.key_map.len());
    }

    /// Velocity for new content: the fixed velocity if set, else the press.
    fn note_velocity(&self, pressed: u8) -> u8 {
        match self.fixed_velocity {
            Some(v) => v,
            None if pressed > 0 => pressed,
            None => DEFAULT_VELOCITY,
        }
    }

    fn step_pad(&self, step: usize) -> Option<usize> {
        let (col, row) = self.layout.step_position(step)?;
        self.layout.index(col, row)
    }

    fn sequencer_release_ok(button: &PadButton, state: ButtonState) -> bool {
        button.pressed_velocity() > 0 && state != ButtonState::Idle && state != ButtonState::Consumed
    }
}

impl<C: NoteClip + Default, B: DrumPadBank + Default> SequencerView<C, B> {
    /// Replace this view with another variant over the same clip and bank.
    /// All transient editing state starts over.
    pub fn switch_to(&mut self, kind: ViewKind, layout: GridLayout, options: ViewOptions) -> anyhow::Result<()> {
        check_layout(kind, &layout)?;
        if kind.note_area().is_drum() {
            sync_drum_bank(&mut self.bank, layout.play_pad_count())?;
        }
        let clip = std::mem::take(&mut self.clip);
        let bank = std::mem::take(&mut self.bank);
        *self = Self::activate(kind, layout, options, clip, bank);
        Ok(())
    }
}

fn check_layout(kind: ViewKind, layout: &GridLayout) -> anyhow::Result<()> {
    if (kind.note_area() == NoteAreaPolicy::DrumBlocks) != layout.is_block_remapped() {
        anyhow::bail!(
            "{} view needs a {} layout",
            kind.name(),
            if layout.is_block_remapped() { "plain" } else { "block-remapped" }
        );
    }
    if layout.play_rows() == 0 && layout.sequencer_rows() == 0 {
        anyhow::bail!("{} view needs a play or sequencer zone", kind.name());
    }
    Ok(())
}

//! Pad colours from a snapshot of the view. Nothing here mutates the model.

use std::time::Instant;

use crate::clip::{DrumPadBank, NoteClip, StepInfo, StepState};
use crate::config::{Rgb, Theme};
use crate::grid::{PadPosition, Zone};
use crate::resolution::{PageContext, PageState, RESOLUTION_BUTTONS};
use crate::sequencer::{NoteAreaPolicy, SequencerAreaPolicy, SequencerView};

/// Anything that can light pads: a hardware grid or a screen emulator.
pub trait PadSurface {
    fn light(&mut self, index: usize, color: Rgb);

    /// Resolution button `index` of the control row.
    fn light_button(&mut self, index: usize, color: Rgb);
}

/// One complete set of pad colours, indexed like the grid (row 0 at the
/// bottom).
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: usize,
    rows: usize,
    pads: Vec<Rgb>,
    buttons: [Rgb; RESOLUTION_BUTTONS],
}

impl Frame {
    pub fn blank(columns: usize, rows: usize) -> Self {
        Frame {
            columns,
            rows,
            pads: vec![Rgb::OFF; columns * rows],
            buttons: [Rgb::OFF; RESOLUTION_BUTTONS],
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn pad(&self, index: usize) -> Rgb {
        self.pads.get(index).copied().unwrap_or(Rgb::OFF)
    }

    pub fn pad_at(&self, col: usize, row: usize) -> Rgb {
        if col >= self.columns {
            return Rgb::OFF;
        }
        self.pad(row * self.columns + col)
    }

    pub fn pads(&self) -> &[Rgb] {
        &self.pads
    }

    pub fn buttons(&self) -> &[Rgb; RESOLUTION_BUTTONS] {
        &self.buttons
    }

    /// Send every pad whose colour differs from `previous` (or all of them
    /// when there is no previous frame).
    pub fn flush(&self, previous: Option<&Frame>, surface: &mut impl PadSurface) -> usize {
        let previous = previous.filter(|p| p.pads.len() == self.pads.len());
        let mut sent = 0;
        for (i, &color) in self.pads.iter().enumerate() {
            if previous.is_some_and(|p| p.pads[i] == color) {
                continue;
            }
            surface.light(i, color);
            sent += 1;
        }
        for (i, &color) in self.buttons.iter().enumerate() {
            if previous.is_some_and(|p| p.buttons[i] == color) {
                continue;
            }
            surface.light_button(i, color);
            sent += 1;
        }
        sent
    }
}

/// Colour every pad of the view.
pub fn render<C: NoteClip, B: DrumPadBank>(view: &SequencerView<C, B>, theme: &Theme, now: Instant) -> Frame {
    let layout = view.layout();
    let mut frame = Frame::blank(layout.columns(), layout.total_rows());
    if !view.is_active() {
        return frame;
    }

    let playhead = playhead_step(view);
    for index in 0..layout.pad_count() {
        let Some(pos) = layout.position(index) else {
            continue;
        };
        frame.pads[index] = match pos.zone {
            Zone::Play => play_color(view, theme, index, pos),
            Zone::Sequencer => step_color(view, theme, index, pos, playhead, now),
            Zone::Loop => page_color(view, theme, pos),
        };
    }

    let active = view.pages().active_button();
    for (i, button) in frame.buttons.iter_mut().enumerate() {
        *button = if i == active {
            theme.resolution_selected
        } else {
            theme.resolution
        };
    }
    frame
}

/// Page-relative step under the play head, if it is on the page shown.
fn playhead_step<C: NoteClip, B: DrumPadBank>(view: &SequencerView<C, B>) -> Option<usize> {
    let current = view.clip().current_step()?;
    let pages = view.pages();
    let steps = pages.displayed_steps();
    if steps == 0 || pages.page_of_step(current) != view.clip().edit_page() {
        return None;
    }
    Some(current % steps)
}

fn sounding(view: &SequencerView<impl NoteClip, impl DrumPadBank>, theme: &Theme) -> Rgb {
    if view.clip().is_armed() {
        theme.recording
    } else {
        theme.playing
    }
}

fn play_color<C: NoteClip, B: DrumPadBank>(
    view: &SequencerView<C, B>,
    theme: &Theme,
    index: usize,
    pos: PadPosition,
) -> Rgb {
    let Some(play_index) = view.layout().play_index(pos) else {
        return theme.off;
    };
    let Some(note) = view.play_note(play_index) else {
        return theme.off;
    };
    if view.buttons().is_pressed(index) {
        return sounding(view, theme);
    }

    match view.note_area() {
        NoteAreaPolicy::Scale => {
            let notes = view.notes();
            if view.cursor().selected_note == Some(note) {
                theme.selected
            } else if notes.is_root(note) {
                theme.note_root
            } else if notes.contains(note) {
                theme.note_in_scale
            } else {
                theme.off
            }
        }
        NoteAreaPolicy::DrumPads | NoteAreaPolicy::DrumBlocks => {
            let bank = view.bank();
            let item = bank.item(play_index);
            if !item.exists {
                theme.off
            } else if view.cursor().selected_pad == Some(play_index) {
                theme.selected
            } else if item.mute || (bank.has_solo() && !item.solo) {
                theme.muted
            } else if item.active {
                item.color.unwrap_or(theme.drum_active)
            } else {
                theme.drum_empty
            }
        }
    }
}

/// Content of a step across the rows the sequencer edits.
fn step_content<C: NoteClip, B: DrumPadBank>(view: &SequencerView<C, B>, step: usize) -> StepInfo {
    let clip = view.clip();
    let channel = view.channel();
    match view.sequencer_area() {
        SequencerAreaPolicy::SingleNote => view
            .sequencer_note()
            .map(|note| clip.step(channel, step, note))
            .unwrap_or_default(),
        SequencerAreaPolicy::Chord => {
            let mut merged = StepInfo {
                muted: true,
                ..StepInfo::default()
            };
            for note in 0..clip.num_rows().min(128) as u8 {
                let info = clip.step(channel, step, note);
                match info.state {
                    StepState::Off => continue,
                    StepState::Start => merged.state = StepState::Start,
                    StepState::Continue if merged.state == StepState::Off => merged.state = StepState::Continue,
                    StepState::Continue => {}
                }
                merged.muted &= info.muted;
            }
            if merged.state == StepState::Off {
                merged.muted = false;
            }
            merged
        }
    }
}

fn step_color<C: NoteClip, B: DrumPadBank>(
    view: &SequencerView<C, B>,
    theme: &Theme,
    index: usize,
    pos: PadPosition,
    playhead: Option<usize>,
    now: Instant,
) -> Rgb {
    let Some(step) = view.layout().sequencer_step(pos) else {
        return theme.off;
    };
    let info = step_content(view, step);
    let has_content = info.state != StepState::Off;
    let under_playhead = playhead == Some(step);

    if under_playhead && has_content {
        return sounding(view, theme);
    }
    let copy_source = view
        .cursor()
        .copied_step
        .as_ref()
        .is_some_and(|c| c.step == step && c.page == view.clip().edit_page());
    if copy_source || view.buttons().is_long_pressed(index, now) {
        return theme.selected;
    }
    match info.state {
        _ if has_content && info.muted => theme.muted,
        StepState::Start => theme.step_start,
        StepState::Continue => theme.step_continue,
        StepState::Off if under_playhead => theme.step_playhead,
        StepState::Off => theme.off,
    }
}

fn page_color<C: NoteClip, B: DrumPadBank>(view: &SequencerView<C, B>, theme: &Theme, pos: PadPosition) -> Rgb {
    let Some(page) = view.layout().loop_page(pos) else {
        return theme.off;
    };
    if view.cursor().loop_pad_pressed == Some(page) {
        return theme.selected;
    }
    let clip = view.clip();
    let pages = view.pages();
    let ctx = PageContext {
        playing_page: clip.current_step().map(|s| pages.loop_page_of_step(s)),
        edit_page: clip.edit_page(),
        loop_start: clip.loop_start(),
        loop_length: clip.loop_length(),
    };
    match pages.page_state(page, &ctx) {
        PageState::Playing => theme.page_playing,
        PageState::Selected => theme.page_selected,
        PageState::InLoop => theme.page_in_loop,
        PageState::Empty => theme.off,
    }
}

use std::time::Instant;

use crate::button::{ButtonState, PadButton};
use crate::clip::{DrumPadBank, NoteClip, StepState};
use crate::grid::PadPosition;

use super::{CopiedStep, Modifier, SequencerAreaPolicy, SequencerView};

impl<C: NoteClip, B: DrumPadBank> SequencerView<C, B> {
    /// Sequencer pads edit on release so a hold can be told apart from a tap.
    pub(super) fn handle_sequencer_release(
        &mut self,
        pos: PadPosition,
        button: PadButton,
        state: ButtonState,
        now: Instant,
    ) {
        let Some(step) = self.layout.sequencer_step(pos) else {
            return;
        };
        if !Self::sequencer_release_ok(&button, state) {
            log::debug!("Step {step}: release without a live press ({state:?})");
            return;
        }

        if self.modifiers.contains(&Modifier::Duplicate) {
            self.duplicate_step(step);
            return;
        }
        if self.extend_from_long_press(step, now) {
            return;
        }

        match self.sequencer_area {
            SequencerAreaPolicy::SingleNote => {
                let Some(note) = self.sequencer_note() else {
                    log::debug!("Step {step}: no note row in key, ignoring");
                    return;
                };
                let velocity = self.note_velocity(button.pressed_velocity());
                self.clip.toggle_step(self.channel, step, note, velocity);
            }
            SequencerAreaPolicy::Chord => self.toggle_chord(step),
        }
    }

    /// First duplicate tap on a note start picks the source; later taps on
    /// other steps paste it.
    fn duplicate_step(&mut self, step: usize) {
        let page = self.clip.edit_page();
        let source: Vec<_> = match self.sequencer_area {
            SequencerAreaPolicy::SingleNote => {
                let Some(note) = self.sequencer_note() else {
                    return;
                };
                let info = self.clip.step(self.channel, step, note);
                if info.state == StepState::Start {
                    vec![(note, info)]
                } else {
                    Vec::new()
                }
            }
            SequencerAreaPolicy::Chord => self
                .chord_at(step)
                .into_iter()
                .map(|note| (note, self.clip.step(self.channel, step, note)))
                .collect(),
        };

        if !source.is_empty() {
            log::debug!("Copy source: page {page} step {step} ({} notes)", source.len());
            self.cursor.copied_step = Some(CopiedStep {
                page,
                step,
                notes: source,
            });
            return;
        }

        let Some(copy) = self.cursor.copied_step.clone() else {
            return;
        };
        match self.sequencer_area {
            SequencerAreaPolicy::SingleNote => {
                let (Some(note), Some((_, info))) = (self.sequencer_note(), copy.notes.first()) else {
                    return;
                };
                self.clip
                    .set_step(self.channel, step, note, info.velocity, info.duration);
            }
            SequencerAreaPolicy::Chord => {
                for (note, info) in &copy.notes {
                    self.clip
                        .set_step(self.channel, step, *note, info.velocity, info.duration);
                }
            }
        }
        log::debug!("Pasted step {} onto step {step}", copy.step);
    }

    /// Tapping a step while an earlier step is long-pressed sets the held
    /// note's length to reach the tapped step. Returns whether the held
    /// step had notes to extend; the held pad stays live otherwise.
    fn extend_from_long_press(&mut self, step: usize, now: Instant) -> bool {
        let held = (0..step).rev().find_map(|s| {
            let pad = self.step_pad(s)?;
            self.buttons.is_long_pressed(pad, now).then_some((s, pad))
        });
        let Some((start, pad)) = held else {
            return false;
        };

        let length = step - start + 1;
        let duration = length as f64 * self.pages.step_length();
        let held_velocity = self.note_velocity(self.buttons.pressed_velocity(pad));

        let rows: Vec<(u8, u8)> = match self.sequencer_area {
            SequencerAreaPolicy::SingleNote => match self.sequencer_note() {
                Some(note) => vec![(note, held_velocity)],
                None => Vec::new(),
            },
            SequencerAreaPolicy::Chord => {
                let existing = self.chord_at(start);
                if existing.is_empty() {
                    self.cursor
                        .note_memory
                        .iter()
                        .map(|(note, velocity)| (note, self.note_velocity(velocity)))
                        .collect()
                } else {
                    existing.into_iter().map(|note| (note, held_velocity)).collect()
                }
            }
        };
        if rows.is_empty() {
            log::debug!("Step {start} held with no notes to extend");
            return false;
        }

        for (note, velocity) in rows {
            if self.clip.step(self.channel, start, note).state == StepState::Start {
                self.clip
                    .update_step_duration(self.channel, start, note, duration);
            } else {
                self.clip
                    .set_step(self.channel, start, note, velocity, duration);
            }
        }
        self.buttons.consume(pad);
        log::debug!("Step {start} extended to {length} steps ({duration} beats)");
        true
    }
}

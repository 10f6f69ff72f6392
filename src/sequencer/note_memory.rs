use std::collections::{BTreeMap, BTreeSet};

use crate::clip::{DrumPadBank, NoteClip, StepState};

use super::SequencerView;

/// Chord capture buffer.
///
/// Every key pressed while at least one key is held is remembered with its
/// velocity. Releasing a key keeps its note; releasing the last key forgets
/// the whole chord.
#[derive(Debug, Clone, Default)]
pub struct NoteMemory {
    notes: BTreeMap<u8, u8>,
    held: BTreeSet<usize>,
}

impl NoteMemory {
    pub fn key_down(&mut self, pad: usize, note: u8, velocity: u8) {
        if velocity == 0 {
            return;
        }
        if self.held.is_empty() {
            self.notes.clear();
        }
        self.held.insert(pad);
        self.notes.insert(note, velocity);
    }

    pub fn key_up(&mut self, pad: usize) {
        self.held.remove(&pad);
        if self.held.is_empty() {
            self.notes.clear();
        }
    }

    pub fn clear(&mut self) {
        self.notes.clear();
        self.held.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    #[cfg(test)]
    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    pub fn contains(&self, note: u8) -> bool {
        self.notes.contains_key(&note)
    }

    /// Captured `(note, velocity)` pairs, lowest note first.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.notes.iter().map(|(&n, &v)| (n, v))
    }
}

impl<C: NoteClip, B: DrumPadBank> SequencerView<C, B> {
    /// Rows with a note starting on `step`.
    pub(super) fn chord_at(&self, step: usize) -> Vec<u8> {
        (0..self.clip.num_rows().min(128) as u8)
            .filter(|&note| self.clip.step(self.channel, step, note).state == StepState::Start)
            .collect()
    }

    /// A chord-mode tap: clear a step that has any content, otherwise write
    /// the captured chord onto it.
    pub(super) fn toggle_chord(&mut self, step: usize) {
        let rows = self.clip.num_rows().min(128) as u8;
        if !self.chord_at(step).is_empty() {
            for note in 0..rows {
                self.clip.clear_step(self.channel, step, note);
            }
            log::debug!("Cleared chord at step {step}");
            return;
        }

        let duration = self.pages.step_length();
        let chord: Vec<(u8, u8)> = self.cursor.note_memory.iter().collect();
        for &(note, velocity) in &chord {
            let velocity = self.note_velocity(velocity);
            self.clip.set_step(self.channel, step, note, velocity, duration);
        }
        if !chord.is_empty() {
            log::debug!("Wrote {}-note chord at step {step}", chord.len());
        }
    }
}

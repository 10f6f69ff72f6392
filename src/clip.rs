use std::collections::BTreeMap;

use crate::config::Rgb;

/// Content of one step on one note row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepState {
    #[default]
    Off,
    /// A note starts on this step.
    Start,
    /// A note started earlier is still sounding on this step.
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepInfo {
    pub state: StepState,
    pub velocity: u8,
    /// Note length in beats.
    pub duration: f64,
    pub muted: bool,
}

/// The note clip being edited.
///
/// Step indices are relative to the current edit page; the clip adds the
/// page offset itself. Positions and lengths are in beats.
pub trait NoteClip {
    /// False when there is no clip (empty slot, no track).
    fn exists(&self) -> bool;

    fn step(&self, channel: u8, step: usize, note: u8) -> StepInfo;
    fn set_step(&mut self, channel: u8, step: usize, note: u8, velocity: u8, duration: f64);
    /// Add a one-step note, or remove the note starting on this step.
    fn toggle_step(&mut self, channel: u8, step: usize, note: u8, velocity: u8);
    fn clear_step(&mut self, channel: u8, step: usize, note: u8);
    fn clear_row(&mut self, channel: u8, note: u8);
    fn update_step_duration(&mut self, channel: u8, step: usize, note: u8, duration: f64);

    fn loop_start(&self) -> f64;
    fn loop_length(&self) -> f64;
    fn set_loop_start(&mut self, start: f64);
    fn set_loop_length(&mut self, length: f64);
    fn set_play_range(&mut self, start: f64, end: f64);

    fn edit_page(&self) -> usize;
    fn scroll_to_page(&mut self, page: usize);
    /// Absolute step under the play head, if the clip is playing.
    fn current_step(&self) -> Option<usize>;
    /// Steps per page.
    fn num_steps(&self) -> usize;
    fn num_rows(&self) -> usize;
    fn set_step_length(&mut self, beats: f64);

    /// Whether the host records into this clip.
    fn is_armed(&self) -> bool;
}

/// One lane of the drum pad bank as seen through the current bank page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrumPadItem {
    pub color: Option<Rgb>,
    pub mute: bool,
    pub solo: bool,
    /// The lane holds an instrument.
    pub active: bool,
    /// The index is inside the bank.
    pub exists: bool,
}

/// A paged bank of drum lanes. Item indices are relative to the bank
/// position; scrolling moves the page one lane per step.
pub trait DrumPadBank {
    fn page_size(&self) -> usize;
    fn position(&self) -> usize;
    fn item(&self, index: usize) -> DrumPadItem;
    /// Whether any lane in the whole bank is soloed.
    fn has_solo(&self) -> bool;

    fn scroll_forwards(&mut self, steps: usize);
    fn scroll_backwards(&mut self, steps: usize);
    fn scroll_to(&mut self, position: usize);
    /// Resize the page. The position is re-clamped to the new page.
    fn set_page_size(&mut self, size: usize);

    fn select(&mut self, index: usize);
    fn toggle_mute(&mut self, index: usize);
    fn toggle_solo(&mut self, index: usize);
    fn duplicate(&mut self, index: usize);
}

// ---------------------------------------------------------------------------
// In-memory implementations
// ---------------------------------------------------------------------------

/// Fine enough for every step length in the resolution table.
const TICKS_PER_BEAT: f64 = 96.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Note {
    velocity: u8,
    duration: f64,
    muted: bool,
}

/// Note clip kept in memory, with a minimal transport.
#[derive(Debug, Clone)]
pub struct MemoryClip {
    /// Keyed by (channel, note, start tick).
    notes: BTreeMap<(u8, u8, u64), Note>,
    step_ticks: u64,
    num_steps: usize,
    edit_page: usize,
    loop_start: f64,
    loop_length: f64,
    play_range: (f64, f64),
    position: Option<f64>,
    armed: bool,
    exists: bool,
}

impl MemoryClip {
    pub fn new(num_steps: usize, step_length: f64, loop_length: f64) -> Self {
        MemoryClip {
            notes: BTreeMap::new(),
            step_ticks: beats_to_ticks(step_length).max(1),
            num_steps,
            edit_page: 0,
            loop_start: 0.0,
            loop_length,
            play_range: (0.0, loop_length),
            position: None,
            armed: false,
            exists: true,
        }
    }

    pub fn set_exists(&mut self, exists: bool) {
        self.exists = exists;
    }

    pub fn set_armed(&mut self, armed: bool) {
        self.armed = armed;
    }

    pub fn play_range(&self) -> (f64, f64) {
        self.play_range
    }

    pub fn is_playing(&self) -> bool {
        self.position.is_some()
    }

    pub fn play(&mut self) {
        self.position = Some(self.loop_start);
    }

    pub fn stop(&mut self) {
        self.position = None;
    }

    pub fn position(&self) -> Option<f64> {
        self.position
    }

    /// Move the play head, wrapping inside the loop.
    pub fn advance(&mut self, beats: f64) {
        let Some(pos) = self.position else {
            return;
        };
        let mut pos = pos + beats;
        let end = self.loop_start + self.loop_length;
        if self.loop_length > 0.0 && pos >= end {
            pos = self.loop_start + (pos - self.loop_start) % self.loop_length;
        }
        self.position = Some(pos);
    }

    /// Number of note starts in the clip, across all pages.
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn set_muted(&mut self, channel: u8, step: usize, note: u8, muted: bool) {
        if let Some(tick) = self.tick(step) {
            if let Some(n) = self.notes.get_mut(&(channel, note, tick)) {
                n.muted = muted;
            }
        }
    }

    fn tick(&self, step: usize) -> Option<u64> {
        if step >= self.num_steps {
            return None;
        }
        Some((self.edit_page * self.num_steps + step) as u64 * self.step_ticks)
    }
}

/// A clip with no steps and an empty loop.
impl Default for MemoryClip {
    fn default() -> Self {
        MemoryClip::new(0, 0.25, 0.0)
    }
}

fn beats_to_ticks(beats: f64) -> u64 {
    (beats * TICKS_PER_BEAT).round().max(0.0) as u64
}

impl NoteClip for MemoryClip {
    fn exists(&self) -> bool {
        self.exists
    }

    fn step(&self, channel: u8, step: usize, note: u8) -> StepInfo {
        let Some(tick) = self.tick(step) else {
            return StepInfo::default();
        };
        if let Some(n) = self.notes.get(&(channel, note, tick)) {
            return StepInfo {
                state: StepState::Start,
                velocity: n.velocity,
                duration: n.duration,
                muted: n.muted,
            };
        }
        let covering = self
            .notes
            .range((channel, note, 0)..(channel, note, tick))
            .rev()
            .find(|((_, _, start), n)| start + beats_to_ticks(n.duration) > tick);
        match covering {
            Some((_, n)) => StepInfo {
                state: StepState::Continue,
                velocity: n.velocity,
                duration: n.duration,
                muted: n.muted,
            },
            None => StepInfo::default(),
        }
    }

    fn set_step(&mut self, channel: u8, step: usize, note: u8, velocity: u8, duration: f64) {
        if let Some(tick) = self.tick(step) {
            self.notes.insert(
                (channel, note, tick),
                Note {
                    velocity,
                    duration,
                    muted: false,
                },
            );
        }
    }

    fn toggle_step(&mut self, channel: u8, step: usize, note: u8, velocity: u8) {
        let Some(tick) = self.tick(step) else {
            return;
        };
        let key = (channel, note, tick);
        if self.notes.remove(&key).is_none() {
            let duration = self.step_ticks as f64 / TICKS_PER_BEAT;
            self.notes.insert(
                key,
                Note {
                    velocity,
                    duration,
                    muted: false,
                },
            );
        }
    }

    fn clear_step(&mut self, channel: u8, step: usize, note: u8) {
        if let Some(tick) = self.tick(step) {
            self.notes.remove(&(channel, note, tick));
        }
    }

    fn clear_row(&mut self, channel: u8, note: u8) {
        self.notes.retain(|&(c, n, _), _| c != channel || n != note);
    }

    fn update_step_duration(&mut self, channel: u8, step: usize, note: u8, duration: f64) {
        if let Some(tick) = self.tick(step) {
            if let Some(n) = self.notes.get_mut(&(channel, note, tick)) {
                n.duration = duration;
            }
        }
    }

    fn loop_start(&self) -> f64 {
        self.loop_start
    }

    fn loop_length(&self) -> f64 {
        self.loop_length
    }

    fn set_loop_start(&mut self, start: f64) {
        self.loop_start = start.max(0.0);
    }

    fn set_loop_length(&mut self, length: f64) {
        self.loop_length = length.max(0.0);
    }

    fn set_play_range(&mut self, start: f64, end: f64) {
        self.play_range = (start, end);
    }

    fn edit_page(&self) -> usize {
        self.edit_page
    }

    fn scroll_to_page(&mut self, page: usize) {
        self.edit_page = page;
    }

    fn current_step(&self) -> Option<usize> {
        let pos = self.position?;
        Some((beats_to_ticks(pos) / self.step_ticks) as usize)
    }

    fn num_steps(&self) -> usize {
        self.num_steps
    }

    fn num_rows(&self) -> usize {
        128
    }

    fn set_step_length(&mut self, beats: f64) {
        self.step_ticks = beats_to_ticks(beats).max(1);
    }

    fn is_armed(&self) -> bool {
        self.armed
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Lane {
    color: Option<Rgb>,
    mute: bool,
    solo: bool,
    active: bool,
}

/// 128 drum lanes (one per MIDI note), viewed through a scrollable page.
#[derive(Debug, Clone)]
pub struct MemoryDrumBank {
    lanes: Vec<Lane>,
    position: usize,
    page_size: usize,
    selected: Option<usize>,
}

/// Colours handed to the lanes of a fresh kit.
const KIT_COLORS: [Rgb; 4] = [
    Rgb(230, 80, 60),
    Rgb(240, 180, 40),
    Rgb(70, 170, 230),
    Rgb(170, 110, 230),
];

impl MemoryDrumBank {
    /// A bank with a 16-lane kit loaded at `kit_start`.
    pub fn new(page_size: usize, position: usize, kit_start: usize) -> Self {
        let mut lanes = vec![Lane::default(); 128];
        for (i, lane) in lanes.iter_mut().skip(kit_start).take(16).enumerate() {
            lane.active = true;
            lane.color = Some(KIT_COLORS[i / 4 % KIT_COLORS.len()]);
        }
        let mut bank = MemoryDrumBank {
            lanes,
            position: 0,
            page_size,
            selected: None,
        };
        bank.scroll_to(position);
        bank
    }

    /// Absolute lane of the selected pad.
    pub fn selected_lane(&self) -> Option<usize> {
        self.selected
    }

    fn lane(&self, index: usize) -> Option<&Lane> {
        if index >= self.page_size {
            return None;
        }
        self.lanes.get(self.position + index)
    }

    fn lane_mut(&mut self, index: usize) -> Option<&mut Lane> {
        if index >= self.page_size {
            return None;
        }
        self.lanes.get_mut(self.position + index)
    }

    fn max_position(&self) -> usize {
        self.lanes.len().saturating_sub(self.page_size)
    }
}

impl Default for MemoryDrumBank {
    fn default() -> Self {
        MemoryDrumBank::new(16, 36, 36)
    }
}

impl DrumPadBank for MemoryDrumBank {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn position(&self) -> usize {
        self.position
    }

    fn item(&self, index: usize) -> DrumPadItem {
        match self.lane(index) {
            Some(lane) => DrumPadItem {
                color: lane.color,
                mute: lane.mute,
                solo: lane.solo,
                active: lane.active,
                exists: true,
            },
            None => DrumPadItem::default(),
        }
    }

    fn has_solo(&self) -> bool {
        self.lanes.iter().any(|l| l.solo)
    }

    fn scroll_forwards(&mut self, steps: usize) {
        self.position = (self.position + steps).min(self.max_position());
    }

    fn scroll_backwards(&mut self, steps: usize) {
        self.position = self.position.saturating_sub(steps);
    }

    fn scroll_to(&mut self, position: usize) {
        self.position = position.min(self.max_position());
    }

    fn set_page_size(&mut self, size: usize) {
        self.page_size = size;
        self.position = self.position.min(self.max_position());
    }

    fn select(&mut self, index: usize) {
        if index < self.page_size && self.position + index < self.lanes.len() {
            self.selected = Some(self.position + index);
        }
    }

    fn toggle_mute(&mut self, index: usize) {
        if let Some(lane) = self.lane_mut(index) {
            lane.mute = !lane.mute;
        }
    }

    fn toggle_solo(&mut self, index: usize) {
        if let Some(lane) = self.lane_mut(index) {
            lane.solo = !lane.solo;
        }
    }

    /// Copy the lane onto the one above it.
    fn duplicate(&mut self, index: usize) {
        let Some(&lane) = self.lane(index) else {
            return;
        };
        if let Some(next) = self.lanes.get_mut(self.position + index + 1) {
            *next = lane;
        }
    }
}

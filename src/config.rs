use std::time::Duration;

use serde::Deserialize;

/// An RGB pad colour. Deserializes from `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const OFF: Rgb = Rgb(0, 0, 0);

    pub fn is_off(self) -> bool {
        self == Rgb::OFF
    }
}

/// Pad colours. Fixed for the lifetime of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub off: Rgb,
    /// Note sounding while the host is not recording.
    pub playing: Rgb,
    /// Note sounding while the host records.
    pub recording: Rgb,
    /// Selected pad, copy source, selected note.
    pub selected: Rgb,
    pub muted: Rgb,
    pub step_start: Rgb,
    pub step_continue: Rgb,
    /// Sequencer step under the play head with no content.
    pub step_playhead: Rgb,
    pub page_playing: Rgb,
    pub page_selected: Rgb,
    pub page_in_loop: Rgb,
    pub note_root: Rgb,
    pub note_in_scale: Rgb,
    /// Drum lane that holds an instrument but has no colour of its own.
    pub drum_active: Rgb,
    /// Drum lane without an instrument.
    pub drum_empty: Rgb,
    pub resolution: Rgb,
    pub resolution_selected: Rgb,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            off: Rgb::OFF,
            playing: Rgb(0, 220, 0),
            recording: Rgb(230, 0, 0),
            selected: Rgb(255, 255, 255),
            muted: Rgb(60, 60, 60),
            step_start: Rgb(0, 120, 255),
            step_continue: Rgb(0, 50, 120),
            step_playhead: Rgb(30, 90, 30),
            page_playing: Rgb(0, 220, 0),
            page_selected: Rgb(255, 255, 255),
            page_in_loop: Rgb(90, 90, 160),
            note_root: Rgb(0, 120, 255),
            note_in_scale: Rgb(120, 120, 120),
            drum_active: Rgb(200, 160, 0),
            drum_empty: Rgb(20, 20, 20),
            resolution: Rgb(60, 40, 0),
            resolution_selected: Rgb(255, 170, 0),
        }
    }
}

/// Time constants of the gesture and redraw machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Hold time after which a pad counts as long-pressed.
    pub long_press_ms: u64,
    /// Delay of the coalesced redraw after a model change.
    pub redraw_delay_ms: u64,
    /// Delay of the coalesced key→note table rebuild.
    pub rebuild_delay_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            long_press_ms: 400,
            redraw_delay_ms: 5,
            rebuild_delay_ms: 5,
        }
    }
}

impl Timing {
    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    pub fn redraw_delay(&self) -> Duration {
        Duration::from_millis(self.redraw_delay_ms)
    }

    pub fn rebuild_delay(&self) -> Duration {
        Duration::from_millis(self.rebuild_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_theme_keeps_defaults() {
        let theme: Theme = toml::from_str("playing = [1, 2, 3]").unwrap();
        assert_eq!(theme.playing, Rgb(1, 2, 3));
        assert_eq!(theme.recording, Theme::default().recording);
    }

    #[test]
    fn timing_durations() {
        let timing: Timing = toml::from_str("long_press_ms = 250").unwrap();
        assert_eq!(timing.long_press(), Duration::from_millis(250));
        assert_eq!(timing.redraw_delay(), Duration::from_millis(5));
    }
}

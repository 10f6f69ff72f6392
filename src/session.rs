use std::path::Path;
use std::time::Instant;

use serde::Deserialize;

use crate::clip::{MemoryClip, MemoryDrumBank, NoteClip};
use crate::config::{Theme, Timing};
use crate::grid::GridLayout;
use crate::keys::KeyAction;
use crate::midi::GridInput;
use crate::resolution::{DEFAULT_RESOLUTION, PageController, RESOLUTIONS};
use crate::scale::{MAX_OCTAVE, NoteLayout, ScaleKind};
use crate::sequencer::{SequencerView, ViewKind, ViewOptions, sync_drum_bank};

/// Loop length used when a view has no sequencer zone to derive one from.
const FALLBACK_PAGE_BEATS: f64 = 4.0;

/// First lane of the demo drum kit loaded into the in-memory bank.
const KIT_START: usize = 36;

pub type MemoryView = SequencerView<MemoryClip, MemoryDrumBank>;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub view: ViewKind,
    pub grid: GridConfig,
    pub clip: ClipConfig,
    pub scale: ScaleConfig,
    pub midi: MidiConfig,
    pub timing: Timing,
    pub theme: Theme,
    pub fixed_velocity: Option<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub columns: usize,
    pub rows: usize,
    pub play_rows: usize,
    pub sequencer_rows: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            columns: 8,
            rows: 8,
            play_rows: 2,
            sequencer_rows: 4,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    /// Pages covered by the initial loop.
    pub pages: usize,
    pub bpm: f64,
    pub channel: u8,
    /// Index into the resolution table (0 = 1/1 … 7 = 1/32).
    pub resolution: usize,
}

impl Default for ClipConfig {
    fn default() -> Self {
        ClipConfig {
            pages: 4,
            bpm: 120.0,
            channel: 0,
            resolution: DEFAULT_RESOLUTION,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    pub name: ScaleKind,
    /// Pitch class of the root, 0 = C.
    pub root: u8,
    pub octave: u8,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        ScaleConfig {
            name: ScaleKind::Major,
            root: 0,
            octave: 4,
        }
    }
}

/// How the hardware grid talks MIDI. Pads send notes starting at
/// `pad_base_note` (row-major from the bottom-left pad); control buttons
/// send CCs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MidiConfig {
    /// Input port name filter (default: open all).
    pub device: Option<String>,
    /// Output port name filter for pad lights (default: no lights).
    pub output: Option<String>,
    pub pad_base_note: u8,
    pub channel: u8,
    /// First of eight consecutive CCs for the resolution buttons.
    pub resolution_cc: u8,
    pub octave_down_cc: u8,
    pub octave_up_cc: u8,
    pub duplicate_cc: u8,
    pub mute_cc: u8,
    pub solo_cc: u8,
    pub select_cc: u8,
    pub delete_cc: u8,
}

impl Default for MidiConfig {
    fn default() -> Self {
        MidiConfig {
            device: None,
            output: None,
            pad_base_note: 36,
            channel: 0,
            resolution_cc: 100,
            octave_down_cc: 91,
            octave_up_cc: 92,
            duplicate_cc: 93,
            mute_cc: 94,
            solo_cc: 95,
            select_cc: 96,
            delete_cc: 97,
        }
    }
}

pub fn load(path: &Path) -> anyhow::Result<SessionConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read session {}: {e}", path.display()))?;
    let config: SessionConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl SessionConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.clip.channel > 15 || self.midi.channel > 15 {
            anyhow::bail!(
                "MIDI channels are 0-15 (clip={}, midi={})",
                self.clip.channel,
                self.midi.channel
            );
        }
        if self.clip.resolution >= RESOLUTIONS.len() {
            anyhow::bail!(
                "Resolution index {} out of range (0-{})",
                self.clip.resolution,
                RESOLUTIONS.len() - 1
            );
        }
        if self.clip.bpm.is_nan() || self.clip.bpm <= 0.0 {
            anyhow::bail!("BPM must be positive (got {})", self.clip.bpm);
        }
        if self.clip.pages == 0 {
            anyhow::bail!("Clip needs at least one page");
        }
        if self.scale.root > 11 {
            anyhow::bail!("Scale root is a pitch class 0-11 (got {})", self.scale.root);
        }
        if self.scale.octave > MAX_OCTAVE {
            anyhow::bail!("Scale octave is 0-{MAX_OCTAVE} (got {})", self.scale.octave);
        }
        if let Some(v) = self.fixed_velocity {
            if v == 0 || v > 127 {
                anyhow::bail!("fixed_velocity must be 1-127 (got {v})");
            }
        }
        self.layout_for(self.view)?;
        Ok(())
    }

    /// Grid geometry for a view variant. Block-remapped drums take the whole
    /// grid as play zone.
    pub fn layout_for(&self, kind: ViewKind) -> anyhow::Result<GridLayout> {
        let g = &self.grid;
        match kind {
            ViewKind::Drum64 => GridLayout::block_remapped(g.columns, g.rows),
            _ => GridLayout::new(g.columns, g.rows, g.play_rows, g.sequencer_rows),
        }
    }

    pub fn view_options(&self) -> ViewOptions {
        ViewOptions {
            channel: self.clip.channel,
            fixed_velocity: self.fixed_velocity,
            resolution: self.clip.resolution,
            notes: NoteLayout::new(self.scale.name, self.scale.root, self.scale.octave),
            timing: self.timing,
        }
    }

    /// Steps per page of the grid's sequencer zone.
    pub fn page_steps(&self) -> usize {
        self.grid.columns * self.grid.sequencer_rows
    }

    /// An empty clip sized for the grid, looping over `clip.pages` pages.
    pub fn new_clip(&self) -> MemoryClip {
        let pages = PageController::new(self.page_steps(), self.clip.resolution);
        let page_length = match pages.page_length() {
            l if l > 0.0 => l,
            _ => FALLBACK_PAGE_BEATS,
        };
        MemoryClip::new(
            self.page_steps(),
            pages.step_length(),
            page_length * self.clip.pages as f64,
        )
    }

    /// A bank paged over the drum play zone. Views resize the page to
    /// their own play zone when they activate.
    pub fn new_bank(&self) -> MemoryDrumBank {
        MemoryDrumBank::new(self.grid.columns * self.grid.play_rows, KIT_START, KIT_START)
    }

    pub fn open_view(
        &self,
        kind: ViewKind,
        clip: MemoryClip,
        bank: MemoryDrumBank,
    ) -> anyhow::Result<MemoryView> {
        let layout = self.layout_for(kind)?;
        SequencerView::new(kind, layout, self.view_options(), clip, bank)
    }
}

/// A running session: the active view and the clock that drives its clip.
pub struct Session {
    config: SessionConfig,
    view: MemoryView,
    /// Variants the configured grid can host, in cycling order.
    kinds: Vec<ViewKind>,
    last_tick: Instant,
}

impl Session {
    pub fn open(config: SessionConfig, now: Instant) -> anyhow::Result<Self> {
        let view = config.open_view(config.view, config.new_clip(), config.new_bank())?;
        let kinds = ViewKind::ALL
            .into_iter()
            .filter(|&k| match config.layout_for(k) {
                Ok(layout) => {
                    !k.note_area().is_drum()
                        || sync_drum_bank(&mut config.new_bank(), layout.play_pad_count()).is_ok()
                }
                Err(_) => false,
            })
            .collect();
        Ok(Session {
            config,
            view,
            kinds,
            last_tick: now,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn view(&self) -> &MemoryView {
        &self.view
    }

    pub fn available_views(&self) -> &[ViewKind] {
        &self.kinds
    }

    pub fn handle_input(&mut self, input: GridInput, now: Instant) {
        match input {
            GridInput::Pad { index, velocity } => self.view.handle_pad(index, velocity, now),
            GridInput::Control(control) => self.view.handle_control(control, now),
        }
    }

    pub fn apply(&mut self, action: KeyAction, now: Instant) -> anyhow::Result<()> {
        match action {
            KeyAction::Control(control) => self.view.handle_control(control, now),
            KeyAction::Transport => self.toggle_transport(now),
            KeyAction::Arm => self.toggle_armed(now),
            KeyAction::NextView => self.next_view(now)?,
        }
        Ok(())
    }

    pub fn toggle_transport(&mut self, now: Instant) {
        let bpm = self.config.clip.bpm;
        let clip = self.view.clip_mut();
        if clip.is_playing() {
            clip.stop();
            log::info!("Transport stopped");
        } else {
            clip.play();
            log::info!("Transport playing at {bpm} BPM");
        }
        self.last_tick = now;
        self.view.request_redraw(now);
    }

    pub fn toggle_armed(&mut self, now: Instant) {
        let clip = self.view.clip_mut();
        let armed = !clip.is_armed();
        clip.set_armed(armed);
        log::info!("Recording {}", if armed { "armed" } else { "disarmed" });
        self.view.request_redraw(now);
    }

    /// Reopen the shared clip and bank in another view variant.
    pub fn switch_view(&mut self, kind: ViewKind, now: Instant) -> anyhow::Result<()> {
        if kind == self.view.kind() {
            return Ok(());
        }
        let layout = self.config.layout_for(kind)?;
        self.view.switch_to(kind, layout, self.config.view_options())?;
        self.view.request_redraw(now);
        Ok(())
    }

    pub fn next_view(&mut self, now: Instant) -> anyhow::Result<()> {
        let current = self.kinds.iter().position(|&k| k == self.view.kind());
        let next = current.map_or(0, |i| (i + 1) % self.kinds.len());
        let Some(&kind) = self.kinds.get(next) else {
            return Ok(());
        };
        self.switch_view(kind, now)
    }

    /// Advance the transport by the wall time since the last tick and run the
    /// view's deferred work. Returns true when the grid should be redrawn.
    pub fn tick(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        let bpm = self.config.clip.bpm;
        let clip = self.view.clip_mut();
        if clip.is_playing() {
            let before = clip.current_step();
            clip.advance(elapsed.as_secs_f64() * bpm / 60.0);
            if clip.current_step() != before {
                self.view.request_redraw(now);
            }
        }
        // A held pad can cross the long-press threshold at any moment.
        let holding = self.view.buttons().any_pressed();
        self.view.tick(now) || holding
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::clip::{DrumPadBank, NoteClip};

    fn write_session(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_session_uses_defaults() {
        let file = write_session("");
        let config = load(file.path()).unwrap();
        assert_eq!(config.view, ViewKind::Note);
        assert_eq!(config.grid.columns, 8);
        assert_eq!(config.clip.resolution, DEFAULT_RESOLUTION);
        assert_eq!(config.midi.pad_base_note, 36);
        assert_eq!(config.timing.long_press_ms, 400);
        assert!(config.fixed_velocity.is_none());
    }

    #[test]
    fn full_session() {
        let file = write_session(
            r#"
view = "drum64"
fixed_velocity = 90

[grid]
columns = 8
rows = 8

[clip]
pages = 2
bpm = 96.0
channel = 9
resolution = 3

[scale]
name = "pentatonic_minor"
root = 9
octave = 3

[midi]
device = "Launchpad"
resolution_cc = 20

[timing]
long_press_ms = 300

[theme]
playing = [1, 2, 3]
"#,
        );
        let config = load(file.path()).unwrap();
        assert_eq!(config.view, ViewKind::Drum64);
        assert_eq!(config.fixed_velocity, Some(90));
        assert_eq!(config.clip.channel, 9);
        assert_eq!(config.scale.name, ScaleKind::PentatonicMinor);
        assert_eq!(config.midi.device.as_deref(), Some("Launchpad"));
        assert_eq!(config.midi.resolution_cc, 20);
        assert_eq!(config.midi.mute_cc, 94);
        assert_eq!(config.timing.long_press_ms, 300);
        assert_eq!(config.theme.playing, crate::config::Rgb(1, 2, 3));

        let layout = config.layout_for(config.view).unwrap();
        assert!(layout.is_block_remapped());
        assert_eq!(layout.play_rows(), 8);
    }

    #[test]
    fn unknown_view_is_rejected() {
        let file = write_session(r#"view = "piano""#);
        assert!(load(file.path()).is_err());
    }

    #[test]
    fn bad_geometry_is_rejected() {
        let file = write_session("[grid]\nrows = 4\nplay_rows = 2\nsequencer_rows = 4\n");
        assert!(load(file.path()).is_err());
        let file = write_session("view = \"drum64\"\n[grid]\ncolumns = 6\n");
        assert!(load(file.path()).is_err());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for content in [
            "[clip]\nresolution = 8\n",
            "[clip]\nchannel = 16\n",
            "[clip]\nbpm = 0.0\n",
            "[scale]\nroot = 12\n",
            "fixed_velocity = 0\n",
        ] {
            let file = write_session(content);
            assert!(load(file.path()).is_err(), "accepted: {content}");
        }
    }

    #[test]
    fn missing_file_names_path() {
        let err = load(Path::new("/nonexistent/session.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/session.toml"));
    }

    #[test]
    fn clip_and_bank_fit_the_grid() {
        let config = SessionConfig::default();
        let clip = config.new_clip();
        assert_eq!(clip.num_steps(), 32);
        // 4 pages of 8 beats.
        assert_eq!(clip.loop_length(), 32.0);
        let bank = config.new_bank();
        assert_eq!(bank.page_size(), 16);
        assert_eq!(bank.position(), 36);
    }

    #[test]
    fn transport_follows_the_clock() {
        let t0 = Instant::now();
        let mut session = Session::open(SessionConfig::default(), t0).unwrap();
        assert!(!session.view().clip().is_playing());

        session.apply(KeyAction::Transport, t0).unwrap();
        assert_eq!(session.view().clip().current_step(), Some(0));
        // 120 BPM: half a second is one beat, four 1/16 steps.
        session.tick(t0 + std::time::Duration::from_millis(500));
        assert_eq!(session.view().clip().current_step(), Some(4));

        session.apply(KeyAction::Transport, t0).unwrap();
        assert_eq!(session.view().clip().current_step(), None);
    }

    #[test]
    fn arm_toggles_recording() {
        let t0 = Instant::now();
        let mut session = Session::open(SessionConfig::default(), t0).unwrap();
        session.apply(KeyAction::Arm, t0).unwrap();
        assert!(session.view().clip().is_armed());
        session.apply(KeyAction::Arm, t0).unwrap();
        assert!(!session.view().clip().is_armed());
    }

    #[test]
    fn next_view_cycles_and_keeps_notes() {
        let t0 = Instant::now();
        let mut session = Session::open(SessionConfig::default(), t0).unwrap();
        assert_eq!(session.available_views().len(), 4);
        let first_step = session.view().layout().index(0, 2).unwrap();
        session.handle_input(GridInput::Pad { index: first_step, velocity: 100 }, t0);
        session.handle_input(GridInput::Pad { index: first_step, velocity: 0 }, t0);
        assert_eq!(session.view().clip().note_count(), 1);

        let mut seen = vec![session.view().kind()];
        for _ in 0..4 {
            session.apply(KeyAction::NextView, t0).unwrap();
            seen.push(session.view().kind());
        }
        assert_eq!(
            seen,
            [ViewKind::Note, ViewKind::Drum, ViewKind::Poly, ViewKind::Drum64, ViewKind::Note]
        );
        assert_eq!(session.view().clip().note_count(), 1);
    }

    #[test]
    fn grids_without_blocks_skip_drum64() {
        let mut config = SessionConfig::default();
        config.grid.columns = 6;
        let session = Session::open(config, Instant::now()).unwrap();
        assert_eq!(
            session.available_views(),
            [ViewKind::Note, ViewKind::Drum, ViewKind::Poly]
        );
    }

    #[test]
    fn wide_grids_page_the_bank_per_view() {
        let mut config = SessionConfig::default();
        config.grid.columns = 16;
        config.view = ViewKind::Drum;
        let session = Session::open(config, Instant::now()).unwrap();
        let view = session.view();
        assert_eq!(view.note_for_pad(0), Some(36));
        assert_eq!(view.bank().page_size(), 32);
        assert_eq!(view.bank().position(), 36);
        assert!(view.bank().item(0).active);
        // 128 block pads cannot start at the kick.
        assert!(!session.available_views().contains(&ViewKind::Drum64));
    }

    #[test]
    fn views_share_clip_and_bank() {
        let config = SessionConfig::default();
        let view = config
            .open_view(ViewKind::Drum, config.new_clip(), config.new_bank())
            .unwrap();
        assert_eq!(view.bank().position(), 36);
        let (clip, bank) = view.into_parts();
        let view = config.open_view(ViewKind::Drum64, clip, bank).unwrap();
        assert!(view.layout().is_block_remapped());
        assert_eq!(view.bank().page_size(), 64);
        assert_eq!(view.bank().position(), 36);
    }
}

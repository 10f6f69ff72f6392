use std::collections::HashSet;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};

use crate::config::Rgb;
use crate::render::{Frame, PadSurface};
use crate::resolution::RESOLUTION_BUTTONS;
use crate::session::{MidiConfig, Session};
use crate::sequencer::{Control, Modifier};

/// Decoded events buffered between the MIDI callback and the main loop.
const INPUT_QUEUE: usize = 1024;

const DEVICE_POLL: Duration = Duration::from_secs(1);

/// One decoded event from the hardware grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridInput {
    /// Pad press (`velocity > 0`) or release.
    Pad { index: usize, velocity: u8 },
    Control(Control),
}

/// Translate a raw MIDI message into a grid event. Messages on other
/// channels, unmapped CCs and control releases that carry no meaning are
/// dropped.
pub fn decode(bytes: &[u8], map: &MidiConfig) -> Option<GridInput> {
    let (&status, data) = bytes.split_first()?;
    if status & 0x0F != map.channel {
        return None;
    }
    match (status & 0xF0, data) {
        (0x90, &[note, velocity, ..]) => pad(note, velocity, map),
        (0x80, &[note, ..]) => pad(note, 0, map),
        (0xB0, &[cc, value, ..]) => control(cc, value > 0, map).map(GridInput::Control),
        _ => None,
    }
}

fn pad(note: u8, velocity: u8, map: &MidiConfig) -> Option<GridInput> {
    let index = note.checked_sub(map.pad_base_note)? as usize;
    Some(GridInput::Pad { index, velocity })
}

fn control(cc: u8, pressed: bool, map: &MidiConfig) -> Option<Control> {
    let modifiers = [
        (map.delete_cc, Modifier::Delete),
        (map.duplicate_cc, Modifier::Duplicate),
        (map.mute_cc, Modifier::Mute),
        (map.solo_cc, Modifier::Solo),
        (map.select_cc, Modifier::Select),
    ];
    if let Some(&(_, m)) = modifiers.iter().find(|(c, _)| *c == cc) {
        return Some(Control::Modifier(m, pressed));
    }
    if !pressed {
        return None;
    }
    if cc == map.octave_up_cc {
        return Some(Control::OctaveUp);
    }
    if cc == map.octave_down_cc {
        return Some(Control::OctaveDown);
    }
    let button = cc.checked_sub(map.resolution_cc)? as usize;
    (button < RESOLUTION_BUTTONS).then_some(Control::Resolution(button))
}

/// Velocity that selects `color` on grids with a 64-entry colour cube
/// palette (four levels per channel, starting at velocity 1). Off is 0.
pub fn color_velocity(color: Rgb) -> u8 {
    if color.is_off() {
        return 0;
    }
    let level = |c: u8| c / 64;
    1 + level(color.0) * 16 + level(color.1) * 4 + level(color.2)
}

pub struct MidiManager {
    sender: Sender<GridInput>,
    map: MidiConfig,
    connections: Vec<MidiInputConnection<()>>,
    connected_names: HashSet<String>,
}

impl MidiManager {
    pub fn new(sender: Sender<GridInput>, map: MidiConfig) -> Self {
        MidiManager {
            sender,
            map,
            connections: Vec::new(),
            connected_names: HashSet::new(),
        }
    }

    /// Open all available MIDI input ports (or those matching the device
    /// filter). Returns the number of newly opened connections.
    pub fn open_ports(&mut self) -> anyhow::Result<usize> {
        let midi_in = MidiInput::new("padseq")?;
        let ports = midi_in.ports();
        let mut opened = 0;

        for port in &ports {
            let name = match midi_in.port_name(port) {
                Ok(n) => n,
                Err(_) => continue,
            };

            if self.connected_names.contains(&name) {
                continue;
            }
            if let Some(ref filter) = self.map.device {
                if !name.contains(filter.as_str()) {
                    continue;
                }
            }

            let sender = self.sender.clone();
            let map = self.map.clone();
            let log_name = name.clone();

            // Need a fresh MidiInput for each connection
            let midi_in_for_port = MidiInput::new("padseq")?;
            match midi_in_for_port.connect(
                port,
                &name,
                move |_timestamp_us, bytes, _| {
                    let Some(input) = decode(bytes, &map) else {
                        log::debug!("MIDI in  [{log_name}] unmapped data={bytes:02x?}");
                        return;
                    };
                    log::debug!("MIDI in  [{log_name}] {input:?}");
                    if sender.try_send(input).is_err() {
                        log::warn!("Grid input channel full, dropping event from {log_name}");
                    }
                },
                (),
            ) {
                Ok(conn) => {
                    log::info!("Opened MIDI input: {name}");
                    self.connected_names.insert(name);
                    self.connections.push(conn);
                    opened += 1;
                }
                Err(e) => {
                    log::warn!("Failed to open MIDI input {name}: {e}");
                }
            }
        }

        Ok(opened)
    }

    /// Poll for newly connected MIDI devices. Call periodically from main loop.
    pub fn poll_new_devices(&mut self) {
        match self.open_ports() {
            Ok(0) => {}
            Ok(n) => log::info!("Opened {n} new MIDI device(s)"),
            Err(e) => log::warn!("MIDI poll error: {e}"),
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

/// Pad lights on the hardware grid, driven over MIDI output.
pub struct MidiLights {
    conn: MidiOutputConnection,
    map: MidiConfig,
}

impl MidiLights {
    /// Connect to the first output port whose name contains `filter`.
    pub fn open(filter: &str, map: MidiConfig) -> anyhow::Result<Self> {
        let midi_out = MidiOutput::new("padseq")?;
        let port = midi_out
            .ports()
            .into_iter()
            .find(|p| midi_out.port_name(p).is_ok_and(|n| n.contains(filter)));
        let Some(port) = port else {
            anyhow::bail!("No MIDI output matches '{filter}'");
        };
        let name = midi_out.port_name(&port)?;
        let conn = midi_out
            .connect(&port, "padseq-lights")
            .map_err(|e| anyhow::anyhow!("Failed to open MIDI output {name}: {e}"))?;
        log::info!("Opened MIDI output: {name}");
        Ok(MidiLights { conn, map })
    }

    fn send(&mut self, message: [u8; 3]) {
        if let Err(e) = self.conn.send(&message) {
            log::warn!("MIDI out error: {e}");
        }
    }
}

impl PadSurface for MidiLights {
    fn light(&mut self, index: usize, color: Rgb) {
        let Some(note) = u8::try_from(index)
            .ok()
            .and_then(|i| i.checked_add(self.map.pad_base_note))
            .filter(|&n| n <= 127)
        else {
            return;
        };
        self.send([0x90 | self.map.channel, note, color_velocity(color)]);
    }

    fn light_button(&mut self, index: usize, color: Rgb) {
        let Some(cc) = self.map.resolution_cc.checked_add(index as u8).filter(|&c| c <= 127) else {
            return;
        };
        self.send([0xB0 | self.map.channel, cc, color_velocity(color)]);
    }
}

/// The hardware side of a running session: grid input from every matching
/// MIDI port, plus pad lights when an output is configured.
pub struct GridPort {
    manager: MidiManager,
    input: Receiver<GridInput>,
    lights: Option<MidiLights>,
    last_poll: Instant,
}

impl GridPort {
    pub fn open(map: &MidiConfig) -> anyhow::Result<Self> {
        let (tx, rx) = crossbeam_channel::bounded(INPUT_QUEUE);
        let mut manager = MidiManager::new(tx, map.clone());
        manager.open_ports()?;
        log::info!("MIDI inputs connected: {}", manager.connection_count());

        let lights = match &map.output {
            Some(filter) => Some(MidiLights::open(filter, map.clone())?),
            None => None,
        };
        Ok(GridPort {
            manager,
            input: rx,
            lights,
            last_poll: Instant::now(),
        })
    }

    /// Feed pending grid input to `session`. Returns whether anything arrived.
    pub fn pump(&mut self, session: &mut Session, now: Instant) -> bool {
        let mut received = false;
        while let Ok(input) = self.input.try_recv() {
            session.handle_input(input, now);
            received = true;
        }
        if now.saturating_duration_since(self.last_poll) >= DEVICE_POLL {
            self.manager.poll_new_devices();
            self.last_poll = now;
        }
        received
    }

    /// Push `frame` to the pad lights, sending only what changed since `previous`.
    pub fn show(&mut self, frame: &Frame, previous: Option<&Frame>) {
        if let Some(lights) = self.lights.as_mut() {
            let sent = frame.flush(previous, lights);
            log::trace!("Updated {sent} pad lights");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> MidiConfig {
        MidiConfig::default()
    }

    #[test]
    fn notes_become_pads() {
        assert_eq!(
            decode(&[0x90, 36, 100], &map()),
            Some(GridInput::Pad { index: 0, velocity: 100 })
        );
        assert_eq!(
            decode(&[0x90, 55, 0], &map()),
            Some(GridInput::Pad { index: 19, velocity: 0 })
        );
        assert_eq!(
            decode(&[0x80, 40, 64], &map()),
            Some(GridInput::Pad { index: 4, velocity: 0 })
        );
        assert_eq!(decode(&[0x90, 35, 100], &map()), None);
    }

    #[test]
    fn other_channels_are_ignored() {
        assert_eq!(decode(&[0x91, 36, 100], &map()), None);
        let map = MidiConfig {
            channel: 1,
            ..map()
        };
        assert!(decode(&[0x91, 36, 100], &map).is_some());
    }

    #[test]
    fn controls() {
        assert_eq!(
            decode(&[0xB0, 100, 127], &map()),
            Some(GridInput::Control(Control::Resolution(0)))
        );
        assert_eq!(
            decode(&[0xB0, 107, 127], &map()),
            Some(GridInput::Control(Control::Resolution(7)))
        );
        assert_eq!(decode(&[0xB0, 108, 127], &map()), None);
        assert_eq!(decode(&[0xB0, 100, 0], &map()), None);
        assert_eq!(
            decode(&[0xB0, 92, 127], &map()),
            Some(GridInput::Control(Control::OctaveUp))
        );
        assert_eq!(
            decode(&[0xB0, 93, 0], &map()),
            Some(GridInput::Control(Control::Modifier(Modifier::Duplicate, false)))
        );
        assert_eq!(
            decode(&[0xB0, 97, 1], &map()),
            Some(GridInput::Control(Control::Modifier(Modifier::Delete, true)))
        );
    }

    #[test]
    fn short_and_foreign_messages() {
        assert_eq!(decode(&[], &map()), None);
        assert_eq!(decode(&[0x90, 36], &map()), None);
        assert_eq!(decode(&[0xE0, 0, 64], &map()), None);
        assert_eq!(decode(&[0xF8], &map()), None);
    }

    #[test]
    fn colour_cube() {
        assert_eq!(color_velocity(Rgb::OFF), 0);
        assert_eq!(color_velocity(Rgb(255, 255, 255)), 64);
        assert_eq!(color_velocity(Rgb(255, 0, 0)), 49);
        assert_eq!(color_velocity(Rgb(10, 10, 10)), 1);
    }
}

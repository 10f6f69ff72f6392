use std::collections::HashSet;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::sequencer::{Control, Modifier};

/// What a computer-keyboard key does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Control(Control),
    /// Start / stop the transport.
    Transport,
    /// Toggle recording on the clip.
    Arm,
    /// Cycle to the next view variant.
    NextView,
}

/// Control row on the computer keyboard.
///
/// Modifier keys act like the hardware buttons: held while the key is down.
/// That needs the Kitty keyboard protocol for release events; without it a
/// modifier key latches on the first press and unlatches on the next.
pub struct KeyControls {
    held: HashSet<KeyCode>,
    latched: HashSet<Modifier>,
    kitty: bool,
}

impl KeyControls {
    pub fn new(kitty: bool) -> Self {
        KeyControls {
            held: HashSet::new(),
            latched: HashSet::new(),
            kitty,
        }
    }

    pub fn handle_key_event(&mut self, event: KeyEvent) -> Option<KeyAction> {
        let code = normalize(event.code);
        match event.kind {
            KeyEventKind::Press => {
                // Dedup: ignore if already held
                if self.kitty && !self.held.insert(code) {
                    return None;
                }
                let Some(m) = modifier_for(code) else {
                    return press_action(code);
                };
                if self.kitty {
                    return Some(KeyAction::Control(Control::Modifier(m, true)));
                }
                let pressed = self.latched.insert(m);
                if !pressed {
                    self.latched.remove(&m);
                }
                log::debug!("Modifier {m:?} {}", if pressed { "latched" } else { "released" });
                Some(KeyAction::Control(Control::Modifier(m, pressed)))
            }
            KeyEventKind::Release => {
                self.held.remove(&code);
                modifier_for(code).map(|m| KeyAction::Control(Control::Modifier(m, false)))
            }
            KeyEventKind::Repeat => None,
        }
    }

    /// Modifiers currently held or latched.
    pub fn active_modifiers(&self) -> impl Iterator<Item = Modifier> + '_ {
        let held = self.held.iter().filter_map(|&c| modifier_for(c));
        held.chain(self.latched.iter().copied())
    }

    /// Release events for everything still held, e.g. before switching views.
    pub fn release_all(&mut self) -> Vec<KeyAction> {
        let mut released: Vec<Modifier> = self.active_modifiers().collect();
        released.sort_by_key(|m| *m as u8);
        released.dedup();
        self.held.clear();
        self.latched.clear();
        released
            .into_iter()
            .map(|m| KeyAction::Control(Control::Modifier(m, false)))
            .collect()
    }
}

fn normalize(code: KeyCode) -> KeyCode {
    match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}

fn modifier_for(code: KeyCode) -> Option<Modifier> {
    match code {
        KeyCode::Char('x') => Some(Modifier::Delete),
        KeyCode::Char('d') => Some(Modifier::Duplicate),
        KeyCode::Char('m') => Some(Modifier::Mute),
        KeyCode::Char('s') => Some(Modifier::Solo),
        KeyCode::Char('e') => Some(Modifier::Select),
        _ => None,
    }
}

fn press_action(code: KeyCode) -> Option<KeyAction> {
    let action = match code {
        KeyCode::Char('[') => KeyAction::Control(Control::OctaveDown),
        KeyCode::Char(']') => KeyAction::Control(Control::OctaveUp),
        KeyCode::Char(' ') => KeyAction::Transport,
        KeyCode::Char('r') => KeyAction::Arm,
        KeyCode::Tab => KeyAction::NextView,
        KeyCode::Char(c @ '1'..='8') => KeyAction::Control(Control::Resolution((c as u8 - b'1') as usize)),
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;

    use super::*;

    fn key(c: char, kind: KeyEventKind) -> KeyEvent {
        KeyEvent::new_with_kind(KeyCode::Char(c), KeyModifiers::NONE, kind)
    }

    fn modifier(m: Modifier, pressed: bool) -> Option<KeyAction> {
        Some(KeyAction::Control(Control::Modifier(m, pressed)))
    }

    #[test]
    fn kitty_modifiers_follow_the_key() {
        let mut k = KeyControls::new(true);
        assert_eq!(k.handle_key_event(key('d', KeyEventKind::Press)), modifier(Modifier::Duplicate, true));
        assert_eq!(k.handle_key_event(key('d', KeyEventKind::Press)), None);
        assert_eq!(k.handle_key_event(key('d', KeyEventKind::Repeat)), None);
        assert_eq!(k.active_modifiers().collect::<Vec<_>>(), vec![Modifier::Duplicate]);
        assert_eq!(k.handle_key_event(key('D', KeyEventKind::Release)), modifier(Modifier::Duplicate, false));
        assert_eq!(k.active_modifiers().count(), 0);
    }

    #[test]
    fn legacy_modifiers_latch() {
        let mut k = KeyControls::new(false);
        assert_eq!(k.handle_key_event(key('m', KeyEventKind::Press)), modifier(Modifier::Mute, true));
        assert_eq!(k.handle_key_event(key('m', KeyEventKind::Press)), modifier(Modifier::Mute, false));
        assert_eq!(k.handle_key_event(key('m', KeyEventKind::Press)), modifier(Modifier::Mute, true));
        assert_eq!(k.release_all(), vec![KeyAction::Control(Control::Modifier(Modifier::Mute, false))]);
    }

    #[test]
    fn resolution_and_octave_keys() {
        let mut k = KeyControls::new(false);
        assert_eq!(
            k.handle_key_event(key('1', KeyEventKind::Press)),
            Some(KeyAction::Control(Control::Resolution(0)))
        );
        assert_eq!(
            k.handle_key_event(key('8', KeyEventKind::Press)),
            Some(KeyAction::Control(Control::Resolution(7)))
        );
        assert_eq!(k.handle_key_event(key('9', KeyEventKind::Press)), None);
        assert_eq!(
            k.handle_key_event(key(']', KeyEventKind::Press)),
            Some(KeyAction::Control(Control::OctaveUp))
        );
        // Legacy terminals never report the release, so repeats must work.
        assert_eq!(
            k.handle_key_event(key(']', KeyEventKind::Press)),
            Some(KeyAction::Control(Control::OctaveUp))
        );
    }

    #[test]
    fn transport_keys() {
        let mut k = KeyControls::new(true);
        assert_eq!(k.handle_key_event(key(' ', KeyEventKind::Press)), Some(KeyAction::Transport));
        assert_eq!(k.handle_key_event(key('r', KeyEventKind::Press)), Some(KeyAction::Arm));
        assert_eq!(k.handle_key_event(key('r', KeyEventKind::Release)), None);
        assert_eq!(k.handle_key_event(key('r', KeyEventKind::Press)), Some(KeyAction::Arm));
    }
}

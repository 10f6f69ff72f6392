use std::time::{Duration, Instant};

/// Lifecycle of one pad or button.
///
/// The state is never stored directly: it is derived from the press time,
/// the consumed flag and the current instant, so a button can't get stuck in
/// `LongPressed` after the gesture that used it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Idle,
    Pressed,
    LongPressed,
    /// Held, but its long-press already triggered an action.
    Consumed,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PadButton {
    pressed_at: Option<Instant>,
    velocity: u8,
    consumed: bool,
}

impl PadButton {
    pub fn press(&mut self, now: Instant, velocity: u8) {
        self.pressed_at = Some(now);
        self.velocity = velocity;
        self.consumed = false;
    }

    /// Release the button and return the state it was in just before.
    pub fn release(&mut self, now: Instant, threshold: Duration) -> ButtonState {
        let state = self.state(now, threshold);
        *self = PadButton::default();
        state
    }

    pub fn state(&self, now: Instant, threshold: Duration) -> ButtonState {
        match self.pressed_at {
            None => ButtonState::Idle,
            Some(_) if self.consumed => ButtonState::Consumed,
            Some(at) if now.saturating_duration_since(at) >= threshold => ButtonState::LongPressed,
            Some(_) => ButtonState::Pressed,
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed_at.is_some()
    }

    pub fn is_long_pressed(&self, now: Instant, threshold: Duration) -> bool {
        self.state(now, threshold) == ButtonState::LongPressed
    }

    /// Mark a held button as used. Returns false if it isn't held.
    pub fn consume(&mut self) -> bool {
        if self.pressed_at.is_none() {
            return false;
        }
        self.consumed = true;
        true
    }

    /// Velocity of the press that is currently held (0 when idle).
    pub fn pressed_velocity(&self) -> u8 {
        self.velocity
    }
}

/// Button state for every pad of a grid, sharing one long-press threshold.
#[derive(Debug, Clone)]
pub struct ButtonMatrix {
    buttons: Vec<PadButton>,
    threshold: Duration,
}

impl ButtonMatrix {
    pub fn new(size: usize, threshold: Duration) -> Self {
        ButtonMatrix {
            buttons: vec![PadButton::default(); size],
            threshold,
        }
    }

    pub fn press(&mut self, index: usize, now: Instant, velocity: u8) {
        if let Some(b) = self.buttons.get_mut(index) {
            b.press(now, velocity);
        }
    }

    /// Returns the pre-release state, or `None` for an unknown index.
    pub fn release(&mut self, index: usize, now: Instant) -> Option<ButtonState> {
        let threshold = self.threshold;
        self.buttons.get_mut(index).map(|b| b.release(now, threshold))
    }

    pub fn get(&self, index: usize) -> PadButton {
        self.buttons.get(index).copied().unwrap_or_default()
    }

    pub fn state(&self, index: usize, now: Instant) -> ButtonState {
        self.get(index).state(now, self.threshold)
    }

    pub fn is_pressed(&self, index: usize) -> bool {
        self.get(index).is_pressed()
    }

    pub fn is_long_pressed(&self, index: usize, now: Instant) -> bool {
        self.get(index).is_long_pressed(now, self.threshold)
    }

    pub fn consume(&mut self, index: usize) -> bool {
        self.buttons.get_mut(index).is_some_and(|b| b.consume())
    }

    pub fn pressed_velocity(&self, index: usize) -> u8 {
        self.get(index).pressed_velocity()
    }

    pub fn any_pressed(&self) -> bool {
        self.buttons.iter().any(|b| b.is_pressed())
    }

    /// Forget every press in `indices` without generating releases.
    pub fn clear<I: IntoIterator<Item = usize>>(&mut self, indices: I) {
        for index in indices {
            if let Some(b) = self.buttons.get_mut(index) {
                *b = PadButton::default();
            }
        }
    }

    pub fn clear_all(&mut self) {
        self.buttons.fill(PadButton::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: Duration = Duration::from_millis(400);

    #[test]
    fn idle_by_default() {
        let b = PadButton::default();
        assert_eq!(b.state(Instant::now(), THRESHOLD), ButtonState::Idle);
        assert!(!b.is_pressed());
        assert_eq!(b.pressed_velocity(), 0);
    }

    #[test]
    fn becomes_long_pressed_after_threshold() {
        let t0 = Instant::now();
        let mut b = PadButton::default();
        b.press(t0, 90);
        assert_eq!(b.state(t0, THRESHOLD), ButtonState::Pressed);
        assert_eq!(b.state(t0 + Duration::from_millis(399), THRESHOLD), ButtonState::Pressed);
        assert_eq!(b.state(t0 + THRESHOLD, THRESHOLD), ButtonState::LongPressed);
        assert_eq!(b.pressed_velocity(), 90);
    }

    #[test]
    fn consumed_is_not_long_pressed() {
        let t0 = Instant::now();
        let later = t0 + Duration::from_secs(1);
        let mut b = PadButton::default();
        b.press(t0, 100);
        assert!(b.is_long_pressed(later, THRESHOLD));
        assert!(b.consume());
        assert!(!b.is_long_pressed(later, THRESHOLD));
        assert_eq!(b.state(later, THRESHOLD), ButtonState::Consumed);
        // Consuming again changes nothing.
        assert!(b.consume());
        assert_eq!(b.state(later, THRESHOLD), ButtonState::Consumed);
    }

    #[test]
    fn release_reports_previous_state_and_resets() {
        let t0 = Instant::now();
        let mut b = PadButton::default();
        b.press(t0, 100);
        b.consume();
        assert_eq!(b.release(t0, THRESHOLD), ButtonState::Consumed);
        assert_eq!(b.state(t0, THRESHOLD), ButtonState::Idle);
        // A new press starts fresh.
        b.press(t0, 100);
        assert_eq!(b.state(t0, THRESHOLD), ButtonState::Pressed);
    }

    #[test]
    fn idle_button_cannot_be_consumed() {
        let mut b = PadButton::default();
        assert!(!b.consume());
    }

    #[test]
    fn matrix_ignores_unknown_indices() {
        let t0 = Instant::now();
        let mut m = ButtonMatrix::new(4, THRESHOLD);
        m.press(10, t0, 100);
        assert_eq!(m.release(10, t0), None);
        assert!(!m.consume(10));
        assert_eq!(m.state(10, t0), ButtonState::Idle);
    }

    #[test]
    fn matrix_clear_forgets_presses() {
        let t0 = Instant::now();
        let mut m = ButtonMatrix::new(4, THRESHOLD);
        m.press(0, t0, 100);
        m.press(2, t0, 100);
        m.clear([0]);
        assert!(!m.is_pressed(0));
        assert!(m.is_pressed(2));
        assert!(m.any_pressed());
        m.clear_all();
        assert!(!m.is_pressed(2));
        assert!(!m.any_pressed());
    }
}

use std::time::{Duration, Instant};

/// A deferred one-shot task slot.
///
/// Scheduling while a task is pending replaces its deadline; there is never
/// more than one pending run. The task itself carries no data: whoever polls
/// [`fire`](Self::fire) reads the model as it is at that moment, so bursts of
/// changes collapse into one update.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    due: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Debounce { delay, due: None }
    }

    pub fn schedule(&mut self, now: Instant) {
        self.due = Some(now + self.delay);
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    /// True exactly once when the deadline has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

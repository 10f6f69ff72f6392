/// A musical step length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub name: &'static str,
    /// Length of one step in beats (quarter notes).
    pub beats: f64,
}

/// Selectable step lengths, coarsest first.
pub const RESOLUTIONS: [Resolution; 8] = [
    Resolution { name: "1/1", beats: 4.0 },
    Resolution { name: "1/2", beats: 2.0 },
    Resolution { name: "1/4", beats: 1.0 },
    Resolution { name: "1/8", beats: 0.5 },
    Resolution { name: "1/8T", beats: 1.0 / 3.0 },
    Resolution { name: "1/16", beats: 0.25 },
    Resolution { name: "1/16T", beats: 1.0 / 6.0 },
    Resolution { name: "1/32", beats: 0.125 },
];

/// Number of resolution buttons in the control row.
pub const RESOLUTION_BUTTONS: usize = RESOLUTIONS.len();

/// Default: 1/16.
pub const DEFAULT_RESOLUTION: usize = 5;

/// How a loop-zone page pad is lit. Variants are in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// The transport is inside this page.
    Playing,
    /// The page currently shown in the sequencer zone.
    Selected,
    /// Overlaps the clip's loop range.
    InLoop,
    /// Outside the loop range.
    Empty,
}

/// Snapshot of the clip values a page pad depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageContext {
    pub playing_page: Option<usize>,
    pub edit_page: usize,
    pub loop_start: f64,
    pub loop_length: f64,
}

/// Owns the selected resolution and the page arithmetic derived from it.
#[derive(Debug, Clone)]
pub struct PageController {
    resolution_index: usize,
    displayed_steps: usize,
}

impl PageController {
    pub fn new(displayed_steps: usize, resolution_index: usize) -> Self {
        PageController {
            resolution_index: resolution_index.min(RESOLUTIONS.len() - 1),
            displayed_steps,
        }
    }

    pub fn resolution_index(&self) -> usize {
        self.resolution_index
    }

    pub fn resolution(&self) -> Resolution {
        RESOLUTIONS[self.resolution_index]
    }

    /// Length of one step in beats.
    pub fn step_length(&self) -> f64 {
        self.resolution().beats
    }

    pub fn displayed_steps(&self) -> usize {
        self.displayed_steps
    }

    /// Beats covered by one page, floored to whole beats.
    pub fn page_length(&self) -> f64 {
        (self.displayed_steps as f64 * self.step_length()).floor()
    }

    /// Select a resolution directly. Out-of-range indices are clamped.
    /// Returns whether the resolution changed.
    pub fn set_resolution_index(&mut self, index: usize) -> bool {
        let index = index.min(RESOLUTIONS.len() - 1);
        let changed = index != self.resolution_index;
        self.resolution_index = index;
        changed
    }

    /// Handle resolution button `button` of the control row. The row is
    /// reversed: button 0 selects the finest resolution. Returns the new
    /// index, or `None` if the button does not exist.
    pub fn press_resolution_button(&mut self, button: usize) -> Option<usize> {
        if button >= RESOLUTION_BUTTONS {
            return None;
        }
        self.set_resolution_index(RESOLUTION_BUTTONS - 1 - button);
        Some(self.resolution_index)
    }

    /// Which resolution button lights up for the current selection.
    pub fn active_button(&self) -> usize {
        RESOLUTION_BUTTONS - 1 - self.resolution_index
    }

    /// Page containing an absolute (clip-relative) step.
    pub fn page_of_step(&self, step: usize) -> usize {
        if self.displayed_steps == 0 {
            return 0;
        }
        step / self.displayed_steps
    }

    /// Page pad whose loop span holds an absolute step. Page pads measure
    /// whole-beat pages like `loop_bounds`, which can drift from
    /// `page_of_step` when a page does not fill a whole number of beats.
    pub fn loop_page_of_step(&self, step: usize) -> usize {
        let page_length = self.page_length();
        if page_length <= 0.0 {
            return self.page_of_step(step);
        }
        (step as f64 * self.step_length() / page_length).floor() as usize
    }

    /// Loop bounds in beats spanned by two page pads, in either order.
    /// Returns `(start, length)`.
    pub fn loop_bounds(&self, a: usize, b: usize) -> (f64, f64) {
        let page_length = self.page_length();
        let start = a.min(b);
        let end = a.max(b) + 1;
        (start as f64 * page_length, (end - start) as f64 * page_length)
    }

    /// Colour class for a page pad: playing > selected > in loop > empty.
    pub fn page_state(&self, page: usize, ctx: &PageContext) -> PageState {
        if ctx.playing_page == Some(page) {
            return PageState::Playing;
        }
        if ctx.edit_page == page {
            return PageState::Selected;
        }
        let page_length = self.page_length();
        let start = page as f64 * page_length;
        let end = start + page_length;
        if page_length > 0.0 && start < ctx.loop_start + ctx.loop_length && end > ctx.loop_start {
            PageState::InLoop
        } else {
            PageState::Empty
        }
    }
}

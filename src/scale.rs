use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleKind {
    #[default]
    Major,
    Minor,
    Dorian,
    Mixolydian,
    PentatonicMajor,
    PentatonicMinor,
    Chromatic,
}

impl ScaleKind {
    pub fn intervals(self) -> &'static [u8] {
        match self {
            ScaleKind::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleKind::Minor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleKind::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            ScaleKind::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            ScaleKind::PentatonicMajor => &[0, 2, 4, 7, 9],
            ScaleKind::PentatonicMinor => &[0, 3, 5, 7, 10],
            ScaleKind::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScaleKind::Major => "Major",
            ScaleKind::Minor => "Minor",
            ScaleKind::Dorian => "Dorian",
            ScaleKind::Mixolydian => "Mixolydian",
            ScaleKind::PentatonicMajor => "Pentatonic Major",
            ScaleKind::PentatonicMinor => "Pentatonic Minor",
            ScaleKind::Chromatic => "Chromatic",
        }
    }

    /// Scale degrees between vertically adjacent pads: a fourth up.
    fn row_shift(self) -> usize {
        match self.intervals().len() {
            12 => 5,
            5 => 2,
            _ => 3,
        }
    }
}

pub const MAX_OCTAVE: u8 = 9;

/// In-key pad layout for the play zone: each pad one scale degree to the
/// right of its neighbour, each row a fourth above the row below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteLayout {
    scale: ScaleKind,
    root: u8,
    octave: u8,
}

impl NoteLayout {
    pub fn new(scale: ScaleKind, root: u8, octave: u8) -> Self {
        NoteLayout {
            scale,
            root: root % 12,
            octave: octave.min(MAX_OCTAVE),
        }
    }

    pub fn scale(&self) -> ScaleKind {
        self.scale
    }

    pub fn root(&self) -> u8 {
        self.root
    }

    pub fn octave(&self) -> u8 {
        self.octave
    }

    /// Lowest note of the layout (bottom-left pad).
    pub fn base_note(&self) -> u8 {
        self.octave * 12 + self.root
    }

    /// Note for a play-zone pad, `None` above MIDI range.
    pub fn note_at(&self, col: usize, row: usize) -> Option<u8> {
        let intervals = self.scale.intervals();
        let degree = row * self.scale.row_shift() + col;
        let octaves = degree / intervals.len();
        let note = self.base_note() as usize + octaves * 12 + intervals[degree % intervals.len()] as usize;
        u8::try_from(note).ok().filter(|&n| n <= 127)
    }

    pub fn contains(&self, note: u8) -> bool {
        let pc = (note + 12 - self.root) % 12;
        self.scale.intervals().contains(&pc)
    }

    pub fn is_root(&self, note: u8) -> bool {
        note % 12 == self.root
    }

    /// Returns whether the octave changed.
    pub fn octave_up(&mut self) -> bool {
        if self.octave < MAX_OCTAVE {
            self.octave += 1;
            true
        } else {
            false
        }
    }

    pub fn octave_down(&mut self) -> bool {
        if self.octave > 0 {
            self.octave -= 1;
            true
        } else {
            false
        }
    }
}

pub fn note_name(note: u8) -> String {
    const NAMES: [&str; 12] = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];
    let octave = (note / 12) as i8 - 1;
    let name = NAMES[(note % 12) as usize];
    format!("{name}{octave}")
}

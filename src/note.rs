//! Note data as supplied by the owning pattern, plus pitch-class helpers.

use std::fmt;

/// Highest MIDI pitch.
pub const MAX_PITCH: u8 = 127;
/// Highest MIDI velocity. Velocity 0 is not a valid note velocity.
pub const MAX_VELOCITY: u8 = 127;

/// Rows per quarter note.
pub const ROWS_PER_BEAT: u32 = 4;
/// Rows per measure (4/4).
pub const ROWS_PER_MEASURE: u32 = ROWS_PER_BEAT * 4;

/// Opaque identifier, unique within the owning pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(pub u64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A note in a pattern. Occupies the half-open row interval
/// `start_row..end_row`.
#[derive(Clone, Debug, PartialEq)]
pub struct Note {
    pub id: NoteId,
    pub start_row: f32,
    pub end_row: f32,
    pub midi_note: u8,
    pub velocity: u8,
    /// Channel/instrument index, only used to pick a colour.
    pub channel: Option<u8>,
    pub slide: bool,
    pub accent: bool,
    pub hammer: bool,
    pub mute: bool,
}

impl Note {
    pub fn new(id: NoteId, start_row: f32, end_row: f32, midi_note: u8, velocity: u8) -> Self {
        Self {
            id,
            start_row,
            end_row,
            midi_note: midi_note.min(MAX_PITCH),
            velocity: velocity.clamp(1, MAX_VELOCITY),
            channel: None,
            slide: false,
            accent: false,
            hammer: false,
            mute: false,
        }
    }

    pub fn length(&self) -> f32 {
        self.end_row - self.start_row
    }

    /// Returns a copy shifted in time and pitch. Pitch saturates at the MIDI
    /// range.
    pub fn translated(&self, delta_row: f32, delta_pitch: i32) -> Self {
        Self {
            start_row: self.start_row + delta_row,
            end_row: self.end_row + delta_row,
            midi_note: shift_pitch(self.midi_note, delta_pitch),
            ..self.clone()
        }
    }

    /// True if any articulation decorator is set.
    pub fn has_decorators(&self) -> bool {
        self.slide || self.accent || self.hammer || self.mute
    }
}

/// Shift a pitch by a signed number of semitones, clamping to 0..=127.
pub fn shift_pitch(pitch: u8, delta: i32) -> u8 {
    (pitch as i32 + delta).clamp(0, MAX_PITCH as i32) as u8
}

/// Pitch class (0 = C) of a MIDI note.
pub fn pitch_class(pitch: u8) -> u8 {
    pitch % 12
}

pub fn is_black_key(pitch: u8) -> bool {
    matches!(pitch_class(pitch), 1 | 3 | 6 | 8 | 10)
}

/// True for C, where octave separator lines are drawn.
pub fn is_octave_root(pitch: u8) -> bool {
    pitch_class(pitch) == 0
}

/// Set of pitch classes considered in-scale. An empty scale means no
/// constraint: every pitch is in scale.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scale {
    classes: Vec<u8>,
}

impl Scale {
    /// Build a scale from pitch classes or absolute pitches. Values are
    /// reduced mod 12, sorted and deduplicated.
    pub fn new(notes: impl IntoIterator<Item = u8>) -> Self {
        let mut classes: Vec<u8> = notes.into_iter().map(pitch_class).collect();
        classes.sort_unstable();
        classes.dedup();
        Self { classes }
    }

    pub fn chromatic() -> Self {
        Self::default()
    }

    /// Major scale on `root` (pitch class or absolute pitch).
    pub fn major(root: u8) -> Self {
        Self::new([0, 2, 4, 5, 7, 9, 11].map(|i| root % 12 + i))
    }

    /// Natural minor scale on `root`.
    pub fn minor(root: u8) -> Self {
        Self::new([0, 2, 3, 5, 7, 8, 10].map(|i| root % 12 + i))
    }

    pub fn contains(&self, pitch: u8) -> bool {
        self.classes.is_empty() || self.classes.contains(&pitch_class(pitch))
    }

    /// Sorted pitch classes, for cache keys.
    pub fn classes(&self) -> &[u8] {
        &self.classes
    }
}

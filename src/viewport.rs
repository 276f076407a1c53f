//! Mapping between musical coordinates (rows, semitones) and surface pixels.

use crate::note::{MAX_PITCH, ROWS_PER_BEAT};

/// Pitch that sits at the top edge of the viewport when `scroll_y` is zero.
/// `scroll_y` counts semitones relative to this reference instead of naming
/// the top pitch directly, which keeps scroll independent of vertical zoom.
pub const CENTER_OFFSET: f32 = 60.0;

/// Supported grid divisions, in subdivisions of a quarter note.
pub const GRID_DIVISIONS: [u8; 8] = [1, 2, 3, 4, 6, 8, 12, 16];

/// Row length of one grid step at `division`. A quarter note is
/// `ROWS_PER_BEAT` rows, so division 4 gives one-row steps.
pub fn row_step(division: u8) -> f32 {
    ROWS_PER_BEAT as f32 / division.max(1) as f32
}

/// Round `row` to the nearest grid line for `division`.
pub fn snap_row(row: f32, division: u8) -> f32 {
    let step = row_step(division);
    (row / step).round() * step
}

/// Round `row` down to the start of the grid cell containing it.
pub fn floor_row(row: f32, division: u8) -> f32 {
    let step = row_step(division);
    (row / step).floor() * step
}

/// Closest supported division to `division`.
pub fn nearest_division(division: u8) -> u8 {
    GRID_DIVISIONS.iter()
        .copied()
        .min_by_key(|d| (*d as i16 - division as i16).abs())
        .unwrap_or(4)
}

/// Next finer supported division, saturating at the finest.
pub fn next_division(division: u8) -> u8 {
    GRID_DIVISIONS.iter()
        .copied()
        .find(|d| *d > division)
        .unwrap_or(GRID_DIVISIONS[GRID_DIVISIONS.len() - 1])
}

/// Next coarser supported division, saturating at the coarsest.
pub fn prev_division(division: u8) -> u8 {
    GRID_DIVISIONS.iter()
        .rev()
        .copied()
        .find(|d| *d < division)
        .unwrap_or(GRID_DIVISIONS[0])
}

/// Rows and pitches covered by the surface, padded by one unit on each side.
/// Rows are `start_row..end_row`, pitches `min_note..=max_note`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibleRange {
    pub start_row: f32,
    pub end_row: f32,
    pub min_note: u8,
    pub max_note: u8,
}

impl VisibleRange {
    pub fn contains_rows(&self, start: f32, end: f32) -> bool {
        start < self.end_row && end > self.start_row
    }

    pub fn contains_note(&self, pitch: u8) -> bool {
        (self.min_note..=self.max_note).contains(&pitch)
    }
}

/// Scroll/zoom transform plus surface size, in logical pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Leftmost visible row.
    pub scroll_x: f32,
    /// Semitones scrolled relative to `CENTER_OFFSET`.
    pub scroll_y: f32,
    /// Pixels per row.
    pub h_zoom: f32,
    /// Pixels per semitone.
    pub v_zoom: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scroll_x: 0.0,
            scroll_y: 0.0,
            h_zoom: 16.0,
            v_zoom: 12.0,
            width: 800.0,
            height: 600.0,
        }
    }
}

impl Viewport {
    pub fn row_to_pixel_x(&self, row: f32) -> f32 {
        (row - self.scroll_x) * self.h_zoom
    }

    pub fn pixel_x_to_row(&self, x: f32) -> f32 {
        x / self.h_zoom + self.scroll_x
    }

    /// Top edge of the lane for `midi`.
    pub fn note_to_pixel_y(&self, midi: f32) -> f32 {
        (self.scroll_y + CENTER_OFFSET - midi) * self.v_zoom
    }

    pub fn pixel_y_to_note(&self, y: f32) -> f32 {
        self.scroll_y + CENTER_OFFSET - y / self.v_zoom
    }

    /// The pitch whose lane contains `y`, clamped to the MIDI range.
    pub fn pitch_at(&self, y: f32) -> u8 {
        self.pixel_y_to_note(y).ceil().clamp(0.0, MAX_PITCH as f32) as u8
    }

    /// The row cell containing `x`, clamped to non-negative rows.
    pub fn row_at(&self, x: f32) -> f32 {
        self.pixel_x_to_row(x).max(0.0)
    }

    pub fn visible_range(&self) -> VisibleRange {
        let start_row = (self.scroll_x.floor() - 1.0).max(0.0);
        let end_row = self.pixel_x_to_row(self.width).ceil() + 1.0;
        let top = self.pixel_y_to_note(0.0).ceil() + 1.0;
        let bottom = self.pixel_y_to_note(self.height).floor() - 1.0;
        VisibleRange {
            start_row,
            end_row,
            min_note: bottom.clamp(0.0, MAX_PITCH as f32) as u8,
            max_note: top.clamp(0.0, MAX_PITCH as f32) as u8,
        }
    }

    /// Scroll so that `pitch` is vertically centered.
    pub fn center_on_pitch(&mut self, pitch: f32) {
        let half = self.height / self.v_zoom * 0.5;
        self.scroll_y = pitch + half - CENTER_OFFSET;
    }

    /// Scroll limits for `scroll_y` that keep lanes within the MIDI range.
    pub fn scroll_y_limits(&self) -> (f32, f32) {
        let visible = self.height / self.v_zoom;
        let min = visible - CENTER_OFFSET - 1.0;
        // lane 127 at the top edge, lane 0 at the bottom edge
        let max = MAX_PITCH as f32 - CENTER_OFFSET;
        (min.min(max), max)
    }
}

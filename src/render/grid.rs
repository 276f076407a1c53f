//! Cached background: pitch lanes, grid lines, pattern end.

use macroquad::math::Rect;
use ordered_float::OrderedFloat;
use tracing::debug;

use crate::{note::{is_black_key, is_octave_root, Scale, ROWS_PER_BEAT, ROWS_PER_MEASURE},
    viewport::{row_step, Viewport}};

use super::{surface::Surface, theme::Theme};

/// Width of the pattern end marker, in logical pixels.
const PATTERN_END_WIDTH: f32 = 2.0;
const MEASURE_LINE_WIDTH: f32 = 2.0;
const LINE_WIDTH: f32 = 1.0;

/// Everything the grid image depends on, except the theme. Floats are
/// rounded so sub-pixel jitter doesn't defeat the cache.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    scroll_x: OrderedFloat<f32>,
    scroll_y: OrderedFloat<f32>,
    h_zoom: OrderedFloat<f32>,
    v_zoom: OrderedFloat<f32>,
    width: OrderedFloat<f32>,
    height: OrderedFloat<f32>,
    division: u8,
    pattern_length: OrderedFloat<f32>,
    scale: Vec<u8>,
    pixel_scale: OrderedFloat<f32>,
}

impl CacheKey {
    fn new(viewport: &Viewport, division: u8, pattern_length: f32, scale: &Scale,
        pixel_scale: f32
    ) -> Self {
        Self {
            scroll_x: rounded(viewport.scroll_x),
            scroll_y: rounded(viewport.scroll_y),
            h_zoom: rounded(viewport.h_zoom),
            v_zoom: rounded(viewport.v_zoom),
            width: rounded(viewport.width),
            height: rounded(viewport.height),
            division,
            pattern_length: rounded(pattern_length),
            scale: scale.classes().to_vec(),
            pixel_scale: rounded(pixel_scale),
        }
    }
}

fn rounded(v: f32) -> OrderedFloat<f32> {
    OrderedFloat((v * 1000.0).round() / 1000.0)
}

/// Weight class of a vertical grid line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    Measure,
    Beat,
    Subdivision,
}

/// Classify the `index`th grid line at `division`. Line `index` sits at row
/// `index * row_step(division)`.
pub fn line_kind(index: i64, division: u8) -> LineKind {
    let division = division.max(1) as i64;
    let per_beat = division;
    let per_measure = division * (ROWS_PER_MEASURE / ROWS_PER_BEAT) as i64;
    if index.rem_euclid(per_measure) == 0 {
        LineKind::Measure
    } else if index.rem_euclid(per_beat) == 0 {
        LineKind::Beat
    } else {
        LineKind::Subdivision
    }
}

/// Renders the grid to an owned surface, redrawing only when its inputs
/// change. Theme changes are not part of the key; call `invalidate` (or
/// `set_theme`, which does) when they happen.
pub struct GridRenderer {
    surface: Surface,
    key: Option<CacheKey>,
    theme: Theme,
    generation: u64,
}

impl GridRenderer {
    pub fn new(theme: Theme) -> Self {
        Self {
            surface: Surface::new(1.0, 1.0, 1.0),
            key: None,
            theme,
            generation: 0,
        }
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.invalidate();
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Force the next `render` to redraw.
    pub fn invalidate(&mut self) {
        self.key = None;
    }

    /// Number of redraws so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn render(&mut self, viewport: &Viewport, division: u8, pattern_length: f32,
        scale: &Scale, pixel_scale: f32
    ) -> &Surface {
        let key = CacheKey::new(viewport, division, pattern_length, scale, pixel_scale);
        if self.key.as_ref() == Some(&key) {
            return &self.surface
        }

        let resized = self.surface.resize(viewport.width, viewport.height, pixel_scale);
        debug!(generation = self.generation + 1, resized,
            invalidated = self.key.is_none(), "redrawing grid");
        self.draw(viewport, division, pattern_length, scale);
        self.key = Some(key);
        self.generation += 1;
        &self.surface
    }

    fn draw(&mut self, viewport: &Viewport, division: u8, pattern_length: f32, scale: &Scale) {
        let theme = &self.theme;
        let surface = &mut self.surface;
        let range = viewport.visible_range();
        surface.clear(theme.lane_white());

        // lanes
        for pitch in range.min_note..=range.max_note {
            let y = viewport.note_to_pixel_y(pitch as f32);
            let color = if !scale.contains(pitch) {
                theme.lane_out_of_scale()
            } else if is_black_key(pitch) {
                theme.lane_black()
            } else {
                theme.lane_white()
            };
            surface.fill_rect(Rect::new(0.0, y, viewport.width, viewport.v_zoom), color);
            if is_octave_root(pitch) {
                surface.line(0.0, y + viewport.v_zoom, viewport.width, y + viewport.v_zoom,
                    LINE_WIDTH, theme.octave_line());
            }
        }

        // rows past the pattern
        let end_x = viewport.row_to_pixel_x(pattern_length);
        let has_end = pattern_length > 0.0;
        if has_end && end_x < viewport.width {
            let x = end_x.max(0.0);
            surface.fill_rect(Rect::new(x, 0.0, viewport.width - x, viewport.height),
                theme.beyond_pattern());
        }

        // columns
        let step = row_step(division);
        let first = (range.start_row / step).ceil() as i64;
        let last = (range.end_row / step).floor() as i64;
        for i in first..=last {
            let row = i as f32 * step;
            let x = viewport.row_to_pixel_x(row);
            let kind = line_kind(i, division);
            let width = if kind == LineKind::Measure { MEASURE_LINE_WIDTH } else { LINE_WIDTH };
            let color = if has_end && row >= pattern_length {
                theme.beyond_pattern_line()
            } else {
                match kind {
                    LineKind::Measure => theme.measure_line(),
                    LineKind::Beat => theme.beat_line(),
                    LineKind::Subdivision => theme.subdivision_line(),
                }
            };
            surface.line(x, 0.0, x, viewport.height, width, color);
        }

        if has_end && (0.0..viewport.width).contains(&end_x) {
            surface.fill_rect(Rect::new(end_x, 0.0, PATTERN_END_WIDTH, viewport.height),
                theme.pattern_end());
        }
    }
}

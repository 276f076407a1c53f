//! Notes, ghost notes and overlays, drawn over the cached grid.

use std::collections::HashSet;

use macroquad::{color::Color, math::Rect};

use crate::{hit::{has_resize_bands, note_rect}, note::{Note, NoteId, MAX_VELOCITY},
    viewport::{VisibleRange, Viewport}};

use super::{surface::Surface, theme::Theme};

const SELECTED_OUTLINE: f32 = 2.5;
const OUTLINE: f32 = 1.0;
const GHOST_ALPHA: f32 = 0.35;
const GHOST_DASH: f32 = 4.0;
const MAX_RADIUS: f32 = 3.0;
/// Notes narrower than this get no velocity overlay.
const VELOCITY_MIN_WIDTH: f32 = 12.0;
/// Notes smaller than this get no decorator glyphs.
const DECORATOR_MIN_WIDTH: f32 = 10.0;
const DECORATOR_MIN_HEIGHT: f32 = 6.0;
const GLYPH_MAX: f32 = 5.0;
const GLYPH_INSET: f32 = 2.0;
const PLAYHEAD_WIDTH: f32 = 2.0;
const PLAYHEAD_CAP: f32 = 6.0;

/// Fill alpha for a velocity. Quadratic so quiet notes are visibly dimmer
/// but never vanish.
pub fn velocity_alpha(velocity: u8) -> f32 {
    let v = velocity.min(MAX_VELOCITY) as f32 / MAX_VELOCITY as f32;
    0.33 + 0.67 * v * v
}

/// Row offsets at which a pattern of `pattern_length` rows repeats within
/// the visible range. Without a length, the pattern is drawn once.
pub fn repeat_offsets(range: &VisibleRange, pattern_length: Option<f32>) -> Vec<f32> {
    match pattern_length {
        Some(len) if len > 0.0 => {
            let first = (range.start_row / len).floor().max(0.0) as i64;
            let last = (range.end_row / len).floor().max(0.0) as i64;
            (first..=last).map(|i| i as f32 * len).collect()
        }
        _ => vec![0.0],
    }
}

/// Everything the note layer draws in one frame.
pub struct NoteScene<'a> {
    /// In z-order: later notes are drawn on top.
    pub notes: &'a [Note],
    pub selected: &'a HashSet<NoteId>,
    pub ghosts: &'a [Note],
    pub show_velocity: bool,
    /// When set, notes are tiled at every visible repeat of the pattern.
    pub pattern_length: Option<f32>,
    pub hovered: Option<NoteId>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Style {
    Normal,
    Selected,
    Ghost,
}

pub struct NoteRenderer {
    theme: Theme,
}

impl NoteRenderer {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn render(&self, surface: &mut Surface, viewport: &Viewport, scene: &NoteScene) {
        let range = viewport.visible_range();
        let offsets = repeat_offsets(&range, scene.pattern_length);

        // ghosts go underneath so a note never hides behind its own preview
        for offset in &offsets {
            for ghost in scene.ghosts {
                self.draw_note(surface, viewport, &range, ghost, *offset, Style::Ghost, scene);
            }
        }

        for offset in &offsets {
            for note in scene.notes {
                let style = if scene.selected.contains(&note.id) {
                    Style::Selected
                } else {
                    Style::Normal
                };
                self.draw_note(surface, viewport, &range, note, *offset, style, scene);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_note(&self, surface: &mut Surface, viewport: &Viewport, range: &VisibleRange,
        note: &Note, offset: f32, style: Style, scene: &NoteScene
    ) {
        if !range.contains_rows(note.start_row + offset, note.end_row + offset)
            || !range.contains_note(note.midi_note) {
            return
        }

        let mut rect = note_rect(note, viewport);
        rect.x += offset * viewport.h_zoom;
        rect.w = rect.w.max(1.0);
        let radius = (rect.h * 0.25).min(MAX_RADIUS);
        let theme = &self.theme;

        match style {
            Style::Ghost => {
                let fill = Color { a: GHOST_ALPHA, ..theme.note(note.channel) };
                surface.fill_rounded_rect(rect, radius, fill);
                surface.stroke_rounded_rect(rect, radius, OUTLINE, theme.ghost_outline(),
                    Some(GHOST_DASH));
                return
            }
            Style::Selected => {
                let fill = Color {
                    a: velocity_alpha(note.velocity),
                    ..theme.note_selected(note.channel)
                };
                surface.fill_rounded_rect(rect, radius, fill);
            }
            Style::Normal => {
                let fill = Color { a: velocity_alpha(note.velocity), ..theme.note(note.channel) };
                surface.fill_rounded_rect(rect, radius, fill);
            }
        }

        if scene.show_velocity && rect.w > VELOCITY_MIN_WIDTH {
            let v = note.velocity.min(MAX_VELOCITY) as f32 / MAX_VELOCITY as f32;
            let lit = rect.w * v;
            surface.fill_rect(Rect {
                x: rect.x + lit,
                y: rect.y + 1.0,
                w: rect.w - lit - 1.0,
                h: rect.h - 2.0,
            }, theme.velocity_overlay());
        }

        self.draw_decorators(surface, rect, note);

        if has_resize_bands(rect.w) {
            let x = rect.x + rect.w - 3.0;
            surface.line(x, rect.y + 3.0, x, rect.y + rect.h - 3.0, 1.0,
                theme.note_highlight());
        }

        if style == Style::Selected {
            surface.stroke_rounded_rect(rect, radius, SELECTED_OUTLINE,
                theme.selection_outline(), None);
        } else {
            surface.stroke_rounded_rect(rect, radius, OUTLINE, theme.note_outline(), None);
        }

        if scene.hovered == Some(note.id) {
            let ring = Rect {
                x: rect.x - 1.0,
                y: rect.y - 1.0,
                w: rect.w + 2.0,
                h: rect.h + 2.0,
            };
            surface.stroke_rounded_rect(ring, radius + 1.0, OUTLINE, theme.hover_outline(), None);
        }
    }

    /// Articulation glyphs. Accent and hammer share the top-left corner, so
    /// hammer shifts right when both are set; slide sits at the right end and
    /// mute in the middle.
    fn draw_decorators(&self, surface: &mut Surface, rect: Rect, note: &Note) {
        if !note.has_decorators()
            || rect.w < DECORATOR_MIN_WIDTH || rect.h < DECORATOR_MIN_HEIGHT {
            return
        }
        let color = self.theme.note_highlight();
        let g = (rect.h * 0.5).min(GLYPH_MAX);
        let (left, top) = (rect.x + GLYPH_INSET, rect.y + GLYPH_INSET);
        let right = rect.x + rect.w - GLYPH_INSET - 2.0;
        let bottom = rect.y + rect.h - GLYPH_INSET;

        if note.accent {
            // ">" wedge
            surface.line(left, top, left + g, top + g * 0.5, 1.0, color);
            surface.line(left + g, top + g * 0.5, left, top + g, 1.0, color);
        }

        if note.hammer {
            let x = if note.accent { left + g + GLYPH_INSET } else { left };
            // "T" mark
            surface.line(x, top, x + g, top, 1.0, color);
            surface.line(x + g * 0.5, top, x + g * 0.5, top + g, 1.0, color);
        }

        if note.slide {
            surface.line(right - g, bottom, right, bottom - g, 1.0, color);
        }

        if note.mute {
            let cx = rect.x + rect.w * 0.5;
            let cy = rect.y + rect.h * 0.5;
            let h = g * 0.5;
            surface.line(cx - h, cy - h, cx + h, cy + h, 1.0, color);
            surface.line(cx - h, cy + h, cx + h, cy - h, 1.0, color);
        }
    }
}

/// Vertical playhead at `row`, with a cap at the top edge.
pub fn draw_playhead(surface: &mut Surface, viewport: &Viewport, row: f32, theme: &Theme) {
    let x = viewport.row_to_pixel_x(row);
    if x < -PLAYHEAD_CAP || x > viewport.width + PLAYHEAD_CAP {
        return
    }
    let color = theme.playhead();
    surface.fill_rect(Rect::new(x - PLAYHEAD_WIDTH * 0.5, 0.0, PLAYHEAD_WIDTH, viewport.height),
        color);
    surface.fill_rect(Rect::new(x - PLAYHEAD_CAP * 0.5, 0.0, PLAYHEAD_CAP, PLAYHEAD_CAP * 0.5),
        color);
}

/// Rubber-band rectangle between two corners, in pixels.
pub fn draw_selection_box(surface: &mut Surface, x1: f32, y1: f32, x2: f32, y2: f32,
    theme: &Theme
) {
    let rect = Rect {
        x: x1.min(x2),
        y: y1.min(y2),
        w: (x2 - x1).abs(),
        h: (y2 - y1).abs(),
    };
    surface.fill_rect(rect, theme.selection_box_fill());
    surface.stroke_rounded_rect(rect, 0.0, OUTLINE, theme.selection_box_outline(), None);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport {
            scroll_x: 0.0,
            scroll_y: 10.0,
            h_zoom: 16.0,
            v_zoom: 12.0,
            width: 640.0,
            height: 240.0,
        }
    }

    fn blank(vp: &Viewport) -> Surface {
        let mut s = Surface::new(vp.width, vp.height, 1.0);
        s.clear(Color::new(0.0, 0.0, 0.0, 1.0));
        s
    }

    fn scene<'a>(notes: &'a [Note], selected: &'a HashSet<NoteId>, ghosts: &'a [Note])
    -> NoteScene<'a> {
        NoteScene {
            notes,
            selected,
            ghosts,
            show_velocity: false,
            pattern_length: None,
            hovered: None,
        }
    }

    fn center(vp: &Viewport, row: f32, pitch: f32) -> (f32, f32) {
        (vp.row_to_pixel_x(row), vp.note_to_pixel_y(pitch) + vp.v_zoom * 0.5)
    }

    #[test]
    fn test_velocity_alpha_curve() {
        assert!((velocity_alpha(127) - 1.0).abs() < 1e-6);
        assert!((velocity_alpha(0) - 0.33).abs() < 1e-6);
        assert!(velocity_alpha(32) < velocity_alpha(64));
        assert!(velocity_alpha(64) < 0.33 + 0.67 * 0.5);
    }

    #[test]
    fn test_repeat_offsets() {
        let vp = viewport();
        let range = vp.visible_range();
        // 640px / 16 = 40 rows visible, plus padding
        assert_eq!(repeat_offsets(&range, Some(16.0)), vec![0.0, 16.0, 32.0]);
        assert_eq!(repeat_offsets(&range, None), vec![0.0]);
        assert_eq!(repeat_offsets(&range, Some(0.0)), vec![0.0]);
        let scrolled = Viewport { scroll_x: 20.0, ..vp }.visible_range();
        assert_eq!(repeat_offsets(&scrolled, Some(16.0)), vec![16.0, 32.0, 48.0]);
    }

    #[test]
    fn test_note_drawn_and_tiled() {
        let vp = viewport();
        let renderer = NoteRenderer::new(Theme::default());
        let notes = [Note::new(NoteId(1), 0.0, 4.0, 60, 127)];
        let selected = HashSet::new();
        let background = Color::new(0.0, 0.0, 0.0, 1.0);

        let mut once = blank(&vp);
        renderer.render(&mut once, &vp, &scene(&notes, &selected, &[]));
        let (x, y) = center(&vp, 2.0, 60.0);
        assert_ne!(once.pixel_at(x, y), Some(background));
        let (tx, ty) = center(&vp, 18.0, 60.0);
        assert_eq!(once.pixel_at(tx, ty), Some(background));

        let mut tiled = blank(&vp);
        renderer.render(&mut tiled, &vp, &NoteScene {
            pattern_length: Some(16.0),
            ..scene(&notes, &selected, &[])
        });
        assert_eq!(tiled.pixel_at(tx, ty), once.pixel_at(x, y));
    }

    #[test]
    fn test_ghost_under_real_note() {
        let vp = viewport();
        let renderer = NoteRenderer::new(Theme::default());
        let notes = [Note::new(NoteId(1), 0.0, 4.0, 60, 127)];
        let selected = HashSet::new();

        let mut alone = blank(&vp);
        renderer.render(&mut alone, &vp, &scene(&notes, &selected, &[]));
        let mut with_ghost = blank(&vp);
        renderer.render(&mut with_ghost, &vp, &scene(&notes, &selected, &notes));

        let (x, y) = center(&vp, 2.0, 60.0);
        assert_eq!(alone.pixel_at(x, y), with_ghost.pixel_at(x, y));
    }

    #[test]
    fn test_selected_outline() {
        let vp = viewport();
        let theme = Theme::default();
        let renderer = NoteRenderer::new(theme.clone());
        let notes = [Note::new(NoteId(1), 0.0, 8.0, 60, 127)];
        let selected: HashSet<_> = [NoteId(1)].into();
        let mut s = blank(&vp);
        renderer.render(&mut s, &vp, &scene(&notes, &selected, &[]));
        let (x, _) = center(&vp, 4.0, 60.0);
        let top = vp.note_to_pixel_y(60.0);
        let c = s.pixel_at(x, top + 1.0).unwrap();
        let expected = theme.selection_outline();
        assert!((c.r - expected.r).abs() < 0.01 && (c.g - expected.g).abs() < 0.01);
    }

    #[test]
    fn test_decorators_render() {
        let vp = viewport();
        let renderer = NoteRenderer::new(Theme::default());
        let plain = [Note::new(NoteId(1), 0.0, 8.0, 60, 127)];
        let muted = [Note { mute: true, ..plain[0].clone() }];
        let selected = HashSet::new();
        let mut a = blank(&vp);
        renderer.render(&mut a, &vp, &scene(&plain, &selected, &[]));
        let mut b = blank(&vp);
        renderer.render(&mut b, &vp, &scene(&muted, &selected, &[]));
        let (x, y) = center(&vp, 4.0, 60.0);
        assert_ne!(a.pixel_at(x, y), b.pixel_at(x, y));
    }

    #[test]
    fn test_overlays() {
        let vp = viewport();
        let theme = Theme::default();
        let mut s = blank(&vp);
        draw_playhead(&mut s, &vp, 10.0, &theme);
        let c = s.pixel_at(vp.row_to_pixel_x(10.0), 100.0).unwrap();
        assert_ne!(c, Color::new(0.0, 0.0, 0.0, 1.0));
        let before = s.pixel_at(300.0, 50.0);
        draw_selection_box(&mut s, 320.0, 80.0, 260.0, 20.0, &theme);
        assert_ne!(s.pixel_at(300.0, 50.0), before);
    }
}

//! Per-frame spatial index of note rectangles.
//!
//! Rectangles are stored in note-list order. That order is the z-order:
//! later notes are drawn on top, so they are also hit first.

use macroquad::math::Rect;

use crate::{note::{Note, NoteId}, viewport::Viewport};

/// Width of the resize band at each end of a note, in pixels.
pub const EDGE_BAND: f32 = 8.0;

/// Editing tool, orthogonal to the drag state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tool {
    #[default]
    Select,
    Draw,
    Erase,
}

/// Which part of a note a point lands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitZone {
    Body,
    ResizeStart,
    ResizeEnd,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hit {
    pub id: NoteId,
    /// Position of the note in the list the index was built from.
    pub index: usize,
    pub zone: HitZone,
}

/// Pointer cursor to display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cursor {
    Default,
    Move,
    ResizeHorizontal,
    Draw,
    Erase,
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    id: NoteId,
    rect: Rect,
}

#[derive(Default)]
pub struct HitTester {
    entries: Vec<Entry>,
}

impl HitTester {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild rectangles from `notes` under `viewport`. Must be called
    /// whenever either changes, before the next hit test.
    pub fn rebuild(&mut self, notes: &[Note], viewport: &Viewport) {
        self.entries.clear();
        self.entries.extend(notes.iter().map(|note| Entry {
            id: note.id,
            rect: note_rect(note, viewport),
        }));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn rect_of(&self, id: NoteId) -> Option<Rect> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.rect)
    }

    /// Topmost note under the point, with the zone it was hit in.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<Hit> {
        // linear scan; past roughly a thousand notes this wants an interval
        // tree on rows bucketed by pitch
        self.entries.iter().enumerate().rev()
            .find(|(_, e)| contains(&e.rect, x, y))
            .map(|(index, e)| Hit {
                id: e.id,
                index,
                zone: zone(&e.rect, x),
            })
    }

    /// Every note whose rectangle overlaps the box spanned by the two corners,
    /// in list order. Touching edges do not count as overlap.
    pub fn find_in_rect(&self, x1: f32, y1: f32, x2: f32, y2: f32) -> Vec<NoteId> {
        let (left, right) = (x1.min(x2), x1.max(x2));
        let (top, bottom) = (y1.min(y2), y1.max(y2));
        self.entries.iter()
            .filter(|e| e.rect.x < right && e.rect.x + e.rect.w > left
                && e.rect.y < bottom && e.rect.y + e.rect.h > top)
            .map(|e| e.id)
            .collect()
    }

    pub fn cursor(&self, x: f32, y: f32, tool: Tool) -> Cursor {
        cursor_for(tool, self.hit_test(x, y).map(|h| h.zone))
    }
}

/// Cursor as a function of tool and hit zone. Draw and erase ignore the hit.
pub fn cursor_for(tool: Tool, zone: Option<HitZone>) -> Cursor {
    match tool {
        Tool::Draw => Cursor::Draw,
        Tool::Erase => Cursor::Erase,
        Tool::Select => match zone {
            Some(HitZone::Body) => Cursor::Move,
            Some(HitZone::ResizeStart | HitZone::ResizeEnd) => Cursor::ResizeHorizontal,
            None => Cursor::Default,
        },
    }
}

/// Pixel rectangle of a note.
pub fn note_rect(note: &Note, viewport: &Viewport) -> Rect {
    let x = viewport.row_to_pixel_x(note.start_row);
    Rect {
        x,
        y: viewport.note_to_pixel_y(note.midi_note as f32),
        w: viewport.row_to_pixel_x(note.end_row) - x,
        h: viewport.v_zoom,
    }
}

/// Whether a note this wide gets resize bands. Narrow notes are all body.
pub fn has_resize_bands(width: f32) -> bool {
    width > EDGE_BAND * 2.0
}

fn contains(rect: &Rect, x: f32, y: f32) -> bool {
    x >= rect.x && x < rect.x + rect.w && y >= rect.y && y < rect.y + rect.h
}

fn zone(rect: &Rect, x: f32) -> HitZone {
    if !has_resize_bands(rect.w) {
        HitZone::Body
    } else if x - rect.x < EDGE_BAND {
        HitZone::ResizeStart
    } else if rect.x + rect.w - x < EDGE_BAND {
        HitZone::ResizeEnd
    } else {
        HitZone::Body
    }
}

//! Pointer gesture state machine.
//!
//! A gesture starts on pointer-down, is previewed on pointer-move and is
//! committed on pointer-up. Moves and resizes only publish ghost notes while
//! the pointer is held; the note store sees a single mutation per subject
//! when the gesture ends. Drawing and erasing act immediately.

use std::collections::HashSet;

use crate::{
    hit::{HitTester, HitZone, Tool},
    note::{Note, NoteId, MAX_PITCH},
    store::{NoteStore, SelectionStore},
    viewport::{floor_row, row_step, snap_row, Viewport},
};

/// Pointer travel, in pixels, below which a gesture counts as a click.
pub const CLICK_SLOP: f32 = 3.0;

/// Shortest note a resize can produce, in rows.
pub const MIN_NOTE_LENGTH: f32 = 1.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    /// Shift or ctrl: toggle/extend the selection instead of replacing it.
    pub fn additive(&self) -> bool {
        self.shift || self.ctrl
    }

    /// Alt: drag a copy, leaving the clone where the note was.
    pub fn duplicate(&self) -> bool {
        self.alt
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DragMode {
    #[default]
    None,
    Move,
    ResizeStart,
    ResizeEnd,
    SelectBox,
}

/// Pointer gesture in progress, in surface pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct DragState {
    pub mode: DragMode,
    pub start_x: f32,
    pub start_y: f32,
    pub current_x: f32,
    pub current_y: f32,
    /// Subject of a move or resize. `None` for box selection.
    pub note_id: Option<NoteId>,
}

impl DragState {
    fn travelled(&self) -> bool {
        (self.current_x - self.start_x).abs() > CLICK_SLOP
            || (self.current_y - self.start_y).abs() > CLICK_SLOP
    }
}

/// What a pointer event changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    /// The note store was mutated; the hit index is stale.
    pub notes_changed: bool,
    pub selection_changed: bool,
    /// Ghost notes or the selection box changed.
    pub preview_changed: bool,
}

impl Outcome {
    pub fn any(&self) -> bool {
        self.notes_changed || self.selection_changed || self.preview_changed
    }

    fn merge(&mut self, other: Outcome) {
        self.notes_changed |= other.notes_changed;
        self.selection_changed |= other.selection_changed;
        self.preview_changed |= other.preview_changed;
    }
}

/// Per-event inputs from the interaction thread.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub viewport: &'a Viewport,
    /// Must reflect the current notes and viewport.
    pub hits: &'a HitTester,
    pub tool: Tool,
    pub division: u8,
    /// Velocity for drawn notes.
    pub velocity: u8,
    /// Channel for drawn notes.
    pub channel: Option<u8>,
}

/// Cells already painted in the current draw gesture.
struct Paint {
    visited: HashSet<(i64, u8)>,
    last: (i64, u8),
}

#[derive(Default)]
pub struct Interaction {
    drag: Option<DragState>,
    /// Originals of the notes a move/resize applies to, in list order.
    subjects: Vec<Note>,
    ghosts: Vec<Note>,
    duplicate: bool,
    additive: bool,
    paint: Option<Paint>,
    /// Notes erased in the current erase gesture.
    erasing: Option<HashSet<NoteId>>,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drag(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    pub fn mode(&self) -> DragMode {
        self.drag.as_ref().map_or(DragMode::None, |d| d.mode)
    }

    /// Preview of the gesture's result. Empty unless a move or resize has
    /// left the click slop and would change something.
    pub fn ghosts(&self) -> &[Note] {
        &self.ghosts
    }

    /// Corners of the rubber band, while box selecting.
    pub fn selection_box(&self) -> Option<(f32, f32, f32, f32)> {
        self.drag.as_ref()
            .filter(|d| d.mode == DragMode::SelectBox)
            .map(|d| (d.start_x, d.start_y, d.current_x, d.current_y))
    }

    /// True while any gesture holds the pointer.
    pub fn is_active(&self) -> bool {
        self.drag.is_some() || self.paint.is_some() || self.erasing.is_some()
    }

    /// Abandon the gesture without committing anything.
    pub fn cancel(&mut self) -> Outcome {
        let preview_changed = self.drag.is_some();
        self.reset();
        Outcome { preview_changed, ..Default::default() }
    }

    fn reset(&mut self) {
        self.drag = None;
        self.subjects.clear();
        self.ghosts.clear();
        self.duplicate = false;
        self.additive = false;
        self.paint = None;
        self.erasing = None;
    }

    pub fn pointer_down(&mut self, ctx: &Context, x: f32, y: f32, mods: Modifiers,
        notes: &mut dyn NoteStore, selection: &mut dyn SelectionStore
    ) -> Outcome {
        self.reset();

        if ctx.tool == Tool::Erase {
            self.erasing = Some(HashSet::new());
            return self.erase_at(ctx, x, y, notes)
        }

        let mut outcome = Outcome::default();
        let Some(hit) = ctx.hits.hit_test(x, y) else {
            if ctx.tool == Tool::Draw {
                let cell = cell_at(ctx, x, y);
                self.paint = Some(Paint { visited: HashSet::from([cell]), last: cell });
                if !cell_occupied(ctx, cell) {
                    paint_cell(ctx, cell, notes);
                    outcome.notes_changed = true;
                }
            } else {
                self.start_drag(DragMode::SelectBox, x, y, None);
                self.additive = mods.additive();
                outcome.preview_changed = true;
            }
            return outcome
        };

        let mode = match hit.zone {
            HitZone::Body => DragMode::Move,
            HitZone::ResizeStart => DragMode::ResizeStart,
            HitZone::ResizeEnd => DragMode::ResizeEnd,
        };

        if !selection.selected_ids().contains(&hit.id) && !mods.additive() {
            selection.select(hit.id, false);
            outcome.selection_changed = true;
        }

        // preview = selection plus the drag target
        let selected = selection.selected_ids();
        self.subjects = notes.notes().iter()
            .filter(|n| n.id == hit.id || (mode == DragMode::Move && selected.contains(&n.id)))
            .cloned()
            .collect();
        self.additive = mods.additive();
        self.duplicate = mode == DragMode::Move && mods.duplicate();
        self.start_drag(mode, x, y, Some(hit.id));
        outcome
    }

    pub fn pointer_move(&mut self, ctx: &Context, x: f32, y: f32, notes: &mut dyn NoteStore)
    -> Outcome {
        if self.erasing.is_some() {
            return self.erase_at(ctx, x, y, notes)
        }

        if let Some(paint) = &mut self.paint {
            return paint_to(ctx, paint, cell_at(ctx, x, y), notes)
        }

        let Some(drag) = &mut self.drag else {
            return Outcome::default()
        };
        drag.current_x = x;
        drag.current_y = y;

        // within click slop the gesture still commits nothing
        let ghosts = match drag.mode {
            _ if !drag.travelled() => Vec::new(),
            DragMode::Move => {
                let (dr, dp) = move_delta(ctx, drag, &self.subjects);
                if dr == 0.0 && dp == 0 {
                    Vec::new()
                } else {
                    self.subjects.iter().map(|n| n.translated(dr, dp)).collect()
                }
            }
            DragMode::ResizeEnd => self.subjects.iter()
                .map(|n| Note { end_row: resized_end(ctx, drag, n), ..n.clone() })
                .filter(|n| self.subjects.iter().all(|o| o.end_row != n.end_row))
                .collect(),
            DragMode::ResizeStart => self.subjects.iter()
                .map(|n| Note { start_row: resized_start(ctx, drag, n), ..n.clone() })
                .filter(|n| self.subjects.iter().all(|o| o.start_row != n.start_row))
                .collect(),
            DragMode::SelectBox | DragMode::None => Vec::new(),
        };

        let preview_changed = drag.mode == DragMode::SelectBox || ghosts != self.ghosts;
        self.ghosts = ghosts;
        Outcome { preview_changed, ..Default::default() }
    }

    pub fn pointer_up(&mut self, ctx: &Context, x: f32, y: f32,
        notes: &mut dyn NoteStore, selection: &mut dyn SelectionStore
    ) -> Outcome {
        let mut outcome = Outcome::default();
        if self.drag.is_some() {
            // make sure the final position is accounted for
            outcome.merge(self.pointer_move(ctx, x, y, notes));
        }
        let Some(drag) = self.drag.take() else {
            self.reset();
            return outcome
        };
        outcome.preview_changed = true;

        match (drag.mode, drag.note_id) {
            (DragMode::SelectBox, _) => {
                let found = ctx.hits.find_in_rect(drag.start_x, drag.start_y, x, y);
                if self.additive {
                    let mut ids: Vec<NoteId> = selection.selected_ids().iter().copied().collect();
                    ids.sort_unstable();
                    ids.extend(found.into_iter().filter(|id| !selection.selected_ids().contains(id)));
                    selection.select_range(&ids);
                } else if drag.travelled() {
                    selection.select_range(&found);
                } else {
                    selection.clear();
                }
                outcome.selection_changed = true;
            }
            (_, Some(id)) if !drag.travelled() => {
                selection.select(id, self.additive);
                outcome.selection_changed = true;
            }
            (DragMode::Move, Some(_)) => {
                let (dr, dp) = move_delta(ctx, &drag, &self.subjects);
                if dr != 0.0 || dp != 0 {
                    for note in &self.subjects {
                        if self.duplicate {
                            notes.duplicate_note(note.id);
                        }
                        notes.move_note(note.id, dr, dp);
                    }
                    outcome.notes_changed = true;
                }
            }
            (DragMode::ResizeEnd, Some(id)) => {
                if let Some(note) = self.subjects.iter().find(|n| n.id == id) {
                    let end = resized_end(ctx, &drag, note);
                    if end != note.end_row {
                        notes.resize_note(id, end);
                        outcome.notes_changed = true;
                    }
                }
            }
            (DragMode::ResizeStart, Some(id)) => {
                if let Some(note) = self.subjects.iter().find(|n| n.id == id) {
                    let start = resized_start(ctx, &drag, note);
                    if start != note.start_row {
                        notes.resize_note_start(id, start);
                        outcome.notes_changed = true;
                    }
                }
            }
            _ => (),
        }

        self.reset();
        outcome
    }

    fn start_drag(&mut self, mode: DragMode, x: f32, y: f32, note_id: Option<NoteId>) {
        self.drag = Some(DragState {
            mode,
            start_x: x,
            start_y: y,
            current_x: x,
            current_y: y,
            note_id,
        });
    }

    fn erase_at(&mut self, ctx: &Context, x: f32, y: f32, notes: &mut dyn NoteStore) -> Outcome {
        let Some(erased) = &mut self.erasing else {
            return Outcome::default()
        };
        match ctx.hits.hit_test(x, y) {
            Some(hit) if erased.insert(hit.id) => {
                notes.delete_note(hit.id);
                Outcome { notes_changed: true, ..Default::default() }
            }
            _ => Outcome::default(),
        }
    }
}

/// Snapped (row, pitch) delta of a move, clamped so no subject leaves the
/// row/pitch range.
fn move_delta(ctx: &Context, drag: &DragState, subjects: &[Note]) -> (f32, i32) {
    let raw_rows = (drag.current_x - drag.start_x) / ctx.viewport.h_zoom;
    let mut dr = snap_row(raw_rows, ctx.division);
    let mut dp = (-(drag.current_y - drag.start_y) / ctx.viewport.v_zoom).round() as i32;

    if let Some(min_start) = subjects.iter().map(|n| n.start_row).reduce(f32::min) {
        if min_start + dr < 0.0 {
            // whole grid steps only, so notes stay aligned
            let step = row_step(ctx.division);
            dr = -(min_start / step).floor() * step;
        }
    }
    if let (Some(lo), Some(hi)) = (
        subjects.iter().map(|n| n.midi_note).min(),
        subjects.iter().map(|n| n.midi_note).max(),
    ) {
        dp = dp.clamp(-(lo as i32), (MAX_PITCH - hi) as i32);
    }
    (dr, dp)
}

fn resize_rows(ctx: &Context, drag: &DragState) -> f32 {
    (drag.current_x - drag.start_x) / ctx.viewport.h_zoom
}

/// New end row, at least `MIN_NOTE_LENGTH` after the start.
fn resized_end(ctx: &Context, drag: &DragState, note: &Note) -> f32 {
    let end = snap_row(note.end_row + resize_rows(ctx, drag), ctx.division);
    end.max(note.start_row + MIN_NOTE_LENGTH)
}

/// New start row, at least `MIN_NOTE_LENGTH` before the end and not
/// before row zero.
fn resized_start(ctx: &Context, drag: &DragState, note: &Note) -> f32 {
    let start = snap_row(note.start_row + resize_rows(ctx, drag), ctx.division);
    start.min(note.end_row - MIN_NOTE_LENGTH).max(0.0)
}

/// Grid cell under a point: (row index at the current division, pitch).
fn cell_at(ctx: &Context, x: f32, y: f32) -> (i64, u8) {
    let step = row_step(ctx.division);
    let row = floor_row(ctx.viewport.row_at(x), ctx.division);
    ((row / step).round() as i64, ctx.viewport.pitch_at(y))
}

/// Whether an existing note covers the centre of a cell.
fn cell_occupied(ctx: &Context, (index, pitch): (i64, u8)) -> bool {
    let step = row_step(ctx.division);
    let x = ctx.viewport.row_to_pixel_x((index as f32 + 0.5) * step);
    let y = ctx.viewport.note_to_pixel_y(pitch as f32) + ctx.viewport.v_zoom * 0.5;
    ctx.hits.hit_test(x, y).is_some()
}

fn paint_cell(ctx: &Context, (index, pitch): (i64, u8), notes: &mut dyn NoteStore) {
    let step = row_step(ctx.division);
    notes.add_note(pitch, index as f32 * step, step, ctx.velocity, ctx.channel);
}

/// Paint every cell between the last painted cell and `cell`, skipping
/// cells already painted in this gesture or covered by an existing note.
fn paint_to(ctx: &Context, paint: &mut Paint, cell: (i64, u8), notes: &mut dyn NoteStore)
-> Outcome {
    if cell == paint.last {
        return Outcome::default()
    }
    let (from, to) = (paint.last, cell);
    let d_row = to.0 - from.0;
    let d_pitch = to.1 as i64 - from.1 as i64;
    let n = d_row.abs().max(d_pitch.abs());
    let mut outcome = Outcome::default();

    for i in 1..=n {
        let t = i as f32 / n as f32;
        let c = (
            from.0 + (d_row as f32 * t).round() as i64,
            (from.1 as f32 + d_pitch as f32 * t).round() as u8,
        );
        if !paint.visited.insert(c) {
            continue
        }
        if !cell_occupied(ctx, c) {
            paint_cell(ctx, c, notes);
            outcome.notes_changed = true;
        }
    }
    paint.last = cell;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NoteList, Selection};

    struct Rig {
        viewport: Viewport,
        hits: HitTester,
        notes: NoteList,
        selection: Selection,
        interaction: Interaction,
        tool: Tool,
        division: u8,
    }

    impl Rig {
        fn new(notes: Vec<Note>, tool: Tool) -> Self {
            let viewport = Viewport {
                scroll_x: 0.0,
                scroll_y: 0.0,
                h_zoom: 16.0,
                v_zoom: 12.0,
                width: 800.0,
                height: 600.0,
            };
            let mut rig = Self {
                viewport,
                hits: HitTester::new(),
                notes: NoteList::from_notes(notes),
                selection: Selection::new(),
                interaction: Interaction::new(),
                tool,
                division: 4,
            };
            rig.rebuild();
            rig
        }

        fn rebuild(&mut self) {
            self.hits.rebuild(self.notes.notes(), &self.viewport);
        }


        fn down(&mut self, x: f32, y: f32, mods: Modifiers) -> Outcome {
            let ctx = context(&self.viewport, &self.hits, self.tool, self.division);
            let out = self.interaction.pointer_down(&ctx, x, y, mods,
                &mut self.notes, &mut self.selection);
            if out.notes_changed {
                self.rebuild();
            }
            out
        }

        fn drag_to(&mut self, x: f32, y: f32) -> Outcome {
            let ctx = context(&self.viewport, &self.hits, self.tool, self.division);
            let out = self.interaction.pointer_move(&ctx, x, y, &mut self.notes);
            if out.notes_changed {
                self.rebuild();
            }
            out
        }

        fn up(&mut self, x: f32, y: f32) -> Outcome {
            let ctx = context(&self.viewport, &self.hits, self.tool, self.division);
            let out = self.interaction.pointer_up(&ctx, x, y, &mut self.notes, &mut self.selection);
            if out.notes_changed {
                self.rebuild();
            }
            out
        }

        fn x(&self, row: f32) -> f32 {
            self.viewport.row_to_pixel_x(row)
        }

        fn y(&self, pitch: u8) -> f32 {
            self.viewport.note_to_pixel_y(pitch as f32) + 2.0
        }
    }

    fn context<'a>(viewport: &'a Viewport, hits: &'a HitTester, tool: Tool, division: u8)
    -> Context<'a> {
        Context { viewport, hits, tool, division, velocity: 100, channel: None }
    }

    fn note(id: u64, start: f32, end: f32, pitch: u8) -> Note {
        Note::new(NoteId(id), start, end, pitch, 100)
    }

    #[test]
    fn test_click_selects() {
        let mut rig = Rig::new(vec![note(0, 0.0, 4.0, 60), note(1, 8.0, 12.0, 60)], Tool::Select);
        let (x, y) = (rig.x(2.0), rig.y(60));
        rig.down(x, y, Modifiers::default());
        rig.up(x, y);
        assert_eq!(rig.selection.selected_ids(), &HashSet::from([NoteId(0)]));

        let (x, y) = (rig.x(10.0), rig.y(60));
        let shift = Modifiers { shift: true, ..Default::default() };
        rig.down(x, y, shift);
        rig.up(x, y);
        assert_eq!(rig.selection.selected_ids().len(), 2);
        // toggles off again
        rig.down(x, y, shift);
        rig.up(x, y);
        assert_eq!(rig.selection.selected_ids(), &HashSet::from([NoteId(0)]));
    }

    #[test]
    fn test_move_previews_then_commits_once() {
        let mut rig = Rig::new(vec![note(0, 0.0, 4.0, 60)], Tool::Select);
        let (x, y) = (rig.x(2.0), rig.y(60));
        rig.down(x, y, Modifiers::default());
        assert_eq!(rig.interaction.mode(), DragMode::Move);
        let out = rig.drag_to(x + 16.0 * 2.2, y - 12.0);
        assert!(out.preview_changed && !out.notes_changed);
        assert_eq!(rig.interaction.ghosts().len(), 1);
        assert_eq!(rig.interaction.ghosts()[0].start_row, 2.0);
        assert_eq!(rig.interaction.ghosts()[0].midi_note, 61);
        assert_eq!(rig.notes.notes()[0].start_row, 0.0);

        let out = rig.up(x + 16.0 * 3.0, y - 12.0);
        assert!(out.notes_changed);
        assert_eq!(rig.notes.notes()[0].start_row, 3.0);
        assert_eq!(rig.notes.notes()[0].end_row, 7.0);
        assert_eq!(rig.notes.notes()[0].midi_note, 61);
        assert!(rig.interaction.ghosts().is_empty());
        assert!(!rig.interaction.is_active());
    }

    #[test]
    fn test_move_within_slop_is_a_click() {
        let mut rig = Rig::new(vec![note(0, 0.0, 4.0, 60), note(1, 8.0, 12.0, 60)], Tool::Select);
        rig.division = 16;
        rig.selection.select_range(&[NoteId(0), NoteId(1)]);
        let (x, y) = (rig.x(2.0), rig.y(60));
        rig.down(x, y, Modifiers::default());
        // 3px would snap to a quarter row at this division
        rig.drag_to(x + 3.0, y);
        assert!(rig.interaction.ghosts().is_empty());
        let out = rig.up(x + 3.0, y);
        assert!(!out.notes_changed);
        assert_eq!(rig.notes.notes()[0].start_row, 0.0);
        assert_eq!(rig.selection.selected_ids(), &HashSet::from([NoteId(0)]));

        // past the slop, what the ghost shows is what gets committed
        rig.down(x, y, Modifiers::default());
        rig.drag_to(x + 5.0, y);
        assert_eq!(rig.interaction.ghosts()[0].start_row, 0.25);
        assert!(rig.up(x + 5.0, y).notes_changed);
        assert_eq!(rig.notes.notes()[0].start_row, 0.25);
    }

    #[test]
    fn test_move_clamped_at_zero() {
        let mut rig = Rig::new(vec![note(0, 2.0, 4.0, 60)], Tool::Select);
        let (x, y) = (rig.x(3.0), rig.y(60));
        rig.down(x, y, Modifiers::default());
        rig.up(x - 16.0 * 6.0, y);
        assert_eq!(rig.notes.notes()[0].start_row, 0.0);
    }

    #[test]
    fn test_move_carries_selection() {
        let mut rig = Rig::new(vec![note(0, 0.0, 4.0, 60), note(1, 8.0, 12.0, 64)], Tool::Select);
        rig.selection.select_range(&[NoteId(0), NoteId(1)]);
        let (x, y) = (rig.x(2.0), rig.y(60));
        rig.down(x, y, Modifiers::default());
        rig.drag_to(x + 32.0, y);
        assert_eq!(rig.interaction.ghosts().len(), 2);
        rig.up(x + 32.0, y);
        assert_eq!(rig.notes.get(NoteId(1)).unwrap().start_row, 10.0);
    }

    #[test]
    fn test_duplicate_drag() {
        let mut rig = Rig::new(vec![note(0, 0.0, 4.0, 60)], Tool::Select);
        let (x, y) = (rig.x(2.0), rig.y(60));
        rig.down(x, y, Modifiers { alt: true, ..Default::default() });
        rig.up(x + 64.0, y);
        assert_eq!(rig.notes.len(), 2);
        // original moved, clone stayed
        assert_eq!(rig.notes.get(NoteId(0)).unwrap().start_row, 4.0);
        assert_eq!(rig.notes.get(NoteId(1)).unwrap().start_row, 0.0);
    }

    #[test]
    fn test_resize_end_clamps_to_one_row() {
        let mut rig = Rig::new(vec![note(0, 4.0, 8.0, 60)], Tool::Select);
        let (x, y) = (rig.x(8.0) - 2.0, rig.y(60));
        rig.down(x, y, Modifiers::default());
        assert_eq!(rig.interaction.mode(), DragMode::ResizeEnd);
        rig.drag_to(x - 16.0 * 10.0, y);
        assert_eq!(rig.interaction.ghosts()[0].end_row, 5.0);
        rig.up(x - 16.0 * 10.0, y);
        let n = &rig.notes.notes()[0];
        assert_eq!((n.start_row, n.end_row), (4.0, 5.0));
    }

    #[test]
    fn test_resize_start() {
        let mut rig = Rig::new(vec![note(0, 4.0, 8.0, 60)], Tool::Select);
        let (x, y) = (rig.x(4.0) + 2.0, rig.y(60));
        rig.down(x, y, Modifiers::default());
        assert_eq!(rig.interaction.mode(), DragMode::ResizeStart);
        rig.up(x + 16.0 * 9.0, y);
        let n = &rig.notes.notes()[0];
        assert_eq!((n.start_row, n.end_row), (7.0, 8.0));
    }

    #[test]
    fn test_box_select_and_empty_click_clears() {
        let mut rig = Rig::new(vec![note(0, 0.0, 4.0, 60), note(1, 20.0, 24.0, 60)], Tool::Select);
        let y = rig.y(60);
        rig.down(rig.x(30.0), y - 20.0, Modifiers::default());
        assert!(rig.interaction.selection_box().is_some());
        rig.drag_to(rig.x(5.0), y + 20.0);
        rig.up(rig.x(5.0), y + 20.0);
        assert_eq!(rig.selection.selected_ids(), &HashSet::from([NoteId(1)]));

        rig.down(rig.x(40.0), y, Modifiers::default());
        rig.up(rig.x(40.0), y);
        assert!(rig.selection.selected_ids().is_empty());
    }

    #[test]
    fn test_paint_deduplicates_cells() {
        let mut rig = Rig::new(Vec::new(), Tool::Draw);
        let y = rig.y(60);
        rig.down(rig.x(8.2), y, Modifiers::default());
        rig.drag_to(rig.x(8.7), y);
        rig.drag_to(rig.x(10.5), y);
        rig.drag_to(rig.x(8.5), y);
        rig.up(rig.x(8.5), y);
        let rows: Vec<f32> = rig.notes.notes().iter().map(|n| n.start_row).collect();
        assert_eq!(rows, vec![8.0, 9.0, 10.0]);
        assert!(rig.notes.notes().iter().all(|n| n.length() == 1.0 && n.midi_note == 60));
    }

    #[test]
    fn test_paint_skips_existing_notes() {
        let mut rig = Rig::new(vec![note(0, 9.0, 10.0, 60)], Tool::Draw);
        let y = rig.y(60);
        rig.down(rig.x(8.5), y, Modifiers::default());
        rig.drag_to(rig.x(10.5), y);
        rig.up(rig.x(10.5), y);
        assert_eq!(rig.notes.len(), 3);
    }

    #[test]
    fn test_draw_click_beside_note_does_not_stack() {
        // covers most of the cell at row 8, but not the pointer
        let mut rig = Rig::new(vec![note(0, 8.0, 8.75, 60)], Tool::Draw);
        let y = rig.y(60);
        let out = rig.down(rig.x(8.9), y, Modifiers::default());
        assert!(!out.notes_changed);
        rig.up(rig.x(8.9), y);
        assert_eq!(rig.notes.len(), 1);

        rig.down(rig.x(9.2), y, Modifiers::default());
        rig.up(rig.x(9.2), y);
        assert_eq!(rig.notes.len(), 2);
        assert_eq!(rig.notes.notes()[1].start_row, 9.0);
    }

    #[test]
    fn test_erase_on_down_and_drag() {
        let mut rig = Rig::new(vec![
            note(0, 0.0, 4.0, 60),
            note(1, 4.0, 8.0, 60),
            note(2, 8.0, 12.0, 62),
        ], Tool::Erase);
        let y = rig.y(60);
        assert!(rig.down(rig.x(1.0), y, Modifiers::default()).notes_changed);
        assert!(rig.drag_to(rig.x(5.0), y).notes_changed);
        assert!(!rig.drag_to(rig.x(9.0), y).notes_changed);
        rig.up(rig.x(9.0), y);
        assert_eq!(rig.notes.len(), 1);
        // no button held: nothing erased
        assert!(!rig.drag_to(rig.x(9.0), rig.y(62)).notes_changed);
    }

    #[test]
    fn test_cancel_discards() {
        let mut rig = Rig::new(vec![note(0, 0.0, 4.0, 60)], Tool::Select);
        let (x, y) = (rig.x(2.0), rig.y(60));
        rig.down(x, y, Modifiers::default());
        rig.drag_to(x + 64.0, y);
        rig.interaction.cancel();
        assert!(rig.interaction.ghosts().is_empty());
        rig.up(x + 64.0, y);
        assert_eq!(rig.notes.notes()[0].start_row, 0.0);
    }
}

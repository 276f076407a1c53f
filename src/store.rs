//! Contracts with the application that owns the pattern data, plus simple
//! in-memory implementations.
//!
//! The editor never inspects the result of a mutation. Invalid ids are
//! no-ops; the next frame just reflects whatever `notes()` returns.

use std::collections::HashSet;

use crate::{hit::Tool, note::{Note, NoteId, Scale}, viewport::Viewport};

/// Owner of the note list.
pub trait NoteStore {
    /// Notes in z-order: later entries are drawn on top and hit first.
    fn notes(&self) -> &[Note];
    fn add_note(&mut self, pitch: u8, row: f32, length: f32, velocity: u8, channel: Option<u8>);
    fn move_note(&mut self, id: NoteId, delta_row: f32, delta_pitch: i32);
    fn resize_note(&mut self, id: NoteId, new_end_row: f32);
    fn resize_note_start(&mut self, id: NoteId, new_start_row: f32);
    fn delete_note(&mut self, id: NoteId);

    /// Add a copy of a note at the same position. Stores that track
    /// articulations should override this to keep them.
    fn duplicate_note(&mut self, id: NoteId) {
        if let Some(n) = self.notes().iter().find(|n| n.id == id).cloned() {
            self.add_note(n.midi_note, n.start_row, n.length(), n.velocity, n.channel);
        }
    }
}

/// Owner of the selection set.
pub trait SelectionStore {
    fn selected_ids(&self) -> &HashSet<NoteId>;
    /// Replace the selection with `id`, or toggle `id` if `additive`.
    fn select(&mut self, id: NoteId, additive: bool);
    /// Replace the selection with `ids`.
    fn select_range(&mut self, ids: &[NoteId]);
    fn clear(&mut self);
}

/// Owner of view and tool settings. The editor reads these and calls the
/// setters on user gestures; it never keeps its own copy authoritative.
pub trait ViewStore {
    fn view(&self) -> &ViewSettings;
    fn set_scroll(&mut self, scroll_x: f32, scroll_y: f32);
    fn set_zoom(&mut self, h_zoom: f32, v_zoom: f32);
    fn set_tool(&mut self, tool: Tool);
    fn set_grid_division(&mut self, division: u8);
}

/// View state supplied by a `ViewStore`.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewSettings {
    pub scroll_x: f32,
    pub scroll_y: f32,
    pub h_zoom: f32,
    pub v_zoom: f32,
    pub tool: Tool,
    pub grid_division: u8,
    pub scale: Scale,
    /// Channel assigned to newly drawn notes.
    pub channel: Option<u8>,
    /// Pattern length in rows.
    pub pattern_length: f32,
}

impl Default for ViewSettings {
    fn default() -> Self {
        let vp = Viewport::default();
        Self {
            scroll_x: vp.scroll_x,
            scroll_y: vp.scroll_y,
            h_zoom: vp.h_zoom,
            v_zoom: vp.v_zoom,
            tool: Tool::Select,
            grid_division: 4,
            scale: Scale::chromatic(),
            channel: None,
            pattern_length: 64.0,
        }
    }
}

impl ViewStore for ViewSettings {
    fn view(&self) -> &ViewSettings {
        self
    }

    fn set_scroll(&mut self, scroll_x: f32, scroll_y: f32) {
        self.scroll_x = scroll_x;
        self.scroll_y = scroll_y;
    }

    fn set_zoom(&mut self, h_zoom: f32, v_zoom: f32) {
        self.h_zoom = h_zoom;
        self.v_zoom = v_zoom;
    }

    fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    fn set_grid_division(&mut self, division: u8) {
        self.grid_division = division;
    }
}

/// Vec-backed note store. New notes are appended, so they land on top.
#[derive(Clone, Debug, Default)]
pub struct NoteList {
    notes: Vec<Note>,
    next_id: u64,
}

impl NoteList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_notes(notes: Vec<Note>) -> Self {
        let next_id = notes.iter().map(|n| n.id.0 + 1).max().unwrap_or(0);
        Self { notes, next_id }
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    /// Insert a fully specified note, assigning it a fresh id.
    pub fn push(&mut self, note: Note) -> NoteId {
        let id = NoteId(self.next_id);
        self.next_id += 1;
        self.notes.push(Note { id, ..note });
        id
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    fn get_mut(&mut self, id: NoteId) -> Option<&mut Note> {
        self.notes.iter_mut().find(|n| n.id == id)
    }
}

impl NoteStore for NoteList {
    fn notes(&self) -> &[Note] {
        &self.notes
    }

    fn add_note(&mut self, pitch: u8, row: f32, length: f32, velocity: u8, channel: Option<u8>) {
        let mut note = Note::new(NoteId(0), row, row + length, pitch, velocity);
        note.channel = channel;
        self.push(note);
    }

    fn move_note(&mut self, id: NoteId, delta_row: f32, delta_pitch: i32) {
        if let Some(note) = self.get_mut(id) {
            *note = note.translated(delta_row, delta_pitch);
        }
    }

    fn resize_note(&mut self, id: NoteId, new_end_row: f32) {
        if let Some(note) = self.get_mut(id) {
            if new_end_row > note.start_row {
                note.end_row = new_end_row;
            }
        }
    }

    fn resize_note_start(&mut self, id: NoteId, new_start_row: f32) {
        if let Some(note) = self.get_mut(id) {
            if new_start_row < note.end_row && new_start_row >= 0.0 {
                note.start_row = new_start_row;
            }
        }
    }

    fn delete_note(&mut self, id: NoteId) {
        self.notes.retain(|n| n.id != id);
    }

    fn duplicate_note(&mut self, id: NoteId) {
        if let Some(note) = self.get(id).cloned() {
            self.push(note);
        }
    }
}

/// HashSet-backed selection store.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    ids: HashSet<NoteId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionStore for Selection {
    fn selected_ids(&self) -> &HashSet<NoteId> {
        &self.ids
    }

    fn select(&mut self, id: NoteId, additive: bool) {
        if additive {
            if !self.ids.remove(&id) {
                self.ids.insert(id);
            }
        } else {
            self.ids.clear();
            self.ids.insert(id);
        }
    }

    fn select_range(&mut self, ids: &[NoteId]) {
        self.ids = ids.iter().copied().collect();
    }

    fn clear(&mut self) {
        self.ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_list_ids_and_order() {
        let mut list = NoteList::new();
        list.add_note(60, 0.0, 4.0, 100, None);
        list.add_note(62, 4.0, 2.0, 90, Some(3));
        let ids: Vec<_> = list.notes().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![NoteId(0), NoteId(1)]);
        assert_eq!(list.get(NoteId(1)).unwrap().end_row, 6.0);
        assert_eq!(list.get(NoteId(1)).unwrap().channel, Some(3));
    }

    #[test]
    fn test_invalid_ids_are_noops() {
        let mut list = NoteList::new();
        list.add_note(60, 0.0, 4.0, 100, None);
        list.move_note(NoteId(9), 1.0, 1);
        list.resize_note(NoteId(9), 8.0);
        list.delete_note(NoteId(9));
        assert_eq!(list.len(), 1);
        assert_eq!(list.notes()[0].start_row, 0.0);
    }

    #[test]
    fn test_resize_rejects_inverted() {
        let mut list = NoteList::new();
        list.add_note(60, 4.0, 4.0, 100, None);
        list.resize_note(NoteId(0), 2.0);
        list.resize_note_start(NoteId(0), 9.0);
        assert_eq!(list.notes()[0].start_row, 4.0);
        assert_eq!(list.notes()[0].end_row, 8.0);
    }

    #[test]
    fn test_duplicate_keeps_flags() {
        let mut list = NoteList::new();
        list.push(Note { slide: true, ..Note::new(NoteId(0), 0.0, 1.0, 60, 100) });
        list.duplicate_note(NoteId(0));
        assert_eq!(list.len(), 2);
        assert!(list.notes()[1].slide);
        assert_eq!(list.notes()[1].id, NoteId(1));
    }

    #[test]
    fn test_selection_toggle() {
        let mut sel = Selection::new();
        sel.select(NoteId(1), false);
        sel.select(NoteId(2), true);
        assert_eq!(sel.selected_ids().len(), 2);
        sel.select(NoteId(1), true);
        assert_eq!(sel.selected_ids(), &HashSet::from([NoteId(2)]));
        sel.select(NoteId(3), false);
        assert_eq!(sel.selected_ids(), &HashSet::from([NoteId(3)]));
        sel.select_range(&[NoteId(4), NoteId(5)]);
        assert_eq!(sel.selected_ids().len(), 2);
        sel.clear();
        assert!(sel.selected_ids().is_empty());
    }
}

//! The interaction-thread side of the piano roll.
//!
//! `PianoRoll` owns the viewport, the hit index and the gesture state, and
//! holds the render pipeline if one could be started. It never owns note,
//! selection or view data; those come in through `Stores` on every call.

use tracing::{debug, warn};

use crate::{
    config::Config,
    hit::{Cursor, HitTester, Tool},
    interaction::{Context, DragMode, Interaction, Modifiers, Outcome},
    note::{NoteId, MAX_PITCH},
    pipeline::{Frame, RenderMessage, RenderPipeline, RenderState},
    render::Theme,
    store::{NoteStore, SelectionStore, ViewSettings, ViewStore},
    viewport::{next_division, prev_division, row_step, Viewport},
};

/// Zoom multiplier per wheel notch.
const ZOOM_FACTOR: f32 = 1.25;

/// Borrowed collaborators for one call.
pub struct Stores<'a> {
    pub notes: &'a mut dyn NoteStore,
    pub selection: &'a mut dyn SelectionStore,
    pub view: &'a mut dyn ViewStore,
}

/// Keyboard-level editing commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    DeleteSelected,
    SelectAll,
    ClearSelection,
    SetTool(Tool),
    /// Move the selection by whole grid steps and semitones.
    Nudge { steps: i32, semitones: i32 },
    FinerDivision,
    CoarserDivision,
    /// Abandon the gesture in progress.
    Cancel,
}

pub struct PianoRoll {
    config: Config,
    viewport: Viewport,
    pixel_scale: f32,
    hits: HitTester,
    interaction: Interaction,
    pipeline: Option<RenderPipeline>,
    hover: Option<NoteId>,
    playhead: Option<f32>,
    /// The render thread hasn't seen the current state yet.
    dirty: bool,
}

impl PianoRoll {
    /// Create an editor and start its render thread. If the thread can't be
    /// started the editor still works, but `can_render` is false.
    pub fn new(config: Config, width: f32, height: f32, pixel_scale: f32) -> Self {
        let mut roll = Self::headless(config, width, height);
        roll.pixel_scale = pixel_scale;
        match RenderPipeline::spawn(roll.config.theme.clone(), roll.config.frame_interval()) {
            Ok(mut pipeline) => {
                pipeline.post(RenderMessage::Init { width, height, pixel_scale });
                roll.pipeline = Some(pipeline);
            }
            Err(e) => warn!("interactive rendering unavailable: {e}"),
        }
        roll
    }

    /// Create an editor without a render thread.
    pub fn headless(config: Config, width: f32, height: f32) -> Self {
        let config = config.validated();
        let viewport = Viewport { width, height, ..Default::default() };
        Self {
            config,
            viewport,
            pixel_scale: 1.0,
            hits: HitTester::new(),
            interaction: Interaction::new(),
            pipeline: None,
            hover: None,
            playhead: None,
            dirty: true,
        }
    }

    /// Whether frames will be produced.
    pub fn can_render(&self) -> bool {
        self.pipeline.as_ref().is_some_and(|p| p.is_alive())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn hit_tester(&self) -> &HitTester {
        &self.hits
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn hovered(&self) -> Option<NoteId> {
        self.hover
    }

    /// View settings for a fresh session under this editor's config.
    pub fn initial_view(&self) -> ViewSettings {
        ViewSettings {
            grid_division: self.config.default_division,
            h_zoom: self.config.clamp_h_zoom(self.viewport.h_zoom),
            v_zoom: self.config.clamp_v_zoom(self.viewport.v_zoom),
            ..Default::default()
        }
    }

    /// Pull scroll and zoom from the view store and rebuild the hit index.
    /// Call after changing the stores from outside the editor.
    pub fn sync(&mut self, stores: &Stores) {
        let view = stores.view.view();
        self.viewport = Viewport {
            scroll_x: view.scroll_x,
            scroll_y: view.scroll_y,
            h_zoom: view.h_zoom,
            v_zoom: view.v_zoom,
            ..self.viewport
        };
        self.hits.rebuild(stores.notes.notes(), &self.viewport);
        self.dirty = true;
    }

    pub fn resize(&mut self, width: f32, height: f32, pixel_scale: f32, stores: &Stores) {
        if (width, height, pixel_scale)
            == (self.viewport.width, self.viewport.height, self.pixel_scale) {
            return
        }
        debug!(width, height, pixel_scale, "resize");
        self.viewport.width = width;
        self.viewport.height = height;
        self.pixel_scale = pixel_scale;
        if let Some(pipeline) = &mut self.pipeline {
            pipeline.post(RenderMessage::Resize { width, height, pixel_scale });
        }
        self.sync(stores);
    }

    pub fn pointer_down(&mut self, x: f32, y: f32, mods: Modifiers, stores: &mut Stores)
    -> Outcome {
        self.sync(stores);
        self.set_hover(None);
        let view = stores.view.view();
        let ctx = Context {
            viewport: &self.viewport,
            hits: &self.hits,
            tool: view.tool,
            division: view.grid_division,
            velocity: self.config.default_velocity,
            channel: view.channel,
        };
        let outcome = self.interaction.pointer_down(&ctx, x, y, mods,
            &mut *stores.notes, &mut *stores.selection);
        self.after(outcome, stores);
        outcome
    }

    pub fn pointer_move(&mut self, x: f32, y: f32, stores: &mut Stores) -> Outcome {
        let view = stores.view.view();
        let ctx = Context {
            viewport: &self.viewport,
            hits: &self.hits,
            tool: view.tool,
            division: view.grid_division,
            velocity: self.config.default_velocity,
            channel: view.channel,
        };
        let outcome = self.interaction.pointer_move(&ctx, x, y, &mut *stores.notes);
        self.after(outcome, stores);

        let hover = if self.interaction.is_active() {
            None
        } else {
            self.hits.hit_test(x, y).map(|h| h.id)
        };
        self.set_hover(hover);
        outcome
    }

    pub fn pointer_up(&mut self, x: f32, y: f32, stores: &mut Stores) -> Outcome {
        let view = stores.view.view();
        let ctx = Context {
            viewport: &self.viewport,
            hits: &self.hits,
            tool: view.tool,
            division: view.grid_division,
            velocity: self.config.default_velocity,
            channel: view.channel,
        };
        let outcome = self.interaction.pointer_up(&ctx, x, y,
            &mut *stores.notes, &mut *stores.selection);
        self.after(outcome, stores);
        outcome
    }

    /// Pointer left the surface.
    pub fn pointer_leave(&mut self) {
        self.set_hover(None);
    }

    /// Wheel input. Plain scrolls pitch (and rows, for horizontal wheels),
    /// shift scrolls rows, ctrl zooms rows around `x`, alt zooms pitch
    /// around `y`. `dy > 0` is wheel up.
    pub fn scroll(&mut self, dx: f32, dy: f32, x: f32, y: f32, mods: Modifiers,
        stores: &mut Stores
    ) {
        self.sync(stores);
        let view = stores.view.view().clone();
        let step = self.config.scroll_step;

        if mods.ctrl {
            let anchor = self.viewport.pixel_x_to_row(x);
            let zoom = self.config.clamp_h_zoom(view.h_zoom * ZOOM_FACTOR.powf(dy.signum()));
            stores.view.set_zoom(zoom, view.v_zoom);
            stores.view.set_scroll((anchor - x / zoom).max(0.0), view.scroll_y);
        } else if mods.alt {
            let anchor = self.viewport.pixel_y_to_note(y);
            let zoom = self.config.clamp_v_zoom(view.v_zoom * ZOOM_FACTOR.powf(dy.signum()));
            let probe = Viewport { v_zoom: zoom, ..self.viewport };
            let (lo, hi) = probe.scroll_y_limits();
            let scroll_y = (anchor - probe.pixel_y_to_note(y) + view.scroll_y).clamp(lo, hi);
            stores.view.set_zoom(view.h_zoom, zoom);
            stores.view.set_scroll(view.scroll_x, scroll_y);
        } else {
            let (dx, dy) = if mods.shift { (dx - dy, 0.0) } else { (dx, dy) };
            let (lo, hi) = self.viewport.scroll_y_limits();
            stores.view.set_scroll(
                (view.scroll_x + dx * step).max(0.0),
                (view.scroll_y + dy * step).clamp(lo, hi));
        }

        self.sync(stores);
    }

    /// Scroll so that `pitch` is vertically centered.
    pub fn center_on_pitch(&mut self, pitch: f32, stores: &mut Stores) {
        self.sync(stores);
        let mut probe = self.viewport;
        probe.center_on_pitch(pitch);
        let (lo, hi) = probe.scroll_y_limits();
        stores.view.set_scroll(self.viewport.scroll_x, probe.scroll_y.clamp(lo, hi));
        self.sync(stores);
    }

    pub fn handle_action(&mut self, action: Action, stores: &mut Stores) -> Outcome {
        let mut outcome = Outcome::default();
        match action {
            Action::DeleteSelected => {
                let mut ids: Vec<NoteId> = stores.selection.selected_ids().iter().copied().collect();
                ids.sort_unstable();
                for id in &ids {
                    stores.notes.delete_note(*id);
                }
                stores.selection.clear();
                outcome.notes_changed = !ids.is_empty();
                outcome.selection_changed = true;
            }
            Action::SelectAll => {
                let ids: Vec<NoteId> = stores.notes.notes().iter().map(|n| n.id).collect();
                stores.selection.select_range(&ids);
                outcome.selection_changed = true;
            }
            Action::ClearSelection => {
                stores.selection.clear();
                outcome.selection_changed = true;
            }
            Action::SetTool(tool) => {
                outcome.preview_changed |= self.interaction.cancel().preview_changed;
                stores.view.set_tool(tool);
            }
            Action::Nudge { steps, semitones } => {
                outcome.notes_changed = nudge(steps, semitones, stores);
            }
            Action::FinerDivision => {
                let division = next_division(stores.view.view().grid_division);
                stores.view.set_grid_division(division);
                outcome.preview_changed = true;
            }
            Action::CoarserDivision => {
                let division = prev_division(stores.view.view().grid_division);
                stores.view.set_grid_division(division);
                outcome.preview_changed = true;
            }
            Action::Cancel => outcome = self.interaction.cancel(),
        }
        self.after(outcome, stores);
        outcome
    }

    /// Cursor for the pointer at (x, y). A gesture in progress keeps its
    /// cursor even when the pointer leaves the note.
    pub fn cursor_at(&self, x: f32, y: f32, tool: Tool) -> Cursor {
        match self.interaction.mode() {
            DragMode::Move => Cursor::Move,
            DragMode::ResizeStart | DragMode::ResizeEnd => Cursor::ResizeHorizontal,
            DragMode::SelectBox => Cursor::Default,
            DragMode::None => self.hits.cursor(x, y, tool),
        }
    }

    pub fn set_playhead(&mut self, row: Option<f32>) {
        if row != self.playhead {
            self.playhead = row;
            self.dirty = true;
        }
    }

    pub fn playhead(&self) -> Option<f32> {
        self.playhead
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.config.theme = theme.clone();
        if let Some(pipeline) = &mut self.pipeline {
            pipeline.post(RenderMessage::Theme(Box::new(theme)));
        }
    }

    /// Complete render state for the current stores.
    pub fn snapshot(&self, stores: &Stores) -> RenderState {
        let view = stores.view.view();
        RenderState {
            viewport: self.viewport,
            notes: stores.notes.notes().to_vec(),
            selected: stores.selection.selected_ids().clone(),
            ghosts: self.interaction.ghosts().to_vec(),
            show_velocity: self.config.show_velocity,
            grid_division: view.grid_division,
            pattern_length: view.pattern_length,
            scale: view.scale.clone(),
            repeat_pattern: self.config.repeat_pattern,
            playhead: self.playhead,
            selection_box: self.interaction.selection_box(),
        }
    }

    /// Post a snapshot if anything changed since the last one. Call once
    /// per UI frame.
    pub fn publish(&mut self, stores: &Stores) {
        if self.pipeline.is_none() {
            return
        }
        let state = self.dirty.then(|| self.snapshot(stores));
        if let Some(pipeline) = &mut self.pipeline {
            pipeline.flush();
            if let Some(state) = state {
                pipeline.post(RenderMessage::State(Box::new(state)));
                self.dirty = false;
            }
        }
    }

    /// The newest rendered frame, if one arrived since the last call.
    pub fn take_frame(&mut self) -> Option<&Frame> {
        self.pipeline.as_mut().and_then(|p| p.take_frame())
    }

    pub fn pipeline_mut(&mut self) -> Option<&mut RenderPipeline> {
        self.pipeline.as_mut()
    }

    fn after(&mut self, outcome: Outcome, stores: &Stores) {
        if outcome.notes_changed {
            // stale geometry must never be hit tested
            self.hits.rebuild(stores.notes.notes(), &self.viewport);
        }
        if outcome.any() {
            self.dirty = true;
        }
    }

    fn set_hover(&mut self, hover: Option<NoteId>) {
        if hover == self.hover {
            return
        }
        self.hover = hover;
        if let Some(pipeline) = &mut self.pipeline {
            pipeline.post(RenderMessage::Hover(hover));
        }
    }
}

/// Move every selected note, unless that would push any of them out of
/// range. Returns whether anything moved.
fn nudge(steps: i32, semitones: i32, stores: &mut Stores) -> bool {
    let delta_row = steps as f32 * row_step(stores.view.view().grid_division);
    let selected = stores.selection.selected_ids();
    let subjects: Vec<_> = stores.notes.notes().iter()
        .filter(|n| selected.contains(&n.id))
        .map(|n| (n.id, n.start_row, n.midi_note))
        .collect();

    let fits = subjects.iter().all(|&(_, start, pitch)| {
        let p = pitch as i32 + semitones;
        start + delta_row >= 0.0 && (0..=MAX_PITCH as i32).contains(&p)
    });
    if subjects.is_empty() || !fits || (steps == 0 && semitones == 0) {
        return false
    }
    for (id, ..) in subjects {
        stores.notes.move_note(id, delta_row, semitones);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{note::Note, store::{NoteList, Selection}};

    fn notes() -> NoteList {
        NoteList::from_notes(vec![
            Note::new(NoteId(0), 0.0, 4.0, 60, 100),
            Note::new(NoteId(1), 4.0, 8.0, 64, 100),
        ])
    }

    #[test]
    fn test_headless_cannot_render() {
        let roll = PianoRoll::headless(Config::default(), 800.0, 600.0);
        assert!(!roll.can_render());
    }

    #[test]
    fn test_nudge_and_delete() {
        let mut list = notes();
        let mut sel = Selection::new();
        let mut view = ViewSettings::default();
        let mut roll = PianoRoll::headless(Config::default(), 800.0, 600.0);
        let mut stores = Stores { notes: &mut list, selection: &mut sel, view: &mut view };
        roll.sync(&stores);

        roll.handle_action(Action::SelectAll, &mut stores);
        let out = roll.handle_action(Action::Nudge { steps: 2, semitones: 1 }, &mut stores);
        assert!(out.notes_changed);
        assert_eq!(stores.notes.notes()[0].start_row, 2.0);
        assert_eq!(stores.notes.notes()[1].midi_note, 65);

        // would leave row zero: nothing moves
        let out = roll.handle_action(Action::Nudge { steps: -3, semitones: 0 }, &mut stores);
        assert!(!out.notes_changed);
        assert_eq!(stores.notes.notes()[0].start_row, 2.0);

        roll.handle_action(Action::DeleteSelected, &mut stores);
        assert!(stores.notes.notes().is_empty());
        assert!(stores.selection.selected_ids().is_empty());
        assert!(roll.hit_tester().is_empty());
    }

    #[test]
    fn test_scroll_and_zoom_go_through_view_store() {
        let mut list = notes();
        let mut sel = Selection::new();
        let mut view = ViewSettings::default();
        let mut roll = PianoRoll::headless(Config::default(), 800.0, 600.0);
        let mut stores = Stores { notes: &mut list, selection: &mut sel, view: &mut view };
        roll.sync(&stores);

        roll.scroll(0.0, -1.0, 0.0, 0.0, Modifiers { shift: true, ..Default::default() },
            &mut stores);
        assert_eq!(stores.view.view().scroll_x, 3.0);
        assert_eq!(roll.viewport().scroll_x, 3.0);

        // zoom keeps the row under the pointer in place
        let anchor = roll.viewport().pixel_x_to_row(400.0);
        roll.scroll(0.0, 1.0, 400.0, 0.0, Modifiers { ctrl: true, ..Default::default() },
            &mut stores);
        assert!(stores.view.view().h_zoom > 16.0);
        assert!((roll.viewport().pixel_x_to_row(400.0) - anchor).abs() < 1e-3);
        // hit index follows the viewport
        let rect = roll.hit_tester().rect_of(NoteId(1)).unwrap();
        assert_eq!(rect.x, roll.viewport().row_to_pixel_x(4.0));
    }

    #[test]
    fn test_center_on_pitch() {
        let mut list = notes();
        let mut sel = Selection::new();
        let mut view = ViewSettings::default();
        let mut roll = PianoRoll::headless(Config::default(), 800.0, 600.0);
        let mut stores = Stores { notes: &mut list, selection: &mut sel, view: &mut view };
        roll.center_on_pitch(64.0, &mut stores);
        assert_eq!(roll.viewport().pitch_at(300.0), 64);
        assert_eq!(stores.view.view().scroll_y, roll.viewport().scroll_y);
    }

    #[test]
    fn test_division_cycling() {
        let mut list = notes();
        let mut sel = Selection::new();
        let mut view = ViewSettings::default();
        let mut roll = PianoRoll::headless(Config::default(), 800.0, 600.0);
        let mut stores = Stores { notes: &mut list, selection: &mut sel, view: &mut view };
        roll.handle_action(Action::FinerDivision, &mut stores);
        assert_eq!(stores.view.view().grid_division, 6);
        roll.handle_action(Action::CoarserDivision, &mut stores);
        roll.handle_action(Action::CoarserDivision, &mut stores);
        assert_eq!(stores.view.view().grid_division, 3);
    }
}

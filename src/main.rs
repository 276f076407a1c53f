// disable console in windows release builds
#![cfg_attr(
    all(
        target_os = "windows",
        not(debug_assertions),
    ),
    windows_subsystem = "windows"
)]

use macroquad::{miniquad::{window::set_mouse_cursor, CursorIcon}, prelude::*};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pianoroll::{
    config::CONFIG_PATH, note::{ROWS_PER_BEAT, ROWS_PER_MEASURE}, Action, Config, Cursor,
    Modifiers, Note, NoteId, NoteList, PianoRoll, Selection, SelectionStore, Stores, Tool,
    ViewSettings, APP_NAME,
};

/// Playback tempo of the demo, in beats per minute.
const TEMPO: f32 = 120.0;

/// Notes, selection and view settings, standing in for a host application.
struct Document {
    notes: NoteList,
    selection: Selection,
    view: ViewSettings,
}

impl Document {
    fn stores(&mut self) -> Stores<'_> {
        Stores {
            notes: &mut self.notes,
            selection: &mut self.selection,
            view: &mut self.view,
        }
    }
}

struct App {
    roll: PianoRoll,
    doc: Document,
    texture: Option<Texture2D>,
    playing: bool,
    last_mouse: (f32, f32),
}

impl App {
    fn new(config: Config) -> Self {
        let roll = PianoRoll::new(config, screen_width(), screen_height(), screen_dpi_scale());
        if !roll.can_render() {
            warn!("running without a render thread");
        }
        let mut view = roll.initial_view();
        view.pattern_length = ROWS_PER_MEASURE as f32 * 2.0;
        let mut app = Self {
            doc: Document {
                notes: demo_notes(),
                selection: Selection::new(),
                view,
            },
            roll,
            texture: None,
            playing: false,
            last_mouse: mouse_position(),
        };
        app.roll.center_on_pitch(64.0, &mut app.doc.stores());
        app
    }

    fn frame(&mut self) {
        self.roll.resize(screen_width(), screen_height(), screen_dpi_scale(),
            &self.doc.stores());
        self.handle_keys();
        self.handle_mouse();
        self.advance_playhead();
        self.roll.publish(&self.doc.stores());
        self.draw();
    }

    fn handle_keys(&mut self) {
        let mods = modifiers();
        let mut stores = self.doc.stores();
        for key in get_keys_pressed() {
            let action = match key {
                KeyCode::Delete | KeyCode::Backspace => Action::DeleteSelected,
                KeyCode::A if mods.ctrl => Action::SelectAll,
                KeyCode::Escape => if self.roll.interaction().is_active() {
                    Action::Cancel
                } else {
                    Action::ClearSelection
                },
                KeyCode::S => Action::SetTool(Tool::Select),
                KeyCode::D => Action::SetTool(Tool::Draw),
                KeyCode::E => Action::SetTool(Tool::Erase),
                KeyCode::Left => Action::Nudge { steps: -1, semitones: 0 },
                KeyCode::Right => Action::Nudge { steps: 1, semitones: 0 },
                KeyCode::Up => Action::Nudge { steps: 0, semitones: octave_or_one(mods) },
                KeyCode::Down => Action::Nudge { steps: 0, semitones: -octave_or_one(mods) },
                KeyCode::RightBracket => Action::FinerDivision,
                KeyCode::LeftBracket => Action::CoarserDivision,
                KeyCode::Space => {
                    self.playing = !self.playing;
                    if !self.playing {
                        self.roll.set_playhead(None);
                    }
                    continue
                }
                _ => continue,
            };
            self.roll.handle_action(action, &mut stores);
        }
    }

    fn handle_mouse(&mut self) {
        let (x, y) = mouse_position();
        let mods = modifiers();
        let mut stores = self.doc.stores();

        if is_mouse_button_pressed(MouseButton::Left) {
            self.roll.pointer_down(x, y, mods, &mut stores);
        }
        if (x, y) != self.last_mouse {
            if x < 0.0 || y < 0.0 || x >= screen_width() || y >= screen_height() {
                self.roll.pointer_leave();
            }
            self.roll.pointer_move(x, y, &mut stores);
            self.last_mouse = (x, y);
        }
        if is_mouse_button_released(MouseButton::Left) {
            self.roll.pointer_up(x, y, &mut stores);
        }

        let (wx, wy) = mouse_wheel();
        if wx != 0.0 || wy != 0.0 {
            self.roll.scroll(notch(wx), notch(wy), x, y, mods, &mut stores);
        }

        set_mouse_cursor(match self.roll.cursor_at(x, y, stores.view.view().tool) {
            Cursor::Default => CursorIcon::Default,
            Cursor::Move => CursorIcon::Move,
            Cursor::ResizeHorizontal => CursorIcon::EWResize,
            Cursor::Draw => CursorIcon::Crosshair,
            Cursor::Erase => CursorIcon::NotAllowed,
        });
    }

    fn advance_playhead(&mut self) {
        if !self.playing {
            return
        }
        let length = self.doc.view.pattern_length;
        let rows = get_frame_time() * TEMPO / 60.0 * ROWS_PER_BEAT as f32;
        // keep counting past the pattern end so repeats scroll into view
        let row = self.roll.playhead().unwrap_or(0.0) + rows;
        let row = if length > 0.0 && !self.roll.config().repeat_pattern {
            row % length
        } else {
            row
        };
        self.roll.set_playhead(Some(row));

        // follow
        let vp = *self.roll.viewport();
        let visible = vp.width / vp.h_zoom;
        if row < vp.scroll_x || row > vp.scroll_x + visible {
            let mut stores = self.doc.stores();
            stores.view.set_scroll(row, vp.scroll_y);
            self.roll.sync(&stores);
        }
    }

    fn draw(&mut self) {
        clear_background(self.roll.config().theme.lane_white());

        if let Some(frame) = self.roll.take_frame() {
            let same_size = self.texture.as_ref().is_some_and(|t| {
                (t.width(), t.height())
                    == (frame.image.width as f32, frame.image.height as f32)
            });
            if same_size {
                if let Some(texture) = &self.texture {
                    texture.update(&frame.image);
                }
            } else {
                let texture = Texture2D::from_image(&frame.image);
                texture.set_filter(FilterMode::Nearest);
                self.texture = Some(texture);
            }
        }

        let fg = self.roll.config().theme.fg();
        if let Some(texture) = &self.texture {
            draw_texture_ex(texture, 0.0, 0.0, WHITE, DrawTextureParams {
                dest_size: Some(vec2(screen_width(), screen_height())),
                ..Default::default()
            });
        } else if !self.roll.can_render() {
            draw_text("Interactive rendering unavailable", 20.0, 40.0, 24.0, fg);
        }

        let view = &self.doc.view;
        let status = format!("{:?} | 1/{} | {} notes, {} selected{}",
            view.tool, view.grid_division, self.doc.notes.len(),
            self.doc.selection.selected_ids().len(),
            if self.playing { " | playing" } else { "" });
        draw_text(&status, 8.0, screen_height() - 8.0, 20.0, fg);
    }
}

fn modifiers() -> Modifiers {
    Modifiers {
        shift: is_key_down(KeyCode::LeftShift) || is_key_down(KeyCode::RightShift),
        ctrl: is_key_down(KeyCode::LeftControl) || is_key_down(KeyCode::RightControl),
        alt: is_key_down(KeyCode::LeftAlt) || is_key_down(KeyCode::RightAlt),
    }
}

fn octave_or_one(mods: Modifiers) -> i32 {
    if mods.shift { 12 } else { 1 }
}

/// Wheel deltas vary wildly between platforms; treat each event as one notch.
fn notch(v: f32) -> f32 {
    if v == 0.0 { 0.0 } else { v.signum() }
}

/// A short figure with some articulations, so there's something to look at.
fn demo_notes() -> NoteList {
    let mut notes = NoteList::new();
    let figure: [(f32, f32, u8, u8); 8] = [
        (0.0, 2.0, 60, 110), (2.0, 4.0, 63, 80), (4.0, 6.0, 67, 100), (6.0, 7.0, 70, 60),
        (8.0, 12.0, 72, 127), (12.0, 14.0, 70, 90), (14.0, 15.0, 67, 50), (16.0, 24.0, 48, 100),
    ];
    for (i, (start, end, pitch, velocity)) in figure.into_iter().enumerate() {
        notes.push(Note {
            channel: Some((i % 3) as u8),
            slide: i == 3,
            accent: i == 4 || i == 7,
            hammer: i == 4,
            mute: i == 6,
            ..Note::new(NoteId(0), start, end, pitch, velocity)
        });
    }
    notes
}

fn window_conf() -> Conf {
    Conf {
        window_title: APP_NAME.to_owned(),
        window_width: 1024,
        window_height: 640,
        high_dpi: true,
        window_resizable: true,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("pianoroll=info")))
        .init();

    let config = match Config::load(CONFIG_PATH) {
        Ok(c) => c,
        Err(e) => {
            warn!("using default config: {e}");
            Config::default()
        }
    };
    info!(path = CONFIG_PATH, "starting");

    let mut app = App::new(config);
    loop {
        app.frame();
        next_frame().await
    }
}

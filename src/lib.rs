//! Piano roll editing surface: coordinate mapping, hit testing, gesture
//! handling and a background render thread that draws the grid and notes.
//!
//! The crate never owns musical data. Notes, selection and view settings
//! live behind the traits in [`store`]; [`PianoRoll`] reads them, issues
//! mutations on user gestures, and posts full snapshots to the render
//! thread.

pub mod config;
pub mod editor;
pub mod error;
pub mod hit;
pub mod interaction;
pub mod note;
pub mod pipeline;
pub mod render;
pub mod store;
pub mod viewport;

pub use config::Config;
pub use editor::{Action, PianoRoll, Stores};
pub use error::{Error, Result};
pub use hit::{Cursor, Hit, HitTester, HitZone, Tool};
pub use interaction::{DragMode, DragState, Modifiers, Outcome};
pub use note::{Note, NoteId, Scale};
pub use pipeline::{Frame, RenderMessage, RenderPipeline, RenderState};
pub use render::Theme;
pub use store::{NoteList, NoteStore, Selection, SelectionStore, ViewSettings, ViewStore};
pub use viewport::Viewport;

/// Application name, for window title, etc.
pub const APP_NAME: &str = "Piano Roll";

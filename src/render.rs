//! Drawing. Everything here runs on the render thread and draws into
//! `Surface`s; nothing touches the window or GPU.

pub mod grid;
pub mod notes;
pub mod surface;
pub mod theme;

pub use grid::GridRenderer;
pub use notes::{draw_playhead, draw_selection_box, NoteRenderer, NoteScene};
pub use surface::Surface;
pub use theme::Theme;

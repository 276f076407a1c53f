//! Render thread and the messages that feed it.
//!
//! The interaction thread posts `RenderMessage`s into a wait-free ring; the
//! render thread drains the ring every tick, keeps only the newest message
//! of each kind, draws, and publishes the finished frame through a triple
//! buffer. Neither side ever blocks on the other.

use std::{collections::HashSet, thread::{self, JoinHandle}, time::{Duration, Instant}};

use macroquad::texture::Image;
use rtrb::{Consumer, Producer, PushError, RingBuffer};
use tracing::{info, trace, warn};
use triple_buffer::{triple_buffer, Input, Output};

use crate::{
    error::{Error, Result},
    note::{Note, NoteId, Scale},
    render::{draw_playhead, draw_selection_box, GridRenderer, NoteRenderer, NoteScene,
        Surface, Theme},
    viewport::Viewport,
};

/// Slots in the message ring. Messages coalesce, so this only has to cover
/// the burst between two render ticks.
pub const QUEUE_CAPACITY: usize = 64;

/// Everything the render thread needs to draw one frame. Always complete,
/// never a diff.
#[derive(Clone, Debug)]
pub struct RenderState {
    pub viewport: Viewport,
    pub notes: Vec<Note>,
    pub selected: HashSet<NoteId>,
    pub ghosts: Vec<Note>,
    pub show_velocity: bool,
    pub grid_division: u8,
    /// Pattern length in rows. Zero or less means no pattern end.
    pub pattern_length: f32,
    pub scale: Scale,
    /// Tile notes at every visible repeat of the pattern.
    pub repeat_pattern: bool,
    pub playhead: Option<f32>,
    /// Rubber band corners in pixels.
    pub selection_box: Option<(f32, f32, f32, f32)>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            notes: Vec::new(),
            selected: HashSet::new(),
            ghosts: Vec::new(),
            show_velocity: true,
            grid_division: 4,
            pattern_length: 64.0,
            scale: Scale::chromatic(),
            repeat_pattern: false,
            playhead: None,
            selection_box: None,
        }
    }
}

pub enum RenderMessage {
    /// Surface size in logical pixels. Must precede the first frame.
    Init { width: f32, height: f32, pixel_scale: f32 },
    State(Box<RenderState>),
    Hover(Option<NoteId>),
    Resize { width: f32, height: f32, pixel_scale: f32 },
    Theme(Box<Theme>),
}

impl RenderMessage {
    /// Messages of the same kind supersede each other.
    fn kind(&self) -> u8 {
        match self {
            RenderMessage::Init { .. } | RenderMessage::Resize { .. } => 0,
            RenderMessage::State(_) => 1,
            RenderMessage::Hover(_) => 2,
            RenderMessage::Theme(_) => 3,
        }
    }
}

/// A finished frame.
#[derive(Clone)]
pub struct Frame {
    pub image: Image,
    /// Increments with every published frame. Zero until the first one.
    pub serial: u64,
    pub pixel_scale: f32,
}

impl Frame {
    fn empty() -> Self {
        Self {
            image: Surface::new(1.0, 1.0, 1.0).image().clone(),
            serial: 0,
            pixel_scale: 1.0,
        }
    }
}

/// Handle to the render thread. Dropping it stops and joins the thread.
pub struct RenderPipeline {
    tx: Option<Producer<RenderMessage>>,
    /// Messages that didn't fit in the ring, at most one per kind.
    backlog: Vec<RenderMessage>,
    frames: Output<Frame>,
    handle: Option<JoinHandle<()>>,
}

impl RenderPipeline {
    pub fn spawn(theme: Theme, frame_interval: Duration) -> Result<Self> {
        let (tx, rx) = RingBuffer::new(QUEUE_CAPACITY);
        let (input, output) = triple_buffer(&Frame::empty());
        let handle = thread::Builder::new()
            .name("pianoroll-render".into())
            .spawn(move || Worker::new(theme).run(rx, input, frame_interval))
            .map_err(Error::Spawn)?;

        Ok(Self {
            tx: Some(tx),
            backlog: Vec::new(),
            frames: output,
            handle: Some(handle),
        })
    }

    /// Post a message without blocking. If the ring is full the message
    /// waits in the backlog, replacing any older message of its kind.
    pub fn post(&mut self, msg: RenderMessage) {
        self.flush();
        if self.backlog.is_empty() {
            match self.tx.as_mut().map(|tx| tx.push(msg)) {
                Some(Ok(())) | None => (),
                Some(Err(PushError::Full(msg))) => self.defer(msg),
            }
        } else {
            // keep ordering behind what's already waiting
            self.defer(msg);
        }
    }

    /// Retry backlogged messages. Called by `post`; call it once per frame
    /// too so a backlog drains even when nothing new is posted.
    pub fn flush(&mut self) {
        let Some(tx) = self.tx.as_mut() else { return };
        while !self.backlog.is_empty() {
            let msg = self.backlog.remove(0);
            if let Err(PushError::Full(msg)) = tx.push(msg) {
                self.backlog.insert(0, msg);
                break
            }
        }
    }

    fn defer(&mut self, msg: RenderMessage) {
        let kind = msg.kind();
        if let Some(i) = self.backlog.iter().position(|m| m.kind() == kind) {
            warn!(kind, "render queue full, superseding backlogged message");
            self.backlog.remove(i);
        }
        self.backlog.push(msg);
    }

    /// The newest frame, if one arrived since the last call.
    pub fn take_frame(&mut self) -> Option<&Frame> {
        if self.frames.updated() {
            Some(self.frames.read())
        } else {
            None
        }
    }

    /// Wait up to `timeout` for a new frame.
    pub fn wait_frame(&mut self, timeout: Duration) -> Option<&Frame> {
        let deadline = Instant::now() + timeout;
        while !self.frames.updated() {
            if Instant::now() >= deadline {
                return None
            }
            thread::sleep(Duration::from_millis(1));
        }
        Some(self.frames.read())
    }

    /// Whether the render thread is still running.
    pub fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for RenderPipeline {
    fn drop(&mut self) {
        // abandoning the ring tells the worker to exit
        self.tx = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("render thread panicked");
            }
        }
    }
}

/// State owned by the render thread.
struct Worker {
    grid: GridRenderer,
    notes: NoteRenderer,
    surface: Surface,
    theme: Theme,
    size: Option<(f32, f32, f32)>,
    state: Option<Box<RenderState>>,
    hover: Option<NoteId>,
    dirty: bool,
    serial: u64,
}

impl Worker {
    fn new(theme: Theme) -> Self {
        Self {
            grid: GridRenderer::new(theme.clone()),
            notes: NoteRenderer::new(theme.clone()),
            surface: Surface::new(1.0, 1.0, 1.0),
            theme,
            size: None,
            state: None,
            hover: None,
            dirty: false,
            serial: 0,
        }
    }

    fn run(mut self, mut rx: Consumer<RenderMessage>, mut frames: Input<Frame>,
        interval: Duration
    ) {
        info!(?interval, "render thread started");
        loop {
            // checked before draining so nothing posted before the drop is missed
            let abandoned = rx.is_abandoned();
            while let Ok(msg) = rx.pop() {
                self.apply(msg);
            }
            if self.dirty {
                if let Some(frame) = self.render() {
                    frames.write(frame);
                }
            }
            if abandoned {
                break
            }
            thread::sleep(interval);
        }
        info!(frames = self.serial, "render thread stopped");
    }

    fn apply(&mut self, msg: RenderMessage) {
        match msg {
            RenderMessage::Init { width, height, pixel_scale }
            | RenderMessage::Resize { width, height, pixel_scale } => {
                self.size = Some((width, height, pixel_scale));
            }
            RenderMessage::State(state) => self.state = Some(state),
            RenderMessage::Hover(id) => {
                if id == self.hover {
                    return
                }
                self.hover = id;
            }
            RenderMessage::Theme(theme) => {
                self.grid.set_theme((*theme).clone());
                self.notes.set_theme((*theme).clone());
                self.theme = *theme;
            }
        }
        self.dirty = true;
    }

    /// Draw the latest state. `None` until both a size and a state arrived.
    fn render(&mut self) -> Option<Frame> {
        let (width, height, pixel_scale) = self.size?;
        let state = self.state.as_deref()?;
        let viewport = Viewport { width, height, ..state.viewport };

        let grid = self.grid.render(&viewport, state.grid_division, state.pattern_length,
            &state.scale, pixel_scale);
        self.surface.copy_from(grid);

        let scene = NoteScene {
            notes: &state.notes,
            selected: &state.selected,
            ghosts: &state.ghosts,
            show_velocity: state.show_velocity,
            pattern_length: (state.repeat_pattern && state.pattern_length > 0.0)
                .then_some(state.pattern_length),
            hovered: self.hover,
        };
        self.notes.render(&mut self.surface, &viewport, &scene);

        if let Some(row) = state.playhead {
            draw_playhead(&mut self.surface, &viewport, row, &self.theme);
        }
        if let Some((x1, y1, x2, y2)) = state.selection_box {
            draw_selection_box(&mut self.surface, x1, y1, x2, y2, &self.theme);
        }

        self.dirty = false;
        self.serial += 1;
        trace!(serial = self.serial, notes = state.notes.len(), "frame");
        Some(Frame {
            image: self.surface.image().clone(),
            serial: self.serial,
            pixel_scale,
        })
    }
}

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{error::Result, note::MAX_VELOCITY, render::Theme, viewport::nearest_division};

pub const CONFIG_PATH: &str = "pianoroll.toml";

/// Hard limits on zoom, in pixels per row / per semitone.
const H_ZOOM_LIMITS: (f32, f32) = (2.0, 128.0);
const V_ZOOM_LIMITS: (f32, f32) = (4.0, 48.0);

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
    /// Velocity of drawn notes.
    pub default_velocity: u8,
    pub show_velocity: bool,
    /// Grid division on startup: subdivisions of a quarter note, so the
    /// snap step is `4 / division` rows.
    pub default_division: u8,
    pub min_h_zoom: f32,
    pub max_h_zoom: f32,
    pub min_v_zoom: f32,
    pub max_v_zoom: f32,
    /// Render thread tick.
    pub frame_interval_ms: u64,
    /// Tile notes at every visible repeat of the pattern.
    pub repeat_pattern: bool,
    /// Rows (horizontal) or semitones (vertical) per wheel notch.
    pub scroll_step: f32,
    pub theme: Theme,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            default_velocity: 100,
            show_velocity: true,
            default_division: 4,
            min_h_zoom: 4.0,
            max_h_zoom: 64.0,
            min_v_zoom: 6.0,
            max_v_zoom: 32.0,
            frame_interval_ms: 16,
            repeat_pattern: true,
            scroll_step: 3.0,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let c: Self = toml::from_str(&s)?;
        Ok(c.validated())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let s = toml::to_string(self)?;
        std::fs::write(path, s)?;
        Ok(())
    }

    /// Returns a copy with every field pulled into its valid range.
    pub fn validated(&self) -> Self {
        let (min_h, max_h) = ordered_clamp(self.min_h_zoom, self.max_h_zoom, H_ZOOM_LIMITS);
        let (min_v, max_v) = ordered_clamp(self.min_v_zoom, self.max_v_zoom, V_ZOOM_LIMITS);
        Self {
            theme: self.theme.clone(),
            default_velocity: self.default_velocity.clamp(1, MAX_VELOCITY),
            show_velocity: self.show_velocity,
            default_division: nearest_division(self.default_division),
            min_h_zoom: min_h,
            max_h_zoom: max_h,
            min_v_zoom: min_v,
            max_v_zoom: max_v,
            frame_interval_ms: self.frame_interval_ms.clamp(1, 1000),
            repeat_pattern: self.repeat_pattern,
            scroll_step: if self.scroll_step.is_finite() && self.scroll_step > 0.0 {
                self.scroll_step
            } else {
                Self::default().scroll_step
            },
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn clamp_h_zoom(&self, zoom: f32) -> f32 {
        zoom.clamp(self.min_h_zoom, self.max_h_zoom)
    }

    pub fn clamp_v_zoom(&self, zoom: f32) -> f32 {
        zoom.clamp(self.min_v_zoom, self.max_v_zoom)
    }
}

/// Clamp both bounds into `limits` and put them in order.
fn ordered_clamp(a: f32, b: f32, (lo, hi): (f32, f32)) -> (f32, f32) {
    let sane = |v: f32, fallback: f32| if v.is_finite() { v.clamp(lo, hi) } else { fallback };
    let (a, b) = (sane(a, lo), sane(b, hi));
    (a.min(b), a.max(b))
}

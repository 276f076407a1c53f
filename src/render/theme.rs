//! Color themes.

use std::path::Path;

use macroquad::color::Color;
use palette::{FromColor, Lchuv, Srgb};
use serde::{Deserialize, Serialize};

use crate::error::Result;

const DEFAULT_ACCENT1_HUE: f32 = 180.0;
const DEFAULT_ACCENT2_HUE: f32 = -90.0;
const DEFAULT_ACCENT_CHROMA: f32 = 45.0;

const BLACK_KEY_L_OFFSET: f32 = 4.0;
const OUT_OF_SCALE_L_OFFSET: f32 = 9.0;
const SUBDIVISION_L_OFFSET: f32 = 7.0;
const BEAT_L_OFFSET: f32 = 14.0;
const MEASURE_L_OFFSET: f32 = 28.0;
const ACCENT_L_OFFSET: f32 = 15.0;
const SELECTED_L_OFFSET: f32 = 12.0;

const ACCENT_BG_CHROMA_MULTIPLIER: f32 = 1.0/3.0;

/// Hue rotation between adjacent channels, in degrees. Not a divisor of 360
/// so colours don't repeat for a while.
const CHANNEL_HUE_STEP: f32 = 47.0;

/// Color theme using four seed colors. Seed colors use the CIE L*C*uv h°uv
/// color space, which is cylindrical and perceptually uniform. (Although in
/// practice, we gamma correct.)
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Theme {
    pub fg: Lchuv,
    pub bg: Lchuv,
    /// Note colour. Channels rotate away from this hue.
    pub accent1: Lchuv,
    /// Selection, playhead and box-select colour.
    pub accent2: Lchuv,
    pub gamma: f32,
}

impl Theme {
    /// Returns the default light theme.
    pub fn light(gamma: f32) -> Theme {
        Theme {
            fg: Lchuv::new(10.0, 0.0, 0.0),
            bg: Lchuv::new(95.0, 0.0, 0.0),
            accent1: Lchuv::new(50.0, DEFAULT_ACCENT_CHROMA, DEFAULT_ACCENT1_HUE),
            accent2: Lchuv::new(50.0, DEFAULT_ACCENT_CHROMA, DEFAULT_ACCENT2_HUE),
            gamma,
        }
    }

    /// Returns the default dark theme.
    pub fn dark(gamma: f32) -> Theme {
        Theme {
            fg: Lchuv::new(90.0, 0.0, 0.0),
            bg: Lchuv::new(12.0, 0.0, 0.0),
            accent1: Lchuv::new(60.0, DEFAULT_ACCENT_CHROMA, DEFAULT_ACCENT1_HUE),
            accent2: Lchuv::new(65.0, DEFAULT_ACCENT_CHROMA, DEFAULT_ACCENT2_HUE),
            gamma,
        }
    }

    /// Load theme from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&s)?)
    }

    /// Save theme to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let s = toml::to_string_pretty(self)?;
        Ok(std::fs::write(path, s)?)
    }

    fn is_light(&self) -> bool {
        self.bg.l >= 50.0
    }

    /// Sign that moves lightness away from the background.
    fn contrast_sign(&self) -> f32 {
        if self.is_light() { -1.0 } else { 1.0 }
    }

    pub fn fg(&self) -> Color {
        self.color_from_lchuv(self.fg)
    }

    fn bg_plus(&self, offset: f32) -> Color {
        let bg = Lchuv::new(self.bg.l + self.contrast_sign() * offset,
            self.bg.chroma, self.bg.hue);
        self.color_from_lchuv(bg)
    }

    /// In-scale white-key lane.
    pub fn lane_white(&self) -> Color {
        self.color_from_lchuv(self.bg)
    }

    /// In-scale black-key lane.
    pub fn lane_black(&self) -> Color {
        self.bg_plus(BLACK_KEY_L_OFFSET)
    }

    /// Lane for a pitch outside the active scale. Overrides key colour.
    pub fn lane_out_of_scale(&self) -> Color {
        self.bg_plus(OUT_OF_SCALE_L_OFFSET)
    }

    pub fn octave_line(&self) -> Color {
        self.bg_plus(MEASURE_L_OFFSET)
    }

    pub fn measure_line(&self) -> Color {
        self.bg_plus(MEASURE_L_OFFSET)
    }

    pub fn beat_line(&self) -> Color {
        Color { a: 0.8, ..self.bg_plus(BEAT_L_OFFSET) }
    }

    pub fn subdivision_line(&self) -> Color {
        Color { a: 0.5, ..self.bg_plus(SUBDIVISION_L_OFFSET) }
    }

    /// Tint laid over rows past the end of the pattern.
    pub fn beyond_pattern(&self) -> Color {
        Color { a: 0.35, ..self.color_from_lchuv(self.fg) }
    }

    /// Grid lines past the end of the pattern.
    pub fn beyond_pattern_line(&self) -> Color {
        Color { a: 0.25, ..self.bg_plus(BEAT_L_OFFSET) }
    }

    pub fn pattern_end(&self) -> Color {
        self.accent2_fg()
    }

    pub fn accent1_fg(&self) -> Color {
        let c = Lchuv::new(self.fg.l - self.contrast_sign() * ACCENT_L_OFFSET,
            self.accent1.chroma, self.accent1.hue);
        self.color_from_lchuv(c)
    }

    pub fn accent2_fg(&self) -> Color {
        let c = Lchuv::new(self.fg.l - self.contrast_sign() * ACCENT_L_OFFSET,
            self.accent2.chroma, self.accent2.hue);
        self.color_from_lchuv(c)
    }

    pub fn accent2_bg(&self) -> Color {
        let c = Lchuv::new(self.bg.l + self.contrast_sign() * ACCENT_L_OFFSET,
            self.accent2.chroma * ACCENT_BG_CHROMA_MULTIPLIER, self.accent2.hue);
        self.color_from_lchuv(c)
    }

    /// Base note colour for a channel. `None` uses the accent hue as is.
    pub fn note(&self, channel: Option<u8>) -> Color {
        let rotation = channel.map_or(0.0, |c| c as f32 * CHANNEL_HUE_STEP);
        let hue = self.accent1.hue.into_degrees() + rotation;
        self.color_from_lchuv(Lchuv::new(self.accent1.l, self.accent1.chroma, hue))
    }

    /// Brightened note colour for selected notes.
    pub fn note_selected(&self, channel: Option<u8>) -> Color {
        let rotation = channel.map_or(0.0, |c| c as f32 * CHANNEL_HUE_STEP);
        let hue = self.accent1.hue.into_degrees() + rotation;
        let l = (self.accent1.l + SELECTED_L_OFFSET).min(100.0);
        self.color_from_lchuv(Lchuv::new(l, self.accent1.chroma, hue))
    }

    /// Outline of unselected notes.
    pub fn note_outline(&self) -> Color {
        Color { a: 0.3, ..self.color_from_lchuv(self.fg) }
    }

    pub fn selection_outline(&self) -> Color {
        self.accent2_fg()
    }

    pub fn ghost_outline(&self) -> Color {
        Color { a: 0.8, ..self.accent1_fg() }
    }

    pub fn hover_outline(&self) -> Color {
        Color { a: 0.6, ..self.accent2_fg() }
    }

    /// Dark overlay that grows as velocity drops.
    pub fn velocity_overlay(&self) -> Color {
        Color::new(0.0, 0.0, 0.0, 0.35)
    }

    /// Bright hint line at a note's resize handle, and decorator glyphs.
    pub fn note_highlight(&self) -> Color {
        Color::new(1.0, 1.0, 1.0, 0.85)
    }

    pub fn playhead(&self) -> Color {
        self.accent2_fg()
    }

    pub fn selection_box_fill(&self) -> Color {
        Color { a: 0.2, ..self.accent2_bg() }
    }

    pub fn selection_box_outline(&self) -> Color {
        Color { a: 0.9, ..self.accent2_fg() }
    }

    fn color_from_lchuv(&self, lchuv: Lchuv) -> Color {
        let lchuv = Lchuv {
            l: (lchuv.l.clamp(0.0, 100.0) * 0.01).powf(1.0/self.gamma) * 100.0,
            ..lchuv
        };
        let rgb = Srgb::from_color(lchuv);
        Color::new(rgb.red.clamp(0.0, 1.0), rgb.green.clamp(0.0, 1.0),
            rgb.blue.clamp(0.0, 1.0), 1.0)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark(1.8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn luma(c: Color) -> f32 {
        c.r * 0.3 + c.g * 0.59 + c.b * 0.11
    }

    #[test]
    fn test_lane_shades_distinct() {
        for theme in [Theme::light(1.8), Theme::dark(1.8)] {
            let (w, b, o) = (theme.lane_white(), theme.lane_black(), theme.lane_out_of_scale());
            assert_ne!(w, b);
            assert_ne!(b, o);
            // lanes move away from the background in the same direction
            let dw = luma(w);
            assert_eq!((luma(b) - dw).signum(), (luma(o) - dw).signum());
        }
    }

    #[test]
    fn test_channels_change_hue() {
        let theme = Theme::default();
        assert_ne!(theme.note(Some(0)), theme.note(Some(1)));
        assert_eq!(theme.note(None), theme.note(Some(0)));
        assert!(luma(theme.note_selected(Some(2))) > luma(theme.note(Some(2))));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("pianoroll-theme-{}.toml",
            std::process::id()));
        Theme::light(2.2).save(&path).unwrap();
        let back = Theme::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(back.gamma, 2.2);
        assert!((back.bg.l - 95.0).abs() < 1e-4);
    }
}

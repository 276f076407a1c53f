//! CPU raster surface the render thread draws into.
//!
//! Drawing calls take logical pixel coordinates and scale them by the
//! surface's pixel scale. Colours are blended src-over with straight alpha.

use macroquad::{color::Color, math::Rect, texture::Image};

pub struct Surface {
    image: Image,
    scale: f32,
}

impl Surface {
    pub fn new(width: f32, height: f32, scale: f32) -> Self {
        let scale = sanitize_scale(scale);
        let (w, h) = physical_size(width, height, scale);
        Self {
            image: Image::gen_image_color(w, h, Color::new(0.0, 0.0, 0.0, 0.0)),
            scale,
        }
    }

    /// Resize to the given logical size and scale. Reallocates only if the
    /// physical size changed; returns whether it did. Contents are
    /// undefined after a reallocation.
    pub fn resize(&mut self, width: f32, height: f32, scale: f32) -> bool {
        let scale = sanitize_scale(scale);
        self.scale = scale;
        let (w, h) = physical_size(width, height, scale);
        if (w, h) == (self.image.width, self.image.height) {
            return false
        }
        self.image = Image::gen_image_color(w, h, Color::new(0.0, 0.0, 0.0, 0.0));
        true
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn physical_width(&self) -> u16 {
        self.image.width
    }

    pub fn physical_height(&self) -> u16 {
        self.image.height
    }

    /// Copy another surface's pixels. Resizes to match if needed.
    pub fn copy_from(&mut self, other: &Surface) {
        if (self.image.width, self.image.height) != (other.image.width, other.image.height) {
            self.image = other.image.clone();
        } else {
            self.image.bytes.copy_from_slice(&other.image.bytes);
        }
        self.scale = other.scale;
    }

    pub fn clear(&mut self, color: Color) {
        let px = to_bytes(color);
        for chunk in self.image.bytes.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    /// Colour of a physical pixel, if in bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.image.width as u32 || y >= self.image.height as u32 {
            return None
        }
        let i = (y as usize * self.image.width as usize + x as usize) * 4;
        let b = &self.image.bytes[i..i + 4];
        Some(Color::from_rgba(b[0], b[1], b[2], b[3]))
    }

    /// Colour at a logical position.
    pub fn pixel_at(&self, x: f32, y: f32) -> Option<Color> {
        if x < 0.0 || y < 0.0 {
            return None
        }
        self.pixel((x * self.scale) as u32, (y * self.scale) as u32)
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some((x0, y0, x1, y1)) = self.physical_bounds(rect) else { return };
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend(x, y, color);
            }
        }
    }

    pub fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, color: Color) {
        let Some((x0, y0, x1, y1)) = self.physical_bounds(rect) else { return };
        let shape = RoundedShape::new(rect, radius, self.scale);
        for y in y0..y1 {
            for x in x0..x1 {
                if shape.contains(x as f32 + 0.5, y as f32 + 0.5) {
                    self.blend(x, y, color);
                }
            }
        }
    }

    /// Outline a rounded rectangle on its inside. With `dash`, alternate
    /// drawn and skipped runs of that logical length along each edge.
    pub fn stroke_rounded_rect(&mut self, rect: Rect, radius: f32, thickness: f32,
        color: Color, dash: Option<f32>
    ) {
        let Some((x0, y0, x1, y1)) = self.physical_bounds(rect) else { return };
        let outer = RoundedShape::new(rect, radius, self.scale);
        let t = thickness.max(1.0 / self.scale);
        let inner = RoundedShape::new(Rect {
            x: rect.x + t,
            y: rect.y + t,
            w: rect.w - t * 2.0,
            h: rect.h - t * 2.0,
        }, (radius - t).max(0.0), self.scale);
        let dash_len = dash.map(|d| (d * self.scale).max(1.0));
        let t_px = t * self.scale;

        for y in y0..y1 {
            for x in x0..x1 {
                let (cx, cy) = (x as f32 + 0.5, y as f32 + 0.5);
                if !outer.contains(cx, cy) || inner.contains(cx, cy) {
                    continue
                }
                if let Some(len) = dash_len {
                    let on_horizontal_edge = cy - outer.top < t_px || outer.bottom - cy < t_px;
                    let along = if on_horizontal_edge { cx - outer.left } else { cy - outer.top };
                    if (along / len) as i32 % 2 != 0 {
                        continue
                    }
                }
                self.blend(x, y, color);
            }
        }
    }

    /// Straight line with a square brush.
    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, thickness: f32, color: Color) {
        let half = thickness * 0.5;
        if x1 == x2 || y1 == y2 {
            let rect = Rect {
                x: x1.min(x2) - if x1 == x2 { half } else { 0.0 },
                y: y1.min(y2) - if y1 == y2 { half } else { 0.0 },
                w: if x1 == x2 { thickness } else { (x2 - x1).abs() },
                h: if y1 == y2 { thickness } else { (y2 - y1).abs() },
            };
            self.fill_rect(rect, color);
            return
        }

        // dda; each physical pixel is blended at most once so overlapping
        // brush stamps don't stack alpha
        let steps = ((x2 - x1).abs().max((y2 - y1).abs()) * self.scale).ceil() as usize;
        let mut covered = Vec::new();
        for i in 0..=steps {
            let f = i as f32 / steps as f32;
            let (x, y) = (x1 + (x2 - x1) * f, y1 + (y2 - y1) * f);
            if let Some((bx0, by0, bx1, by1)) = self.physical_bounds(Rect {
                x: x - half,
                y: y - half,
                w: thickness,
                h: thickness,
            }) {
                for py in by0..by1 {
                    for px in bx0..bx1 {
                        covered.push((px, py));
                    }
                }
            }
        }
        covered.sort_unstable();
        covered.dedup();
        for (px, py) in covered {
            self.blend(px, py, color);
        }
    }

    /// Clip a logical rect to physical pixel bounds, as half-open ranges.
    /// Thin rects that round to zero width still cover one pixel.
    fn physical_bounds(&self, rect: Rect) -> Option<(u32, u32, u32, u32)> {
        if rect.w <= 0.0 || rect.h <= 0.0 {
            return None
        }
        let (w, h) = (self.image.width as f32, self.image.height as f32);
        let mut x0 = (rect.x * self.scale).round();
        let mut x1 = ((rect.x + rect.w) * self.scale).round();
        let mut y0 = (rect.y * self.scale).round();
        let mut y1 = ((rect.y + rect.h) * self.scale).round();
        if x1 <= x0 {
            x1 = x0 + 1.0;
        }
        if y1 <= y0 {
            y1 = y0 + 1.0;
        }
        x0 = x0.clamp(0.0, w);
        x1 = x1.clamp(0.0, w);
        y0 = y0.clamp(0.0, h);
        y1 = y1.clamp(0.0, h);
        if x1 <= x0 || y1 <= y0 {
            return None
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }

    fn blend(&mut self, x: u32, y: u32, color: Color) {
        let i = (y as usize * self.image.width as usize + x as usize) * 4;
        let dst = &mut self.image.bytes[i..i + 4];
        let a = color.a.clamp(0.0, 1.0);
        if a >= 1.0 {
            dst.copy_from_slice(&to_bytes(color));
            return
        }
        let src = [color.r, color.g, color.b];
        for c in 0..3 {
            let d = dst[c] as f32 / 255.0;
            dst[c] = ((src[c].clamp(0.0, 1.0) * a + d * (1.0 - a)) * 255.0).round() as u8;
        }
        let da = dst[3] as f32 / 255.0;
        dst[3] = ((a + da * (1.0 - a)) * 255.0).round() as u8;
    }
}

/// Rounded rectangle in physical pixel space.
struct RoundedShape {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
    radius: f32,
}

impl RoundedShape {
    fn new(rect: Rect, radius: f32, scale: f32) -> Self {
        let (w, h) = (rect.w.max(0.0) * scale, rect.h.max(0.0) * scale);
        Self {
            left: rect.x * scale,
            top: rect.y * scale,
            right: rect.x * scale + w,
            bottom: rect.y * scale + h,
            radius: (radius * scale).min(w * 0.5).min(h * 0.5).max(0.0),
        }
    }

    fn contains(&self, x: f32, y: f32) -> bool {
        if x < self.left || x >= self.right || y < self.top || y >= self.bottom {
            return false
        }
        let r = self.radius;
        let dx = (self.left + r - x).max(x - (self.right - r)).max(0.0);
        let dy = (self.top + r - y).max(y - (self.bottom - r)).max(0.0);
        dx * dx + dy * dy <= r * r
    }
}

fn sanitize_scale(scale: f32) -> f32 {
    if scale.is_finite() && scale > 0.0 { scale } else { 1.0 }
}

fn physical_size(width: f32, height: f32, scale: f32) -> (u16, u16) {
    let f = |v: f32| (v * scale).ceil().clamp(1.0, u16::MAX as f32) as u16;
    (f(width), f(height))
}

fn to_bytes(color: Color) -> [u8; 4] {
    let f = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    [f(color.r), f(color.g), f(color.b), f(color.a)]
}

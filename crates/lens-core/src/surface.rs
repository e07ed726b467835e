//! RGB render surface and the raster primitives the lens draws with.
//!
//! Pixels are packed `rgb24`, row-major. Every primitive clips to the
//! surface; coordinates outside it are ignored rather than rejected.

use serde::{Deserialize, Serialize};

use crate::constants::{clamp01, lerp};
use crate::palette::Color;

/// Glyph cell: 3 columns by 5 rows, 4 columns of advance.
pub const GLYPH_W: usize = 3;
pub const GLYPH_H: usize = 5;
pub const GLYPH_ADVANCE: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Blend {
    /// Source-over alpha compositing.
    Over,
    /// `Cb + a·Cs·(1 - Cb)` per channel; never darkens.
    Screen,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Surface {
    pub width: usize,
    pub height: usize,
    pub rgb: Vec<u8>,
}

impl Surface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            rgb: vec![0; width * height * 3],
        }
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Reallocate to a new size, cleared to black. No-op when unchanged.
    pub fn resize(&mut self, width: usize, height: usize) {
        if (width, height) != self.dims() {
            *self = Self::new(width, height);
        }
    }

    pub fn fill(&mut self, color: Color) {
        let px = color.to_rgb8();
        for chunk in self.rgb.chunks_exact_mut(3) {
            chunk.copy_from_slice(&px);
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 3;
        Some([self.rgb[i], self.rgb[i + 1], self.rgb[i + 2]])
    }

    pub fn put_pixel(&mut self, x: usize, y: usize, px: [u8; 3]) {
        if x < self.width && y < self.height {
            let i = (y * self.width + x) * 3;
            self.rgb[i..i + 3].copy_from_slice(&px);
        }
    }

    /// Composite `color` at coverage `alpha` onto one pixel.
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: Color, alpha: f64, mode: Blend) {
        if x < 0 || y < 0 || alpha <= 0.0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        let Some(dst) = self.pixel(x, y) else {
            return;
        };
        let a = clamp01(alpha);
        let cb = Color::from_rgb8(dst);
        let src = color.clamped();
        let out = match mode {
            Blend::Over => Color::new(
                lerp(cb.r, src.r, a),
                lerp(cb.g, src.g, a),
                lerp(cb.b, src.b, a),
            ),
            Blend::Screen => Color::new(
                cb.r + a * src.r * (1.0 - cb.r),
                cb.g + a * src.g * (1.0 - cb.g),
                cb.b + a * src.b * (1.0 - cb.b),
            ),
        };
        self.put_pixel(x, y, to_rgb8_rounded(out));
    }

    /// Composite over the half-open pixel rectangle `[x0, x1) × [y0, y1)`.
    pub fn fill_rect(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, color: Color, alpha: f64, mode: Blend) {
        let (w, h) = (self.width as f64, self.height as f64);
        let xs = x0.max(0.0).round() as i64;
        let xe = x1.min(w).round() as i64;
        let ys = y0.max(0.0).round() as i64;
        let ye = y1.min(h).round() as i64;
        for y in ys..ye {
            for x in xs..xe {
                self.blend_pixel(x, y, color, alpha, mode);
            }
        }
    }

    /// Darken every pixel toward black by `alpha`.
    pub fn darken(&mut self, alpha: f64) {
        let k = 1.0 - clamp01(alpha);
        for v in &mut self.rgb {
            *v = (f64::from(*v) * k).round() as u8;
        }
    }

    /// Antialiased filled disc.
    pub fn fill_circle(&mut self, cx: f64, cy: f64, radius: f64, color: Color, alpha: f64, mode: Blend) {
        if radius <= 0.0 {
            return;
        }
        let (x0, x1) = ((cx - radius - 1.0).floor() as i64, (cx + radius + 1.0).ceil() as i64);
        let (y0, y1) = ((cy - radius - 1.0).floor() as i64, (cy + radius + 1.0).ceil() as i64);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f64 + 0.5 - cx;
                let dy = y as f64 + 0.5 - cy;
                let cover = clamp01(radius + 0.5 - (dx * dx + dy * dy).sqrt());
                if cover > 0.0 {
                    self.blend_pixel(x, y, color, alpha * cover, mode);
                }
            }
        }
    }

    /// Radial glow: full `alpha` at the centre falling off quadratically
    /// to zero at `radius`.
    pub fn glow(&mut self, cx: f64, cy: f64, radius: f64, color: Color, alpha: f64) {
        if radius <= 0.0 {
            return;
        }
        let (x0, x1) = ((cx - radius).floor() as i64, (cx + radius).ceil() as i64);
        let (y0, y1) = ((cy - radius).floor() as i64, (cy + radius).ceil() as i64);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f64 + 0.5 - cx;
                let dy = y as f64 + 0.5 - cy;
                let t = 1.0 - (dx * dx + dy * dy).sqrt() / radius;
                if t > 0.0 {
                    self.blend_pixel(x, y, color, alpha * t * t, Blend::Screen);
                }
            }
        }
    }

    /// Antialiased line segment of the given `width`.
    pub fn draw_line(
        &mut self,
        (ax, ay): (f64, f64),
        (bx, by): (f64, f64),
        width: f64,
        color: Color,
        alpha: f64,
        mode: Blend,
    ) {
        let half = (width * 0.5).max(0.5);
        let pad = half + 1.0;
        let x0 = (ax.min(bx) - pad).floor() as i64;
        let x1 = (ax.max(bx) + pad).ceil() as i64;
        let y0 = (ay.min(by) - pad).floor() as i64;
        let y1 = (ay.max(by) + pad).ceil() as i64;
        let (x0, x1) = (x0.max(0), x1.min(self.width as i64 - 1));
        let (y0, y1) = (y0.max(0), y1.min(self.height as i64 - 1));

        let (ex, ey) = (bx - ax, by - ay);
        let len2 = ex * ex + ey * ey;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let (px, py) = (x as f64 + 0.5, y as f64 + 0.5);
                let t = if len2 > 0.0 {
                    clamp01(((px - ax) * ex + (py - ay) * ey) / len2)
                } else {
                    0.0
                };
                let (qx, qy) = (ax + ex * t - px, ay + ey * t - py);
                let cover = clamp01(half + 0.5 - (qx * qx + qy * qy).sqrt());
                if cover > 0.0 {
                    self.blend_pixel(x, y, color, alpha * cover, mode);
                }
            }
        }
    }

    /// Radial vignette centred on the surface: transparent inside `r0`,
    /// ramping linearly to `max_alpha` black at `r1` and beyond.
    pub fn vignette(&mut self, r0: f64, r1: f64, max_alpha: f64) {
        let (cx, cy) = (self.width as f64 * 0.5, self.height as f64 * 0.5);
        let span = (r1 - r0).max(1e-6);
        for y in 0..self.height {
            for x in 0..self.width {
                let dx = x as f64 + 0.5 - cx;
                let dy = y as f64 + 0.5 - cy;
                let t = clamp01(((dx * dx + dy * dy).sqrt() - r0) / span);
                if t > 0.0 {
                    self.blend_pixel(x as i64, y as i64, Color::BLACK, max_alpha * t, Blend::Over);
                }
            }
        }
    }

    /// Nearest-neighbour copy of `src` stretched over the whole surface.
    pub fn blit_scaled(&mut self, src: &Surface) {
        if src.width == 0 || src.height == 0 {
            return;
        }
        if src.dims() == self.dims() {
            self.rgb.copy_from_slice(&src.rgb);
            return;
        }
        for y in 0..self.height {
            let sy = (y * src.height / self.height).min(src.height - 1);
            for x in 0..self.width {
                let sx = (x * src.width / self.width).min(src.width - 1);
                let s = (sy * src.width + sx) * 3;
                let d = (y * self.width + x) * 3;
                self.rgb[d..d + 3].copy_from_slice(&src.rgb[s..s + 3]);
            }
        }
    }

    /// Draw one glyph with `scale`×`scale` pixel cells; returns the advance.
    pub fn draw_char(&mut self, x: i64, y: i64, ch: char, scale: usize, color: Color, alpha: f64, mode: Blend) -> i64 {
        let glyph = glyph_bits(ch.to_ascii_uppercase());
        let s = scale.max(1) as i64;
        for (row, pattern) in glyph.iter().enumerate() {
            for col in 0..GLYPH_W {
                if (pattern >> (GLYPH_W - 1 - col)) & 1 == 1 {
                    for dy in 0..s {
                        for dx in 0..s {
                            let px = x + col as i64 * s + dx;
                            let py = y + row as i64 * s + dy;
                            self.blend_pixel(px, py, color, alpha, mode);
                        }
                    }
                }
            }
        }
        GLYPH_ADVANCE as i64 * s
    }

    /// Draw `text` centred on `(cx, cy)`.
    pub fn draw_text_centered(&mut self, cx: f64, cy: f64, text: &str, scale: usize, color: Color, alpha: f64, mode: Blend) {
        let (w, h) = text_extent(text, scale);
        let mut cursor = (cx - w as f64 * 0.5).round() as i64;
        let y = (cy - h as f64 * 0.5).round() as i64;
        for ch in text.chars() {
            cursor += self.draw_char(cursor, y, ch, scale, color, alpha, mode);
        }
    }
}

/// Pixel extent of `text` at `scale`, without trailing advance.
pub fn text_extent(text: &str, scale: usize) -> (usize, usize) {
    let s = scale.max(1);
    let n = text.chars().count();
    let w = if n == 0 {
        0
    } else {
        (n - 1) * GLYPH_ADVANCE * s + GLYPH_W * s
    };
    (w, GLYPH_H * s)
}

fn to_rgb8_rounded(c: Color) -> [u8; 3] {
    let c = c.clamped();
    [
        (c.r * 255.0).round() as u8,
        (c.g * 255.0).round() as u8,
        (c.b * 255.0).round() as u8,
    ]
}

const fn glyph_bits(ch: char) -> [u8; 5] {
    match ch {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b111, 0b100, 0b111, 0b101, 0b111],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b111, 0b001, 0b001, 0b101, 0b111],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b101, 0b111, 0b111, 0b111, 0b101],
        'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'Q' => [0b111, 0b101, 0b101, 0b111, 0b011],
        'R' => [0b111, 0b101, 0b111, 0b110, 0b101],
        'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b010, 0b000],
        '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
        '?' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '_' => [0b000, 0b000, 0b000, 0b000, 0b111],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _ => [0b111, 0b101, 0b010, 0b010, 0b111],
    }
}

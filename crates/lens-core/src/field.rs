//! Procedural flow field: layered fBm, banding, ice edge sparkle and a
//! radial vignette.

use serde::{Deserialize, Serialize};

use crate::constants::{FIELD_SEED_BASE, clamp01};
use crate::memory::MemoryRecord;
use crate::mode::{FieldStyle, IDLE_FIELD_STYLE, Regime};
use crate::noise::{NoiseBasis, fbm2d};
use crate::palette::{Color, Palette};
use crate::surface::Surface;

const VIGNETTE_INNER: f64 = 0.15;
const VIGNETTE_OUTER: f64 = 0.75;
const VIGNETTE_ALPHA: f64 = 0.55;

/// Noise seed for a memory record: `2000 + (last mod 10000)`.
pub fn field_seed(memory: &MemoryRecord) -> u32 {
    FIELD_SEED_BASE + (memory.last % 10_000) as u32
}

/// Everything the field needs for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldFrame {
    pub regime: Regime,
    /// Idle visuals: frozen shimmer and static ice edges.
    pub idle: bool,
    pub h: f64,
    pub strength: f64,
    pub time: f64,
    pub seed: u32,
    pub basis: NoiseBasis,
}

impl FieldFrame {
    pub fn style(&self) -> FieldStyle {
        if self.idle && self.regime == Regime::Ice {
            IDLE_FIELD_STYLE
        } else {
            self.regime.field_style()
        }
    }

    fn shimmering(&self) -> bool {
        self.idle && self.regime == Regime::Ice
    }
}

/// Render the field into `target`, which may be smaller than the frame it
/// represents; `frame_width` is the width of that full frame and fixes the
/// noise coordinate scale.
pub fn render_field(target: &mut Surface, frame: &FieldFrame, palette: &Palette, frame_width: usize) {
    let (w, h) = target.dims();
    if w == 0 || h == 0 {
        return;
    }
    let style = frame.style();
    let t = frame.time;
    let speed = style.speed;
    let px_scale = frame_width.max(1) as f64 / w as f64;
    let ice = frame.regime == Regime::Ice;
    let shimmer_on = frame.shimmering();

    let (shimmer, shimmer2, spark) = if shimmer_on {
        (
            0.5 + 0.5 * (t * 6.0).sin(),
            0.5 + 0.5 * (t * 9.0 + 1.7).sin(),
            0.5 + 0.5 * (t * 18.0 + 0.4).sin(),
        )
    } else {
        (0.0, 0.0, 0.0)
    };
    let edge_speed = if frame.idle { 0.0 } else { 0.10 };
    let edge_phase = if frame.idle {
        (shimmer - 0.5) * 0.8 + (shimmer2 - 0.5) * 0.35
    } else {
        0.0
    };
    let seed = frame.seed;
    let basis = frame.basis;

    for y in 0..h {
        let ny = y as f64 * px_scale * style.scale;
        for x in 0..w {
            let nx = x as f64 * px_scale * style.scale;

            let n1 = fbm2d(nx + t * speed, ny, seed, 5, basis);
            let n2 = fbm2d(nx, ny + t * speed * 0.9, seed.wrapping_add(77), 4, basis);
            let mut v = 0.55 * n1 + 0.45 * n2;

            if shimmer_on {
                let grain = fbm2d(nx * 4.5, ny * 4.5, seed.wrapping_add(9000), 2, basis);
                let osc = (shimmer - 0.5) * 0.10 + (shimmer2 - 0.5) * 0.05;
                let micro = (grain - 0.5) * (0.12 + 0.06 * spark);
                v = clamp01(v + osc + micro);
            }
            v = clamp01(v).powf(style.sharp);

            let band = 0.5 + 0.5 * (ny * 22.0 + v * 6.5 + t * speed * 3.0).sin();
            let lum = clamp01((v * 0.85 + band * 0.55) * style.bands);
            let b = clamp01(lum * (0.20 + frame.h * 0.95) * frame.strength);

            let edge = if ice {
                let g = (fbm2d(
                    nx * 1.8 + t * edge_speed + edge_phase,
                    ny * 1.8 - t * edge_speed * 0.7 - edge_phase * 0.8,
                    seed.wrapping_add(999),
                    3,
                    basis,
                ) - 0.5)
                    .abs();
                clamp01((0.24 - g) * 4.0) * frame.strength
            } else {
                0.0
            };

            let color = Color::new(
                palette.base.r * b + palette.ice.r * edge,
                palette.base.g * b + palette.ice.g * edge,
                palette.base.b * b + palette.ice.b * edge,
            );
            target.put_pixel(x, y, color.to_rgb8());
        }
    }

    let hf = h as f64;
    target.vignette(hf * VIGNETTE_INNER, hf * VIGNETTE_OUTER, VIGNETTE_ALPHA);
}

/// How the field reaches the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Composition {
    /// Re-render into the frame on every tick.
    Direct,
    /// Re-render into an offscreen buffer at a capped rate and blit it.
    #[default]
    Cached,
}

/// Offscreen field buffer with a frame-clock rate cap.
#[derive(Clone, Debug)]
pub struct FieldCache {
    buffer: Surface,
    fps: f64,
    scale: f64,
    last_render_ms: Option<f64>,
    renders: u64,
}

impl FieldCache {
    pub fn new(fps: f64, scale: f64) -> Self {
        Self {
            buffer: Surface::new(0, 0),
            fps: fps.max(1e-3),
            scale: scale.clamp(0.05, 1.0),
            last_render_ms: None,
            renders: 0,
        }
    }

    /// Whether a render is due at frame-clock time `now_ms`.
    pub fn due(&self, now_ms: f64) -> bool {
        match self.last_render_ms {
            None => true,
            // tolerance absorbs rounding in synthetic fixed-step clocks
            Some(last) => now_ms - last + 1e-6 >= 1000.0 / self.fps,
        }
    }

    /// Force the next `draw` to re-render.
    pub fn invalidate(&mut self) {
        self.last_render_ms = None;
    }

    /// Number of field renders performed so far.
    pub fn renders(&self) -> u64 {
        self.renders
    }

    pub fn buffer(&self) -> &Surface {
        &self.buffer
    }

    /// Refresh the buffer if due, then blit it over `target`. Returns
    /// whether the field was re-rendered.
    pub fn draw(&mut self, target: &mut Surface, frame: &FieldFrame, palette: &Palette, now_ms: f64) -> bool {
        let bw = ((target.width as f64 * self.scale).round() as usize).max(1);
        let bh = ((target.height as f64 * self.scale).round() as usize).max(1);
        let resized = self.buffer.dims() != (bw, bh);
        let rendered = resized || self.due(now_ms);
        if rendered {
            self.buffer.resize(bw, bh);
            render_field(&mut self.buffer, frame, palette, target.width);
            self.last_render_ms = Some(now_ms);
            self.renders += 1;
        }
        target.blit_scaled(&self.buffer);
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(regime: Regime, idle: bool) -> FieldFrame {
        FieldFrame {
            regime,
            idle,
            h: 0.6,
            strength: 0.5,
            time: 1.25,
            seed: 2042,
            basis: NoiseBasis::Gradient,
        }
    }

    #[test]
    fn test_field_seed() {
        let mem = MemoryRecord::new(0.0, 0.1, 1_700_000_123_456);
        assert_eq!(field_seed(&mem), 2000 + 3456);
    }

    #[test]
    fn test_idle_style_override() {
        assert_eq!(frame(Regime::Ice, true).style(), IDLE_FIELD_STYLE);
        assert_eq!(frame(Regime::Ice, false).style(), Regime::Ice.field_style());
        assert_eq!(frame(Regime::Water, true).style(), Regime::Water.field_style());
    }

    #[test]
    fn test_render_is_deterministic() {
        let pal = Palette::for_regime(Regime::Water, 0.6);
        let mut a = Surface::new(32, 18);
        let mut b = Surface::new(32, 18);
        render_field(&mut a, &frame(Regime::Water, false), &pal, 32);
        render_field(&mut b, &frame(Regime::Water, false), &pal, 32);
        assert_eq!(a, b);
        assert!(a.rgb.iter().any(|&v| v > 0));
    }

    #[test]
    fn test_zero_strength_without_ice_is_black() {
        let pal = Palette::for_regime(Regime::Aurora, 0.6);
        let mut s = Surface::new(16, 9);
        let mut f = frame(Regime::Aurora, false);
        f.strength = 0.0;
        render_field(&mut s, &f, &pal, 16);
        assert!(s.rgb.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_cache_respects_fps_cap() {
        let pal = Palette::for_regime(Regime::Ice, 0.5);
        let mut cache = FieldCache::new(15.0, 1.0);
        let mut target = Surface::new(16, 9);
        let f = frame(Regime::Ice, false);
        let mut rendered = 0;
        // one second of a 60 Hz clock
        for i in 0..60 {
            if cache.draw(&mut target, &f, &pal, i as f64 * 1000.0 / 60.0) {
                rendered += 1;
            }
        }
        assert_eq!(rendered, 15);
        assert_eq!(cache.renders(), 15);
    }

    #[test]
    fn test_cache_reduced_scale_fills_target() {
        let pal = Palette::for_regime(Regime::Water, 0.5);
        let mut cache = FieldCache::new(15.0, 0.5);
        let mut target = Surface::new(32, 18);
        cache.draw(&mut target, &frame(Regime::Water, false), &pal, 0.0);
        assert_eq!(cache.buffer().dims(), (16, 9));
        assert_eq!(target.pixel(1, 1), cache.buffer().pixel(0, 0));
    }

    #[test]
    fn test_invalidate_forces_render() {
        let pal = Palette::for_regime(Regime::Ice, 0.5);
        let mut cache = FieldCache::new(1.0, 1.0);
        let mut target = Surface::new(8, 8);
        let f = frame(Regime::Ice, true);
        assert!(cache.draw(&mut target, &f, &pal, 0.0));
        assert!(!cache.draw(&mut target, &f, &pal, 10.0));
        cache.invalidate();
        assert!(cache.draw(&mut target, &f, &pal, 20.0));
    }
}

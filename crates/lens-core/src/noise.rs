//! Deterministic 2D noise.
//!
//! Two lattice bases share one integer hash: gradient noise (quintic fade,
//! unit gradients from a hashed angle) and value noise (hashed lattice
//! values, cubic fade). Both return values in [0, 1]; `fbm2d` layers octaves
//! of either.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::constants::{clamp01, lerp, smoothstep};

/// Seed offset between successive fBm octaves.
pub const OCTAVE_SEED_STEP: u32 = 1013;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseBasis {
    #[default]
    Gradient,
    Value,
}

/// 32-bit lattice hash. All multiplies wrap.
fn hash2(ix: i32, iy: i32, seed: u32) -> u32 {
    let x = (ix.wrapping_mul(374_761_393) as u32)
        ^ (iy.wrapping_mul(668_265_263) as u32)
        ^ seed.wrapping_mul(1_442_695_041);
    let x = x ^ (x >> 13);
    x.wrapping_mul(1_274_126_177)
}

fn unit_hash(ix: i32, iy: i32, seed: u32) -> f64 {
    f64::from(hash2(ix, iy, seed)) / 4_294_967_296.0
}

fn grad2(ix: i32, iy: i32, seed: u32) -> (f64, f64) {
    let a = unit_hash(ix, iy, seed) * TAU;
    (a.cos(), a.sin())
}

/// Quintic smootherstep.
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lattice(x: f64, y: f64) -> (i32, i32, f64, f64) {
    let (xf, yf) = (x.floor(), y.floor());
    (xf as i32, yf as i32, x - xf, y - yf)
}

/// Single-octave gradient noise in [0, 1].
pub fn perlin2(x: f64, y: f64, seed: u32) -> f64 {
    let (x0, y0, dx0, dy0) = lattice(x, y);
    let (x1, y1) = (x0.wrapping_add(1), y0.wrapping_add(1));
    let (dx1, dy1) = (dx0 - 1.0, dy0 - 1.0);
    let (sx, sy) = (fade(dx0), fade(dy0));

    let dot = |ix, iy, dx: f64, dy: f64| {
        let (gx, gy) = grad2(ix, iy, seed);
        gx * dx + gy * dy
    };
    let n00 = dot(x0, y0, dx0, dy0);
    let n10 = dot(x1, y0, dx1, dy0);
    let n01 = dot(x0, y1, dx0, dy1);
    let n11 = dot(x1, y1, dx1, dy1);

    let v = lerp(lerp(n00, n10, sx), lerp(n01, n11, sx), sy);
    clamp01(0.5 + 0.5 * v)
}

/// Single-octave value noise in [0, 1].
pub fn value_noise2(x: f64, y: f64, seed: u32) -> f64 {
    let (x0, y0, xf, yf) = lattice(x, y);
    let (x1, y1) = (x0.wrapping_add(1), y0.wrapping_add(1));
    let (u, v) = (smoothstep(xf), smoothstep(yf));

    let a = lerp(unit_hash(x0, y0, seed), unit_hash(x1, y0, seed), u);
    let b = lerp(unit_hash(x0, y1, seed), unit_hash(x1, y1, seed), u);
    lerp(a, b, v)
}

impl NoiseBasis {
    pub fn sample(self, x: f64, y: f64, seed: u32) -> f64 {
        match self {
            NoiseBasis::Gradient => perlin2(x, y, seed),
            NoiseBasis::Value => value_noise2(x, y, seed),
        }
    }
}

/// Fractal sum of `octaves` layers: amplitude halves and frequency doubles
/// per octave, normalized back to [0, 1].
pub fn fbm2d(x: f64, y: f64, seed: u32, octaves: u32, basis: NoiseBasis) -> f64 {
    let mut amp = 0.5;
    let mut freq = 1.0;
    let mut sum = 0.0;
    let mut norm = 0.0;
    for i in 0..octaves {
        let octave_seed = seed.wrapping_add(i.wrapping_mul(OCTAVE_SEED_STEP));
        sum += amp * basis.sample(x * freq, y * freq, octave_seed);
        norm += amp;
        amp *= 0.5;
        freq *= 2.0;
    }
    sum / f64::max(1e-6, norm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash2(3, -7, 2000), hash2(3, -7, 2000));
        assert_ne!(hash2(3, -7, 2000), hash2(3, -7, 2001));
        assert_ne!(hash2(3, -7, 2000), hash2(-7, 3, 2000));
    }

    #[test]
    fn test_hash_wraps_on_large_coordinates() {
        let _ = hash2(i32::MAX, i32::MIN, u32::MAX);
        let v = perlin2(1.0e9, -1.0e9, 7);
        assert!((0.0..=1.0).contains(&v));
    }

    #[test]
    fn test_gradient_noise_is_half_on_lattice_points() {
        // every corner contribution vanishes at an integer point
        for (x, y) in [(0.0, 0.0), (4.0, -2.0), (17.0, 33.0)] {
            assert!((perlin2(x, y, 2000) - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_value_noise_interpolates_lattice() {
        let corner = unit_hash(2, 5, 99);
        assert!((value_noise2(2.0, 5.0, 99) - corner).abs() < 1e-12);
    }

    #[test]
    fn test_noise_ranges() {
        for basis in [NoiseBasis::Gradient, NoiseBasis::Value] {
            for i in 0..400 {
                let x = i as f64 * 0.173 - 20.0;
                let y = i as f64 * 0.291 - 35.0;
                let v = fbm2d(x, y, 2042, 5, basis);
                assert!((0.0..=1.0).contains(&v), "{basis:?} {v}");
            }
        }
    }

    #[test]
    fn test_noise_is_continuous() {
        let a = fbm2d(1.2345, 6.789, 2000, 5, NoiseBasis::Gradient);
        let b = fbm2d(1.2346, 6.789, 2000, 5, NoiseBasis::Gradient);
        assert!((a - b).abs() < 0.01);
    }

    #[test]
    fn test_zero_octaves() {
        assert_eq!(fbm2d(0.3, 0.4, 1, 0, NoiseBasis::Gradient), 0.0);
    }

    #[test]
    fn test_basis_serde_names() {
        let json = serde_json::to_string(&NoiseBasis::Value).unwrap();
        assert_eq!(json, "\"value\"");
        let parsed: NoiseBasis = serde_json::from_str("\"gradient\"").unwrap();
        assert_eq!(parsed, NoiseBasis::Gradient);
    }
}

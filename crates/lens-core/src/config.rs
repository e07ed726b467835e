//! Tunable parameters. Every field has a default so partial config files
//! deserialize cleanly.

use serde::{Deserialize, Serialize};

use crate::constants::{clamp, clamp01};
use crate::field::Composition;
use crate::mode::Thresholds;
use crate::noise::NoiseBasis;

pub const DEFAULT_LABEL: &str = "H.E.R";
pub const MAX_DIMENSION: usize = 4096;
const MAX_LABEL_CHARS: usize = 24;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LensParams {
    pub analysis: AnalysisParams,
    pub mode: Thresholds,
    pub animation: AnimationParams,
    pub render: RenderParams,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    /// Weight of the memory bias in the H blend, [0, 1].
    pub memory_influence: f64,
    /// Keyword graph density, [0, 1].
    pub geo_density: f64,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            memory_influence: 0.35,
            geo_density: 0.55,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationParams {
    /// Full scans of the transcript per second.
    pub scan_speed: f64,
    pub intro_rate_run: f64,
    pub intro_rate_idle: f64,
}

impl Default for AnimationParams {
    fn default() -> Self {
        Self {
            scan_speed: 0.22,
            intro_rate_run: 0.09,
            intro_rate_idle: 0.05,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    pub width: usize,
    pub height: usize,
    pub composition: Composition,
    /// Field refresh cap for cached composition, per second of frame clock.
    pub field_fps: f64,
    /// Offscreen field resolution relative to the frame, (0, 1].
    pub field_scale: f64,
    pub noise: NoiseBasis,
    pub label: String,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            composition: Composition::Cached,
            field_fps: 15.0,
            field_scale: 1.0,
            noise: NoiseBasis::Gradient,
            label: DEFAULT_LABEL.to_string(),
        }
    }
}

impl LensParams {
    /// Copy with every value forced into its legal range. Non-finite numbers
    /// fall back to the low end of the range.
    pub fn sanitized(&self) -> Self {
        let mut p = self.clone();

        p.analysis.memory_influence = clamp01(p.analysis.memory_influence);
        p.analysis.geo_density = clamp01(p.analysis.geo_density);

        let t1 = clamp01(p.mode.t1);
        let t2 = clamp01(p.mode.t2);
        p.mode = Thresholds {
            t1: t1.min(t2),
            t2: t1.max(t2),
            hys: clamp(0.0, 0.5, p.mode.hys),
        };

        p.animation.scan_speed = clamp(0.0, 10.0, p.animation.scan_speed);
        p.animation.intro_rate_run = clamp(0.0, 10.0, p.animation.intro_rate_run);
        p.animation.intro_rate_idle = clamp(0.0, 10.0, p.animation.intro_rate_idle);

        p.render.width = p.render.width.clamp(16, MAX_DIMENSION);
        p.render.height = p.render.height.clamp(16, MAX_DIMENSION);
        p.render.field_fps = clamp(0.5, 240.0, p.render.field_fps);
        p.render.field_scale = clamp(0.05, 1.0, p.render.field_scale);
        if p.render.label.chars().count() > MAX_LABEL_CHARS {
            p.render.label = p.render.label.chars().take(MAX_LABEL_CHARS).collect();
        }
        p
    }
}

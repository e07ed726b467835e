/// Default H value when a curve sample is missing.
pub const DEFAULT_H: f64 = 0.5;

/// Seed value of the S-series before any assistant turn contributes.
pub const DEFAULT_S: f64 = 0.45;

/// Largest frame delta the driver integrates, in seconds.
pub const MAX_FRAME_DT: f64 = 0.05;

/// Per-frame multiplicative decay of the breath pulse.
pub const BREATH_DECAY: f64 = 0.92;

/// Minimum keyword length (in characters) for graph and S-series keywords.
pub const MIN_KEYWORD_LEN: usize = 4;

/// Base seed of the flow field noise; offset by the memory record timestamp.
pub const FIELD_SEED_BASE: u32 = 2000;

/// Closed stop-word list shared by the S-series and the keyword graph.
pub const STOP_WORDS: [&str; 27] = [
    "the", "and", "a", "to", "of", "in", "is", "it", "that", "for", "on", "with", "as", "i",
    "you", "we", "are", "be", "or", "was", "were", "this", "at", "by", "from", "an", "not",
];

pub fn clamp01(x: f64) -> f64 {
    clamp(0.0, 1.0, x)
}

/// Clamp `x` into `[lo, hi]`. Non-finite input collapses to `lo`.
pub fn clamp(lo: f64, hi: f64, x: f64) -> f64 {
    if x.is_nan() {
        return lo;
    }
    x.max(lo).min(hi)
}

/// Cubic smoothstep on an already clamped value.
pub fn smoothstep(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp01_bounds() {
        assert_eq!(clamp01(-0.5), 0.0);
        assert_eq!(clamp01(1.5), 1.0);
        assert_eq!(clamp01(0.25), 0.25);
    }

    #[test]
    fn test_clamp_nan_collapses_low() {
        assert_eq!(clamp(-1.0, 1.0, f64::NAN), -1.0);
        assert_eq!(clamp01(f64::NAN), 0.0);
    }

    #[test]
    fn test_clamp_infinities() {
        assert_eq!(clamp01(f64::INFINITY), 1.0);
        assert_eq!(clamp01(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_smoothstep_endpoints() {
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(1.0), 1.0);
        assert!((smoothstep(0.5) - 0.5).abs() < 1e-12);
    }
}

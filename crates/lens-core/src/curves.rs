//! H-series (coherence) and S-series (effectiveness) per turn.
//!
//! Both are sequential recurrences with exponential smoothing. H blends in
//! the cross-session memory record; S only moves on assistant turns and
//! carries its value through user turns.

use std::collections::HashSet;

use crate::constants::{DEFAULT_S, clamp01};
use crate::features::FeatureVector;
use crate::memory::MemoryRecord;
use crate::tokenizer::keyword_set;
use crate::transcript::Turn;

/// Token count that maps to lenNorm = 1.
const LEN_SPAN: f64 = 120.0;
/// lenNorm at which length stability peaks.
const LEN_TARGET: f64 = 0.55;
const LEN_FALLOFF: f64 = 1.2;

const W_LEN: f64 = 0.55;
const W_DENSITY: f64 = 0.20;
const W_UPPER: f64 = 0.10;
const W_REP: f64 = 0.15;

const VOL_EX: f64 = 0.07;
const VOL_Q: f64 = 0.05;
const VOL_NEG: f64 = 0.03;
const VOL_SCALE: f64 = 0.35;
const DRIFT_SCALE: f64 = 0.18;

const H_SMOOTH_PREV: f64 = 0.75;
const S_SMOOTH_PREV: f64 = 0.80;

/// Volatility reported for fewer than two H samples.
const SINGLE_SAMPLE_VOLATILITY: f64 = 0.05;

/// H-series plus the memory record it produced.
#[derive(Clone, Debug, PartialEq)]
pub struct HCurve {
    pub series: Vec<f64>,
    pub memory: MemoryRecord,
}

/// Compute the H-series and fold it into the memory record.
///
/// The record is taken by value and returned updated; persisting it is the
/// caller's concern. `influence` is clamped to [0, 1].
pub fn compute_h_curve(
    features: &[FeatureVector],
    memory: MemoryRecord,
    influence: f64,
    now: u64,
) -> HCurve {
    let influence = clamp01(influence);
    let mem_bias = memory.h_seed();
    let mut series = Vec::with_capacity(features.len());

    let mut prev: Option<&FeatureVector> = None;
    let mut h_prev = mem_bias;

    for f in features {
        let mut h = base_coherence(f) - VOL_SCALE * volatility_penalty(f);

        if let Some(p) = prev {
            let d_len = (f.len as f64 - p.len as f64).abs() / LEN_SPAN;
            let drift = clamp01(d_len + (f.rep - p.rep).abs());
            h -= DRIFT_SCALE * drift;
        }

        h = (1.0 - influence) * h + influence * (0.65 * h_prev + 0.35 * mem_bias);
        h = H_SMOOTH_PREV * h_prev + (1.0 - H_SMOOTH_PREV) * h;

        // only the emitted sample is clamped; the recurrence keeps the raw value
        series.push(clamp01(h));
        h_prev = h;
        prev = Some(f);
    }

    let mean = if series.is_empty() {
        mem_bias
    } else {
        series.iter().sum::<f64>() / series.len() as f64
    };
    let volatility = if series.len() > 1 {
        mean_abs_diff(&series)
    } else {
        SINGLE_SAMPLE_VOLATILITY
    };

    HCurve {
        series,
        memory: memory.absorb(mean, volatility, now),
    }
}

/// Weighted base score before penalties, in [0, 1].
fn base_coherence(f: &FeatureVector) -> f64 {
    let len_norm = clamp01(f.len as f64 / LEN_SPAN);
    let len_stab = clamp01(1.0 - (len_norm - LEN_TARGET).abs() * LEN_FALLOFF);
    let density = clamp01((f.avg_word - 3.5) / 4.0);
    let upper = clamp01(f.upper_ratio * 3.5);

    W_LEN * len_stab + W_DENSITY * density + W_UPPER * (1.0 - upper) + W_REP * (1.0 - f.rep)
}

fn volatility_penalty(f: &FeatureVector) -> f64 {
    clamp01(f.ex as f64 * VOL_EX + f.q as f64 * VOL_Q + f.neg as f64 * VOL_NEG)
}

/// Mean absolute successive difference. Zero for fewer than two values.
pub fn mean_abs_diff(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let total: f64 = values.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    total / (values.len() - 1) as f64
}

/// Compute the S-series over the turns and their features.
///
/// Non-assistant turns copy the previous value forward. Extra turns or
/// features beyond the shorter of the two slices are ignored.
pub fn compute_s_curve(turns: &[Turn], features: &[FeatureVector]) -> Vec<f64> {
    let mut series = Vec::with_capacity(turns.len());
    let mut prev_set: HashSet<String> = HashSet::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut s_prev = DEFAULT_S;

    for (turn, f) in turns.iter().zip(features) {
        if !turn.is_assistant() {
            series.push(s_prev);
            continue;
        }

        let current = keyword_set(&turn.text);

        let depth = clamp01((f.len as f64 - 40.0) / 220.0);
        let clarity = clamp01((1.0 - f.rep) - 0.25 * clamp01((f.ex + f.q) as f64 / 20.0));
        let interconnection = clamp01(set_overlap(&current, &prev_set) * 1.35);
        let novelty = novelty_score(&current, &seen);

        let s = 0.35 * depth + 0.30 * interconnection + 0.20 * clarity + 0.15 * novelty;
        let s = clamp01(S_SMOOTH_PREV * s_prev + (1.0 - S_SMOOTH_PREV) * s);

        series.push(s);
        s_prev = s;
        seen.extend(current.iter().cloned());
        prev_set = current;
    }

    series
}

/// `|a ∩ b| / max(1, min(|a|, |b|))`, or 0 when either set is empty.
pub fn set_overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.iter().filter(|w| b.contains(*w)).count();
    inter as f64 / a.len().min(b.len()).max(1) as f64
}

/// Triangular score peaking when 45% of the keywords are new to the session.
fn novelty_score(current: &HashSet<String>, seen: &HashSet<String>) -> f64 {
    let raw = if current.is_empty() {
        0.0
    } else {
        let fresh = current.iter().filter(|w| !seen.contains(*w)).count();
        fresh as f64 / current.len() as f64
    };
    clamp01(1.0 - (raw - 0.45).abs() * 1.6)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::features_for_turn;
    use crate::transcript::{Role, parse_transcript};
    use approx::assert_abs_diff_eq;

    fn features(turns: &[Turn]) -> Vec<FeatureVector> {
        turns.iter().map(|t| features_for_turn(&t.text)).collect()
    }

    #[test]
    fn test_empty_h_curve_updates_memory_from_seed() {
        let memory = MemoryRecord::new(0.0, 0.1, 0);
        let curve = compute_h_curve(&[], memory, 0.35, 500);
        assert!(curve.series.is_empty());
        // mean = seed 0.5 → bias unchanged; volatility 0.05
        assert_abs_diff_eq!(curve.memory.bias, 0.0);
        assert_abs_diff_eq!(curve.memory.vol, 0.08 + 0.03, epsilon = 1e-12);
        assert_eq!(curve.memory.last, 500);
    }

    #[test]
    fn test_single_turn_value() {
        // 3 words, avg len 5: lenNorm 0.025, lenStab 1-0.525*1.2 = 0.37
        let f = features_for_turn("alpha bravo delta");
        let memory = MemoryRecord::new(0.0, 0.1, 0);
        let curve = compute_h_curve(&[f], memory, 0.0, 0);

        let density = (5.0 - 3.5) / 4.0;
        let base = 0.55 * 0.37 + 0.20 * density + 0.10 * 1.0 + 0.15 * 1.0;
        let expected = 0.75 * 0.5 + 0.25 * base;
        assert_abs_diff_eq!(curve.series[0], expected, epsilon = 1e-9);
    }

    #[test]
    fn test_recurrence_carries_unclamped_value() {
        // lenStab 0.34, no density/upper/rep credit, full punctuation penalty
        let harsh = FeatureVector {
            len: 0,
            rep: 1.0,
            ex: 20,
            avg_word: 0.0,
            upper_ratio: 1.0,
            ..FeatureVector::default()
        };
        // peak length and density; drift vs harsh is clamped to 1
        let calm = FeatureVector {
            len: 66,
            avg_word: 7.5,
            ..FeatureVector::default()
        };
        let mut features = vec![harsh; 6];
        features.push(calm);

        let memory = MemoryRecord::new(-1.0, 0.1, 0);
        let curve = compute_h_curve(&features, memory, 0.0, 0);

        let harsh_raw = 0.55 * 0.34 - 0.35;
        let calm_raw = 1.0 - 0.18;
        let mut h = 0.35;
        let mut expected = Vec::new();
        for _ in 0..6 {
            h = 0.75 * h + 0.25 * harsh_raw;
            expected.push(clamp01(h));
        }
        assert!(h < -0.05, "sequence should dip below zero: {h}");
        h = 0.75 * h + 0.25 * calm_raw;
        expected.push(clamp01(h));

        assert_eq!(curve.series.len(), expected.len());
        for (got, want) in curve.series.iter().zip(&expected) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-9);
        }
        assert_eq!(curve.series[5], 0.0);
        // restarting from a clamped 0 would give 0.25 * calm_raw
        assert!(0.25 * calm_raw - curve.series[6] > 0.04);
    }

    #[test]
    fn test_full_influence_pins_to_memory() {
        let turns = parse_transcript("User: hey!!!\nAssistant: no no no never?\nUser: WHAT?!");
        let memory = MemoryRecord::new(0.0, 0.1, 0);
        let curve = compute_h_curve(&features(&turns), memory, 1.0, 0);
        for h in &curve.series {
            assert_abs_diff_eq!(*h, 0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_h_curve_bounded_and_memory_bounded() {
        let turns = parse_transcript(
            "User: WHY?!?! NO NO NO NO NO NO NO NO\n\
             Assistant: ok\n\
             User: this this this this this this this this this this\n\
             Assistant: Absolutely understandable considerations regarding architecture.",
        );
        let mut memory = MemoryRecord::new(-1.0, 1.0, 0);
        for round in 0..20 {
            let curve = compute_h_curve(&features(&turns), memory, 0.35, round);
            assert!(curve.series.iter().all(|h| (0.0..=1.0).contains(h)));
            memory = curve.memory;
            assert!((-1.0..=1.0).contains(&memory.bias));
            assert!((0.0..=1.0).contains(&memory.vol));
        }
    }

    #[test]
    fn test_s_curve_copies_through_user_turns() {
        let turns = vec![
            Turn::new(Role::User, "first question here"),
            Turn::new(Role::User, "second question here"),
        ];
        let s = compute_s_curve(&turns, &features(&turns));
        assert_eq!(s, vec![DEFAULT_S, DEFAULT_S]);
    }

    #[test]
    fn test_s_curve_assistant_moves_value() {
        let turns = parse_transcript("User: Hello there\n\nAssistant: Hi! How can I help you today?");
        let s = compute_s_curve(&turns, &features(&turns));
        assert_eq!(s.len(), 2);
        assert_eq!(s[0], DEFAULT_S);
        // keywords {help, today}: all new → novelty 1-0.55*1.6 = 0.12
        // depth 0, interconnection 0, clarity 1 - 0.25*(2/20) = 0.975
        let raw = 0.20 * 0.975 + 0.15 * 0.12;
        assert_abs_diff_eq!(s[1], 0.8 * DEFAULT_S + 0.2 * raw, epsilon = 1e-9);
        assert_ne!(s[1], DEFAULT_S);

        let h = compute_h_curve(&features(&turns), MemoryRecord::new(0.0, 0.1, 0), 0.35, 0);
        assert_eq!(h.series.len(), 2);
        assert!(h.series.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_s_curve_interconnection_rewards_overlap() {
        let shared = "Assistant: architecture layout rendering pipeline\n";
        let linked = format!("{shared}{shared}");
        let unrelated = format!("{shared}Assistant: gardening tomatoes watering schedule\n");

        let a = parse_transcript(&linked);
        let b = parse_transcript(&unrelated);
        let sa = compute_s_curve(&a, &features(&a));
        let sb = compute_s_curve(&b, &features(&b));
        assert!(sa[1] > sb[1], "overlap {} vs none {}", sa[1], sb[1]);
    }

    #[test]
    fn test_mismatched_lengths_use_shorter() {
        let turns = vec![Turn::new(Role::Assistant, "words here")];
        assert!(compute_s_curve(&turns, &[]).is_empty());
    }

    #[test]
    fn test_set_overlap_guards_empty() {
        let a: HashSet<String> = ["x".to_string()].into_iter().collect();
        let empty = HashSet::new();
        assert_eq!(set_overlap(&a, &empty), 0.0);
        assert_eq!(set_overlap(&empty, &a), 0.0);
        assert_eq!(set_overlap(&a, &a), 1.0);
    }

    #[test]
    fn test_mean_abs_diff() {
        assert_eq!(mean_abs_diff(&[]), 0.0);
        assert_eq!(mean_abs_diff(&[0.3]), 0.0);
        assert_abs_diff_eq!(mean_abs_diff(&[0.0, 1.0, 0.5]), 0.75);
    }
}

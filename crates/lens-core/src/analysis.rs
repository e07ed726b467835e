//! One complete analysis of a transcript.
//!
//! Turns, features, both curves and the keyword graph are produced together
//! and replaced together; nothing observes a half-updated analysis.

use rand::Rng;
use serde::Serialize;

use crate::config::AnalysisParams;
use crate::constants::{DEFAULT_H, DEFAULT_S, clamp01};
use crate::curves::{compute_h_curve, compute_s_curve};
use crate::features::{FeatureVector, features_for_turn};
use crate::graph::KeywordGraph;
use crate::memory::MemoryRecord;
use crate::mode::{ModeMachine, Regime, Thresholds};
use crate::transcript::Turn;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Analysis {
    pub turns: Vec<Turn>,
    pub features: Vec<FeatureVector>,
    pub h_series: Vec<f64>,
    pub s_series: Vec<f64>,
    pub graph: KeywordGraph,
}

/// Curve values interpolated at a fractional scan position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurveSample {
    pub i0: usize,
    pub i1: usize,
    pub frac: f64,
    pub h: f64,
    pub s: f64,
}

impl Analysis {
    /// Analyze `turns` against `memory`. Returns the analysis and the
    /// updated memory record; the input record is not modified.
    pub fn run(
        turns: Vec<Turn>,
        memory: MemoryRecord,
        params: &AnalysisParams,
        canvas: (f64, f64),
        rng: &mut impl Rng,
        now: u64,
    ) -> (Self, MemoryRecord) {
        let features: Vec<FeatureVector> = turns.iter().map(|t| features_for_turn(&t.text)).collect();
        let h = compute_h_curve(&features, memory, params.memory_influence, now);
        let s_series = compute_s_curve(&turns, &features);
        let graph = KeywordGraph::build(&turns, params.geo_density, canvas.0, canvas.1, rng);

        let analysis = Self {
            turns,
            features,
            h_series: h.series,
            s_series,
            graph,
        };
        (analysis, h.memory)
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    /// Interpolate H and S at `scan ∈ [0, n-1]`. Missing samples fall back
    /// to the curve seeds, so a short or empty series never panics.
    pub fn sample(&self, scan: f64) -> CurveSample {
        let n = self.turns.len();
        let last = n.saturating_sub(1);
        let scan = if scan.is_finite() { scan.clamp(0.0, last as f64) } else { 0.0 };
        let i0 = (scan.floor() as usize).min(last);
        let i1 = (i0 + 1).min(last);
        let frac = clamp01(scan - i0 as f64);

        let h0 = self.h_series.get(i0).copied().unwrap_or(DEFAULT_H);
        let h1 = self.h_series.get(i1).copied().unwrap_or(h0);
        let s0 = self.s_series.get(i0).copied().unwrap_or(DEFAULT_S);
        let s1 = self.s_series.get(i1).copied().unwrap_or(s0);

        CurveSample {
            i0,
            i1,
            frac,
            h: h0 + (h1 - h0) * frac,
            s: s0 + (s1 - s0) * frac,
        }
    }

    /// Regime after each turn when the H-series is fed to a fresh machine.
    pub fn regimes(&self, thresholds: &Thresholds) -> Vec<Regime> {
        let mut machine = ModeMachine::new();
        self.h_series.iter().map(|&h| machine.update(h, thresholds)).collect()
    }
}

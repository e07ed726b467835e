//! Hysteretic regime classifier driven by instantaneous H.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Visual regime. Lookup tables below are indexed by variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Regime {
    Ice,
    Water,
    Aurora,
}

/// Flow-field shape parameters of a regime.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldStyle {
    pub speed: f64,
    pub scale: f64,
    pub bands: f64,
    pub sharp: f64,
}

const FIELD_STYLES: [FieldStyle; 3] = [
    FieldStyle { speed: 0.06, scale: 0.020, bands: 0.85, sharp: 1.8 },
    FieldStyle { speed: 0.12, scale: 0.016, bands: 1.05, sharp: 1.1 },
    FieldStyle { speed: 0.18, scale: 0.013, bands: 1.35, sharp: 0.8 },
];

/// Idle rendering freezes the ICE field into a fine, hard-edged shimmer.
pub const IDLE_FIELD_STYLE: FieldStyle = FieldStyle {
    speed: 0.02,
    scale: 0.03,
    bands: 0.85,
    sharp: 1.85,
};

const GLOW_RADII: [f64; 3] = [8.0, 12.0, 18.0];

impl Regime {
    pub const ALL: [Regime; 3] = [Regime::Ice, Regime::Water, Regime::Aurora];

    pub fn index(self) -> usize {
        match self {
            Regime::Ice => 0,
            Regime::Water => 1,
            Regime::Aurora => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Regime::Ice => "ICE",
            Regime::Water => "WATER",
            Regime::Aurora => "AURORA",
        }
    }

    pub fn field_style(self) -> FieldStyle {
        FIELD_STYLES[self.index()]
    }

    pub fn glow_radius(self) -> f64 {
        GLOW_RADII[self.index()]
    }

    /// Direct two-threshold classification with no hysteresis.
    pub fn classify(h: f64, thresholds: &Thresholds) -> Self {
        if h < thresholds.t1 {
            Regime::Ice
        } else if h < thresholds.t2 {
            Regime::Water
        } else {
            Regime::Aurora
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the driver is showing: the idle void or one of the regimes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Idle,
    Run(Regime),
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Idle => "IDLE",
            Mode::Run(r) => r.label(),
        }
    }

    pub fn regime(self) -> Option<Regime> {
        match self {
            Mode::Idle => None,
            Mode::Run(r) => Some(r),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classification thresholds: `t1 < t2` with a hysteresis half-band `hys`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub t1: f64,
    pub t2: f64,
    pub hys: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            t1: 0.38,
            t2: 0.68,
            hys: 0.06,
        }
    }
}

/// Regime state machine. `None` is the unset state before the first sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModeMachine {
    state: Option<Regime>,
}

impl ModeMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Regime> {
        self.state
    }

    /// -1 while unset, otherwise the regime index.
    pub fn raw_index(&self) -> i32 {
        self.state.map_or(-1, |r| r.index() as i32)
    }

    pub fn reset(&mut self) {
        self.state = None;
    }

    pub fn force(&mut self, regime: Regime) {
        self.state = Some(regime);
    }

    /// Feed one H sample and return the resulting regime.
    ///
    /// Leaving a regime requires crossing its threshold by at least `hys`.
    pub fn update(&mut self, h: f64, th: &Thresholds) -> Regime {
        let next = match self.state {
            None => Regime::classify(h, th),
            Some(Regime::Ice) => {
                if h > th.t1 + th.hys {
                    if h >= th.t2 { Regime::Aurora } else { Regime::Water }
                } else {
                    Regime::Ice
                }
            }
            Some(Regime::Water) => {
                if h < th.t1 - th.hys {
                    Regime::Ice
                } else if h > th.t2 + th.hys {
                    Regime::Aurora
                } else {
                    Regime::Water
                }
            }
            Some(Regime::Aurora) => {
                if h < th.t2 - th.hys {
                    if h <= th.t1 { Regime::Ice } else { Regime::Water }
                } else {
                    Regime::Aurora
                }
            }
        };
        self.state = Some(next);
        next
    }
}

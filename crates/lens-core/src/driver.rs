//! Animation driver: owns the frame surface and advances the lens one
//! tick at a time from an external monotonic clock.

use rand::Rng;
use serde::Serialize;

use crate::analysis::Analysis;
use crate::config::LensParams;
use crate::constants::{BREATH_DECAY, MAX_FRAME_DT, clamp, clamp01};
use crate::field::{Composition, FieldCache, FieldFrame, field_seed, render_field};
use crate::layout::{stability_for, step_layout};
use crate::memory::MemoryRecord;
use crate::mode::{Mode, ModeMachine, Regime};
use crate::overlay::{draw_center_mark, draw_graph, draw_idle_veil, draw_timeline};
use crate::palette::{Color, Palette};
use crate::surface::Surface;
use crate::transcript::{Turn, TurnInput, parse_transcript, turns_to_transcript};

const FIELD_MUTE: f64 = 0.75;
const GEO_BOOST: f64 = 1.20;
const LOCK_FIELD: f64 = 0.55;
const LOCK_GEO: f64 = 0.85;

/// Time envelopes carried from tick to tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct AnimationState {
    /// Seconds of integrated frame time since the last load.
    pub elapsed: f64,
    /// Fade-in envelope, [0, 1].
    pub intro: f64,
    /// Pulse set to 1 on each new scanned turn, decaying per tick.
    pub breath: f64,
    pub last_scan_index: Option<usize>,
    pub last_timestamp: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GraphCounts {
    pub nodes: usize,
    pub edges: usize,
}

/// What one tick produced.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FrameInfo {
    pub mode: Mode,
    pub h: f64,
    pub s: f64,
    /// Fractional turn position, absent while idle.
    pub scan: Option<f64>,
    pub field_strength: f64,
    pub geo_strength: f64,
    pub elapsed: f64,
    pub intro: f64,
    pub breath: f64,
    pub field_rendered: bool,
}

/// Field and geometry strengths for a frame.
pub fn strengths(h: f64, s: f64, intro: f64, breath: f64, locked: bool) -> (f64, f64) {
    let field = f64::max(0.12, intro * (0.10 + 0.55 * h) * (0.85 + 0.25 * breath)) * FIELD_MUTE;
    let geo = f64::min(1.0, f64::max(0.10, intro * (0.18 + 0.78 * s)) * GEO_BOOST);
    if locked {
        (field * LOCK_FIELD, f64::min(1.0, geo * LOCK_GEO))
    } else {
        (field, geo)
    }
}

pub struct AnimationDriver {
    params: LensParams,
    surface: Surface,
    cache: FieldCache,
    analysis: Analysis,
    machine: ModeMachine,
    memory: MemoryRecord,
    state: AnimationState,
    mode: Mode,
    locked: bool,
}

impl AnimationDriver {
    /// New driver in idle mode. `params` are sanitized on entry.
    pub fn new(params: &LensParams, memory: MemoryRecord) -> Self {
        let params = params.sanitized();
        let render = &params.render;
        Self {
            surface: Surface::new(render.width, render.height),
            cache: FieldCache::new(render.field_fps, render.field_scale),
            analysis: Analysis::default(),
            machine: ModeMachine::new(),
            memory,
            state: AnimationState::default(),
            mode: Mode::Idle,
            locked: false,
            params,
        }
    }

    /// Parse and analyze raw transcript text. Returns the updated memory
    /// record for the caller to persist.
    pub fn load_transcript(&mut self, text: &str, rng: &mut impl Rng, now: u64) -> MemoryRecord {
        self.install(parse_transcript(text), false, rng, now)
    }

    /// Analyze a turn list. Missing roles alternate starting from the user.
    /// With `reset` the state machine restarts in ICE.
    pub fn load_turns(&mut self, turns: &[TurnInput], reset: bool, rng: &mut impl Rng, now: u64) -> MemoryRecord {
        let text = turns_to_transcript(turns);
        self.install(parse_transcript(&text), reset, rng, now)
    }

    fn install(&mut self, turns: Vec<Turn>, reset: bool, rng: &mut impl Rng, now: u64) -> MemoryRecord {
        let canvas = (self.surface.width as f64, self.surface.height as f64);
        let (analysis, memory) = Analysis::run(turns, self.memory, &self.params.analysis, canvas, rng, now);
        self.analysis = analysis;
        self.memory = memory;
        self.reset_envelopes();
        self.cache.invalidate();

        if self.analysis.is_empty() {
            self.machine.reset();
            self.mode = Mode::Idle;
        } else {
            if reset {
                self.machine.force(Regime::Ice);
            }
            self.mode = Mode::Run(self.machine.current().unwrap_or(Regime::Ice));
        }
        self.memory
    }

    /// Drop the transcript and return to the idle void. The memory record
    /// is kept.
    pub fn enter_idle(&mut self) {
        self.analysis = Analysis::default();
        self.machine.reset();
        self.reset_envelopes();
        self.cache.invalidate();
        self.mode = Mode::Idle;
    }

    fn reset_envelopes(&mut self) {
        self.state = AnimationState {
            last_timestamp: self.state.last_timestamp,
            ..AnimationState::default()
        };
    }

    /// Advance to frame-clock time `timestamp_ms` and render the frame.
    pub fn tick(&mut self, timestamp_ms: f64) -> FrameInfo {
        let dt = match self.state.last_timestamp {
            Some(last) => clamp(0.0, MAX_FRAME_DT, (timestamp_ms - last) / 1000.0),
            None => 0.0,
        };
        self.state.last_timestamp = Some(timestamp_ms);
        self.state.elapsed += dt;

        let anim = self.params.animation;
        let rate = if self.analysis.is_empty() {
            anim.intro_rate_idle
        } else {
            anim.intro_rate_run
        };
        self.state.intro = clamp01(self.state.intro + dt * rate);
        self.state.breath *= BREATH_DECAY;

        if self.analysis.is_empty() {
            self.tick_idle(timestamp_ms)
        } else {
            self.tick_run(timestamp_ms)
        }
    }

    fn tick_idle(&mut self, now_ms: f64) -> FrameInfo {
        let t = self.state.elapsed;
        let pulse = 0.5 + 0.5 * t.sin();
        let h = clamp01(0.42 + self.memory.bias * 0.05 + (pulse - 0.5) * 0.05);
        let s = clamp01(0.42 + (pulse - 0.5) * 0.03);
        self.mode = Mode::Idle;
        self.draw(now_ms, h, s, Regime::Ice, None)
    }

    fn tick_run(&mut self, now_ms: f64) -> FrameInfo {
        let t = self.state.elapsed;
        let n = self.analysis.turn_count();
        let x = (t * self.params.animation.scan_speed).rem_euclid(1.0);
        let scan = x * n.saturating_sub(1) as f64;

        let sample = self.analysis.sample(scan);
        if self.state.last_scan_index != Some(sample.i0) {
            self.state.breath = 1.0;
            self.state.last_scan_index = Some(sample.i0);
        }

        let regime = self.machine.update(sample.h, &self.params.mode);
        self.mode = Mode::Run(regime);
        self.draw(now_ms, sample.h, sample.s, regime, Some(scan))
    }

    fn draw(&mut self, now_ms: f64, h: f64, s: f64, regime: Regime, scan: Option<f64>) -> FrameInfo {
        let AnimationState { elapsed: t, intro, breath, .. } = self.state;
        let idle = self.analysis.is_empty();
        let (width, height) = (self.surface.width as f64, self.surface.height as f64);

        self.surface.fill(Color::BLACK);
        let palette = Palette::for_regime(regime, h);
        let (field, geo) = strengths(h, s, intro, breath, self.locked);

        let frame = FieldFrame {
            regime,
            idle,
            h,
            strength: field,
            time: t,
            seed: field_seed(&self.memory),
            basis: self.params.render.noise,
        };
        let field_rendered = match self.params.render.composition {
            Composition::Direct => {
                let full_width = self.surface.width;
                render_field(&mut self.surface, &frame, &palette, full_width);
                true
            }
            Composition::Cached => self.cache.draw(&mut self.surface, &frame, &palette, now_ms),
        };

        if idle {
            draw_idle_veil(&mut self.surface, t);
        }

        let graph = &mut self.analysis.graph;
        if !graph.is_empty() {
            step_layout(graph, stability_for(s, intro), t, width, height);
            draw_graph(&mut self.surface, graph, &palette, h, s, geo);
        }

        draw_center_mark(&mut self.surface, &self.params.render.label, regime, &palette, t, geo, breath);

        if let Some(scan) = scan {
            let progress = scan / f64::max(1.0, self.analysis.turn_count().saturating_sub(1) as f64);
            draw_timeline(&mut self.surface, progress, &palette, field, self.locked);
        }

        FrameInfo {
            mode: self.mode,
            h,
            s,
            scan,
            field_strength: field,
            geo_strength: geo,
            elapsed: t,
            intro,
            breath,
            field_rendered,
        }
    }

    pub fn graph_counts(&self) -> GraphCounts {
        GraphCounts {
            nodes: self.analysis.graph.node_count(),
            edges: self.analysis.graph.edge_count(),
        }
    }

    /// Cosmetic pause look: mutes the field and softens geometry.
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    pub fn memory(&self) -> MemoryRecord {
        self.memory
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Raw state machine index: -1 unset, else 0 ICE, 1 WATER, 2 AURORA.
    pub fn raw_state(&self) -> i32 {
        self.machine.raw_index()
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    pub fn params(&self) -> &LensParams {
        &self.params
    }

    pub fn field_renders(&self) -> u64 {
        self.cache.renders()
    }
}

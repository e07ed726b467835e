//! Resonance lens engine.
//!
//! Turns a conversational transcript into two per-turn curves (H for
//! coherence, S for effectiveness), a hysteretic ICE/WATER/AURORA regime and
//! a force-directed keyword graph, then renders them over a procedural
//! noise field one frame at a time.
//!
//! Zero I/O. The caller supplies the clock, the random source for graph
//! placement, and persistence of the memory record.

pub mod analysis;
pub mod config;
pub mod constants;
pub mod curves;
pub mod driver;
pub mod features;
pub mod field;
pub mod graph;
pub mod layout;
pub mod memory;
pub mod mode;
pub mod noise;
pub mod overlay;
pub mod palette;
pub mod surface;
pub mod time;
pub mod tokenizer;
pub mod transcript;

pub use analysis::{Analysis, CurveSample};
pub use config::{AnalysisParams, AnimationParams, LensParams, RenderParams};
pub use constants::{DEFAULT_H, DEFAULT_S, clamp01};
pub use curves::{HCurve, compute_h_curve, compute_s_curve};
pub use driver::{AnimationDriver, AnimationState, FrameInfo, GraphCounts};
pub use features::{FeatureVector, features_for_turn};
pub use field::{Composition, FieldCache, FieldFrame, field_seed, render_field};
pub use graph::{GraphEdge, GraphNode, KeywordGraph};
pub use layout::{stability_for, step_layout};
pub use memory::MemoryRecord;
pub use mode::{Mode, ModeMachine, Regime, Thresholds};
pub use noise::{NoiseBasis, fbm2d};
pub use palette::{Color, Palette};
pub use surface::{Blend, Surface};
pub use tokenizer::tokenize;
pub use transcript::{Role, Turn, TurnInput, parse_transcript, render_transcript, turns_to_transcript};

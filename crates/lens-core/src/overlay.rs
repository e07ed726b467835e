//! Everything drawn on top of the field: keyword graph, centre label,
//! timeline marker and the idle veil.

use crate::constants::{clamp01, smoothstep};
use crate::graph::KeywordGraph;
use crate::mode::Regime;
use crate::palette::{Color, Palette};
use crate::surface::{Blend, Surface};

const SCALE_MIN: f64 = 0.92;
const SCALE_MAX: f64 = 1.08;
const IDLE_DARKEN: f64 = 0.41;
const LABEL_COLOR: Color = Color::new(229.0 / 255.0, 231.0 / 255.0, 235.0 / 255.0);
const HALO_ALPHA: f64 = 0.65;
const TIMELINE_INSET: f64 = 14.0;
const TIMELINE_BOTTOM: f64 = 18.0;
const TIMELINE_HEIGHT: f64 = 6.0;

/// Graph zoom about `(W/2, 0.55H)`: grows with H, nudged by S.
pub fn geo_scale(h: f64, s: f64) -> f64 {
    let s_mod = 1.0 + (clamp01(s) - 0.5) * 0.02;
    (SCALE_MIN + (SCALE_MAX - SCALE_MIN) * smoothstep(clamp01(h))) * s_mod
}

/// Screen-blend edges then node discs, scaled by `geo_scale(h, s)`.
pub fn draw_graph(surface: &mut Surface, graph: &KeywordGraph, palette: &Palette, h: f64, s: f64, strength: f64) {
    if graph.is_empty() {
        return;
    }
    let (cx, cy) = (surface.width as f64 * 0.5, surface.height as f64 * 0.55);
    let k = geo_scale(h, s);
    let project = |x: f64, y: f64| (cx + (x - cx) * k, cy + (y - cy) * k);

    let edge_alpha = clamp01((0.18 + 0.70 * s) * strength);
    let node_alpha = clamp01((0.10 + 0.55 * s) * strength);
    let line_width = (1.1 + 2.8 * s) * k;

    for edge in &graph.edges {
        let Some((a, b)) = graph.endpoints(edge) else {
            continue;
        };
        surface.draw_line(
            project(a.x, a.y),
            project(b.x, b.y),
            line_width,
            palette.edge,
            edge_alpha,
            Blend::Screen,
        );
    }

    for node in &graph.nodes {
        let r = (2.8 + f64::min(9.0, node.weight * 0.5)) * (0.9 + 0.6 * s) * k;
        let (x, y) = project(node.x, node.y);
        surface.fill_circle(x, y, r, palette.node, node_alpha, Blend::Screen);
    }
}

/// Glyph scale for the centre label at a surface height.
pub fn label_scale(height: usize) -> usize {
    (height / 60).max(1)
}

/// Centre label with a regime-sized glow halo that pulses at 1.7 rad/s and
/// swells with the breath envelope.
pub fn draw_center_mark(
    surface: &mut Surface,
    label: &str,
    regime: Regime,
    palette: &Palette,
    time: f64,
    strength: f64,
    breath: f64,
) {
    let (cx, cy) = (surface.width as f64 * 0.5, surface.height as f64 * 0.5);
    let pulse = 0.6 + 0.4 * (time * 1.7).sin();
    let scale = label_scale(surface.height);

    surface.draw_text_centered(
        cx,
        cy,
        label,
        scale,
        Color::WHITE,
        clamp01(0.55 + 0.35 * strength),
        Blend::Over,
    );

    let halo = (regime.glow_radius() + pulse * 10.0) * (0.6 + 0.9 * strength) * (0.85 + 0.25 * breath);
    surface.glow(cx, cy, halo, palette.node, HALO_ALPHA * clamp01(strength));

    surface.draw_text_centered(
        cx,
        cy,
        label,
        scale,
        LABEL_COLOR,
        clamp01((0.25 + pulse * 0.35) * strength),
        Blend::Screen,
    );
}

/// Scan progress bar along the bottom edge.
pub fn draw_timeline(surface: &mut Surface, progress: f64, palette: &Palette, strength: f64, locked: bool) {
    let (w, h) = (surface.width as f64, surface.height as f64);
    let x = TIMELINE_INSET;
    let y = h - TIMELINE_BOTTOM;
    let track = w - 2.0 * TIMELINE_INSET;
    if track <= 0.0 || y < 0.0 {
        return;
    }
    surface.fill_rect(x, y, x + track, y + TIMELINE_HEIGHT, Color::WHITE, 0.10, Blend::Screen);

    let a = clamp01(0.25 + 0.6 * strength);
    let alpha = if locked { a * 0.35 } else { a };
    let fill = f64::max(2.0, track * clamp01(progress));
    surface.fill_rect(x, y, x + fill, y + TIMELINE_HEIGHT, palette.node, alpha, Blend::Screen);
}

/// Idle only: darken the field, then lay a faint white heartbeat over it.
pub fn draw_idle_veil(surface: &mut Surface, time: f64) {
    surface.darken(IDLE_DARKEN);
    let pulse = 0.5 + 0.5 * (time * 1.6).sin();
    let (w, h) = (surface.width as f64, surface.height as f64);
    surface.fill_rect(0.0, 0.0, w, h, Color::WHITE, 0.02 + pulse * 0.03, Blend::Screen);
}

//! Force-directed layout: one explicit Euler step per frame.

use crate::constants::{clamp, clamp01};
use crate::graph::KeywordGraph;

const CENTER_PULL_X: f64 = 0.00035;
const CENTER_PULL_Y: f64 = 0.00030;
const JITTER: f64 = 0.002;
const REPULSION: f64 = 18.0;
const SPRING_K: f64 = 0.0026;
const VELOCITY_DAMPING: f64 = 0.86;
const MARGIN: f64 = 40.0;

/// Layout stability from the current S sample and the intro envelope.
pub fn stability_for(s: f64, intro: f64) -> f64 {
    clamp01(0.15 + 0.85 * s) * (0.75 + 0.25 * clamp01(intro))
}

/// Rest length of an edge with co-occurrence weight `w`.
pub fn rest_length(weight: u32) -> f64 {
    85.0 + 40.0 / f64::from(weight.max(1))
}

/// Advance every node by one step.
///
/// High stability pulls nodes toward `(W/2, 0.55H)` and tightens springs;
/// low stability loosens springs and adds a time-varying drift.
pub fn step_layout(graph: &mut KeywordGraph, stability: f64, time: f64, width: f64, height: f64) {
    let stability = clamp01(stability);
    let loose = 1.0 - stability;
    let (cx, cy) = (width * 0.5, height * 0.55);
    let n = graph.nodes.len();

    for i in 0..n {
        let phase = i as f64;
        {
            let a = &mut graph.nodes[i];
            a.vx += (cx - a.x) * CENTER_PULL_X * stability;
            a.vy += (cy - a.y) * CENTER_PULL_Y * stability;
            a.vx += (time * 0.6 + phase).sin() * JITTER * loose;
            a.vy += (time * 0.7 + phase).cos() * JITTER * loose;
        }
        for j in (i + 1)..n {
            let (head, tail) = graph.nodes.split_at_mut(j);
            let (a, b) = (&mut head[i], &mut tail[0]);
            let dx = a.x - b.x;
            let dy = a.y - b.y;
            let rep = REPULSION / (dx * dx + dy * dy + 1.0) * (0.6 + 0.9 * loose);
            a.vx += dx * rep;
            a.vy += dy * rep;
            b.vx -= dx * rep;
            b.vy -= dy * rep;
        }
    }

    let k = SPRING_K * stability;
    for edge in &graph.edges {
        let (ia, ib) = (edge.a, edge.b);
        if ia >= n || ib >= n || ia == ib {
            continue;
        }
        let dx = graph.nodes[ib].x - graph.nodes[ia].x;
        let dy = graph.nodes[ib].y - graph.nodes[ia].y;
        let dist = (dx * dx + dy * dy).sqrt() + 0.0001;
        let f = (dist - rest_length(edge.weight)) * k;
        let fx = dx / dist * f;
        let fy = dy / dist * f;
        graph.nodes[ia].vx += fx;
        graph.nodes[ia].vy += fy;
        graph.nodes[ib].vx -= fx;
        graph.nodes[ib].vy -= fy;
    }

    for node in &mut graph.nodes {
        node.vx *= VELOCITY_DAMPING;
        node.vy *= VELOCITY_DAMPING;
        node.x = clamp(MARGIN, width - MARGIN, node.x + node.vx);
        node.y = clamp(MARGIN, height - MARGIN, node.y + node.vy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphEdge, GraphNode};

    fn node(id: &str, x: f64, y: f64) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            weight: 1.0,
        }
    }

    fn distance(g: &KeywordGraph) -> f64 {
        let (a, b) = (&g.nodes[0], &g.nodes[1]);
        ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
    }

    #[test]
    fn test_stability_range() {
        assert!((stability_for(0.0, 0.0) - 0.15 * 0.75).abs() < 1e-12);
        assert!((stability_for(1.0, 1.0) - 1.0).abs() < 1e-12);
        assert!((stability_for(0.45, 0.5) - 0.5325 * 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_rest_length() {
        assert_eq!(rest_length(1), 125.0);
        assert_eq!(rest_length(0), 125.0);
        assert_eq!(rest_length(4), 95.0);
    }

    /// Net inward force on one node of a symmetric pair at separation `d`
    /// under full stability: centring plus spring minus repulsion.
    fn pair_force(d: f64) -> f64 {
        0.5 * d * CENTER_PULL_X + (d - rest_length(1)) * SPRING_K - REPULSION * 0.6 * d / (d * d + 1.0)
    }

    fn pair_equilibrium() -> f64 {
        let (mut lo, mut hi) = (100.0, 200.0);
        for _ in 0..60 {
            let mid = 0.5 * (lo + hi);
            if pair_force(mid) > 0.0 {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        0.5 * (lo + hi)
    }

    #[test]
    fn test_converges_to_force_balance() {
        let mut g = KeywordGraph {
            nodes: vec![node("alpha", 330.0, 330.0), node("bravo", 470.0, 330.0)],
            edges: vec![GraphEdge { a: 0, b: 1, weight: 1 }],
        };
        let mut tail = Vec::new();
        for step in 0..2000 {
            step_layout(&mut g, 1.0, step as f64 / 60.0, 800.0, 600.0);
            if step >= 1900 {
                tail.push(distance(&g));
            }
        }
        let d = distance(&g);
        let eq = pair_equilibrium();
        assert!(eq > rest_length(1), "repulsion stretches the spring: {eq}");
        assert!((d - eq).abs() < 1.0, "separation {d}, equilibrium {eq}");

        let (min, max) = tail
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        assert!(max - min < 1e-3, "separation still drifting: {min}..{max}");
        let speed: f64 = g.nodes.iter().map(|n| n.vx.abs() + n.vy.abs()).sum();
        assert!(speed < 1e-3, "still moving: {speed}");
    }

    #[test]
    fn test_positions_stay_inside_margin() {
        let mut g = KeywordGraph {
            nodes: vec![node("alpha", 400.0, 300.0), node("bravo", 400.5, 300.0)],
            edges: vec![],
        };
        for step in 0..500 {
            step_layout(&mut g, 0.0, step as f64 / 60.0, 800.0, 600.0);
            for n in &g.nodes {
                assert!((40.0..=760.0).contains(&n.x));
                assert!((40.0..=560.0).contains(&n.y));
            }
        }
    }

    #[test]
    fn test_out_of_range_edges_skipped() {
        let mut g = KeywordGraph {
            nodes: vec![node("alpha", 300.0, 300.0)],
            edges: vec![GraphEdge { a: 0, b: 7, weight: 2 }],
        };
        step_layout(&mut g, 0.8, 0.0, 800.0, 600.0);
        assert!(g.nodes[0].x.is_finite());
    }

    #[test]
    fn test_empty_graph_is_noop() {
        let mut g = KeywordGraph::default();
        step_layout(&mut g, 0.5, 1.0, 800.0, 600.0);
        assert!(g.is_empty());
    }
}

//! Keyword co-occurrence graph.
//!
//! Nodes live in an arena addressed by index; edges are index pairs. The
//! topology is fixed once built, only node positions and velocities change.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::clamp01;
use crate::tokenizer::{is_keyword, tokenize};
use crate::transcript::Turn;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub weight: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub a: usize,
    pub b: usize,
    pub weight: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Node cap for a density in [0, 1]: `floor(10 + 20 density)`.
pub fn node_budget(density: f64) -> usize {
    (10.0 + clamp01(density) * 20.0).floor() as usize
}

/// Edge cap for a density in [0, 1]: `floor(12 + 28 density)`.
pub fn edge_budget(density: f64) -> usize {
    (12.0 + clamp01(density) * 28.0).floor() as usize
}

impl KeywordGraph {
    /// Build the graph for `turns` on a `width × height` canvas.
    ///
    /// Terms are ranked by frequency (ties keep first-seen order). Initial
    /// node placement draws from `rng` and is the only non-deterministic
    /// step; pass a seeded generator for reproducible layouts.
    pub fn build(
        turns: &[Turn],
        density: f64,
        width: f64,
        height: f64,
        rng: &mut impl Rng,
    ) -> Self {
        let turn_keywords: Vec<Vec<String>> = turns
            .iter()
            .map(|t| tokenize(&t.text).into_iter().filter(|w| is_keyword(w)).collect())
            .collect();

        let mut ranked: Vec<(String, usize)> = Vec::new();
        let mut slot: HashMap<String, usize> = HashMap::new();
        for word in turn_keywords.iter().flatten() {
            match slot.get(word) {
                Some(&i) => ranked[i].1 += 1,
                None => {
                    slot.insert(word.clone(), ranked.len());
                    ranked.push((word.clone(), 1));
                }
            }
        }
        // stable: equal counts keep first-seen order
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(node_budget(density));

        let nodes: Vec<GraphNode> = ranked
            .iter()
            .map(|(word, freq)| GraphNode {
                id: word.clone(),
                x: width * 0.5 + (rng.random::<f64>() - 0.5) * width * 0.25,
                y: height * 0.5 + (rng.random::<f64>() - 0.5) * height * 0.25,
                vx: 0.0,
                vy: 0.0,
                weight: 1.0 + *freq as f64 * 0.25,
            })
            .collect();

        let index: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        let mut pairs: Vec<((usize, usize), u32)> = Vec::new();
        let mut pair_slot: HashMap<(usize, usize), usize> = HashMap::new();
        for words in &turn_keywords {
            let mut present: Vec<&str> = Vec::new();
            for w in words {
                if index.contains_key(w.as_str()) && !present.contains(&w.as_str()) {
                    present.push(w.as_str());
                }
            }
            for i in 0..present.len() {
                for j in (i + 1)..present.len() {
                    let (lo, hi) = if present[i] < present[j] {
                        (present[i], present[j])
                    } else {
                        (present[j], present[i])
                    };
                    let key = (index[lo], index[hi]);
                    match pair_slot.get(&key) {
                        Some(&k) => pairs[k].1 += 1,
                        None => {
                            pair_slot.insert(key, pairs.len());
                            pairs.push((key, 1));
                        }
                    }
                }
            }
        }
        pairs.sort_by(|a, b| b.1.cmp(&a.1));
        pairs.truncate(edge_budget(density));

        let edges = pairs
            .into_iter()
            .map(|((a, b), weight)| GraphEdge { a, b, weight })
            .collect();

        Self { nodes, edges }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Both endpoints of an edge, or `None` when an index is out of range.
    pub fn endpoints(&self, edge: &GraphEdge) -> Option<(&GraphNode, &GraphNode)> {
        Some((self.nodes.get(edge.a)?, self.nodes.get(edge.b)?))
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{Role, parse_transcript};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    #[test]
    fn test_empty_transcript_empty_graph() {
        let g = KeywordGraph::build(&[], 0.55, 800.0, 600.0, &mut rng());
        assert!(g.is_empty());
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_budgets() {
        assert_eq!(node_budget(0.55), 21);
        assert_eq!(edge_budget(0.55), 27);
        assert_eq!(node_budget(0.0), 10);
        assert_eq!(edge_budget(1.0), 40);
        assert_eq!(node_budget(7.0), 30, "density is clamped");
    }

    #[test]
    fn test_ranking_and_weights() {
        let turns = parse_transcript(
            "User: graph graph graph layout layout field\nAssistant: the and with graph",
        );
        let g = KeywordGraph::build(&turns, 0.55, 800.0, 600.0, &mut rng());
        let ids: Vec<&str> = g.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["graph", "layout", "field"]);
        assert_eq!(g.nodes[0].weight, 1.0 + 4.0 * 0.25);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let turns = vec![Turn::new(Role::User, "zebra apple mango")];
        let g = KeywordGraph::build(&turns, 0.0, 800.0, 600.0, &mut rng());
        let ids: Vec<&str> = g.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["zebra", "apple", "mango"]);
    }

    #[test]
    fn test_edges_count_cooccurrence_per_turn() {
        let turns = parse_transcript(
            "User: river stone river stone\nAssistant: river stone cloud\nUser: cloud alone",
        );
        let g = KeywordGraph::build(&turns, 0.55, 800.0, 600.0, &mut rng());
        let river = g.nodes.iter().position(|n| n.id == "river").unwrap();
        let stone = g.nodes.iter().position(|n| n.id == "stone").unwrap();
        let top = g.edges[0];
        assert_eq!((top.a.min(top.b), top.a.max(top.b)), (river.min(stone), river.max(stone)));
        assert_eq!(top.weight, 2, "one count per turn, not per repetition");
        assert!(g.edges.iter().all(|e| e.a != e.b));
    }

    #[test]
    fn test_initial_positions_near_center() {
        let turns = vec![Turn::new(Role::User, "alpha bravo charlie delta echo")];
        let g = KeywordGraph::build(&turns, 0.55, 800.0, 600.0, &mut rng());
        for n in &g.nodes {
            assert!((300.0..=500.0).contains(&n.x), "x = {}", n.x);
            assert!((225.0..=375.0).contains(&n.y), "y = {}", n.y);
            assert_eq!((n.vx, n.vy), (0.0, 0.0));
        }
    }

    #[test]
    fn test_seeded_build_is_reproducible() {
        let turns = vec![Turn::new(Role::User, "alpha bravo charlie delta echo")];
        let a = KeywordGraph::build(&turns, 0.55, 800.0, 600.0, &mut rng());
        let b = KeywordGraph::build(&turns, 0.55, 800.0, 600.0, &mut rng());
        assert_eq!(a, b);
    }

    #[test]
    fn test_size_bounds_on_large_vocabulary() {
        let text: Vec<String> = (0..200).map(|i| format!("word{i:03}")).collect();
        let turns = vec![
            Turn::new(Role::User, text[..100].join(" ")),
            Turn::new(Role::Assistant, text[50..].join(" ")),
        ];
        let g = KeywordGraph::build(&turns, 0.55, 800.0, 600.0, &mut rng());
        assert!(g.node_count() <= 21);
        assert!(g.edge_count() <= 27);
        assert_eq!(g.node_count(), 21);
        assert_eq!(g.edge_count(), 27);
    }

    #[test]
    fn test_endpoints_guard_out_of_range() {
        let g = KeywordGraph::default();
        assert!(g.endpoints(&GraphEdge { a: 0, b: 1, weight: 1 }).is_none());
    }
}

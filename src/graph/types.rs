//! Causal graph data types and the runtime layout arena.

use egui::{Pos2, Vec2};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use std::collections::HashMap;

/// Smallest and largest rendered node radius (screen points at zoom 1)
pub const MIN_NODE_RADIUS: f32 = 8.0;
pub const MAX_NODE_RADIUS: f32 = 32.0;

/// Rendered radius for a node probability.
///
/// Square-root scale so that circle *area* grows linearly with probability.
pub fn node_radius(probability: f32) -> f32 {
    let p = if probability.is_nan() { 0.0 } else { probability.clamp(0.0, 1.0) };
    MIN_NODE_RADIUS + (MAX_NODE_RADIUS - MIN_NODE_RADIUS) * p.sqrt()
}

/// Direction of a causal influence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EdgeKind {
    #[default]
    Positive,
    Negative,
}

impl EdgeKind {
    /// Lenient parse: anything other than "negative" is treated as positive
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("negative") {
            EdgeKind::Negative
        } else {
            EdgeKind::Positive
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EdgeKind::Positive => "positive",
            EdgeKind::Negative => "negative",
        }
    }
}

/// A factor in the causal graph
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    /// Estimated probability, drives the rendered radius
    pub probability: f32,
    /// Model confidence, drives the fill color
    pub confidence: f32,
    pub category: String,
}

/// A directed causal link between two factors
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    /// Link strength; only affects stroke width
    pub weight: f32,
    pub kind: EdgeKind,
    pub description: String,
}

/// Complete causal graph input, possibly with dangling edges
#[derive(Debug, Clone, Default)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// A graph node plus its mutable layout state
#[derive(Debug, Clone)]
pub struct SimNode {
    pub node: GraphNode,
    pub pos: Pos2,
    pub vel: Vec2,
    /// Fixed position while the user drags the node
    pub pin: Option<Pos2>,
}

impl SimNode {
    pub fn id(&self) -> &str {
        &self.node.id
    }

    pub fn radius(&self) -> f32 {
        node_radius(self.node.probability)
    }

    pub fn is_pinned(&self) -> bool {
        self.pin.is_some()
    }
}

/// Edge payload stored in the arena (endpoints are arena indices)
#[derive(Debug, Clone)]
pub struct SimLink {
    pub weight: f32,
    pub kind: EdgeKind,
    pub description: String,
}

/// Layout temperature.
///
/// `alpha` scales every force and decays toward `target` each step; the
/// simulation idles once both are below the layout's stopping threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperature {
    pub alpha: f32,
    pub target: f32,
}

impl Default for Temperature {
    fn default() -> Self {
        Self { alpha: 1.0, target: 0.0 }
    }
}

/// Runtime graph state: an arena of nodes indexed by stable id.
///
/// Nodes are never removed from the arena, so `NodeIndex::index()` is dense
/// in `0..node_count()` and can address per-step scratch arrays.
pub struct GraphState {
    graph: StableDiGraph<SimNode, SimLink>,
    /// Node index lookup (id -> arena index)
    index: HashMap<String, NodeIndex>,
    pub temperature: Temperature,
    /// Edges rejected at load because an endpoint did not resolve
    dropped_edges: usize,
}

impl GraphState {
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            index: HashMap::new(),
            temperature: Temperature::default(),
            dropped_edges: 0,
        }
    }

    /// Build a fresh arena from `data`, seeding positions on a spiral around `center`
    pub fn load(data: GraphData, center: Pos2) -> Self {
        let mut state = Self::new();
        state.replace_data(data, center);
        state
    }

    /// Replace the node/edge sets.
    ///
    /// Nodes whose id survives keep their position and velocity; new ones are
    /// placed on the spiral. Pins are not carried over. Always re-heats the
    /// layout to full temperature.
    pub fn replace_data(&mut self, data: GraphData, center: Pos2) {
        let previous: HashMap<String, (Pos2, Vec2)> = self
            .graph
            .node_indices()
            .map(|i| {
                let n = &self.graph[i];
                (n.node.id.clone(), (n.pos, n.vel))
            })
            .collect();

        let mut graph = StableDiGraph::with_capacity(data.nodes.len(), data.edges.len());
        let mut index = HashMap::with_capacity(data.nodes.len());

        for node in data.nodes {
            if index.contains_key(&node.id) {
                tracing::debug!(id = %node.id, "duplicate node id ignored");
                continue;
            }
            let slot = index.len();
            let (pos, vel) = previous
                .get(&node.id)
                .copied()
                .unwrap_or_else(|| (phyllotaxis(slot, center), Vec2::ZERO));
            let id = node.id.clone();
            let idx = graph.add_node(SimNode {
                node,
                pos,
                vel,
                pin: None,
            });
            index.insert(id, idx);
        }

        let mut dropped = 0;
        for edge in data.edges {
            let (Some(&s), Some(&t)) = (index.get(&edge.source), index.get(&edge.target)) else {
                dropped += 1;
                continue;
            };
            graph.add_edge(
                s,
                t,
                SimLink {
                    weight: edge.weight,
                    kind: edge.kind,
                    description: edge.description,
                },
            );
        }

        if dropped > 0 {
            tracing::debug!(dropped, "dropped edges with dangling endpoints");
        }

        self.graph = graph;
        self.index = index;
        self.dropped_edges = dropped;
        self.temperature.alpha = 1.0;
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn dropped_edges(&self) -> usize {
        self.dropped_edges
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Get a node by ID
    pub fn get(&self, id: &str) -> Option<&SimNode> {
        self.index.get(id).map(|&i| &self.graph[i])
    }

    /// Get the position of a node
    pub fn get_pos(&self, id: &str) -> Option<Pos2> {
        self.get(id).map(|n| n.pos)
    }

    /// All nodes in arena order
    pub fn nodes(&self) -> impl Iterator<Item = &SimNode> + '_ {
        self.graph.node_indices().map(move |i| &self.graph[i])
    }

    /// All links with both endpoints resolved
    pub fn links(&self) -> impl Iterator<Item = (&SimNode, &SimNode, &SimLink)> + '_ {
        self.graph.edge_indices().filter_map(move |e| {
            let (s, t) = self.graph.edge_endpoints(e)?;
            Some((&self.graph[s], &self.graph[t], &self.graph[e]))
        })
    }

    /// Link endpoints as dense arena slots
    pub(super) fn link_slots(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.graph
            .edge_indices()
            .filter_map(move |e: EdgeIndex| self.graph.edge_endpoints(e))
            .map(|(s, t)| (s.index(), t.index()))
    }

    pub(super) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut SimNode> + '_ {
        self.graph.node_weights_mut()
    }

    /// Pin a node at `pos`. Returns false if the id is unknown.
    pub fn pin(&mut self, id: &str, pos: Pos2) -> bool {
        let Some(&i) = self.index.get(id) else {
            return false;
        };
        let node = &mut self.graph[i];
        node.pin = Some(pos);
        node.pos = pos;
        node.vel = Vec2::ZERO;
        true
    }

    /// Move an already pinned node's anchor
    pub fn move_pin(&mut self, id: &str, pos: Pos2) {
        if let Some(&i) = self.index.get(id) {
            let node = &mut self.graph[i];
            if node.pin.is_some() {
                node.pin = Some(pos);
                node.pos = pos;
            }
        }
    }

    /// Release a pinned node so it drifts under the forces again
    pub fn unpin(&mut self, id: &str) {
        if let Some(&i) = self.index.get(id) {
            self.graph[i].pin = None;
        }
    }

    /// Raise the temperature to at least `alpha`
    pub fn reheat(&mut self, alpha: f32) {
        self.temperature.alpha = self.temperature.alpha.max(alpha);
    }

    /// Keep the layout warm while a drag is active
    pub fn set_alpha_target(&mut self, target: f32) {
        self.temperature.target = target;
    }
}

impl Default for GraphState {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic sunflower spiral used to seed initial positions
fn phyllotaxis(slot: usize, center: Pos2) -> Pos2 {
    const INITIAL_RADIUS: f32 = 10.0;
    let golden_angle = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    let radius = INITIAL_RADIUS * (0.5 + slot as f32).sqrt();
    let angle = slot as f32 * golden_angle;
    center + Vec2::new(radius * angle.cos(), radius * angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, probability: f32) -> GraphNode {
        GraphNode {
            id: id.into(),
            label: id.to_uppercase(),
            probability,
            confidence: 0.5,
            category: "general".into(),
        }
    }

    fn edge(source: &str, target: &str) -> GraphEdge {
        GraphEdge {
            source: source.into(),
            target: target.into(),
            weight: 0.5,
            kind: EdgeKind::Positive,
            description: String::new(),
        }
    }

    #[test]
    fn dangling_edges_are_dropped() {
        let data = GraphData {
            nodes: vec![node("a", 0.5), node("b", 0.5)],
            edges: vec![edge("a", "b"), edge("a", "ghost"), edge("nobody", "b")],
        };
        let state = GraphState::load(data, Pos2::new(400.0, 250.0));

        assert_eq!(state.edge_count(), 1);
        assert_eq!(state.dropped_edges(), 2);
        for (s, t, _) in state.links() {
            assert!(state.get(s.id()).is_some());
            assert!(state.get(t.id()).is_some());
        }
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let mut second = node("a", 0.9);
        second.label = "second".into();
        let data = GraphData {
            nodes: vec![node("a", 0.1), second],
            edges: vec![],
        };
        let state = GraphState::load(data, Pos2::ZERO);
        assert_eq!(state.node_count(), 1);
        assert_eq!(state.get("a").unwrap().node.label, "A");
    }

    #[test]
    fn spiral_seeds_distinct_positions() {
        let nodes = (0..20).map(|i| node(&format!("n{i}"), 0.5)).collect();
        let state = GraphState::load(GraphData { nodes, edges: vec![] }, Pos2::ZERO);
        let positions: Vec<Pos2> = state.nodes().map(|n| n.pos).collect();
        for (i, a) in positions.iter().enumerate() {
            for b in &positions[i + 1..] {
                assert!(a.distance(*b) > 0.1);
            }
        }
    }

    #[test]
    fn replace_data_keeps_positions_by_id() {
        let data = GraphData {
            nodes: vec![node("a", 0.5), node("b", 0.5)],
            edges: vec![],
        };
        let mut state = GraphState::load(data, Pos2::ZERO);
        state.pin("a", Pos2::new(50.0, 60.0));
        state.unpin("a");
        state.temperature.alpha = 0.01;

        let data = GraphData {
            nodes: vec![node("a", 0.7), node("c", 0.5)],
            edges: vec![edge("a", "c")],
        };
        state.replace_data(data, Pos2::ZERO);

        assert_eq!(state.get_pos("a"), Some(Pos2::new(50.0, 60.0)));
        assert_eq!(state.get("a").unwrap().node.probability, 0.7);
        assert!(state.get("b").is_none());
        assert_eq!(state.temperature.alpha, 1.0);
    }

    #[test]
    fn replace_data_drops_pins() {
        let data = GraphData {
            nodes: vec![node("a", 0.5), node("b", 0.5)],
            edges: vec![],
        };
        let mut state = GraphState::load(data.clone(), Pos2::ZERO);
        state.pin("a", Pos2::new(50.0, 60.0));

        state.replace_data(data, Pos2::ZERO);

        let a = state.get("a").unwrap();
        assert!(!a.is_pinned());
        assert_eq!(a.pos, Pos2::new(50.0, 60.0));
    }

    #[test]
    fn pin_unknown_id_is_rejected() {
        let mut state = GraphState::load(GraphData::default(), Pos2::ZERO);
        assert!(!state.pin("missing", Pos2::ZERO));
    }

    #[test]
    fn radius_grows_with_probability() {
        assert_eq!(node_radius(0.0), MIN_NODE_RADIUS);
        assert_eq!(node_radius(1.0), MAX_NODE_RADIUS);
        assert!(node_radius(0.9) > node_radius(0.1));
        assert_eq!(node_radius(2.0), MAX_NODE_RADIUS);
    }

    #[test]
    fn edge_kind_parse_is_lenient() {
        assert_eq!(EdgeKind::parse("negative"), EdgeKind::Negative);
        assert_eq!(EdgeKind::parse(" NEGATIVE "), EdgeKind::Negative);
        assert_eq!(EdgeKind::parse("positive"), EdgeKind::Positive);
        assert_eq!(EdgeKind::parse("sideways"), EdgeKind::Positive);
    }
}

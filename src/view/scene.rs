//! Scene building and painting.
//!
//! Building turns model state plus a [`ViewTransform`] into screen-space
//! primitives; painting submits those primitives to an egui painter. The
//! split keeps everything except the final draw calls testable without a
//! rendering backend.

use super::interaction::distance_to_segment;
use super::ViewTransform;
use crate::agents::Agent;
use crate::graph::{EdgeKind, GraphState};
use crate::theme;
use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Shape, Stroke, Vec2};
use std::collections::{HashMap, HashSet};

/// Label font size at zoom 1
const LABEL_SIZE: f32 = 11.0;

/// Gap between a node's rim and its label, at zoom 1
const LABEL_GAP: f32 = 14.0;

/// Arrowhead length at zoom 1
const ARROW_SIZE: f32 = 8.0;

/// Extra pixels around an edge that still count as hovering it
const EDGE_HOVER_SLOP: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneStyle {
    pub show_labels: bool,
    pub show_arrows: bool,
    /// Physical pixels per egui point
    pub pixels_per_point: f32,
}

impl Default for SceneStyle {
    fn default() -> Self {
        Self {
            show_labels: true,
            show_arrows: true,
            pixels_per_point: 1.0,
        }
    }
}

impl SceneStyle {
    /// Width of one physical pixel in points
    pub fn hairline(&self) -> f32 {
        1.0 / self.pixels_per_point.max(0.1)
    }

    /// Stroke of at least one physical pixel
    pub fn stroke(&self, width: f32, color: Color32) -> Stroke {
        Stroke::new(width.max(self.hairline()), color)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgePrimitive {
    pub from: Pos2,
    pub to: Pos2,
    pub stroke: Stroke,
    /// Tip, left and right corners
    pub arrow: Option<[Pos2; 3]>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodePrimitive {
    pub id: String,
    pub center: Pos2,
    pub radius: f32,
    pub fill: Color32,
    pub stroke: Stroke,
    pub label: Option<(Pos2, String, f32)>,
    pub tooltip: String,
}

#[derive(Debug, Clone, Default)]
pub struct GraphScene {
    pub edges: Vec<EdgePrimitive>,
    pub nodes: Vec<NodePrimitive>,
}

impl GraphScene {
    /// Description of the edge under `cursor`, if any
    pub fn edge_at(&self, cursor: Pos2) -> Option<&EdgePrimitive> {
        self.edges
            .iter()
            .filter(|e| distance_to_segment(cursor, e.from, e.to) <= e.stroke.width / 2.0 + EDGE_HOVER_SLOP)
            .min_by(|a, b| {
                let da = distance_to_segment(cursor, a.from, a.to);
                let db = distance_to_segment(cursor, b.from, b.to);
                da.total_cmp(&db)
            })
    }

    pub fn node(&self, id: &str) -> Option<&NodePrimitive> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Screen-space primitives for the causal graph
pub fn build_graph_scene(
    state: &GraphState,
    view: &ViewTransform,
    style: &SceneStyle,
    selected: Option<&str>,
    hovered: Option<&str>,
) -> GraphScene {
    let scale = view.scale();
    let mut scene = GraphScene::default();

    for (source, target, link) in state.links() {
        let from = view.to_screen(source.pos);
        let end = view.to_screen(target.pos);
        let delta = end - from;
        let length = delta.length();
        if length < 1e-3 {
            continue;
        }
        let dir = delta / length;
        let tip = end - dir * (target.radius() * scale + 2.0);

        let color = match link.kind {
            EdgeKind::Positive => theme::edge::POSITIVE,
            EdgeKind::Negative => theme::edge::NEGATIVE,
        };
        let stroke = style.stroke((1.0 + 5.0 * link.weight.clamp(0.0, 1.0)) * scale, color.gamma_multiply(theme::edge::OPACITY));

        let (to, arrow) = if style.show_arrows {
            let size = ARROW_SIZE * scale;
            let perp = Vec2::new(-dir.y, dir.x);
            let base = tip - dir * size;
            let arrow = [tip, base + perp * size * 0.5, base - perp * size * 0.5];
            (base, Some(arrow))
        } else {
            (end, None)
        };

        scene.edges.push(EdgePrimitive {
            from,
            to,
            stroke,
            arrow,
            description: link.description.clone(),
        });
    }

    for node in state.nodes() {
        let center = view.to_screen(node.pos);
        let radius = node.radius() * scale;
        let id = node.id();

        let stroke = if selected == Some(id) {
            style.stroke(3.0 * scale, Color32::WHITE)
        } else if hovered == Some(id) {
            style.stroke(2.0 * scale, Color32::WHITE.gamma_multiply(0.8))
        } else {
            style.stroke(1.5 * scale, Color32::WHITE.gamma_multiply(0.3))
        };

        let label = style.show_labels.then(|| {
            (
                center + Vec2::new(0.0, radius + LABEL_GAP * scale),
                node.node.label.clone(),
                LABEL_SIZE * scale,
            )
        });

        scene.nodes.push(NodePrimitive {
            id: id.to_string(),
            center,
            radius,
            fill: theme::diverging_ramp(node.node.confidence),
            stroke,
            label,
            tooltip: format!("{}: {:.0}%", node.node.label, node.node.probability * 100.0),
        });
    }

    scene
}

pub fn paint_graph_scene(painter: &Painter, scene: &GraphScene) {
    for edge in &scene.edges {
        painter.line_segment([edge.from, edge.to], edge.stroke);
        if let Some(arrow) = edge.arrow {
            painter.add(Shape::convex_polygon(arrow.to_vec(), edge.stroke.color, Stroke::NONE));
        }
    }

    for node in &scene.nodes {
        painter.circle_filled(node.center, node.radius, node.fill);
        painter.circle_stroke(node.center, node.radius, node.stroke);
        if let Some((pos, text, size)) = &node.label {
            painter.text(
                *pos,
                Align2::CENTER_CENTER,
                text,
                FontId::proportional(size.max(4.0)),
                theme::text::LABEL,
            );
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentPrimitive {
    pub id: u32,
    pub center: Pos2,
    pub radius: f32,
    pub color: Color32,
    pub selected: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AgentScene {
    /// Each social link once
    pub connections: Vec<[Pos2; 2]>,
    pub connection_stroke: Stroke,
    pub agents: Vec<AgentPrimitive>,
    pub selected_stroke: Stroke,
}

/// Screen radius of an agent; shared with hit-testing
pub fn agent_screen_radius(agent: &Agent, view: &ViewTransform) -> f32 {
    agent.radius() * view.zoom()
}

/// Screen-space primitives for the agent canvas at `tick`
pub fn build_agent_scene(
    agents: &[Agent],
    tick: u32,
    view: &ViewTransform,
    style: &SceneStyle,
    selected: Option<u32>,
) -> AgentScene {
    let screen: HashMap<u32, Pos2> = agents.iter().map(|a| (a.id, view.to_screen(a.pos))).collect();

    let mut seen = HashSet::new();
    let mut connections = Vec::new();
    for agent in agents {
        for &other in &agent.connections {
            if !seen.insert((agent.id.min(other), agent.id.max(other))) {
                continue;
            }
            if let (Some(&a), Some(&b)) = (screen.get(&agent.id), screen.get(&other)) {
                connections.push([a, b]);
            }
        }
    }

    let agents = agents
        .iter()
        .map(|agent| AgentPrimitive {
            id: agent.id,
            center: screen.get(&agent.id).copied().unwrap_or_else(|| view.to_screen(agent.pos)),
            radius: agent_screen_radius(agent, view),
            color: theme::stance_color(agent.stance_at(tick)),
            selected: selected == Some(agent.id),
        })
        .collect();

    AgentScene {
        connections,
        connection_stroke: style.stroke(
            0.5 * view.zoom(),
            theme::agent::CONNECTION.gamma_multiply(theme::agent::CONNECTION_OPACITY),
        ),
        agents,
        selected_stroke: style.stroke(2.0, theme::agent::SELECTED_RING),
    }
}

pub fn paint_agent_scene(painter: &Painter, scene: &AgentScene) {
    for [a, b] in &scene.connections {
        painter.line_segment([*a, *b], scene.connection_stroke);
    }

    for agent in &scene.agents {
        painter.circle_filled(
            agent.center,
            agent.radius + 2.0,
            agent.color.gamma_multiply(theme::agent::GLOW_OPACITY),
        );
        painter.circle_filled(agent.center, agent.radius, agent.color);
        if agent.selected {
            painter.circle_stroke(agent.center, agent.radius, scene.selected_stroke);
        }
    }
}

/// Small floating text box next to `anchor`
pub fn paint_tooltip(painter: &Painter, anchor: Pos2, text: &str) {
    let galley = painter.layout_no_wrap(text.to_string(), FontId::default(), theme::text::PRIMARY);
    let pos = anchor + Vec2::new(12.0, 12.0);
    let rect = Rect::from_min_size(pos, galley.size() + Vec2::splat(12.0));
    painter.rect_filled(rect, 4.0, Color32::from_rgba_unmultiplied(20, 20, 30, 230));
    painter.galley(pos + Vec2::splat(6.0), galley, theme::text::PRIMARY);
}

//! Normalization of backend payloads into canonical entities.
//!
//! Payloads are loosely typed: every field is optional and may carry the
//! wrong JSON type. Entries that cannot be used are skipped, missing fields
//! get their documented defaults and out-of-range numbers are clamped.
//! When nothing usable remains, a deterministic synthetic dataset is
//! returned instead.

use super::synthetic;
use crate::agents::{Agent, DataSource, SimulationData, Stance, StanceChange, StanceSummary};
use crate::graph::{EdgeKind, GraphData, GraphEdge, GraphNode};
use rand::{rngs::StdRng, SeedableRng};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

pub const DEFAULT_AGE: u32 = 30;
pub const DEFAULT_ATTRIBUTE: &str = "Unknown";
pub const DEFAULT_INFLUENCE: f32 = 0.5;
pub const DEFAULT_MAX_TICKS: u32 = 50;
/// Upper bound on accepted tick counts
pub const MAX_TICKS: u32 = 10_000;
pub const DEFAULT_PROBABILITY: f32 = 0.5;
pub const DEFAULT_CONFIDENCE: f32 = 0.5;
pub const DEFAULT_CATEGORY: &str = "general";
pub const DEFAULT_EDGE_WEIGHT: f32 = 0.5;

/// Numeric stances beyond this magnitude lean towards a side
const NUMERIC_STANCE_DEADBAND: f64 = 0.1;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawNode {
    id: Value,
    label: Value,
    probability: Value,
    confidence: Value,
    category: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEdge {
    source: Value,
    target: Value,
    weight: Value,
    #[serde(rename = "type")]
    kind: Value,
    description: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAgent {
    id: Value,
    age: Value,
    region: Value,
    ethnicity: Value,
    #[serde(alias = "income")]
    income_level: Value,
    education: Value,
    stance: Value,
    influence: Value,
    connections: Value,
    stance_history: Value,
}

/// Adapt a prediction result (or a bare `{nodes, edges}` object) into
/// graph data.
pub fn adapt_causal_graph(payload: Option<&Value>) -> (GraphData, DataSource) {
    let Some(payload) = payload else {
        return (synthetic::causal_graph(), DataSource::Synthetic);
    };
    let graph = payload.get("causal_graph").unwrap_or(payload);

    let nodes = adapt_nodes(graph.get("nodes"));
    if nodes.is_empty() {
        info!("causal graph payload has no usable nodes, using demo graph");
        return (synthetic::causal_graph(), DataSource::Synthetic);
    }
    let edges = adapt_edges(graph.get("edges"));

    debug!(nodes = nodes.len(), edges = edges.len(), "adapted causal graph");
    (GraphData { nodes, edges }, DataSource::Backend)
}

fn adapt_nodes(raw: Option<&Value>) -> Vec<GraphNode> {
    let mut seen = HashSet::new();
    let mut nodes = Vec::new();
    for entry in raw.and_then(Value::as_array).into_iter().flatten() {
        let Ok(node) = RawNode::deserialize(entry) else {
            debug!("skipping non-object node entry");
            continue;
        };
        let Some(id) = as_id(&node.id) else {
            debug!("skipping node without id");
            continue;
        };
        if !seen.insert(id.clone()) {
            debug!(%id, "skipping duplicate node id");
            continue;
        }
        nodes.push(GraphNode {
            label: as_string(&node.label).unwrap_or_else(|| id.clone()),
            probability: as_unit(&node.probability).unwrap_or(DEFAULT_PROBABILITY),
            confidence: as_unit(&node.confidence).unwrap_or(DEFAULT_CONFIDENCE),
            category: as_string(&node.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            id,
        });
    }
    nodes
}

fn adapt_edges(raw: Option<&Value>) -> Vec<GraphEdge> {
    let mut edges = Vec::new();
    for entry in raw.and_then(Value::as_array).into_iter().flatten() {
        let Ok(edge) = RawEdge::deserialize(entry) else {
            continue;
        };
        let (Some(source), Some(target)) = (as_id(&edge.source), as_id(&edge.target)) else {
            debug!("skipping edge without endpoints");
            continue;
        };
        edges.push(GraphEdge {
            source,
            target,
            weight: as_unit(&edge.weight).unwrap_or(DEFAULT_EDGE_WEIGHT),
            kind: edge.kind.as_str().map(EdgeKind::parse).unwrap_or_default(),
            description: as_string(&edge.description).unwrap_or_default(),
        });
    }
    edges
}

/// Adapt an agents payload into a playable simulation.
///
/// `seed` drives the initial scatter of the agents and the synthetic
/// fallback.
pub fn adapt_simulation(payload: Option<&Value>, seed: u64) -> SimulationData {
    let mut rng = StdRng::seed_from_u64(seed);
    let Some(payload) = payload else {
        return synthetic::simulation(&mut rng);
    };

    let mut agents = adapt_agents(payload.get("agents"), &mut rng);
    if agents.is_empty() {
        info!("agents payload has no usable agents, using demo population");
        return synthetic::simulation(&mut rng);
    }
    link_agents(&mut agents, payload.get("edges"));

    let max_ticks = ["ticks", "tick_count", "max_ticks"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_f64))
        .map_or(DEFAULT_MAX_TICKS, |t| t.clamp(0.0, MAX_TICKS as f64).round() as u32);

    let computed = StanceSummary::from_agents(&agents);
    let summary = match payload
        .get("summary")
        .and_then(|s| StanceSummary::deserialize(s).ok())
    {
        Some(summary) if summary.is_consistent() => summary,
        Some(summary) => {
            warn!(sum = summary.sum(), "backend stance summary is inconsistent, recomputing");
            computed
        }
        None => computed,
    };

    SimulationData {
        agents,
        max_ticks,
        summary,
        source: DataSource::Backend,
    }
}

fn adapt_agents(raw: Option<&Value>, rng: &mut StdRng) -> Vec<Agent> {
    let mut agents: Vec<Agent> = Vec::new();
    let mut seen = HashSet::new();
    for (index, entry) in raw.and_then(Value::as_array).into_iter().flatten().enumerate() {
        let Ok(raw) = RawAgent::deserialize(entry) else {
            continue;
        };
        let id = raw
            .id
            .as_u64()
            .and_then(|id| u32::try_from(id).ok())
            .unwrap_or(index as u32);
        if !seen.insert(id) {
            debug!(id, "skipping duplicate agent id");
            continue;
        }

        let stance = as_stance(&raw.stance).unwrap_or_default();
        let mut stance_history: Vec<StanceChange> = raw
            .stance_history
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|change| {
                let tick = change.get("tick")?.as_f64()?.max(0.0).round() as u32;
                let stance = as_stance(change.get("stance")?)?;
                Some(StanceChange { tick, stance })
            })
            .collect();
        stance_history.sort_by_key(|c| c.tick);

        let connections = raw
            .connections
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|c| c.as_u64().and_then(|c| u32::try_from(c).ok()))
            .collect();

        let (pos, vel) = synthetic::scatter(rng);
        agents.push(Agent {
            id,
            age: raw
                .age
                .as_f64()
                .map_or(DEFAULT_AGE, |a| a.clamp(0.0, 150.0).round() as u32),
            region: as_string(&raw.region).unwrap_or_else(unknown),
            ethnicity: as_string(&raw.ethnicity).unwrap_or_else(unknown),
            income_level: as_string(&raw.income_level).unwrap_or_else(unknown),
            education: as_string(&raw.education).unwrap_or_else(unknown),
            stance,
            influence: as_unit(&raw.influence).unwrap_or(DEFAULT_INFLUENCE),
            connections,
            stance_history,
            pos,
            vel,
        });
    }
    agents
}

/// Merge an optional `{source, target}` network list into the agents'
/// connections and drop links to unknown agents or to themselves.
fn link_agents(agents: &mut [Agent], network: Option<&Value>) {
    let slots: HashMap<u32, usize> = agents.iter().enumerate().map(|(i, a)| (a.id, i)).collect();

    for edge in network.and_then(Value::as_array).into_iter().flatten() {
        let endpoint = |key: &str| {
            edge.get(key)
                .and_then(Value::as_u64)
                .and_then(|id| u32::try_from(id).ok())
        };
        if let (Some(a), Some(b)) = (endpoint("source"), endpoint("target")) {
            if let (Some(&sa), Some(&sb)) = (slots.get(&a), slots.get(&b)) {
                agents[sa].connections.insert(b);
                agents[sb].connections.insert(a);
            }
        }
    }

    for agent in agents.iter_mut() {
        let own = agent.id;
        let before = agent.connections.len();
        agent.connections = std::mem::take(&mut agent.connections)
            .into_iter()
            .filter(|c| *c != own && slots.contains_key(c))
            .collect::<BTreeSet<_>>();
        let dropped = before - agent.connections.len();
        if dropped > 0 {
            debug!(agent = own, dropped, "dropped unknown connections");
        }
    }
}

fn unknown() -> String {
    DEFAULT_ATTRIBUTE.to_string()
}

/// Node ids may arrive as strings or numbers
fn as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A number clamped into `[0, 1]`
fn as_unit(value: &Value) -> Option<f32> {
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0) as f32)
}

/// Stances arrive either as labels or as a score in `[-1, 1]`
/// (positive leans government).
fn as_stance(value: &Value) -> Option<Stance> {
    match value {
        Value::String(s) => Some(Stance::parse(s).unwrap_or_default()),
        Value::Number(n) => {
            let score = n.as_f64()?;
            Some(if score > NUMERIC_STANCE_DEADBAND {
                Stance::Government
            } else if score < -NUMERIC_STANCE_DEADBAND {
                Stance::Opposition
            } else {
                Stance::Neutral
            })
        }
        _ => None,
    }
}

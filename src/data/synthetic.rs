//! Demo datasets used when the backend has nothing usable.

use crate::agents::{Agent, DataSource, SimulationData, Stance, StanceChange, StanceSummary};
use crate::graph::{EdgeKind, GraphData, GraphEdge, GraphNode};
use egui::{Pos2, Vec2};
use rand::{rngs::StdRng, seq::SliceRandom, Rng};
use std::collections::BTreeSet;

pub const AGENT_COUNT: u32 = 100;
pub const TICKS: u32 = 50;

/// Tick at which demo agents leave neutral for their final stance
const DECISION_TICK: u32 = 5;

const REGIONS: [&str; 3] = ["Urban", "Suburban", "Rural"];
const ETHNICITIES: [&str; 4] = ["Group A", "Group B", "Group C", "Group D"];
const INCOMES: [&str; 3] = ["Low", "Middle", "High"];
const EDUCATIONS: [&str; 4] = ["High School", "Bachelor", "Master", "PhD"];

/// (id, label, probability, confidence, category)
const NODES: [(&str, &str, f32, f32, &str); 8] = [
    ("economy", "Economic Growth", 0.62, 0.78, "economic"),
    ("inflation", "Inflation", 0.45, 0.64, "economic"),
    ("sentiment", "Public Sentiment", 0.55, 0.41, "social"),
    ("stability", "Policy Stability", 0.70, 0.72, "political"),
    ("media", "Media Coverage", 0.38, 0.35, "social"),
    ("turnout", "Voter Turnout", 0.66, 0.58, "political"),
    ("coalition", "Coalition Strength", 0.48, 0.52, "political"),
    ("outcome", "Outcome", 0.58, 0.61, "outcome"),
];

/// (source, target, weight, kind, description)
const EDGES: [(&str, &str, f32, EdgeKind, &str); 10] = [
    ("economy", "sentiment", 0.8, EdgeKind::Positive, "Growth lifts household confidence"),
    ("inflation", "sentiment", 0.7, EdgeKind::Negative, "Rising prices erode approval"),
    ("economy", "inflation", 0.4, EdgeKind::Positive, "Demand pressure pushes prices up"),
    ("media", "sentiment", 0.5, EdgeKind::Positive, "Coverage frames the public mood"),
    ("sentiment", "turnout", 0.6, EdgeKind::Positive, "Engaged voters show up"),
    ("stability", "coalition", 0.7, EdgeKind::Positive, "Stable policy holds partners together"),
    ("inflation", "stability", 0.3, EdgeKind::Negative, "Price shocks force policy changes"),
    ("coalition", "outcome", 0.9, EdgeKind::Positive, "Coalition seats decide the result"),
    ("turnout", "outcome", 0.6, EdgeKind::Positive, "Turnout shifts the margin"),
    ("media", "coalition", 0.2, EdgeKind::Negative, "Scandal coverage strains the coalition"),
];

/// Fixed eight-node causal graph
pub fn causal_graph() -> GraphData {
    GraphData {
        nodes: NODES
            .iter()
            .map(|&(id, label, probability, confidence, category)| GraphNode {
                id: id.to_string(),
                label: label.to_string(),
                probability,
                confidence,
                category: category.to_string(),
            })
            .collect(),
        edges: EDGES
            .iter()
            .map(|&(source, target, weight, kind, description)| GraphEdge {
                source: source.to_string(),
                target: target.to_string(),
                weight,
                kind,
                description: description.to_string(),
            })
            .collect(),
    }
}

/// Random starting position inside the agent world and a small drift
pub(crate) fn scatter(rng: &mut StdRng) -> (Pos2, Vec2) {
    let pos = Pos2::new(rng.gen_range(50.0..750.0), rng.gen_range(50.0..450.0));
    let vel = Vec2::new(rng.gen_range(-0.25..0.25), rng.gen_range(-0.25..0.25));
    (pos, vel)
}

/// Demo population of [`AGENT_COUNT`] agents over [`TICKS`] ticks
pub fn simulation(rng: &mut StdRng) -> SimulationData {
    let sides = [Stance::Government, Stance::Opposition, Stance::Neutral];
    let mut agents = Vec::with_capacity(AGENT_COUNT as usize);

    for id in 0..AGENT_COUNT {
        let stance = *sides.choose(rng).unwrap_or(&Stance::Neutral);
        let influence = rng.gen_range(0.3..1.0);

        let mut connections = BTreeSet::new();
        for _ in 0..rng.gen_range(1..=5) {
            let target = rng.gen_range(0..AGENT_COUNT);
            if target != id {
                connections.insert(target);
            }
        }

        let (pos, vel) = scatter(rng);
        agents.push(Agent {
            id,
            age: rng.gen_range(18..80),
            region: pick(rng, &REGIONS),
            ethnicity: pick(rng, &ETHNICITIES),
            income_level: pick(rng, &INCOMES),
            education: pick(rng, &EDUCATIONS),
            stance,
            influence,
            connections,
            stance_history: vec![
                StanceChange {
                    tick: 0,
                    stance: Stance::Neutral,
                },
                StanceChange {
                    tick: DECISION_TICK,
                    stance,
                },
            ],
            pos,
            vel,
        });
    }

    SimulationData {
        summary: StanceSummary::from_agents(&agents),
        agents,
        max_ticks: TICKS,
        source: DataSource::Synthetic,
    }
}

fn pick(rng: &mut StdRng, options: &[&str]) -> String {
    options.choose(rng).copied().unwrap_or("Unknown").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn demo_graph_edges_resolve() {
        let graph = causal_graph();
        let ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), 8);
        for edge in &graph.edges {
            assert!(ids.contains(edge.source.as_str()), "{}", edge.source);
            assert!(ids.contains(edge.target.as_str()), "{}", edge.target);
        }
    }

    #[test]
    fn demo_population_is_well_formed() {
        let mut rng = StdRng::seed_from_u64(5);
        let data = simulation(&mut rng);
        assert_eq!(data.agents.len(), 100);
        assert_eq!(data.max_ticks, 50);
        assert!(data.summary.is_consistent());
        assert_eq!(data.summary.total_agents, 100);
        for agent in &data.agents {
            assert!(!agent.connections.contains(&agent.id));
            assert!((0.3..=1.0).contains(&agent.influence));
            assert_eq!(agent.stance_at(0), Stance::Neutral);
            assert_eq!(agent.stance_at(TICKS), agent.stance);
        }
    }

    #[test]
    fn different_seeds_differ() {
        let a = simulation(&mut StdRng::seed_from_u64(1));
        let b = simulation(&mut StdRng::seed_from_u64(2));
        assert_ne!(a.agents, b.agents);
    }
}

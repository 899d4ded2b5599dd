//! Agent population data types.

use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Political stance of a simulated agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Government,
    Opposition,
    #[default]
    Neutral,
    Undecided,
}

impl Stance {
    pub const ALL: [Stance; 4] = [
        Stance::Government,
        Stance::Opposition,
        Stance::Neutral,
        Stance::Undecided,
    ];

    /// Case-insensitive parse of the backend's stance strings
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "government" => Some(Stance::Government),
            "opposition" => Some(Stance::Opposition),
            "neutral" => Some(Stance::Neutral),
            "undecided" => Some(Stance::Undecided),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stance::Government => "Government",
            Stance::Opposition => "Opposition",
            Stance::Neutral => "Neutral",
            Stance::Undecided => "Undecided",
        }
    }
}

/// One entry of an agent's stance history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StanceChange {
    pub tick: u32,
    pub stance: Stance,
}

/// A simulated member of the population
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: u32,
    pub age: u32,
    pub region: String,
    pub ethnicity: String,
    pub income_level: String,
    pub education: String,
    /// Final stance at the end of the run
    pub stance: Stance,
    /// Social influence in `[0, 1]`, drives the rendered radius
    pub influence: f32,
    pub connections: BTreeSet<u32>,
    /// Sorted by tick
    pub stance_history: Vec<StanceChange>,
    pub pos: Pos2,
    pub vel: Vec2,
}

impl Agent {
    /// Stance the agent held at `tick`.
    ///
    /// The latest history entry at or before `tick` wins; before the first
    /// entry the earliest recorded stance is used, and agents without any
    /// history always show their final stance.
    pub fn stance_at(&self, tick: u32) -> Stance {
        match self.stance_history.iter().rev().find(|c| c.tick <= tick) {
            Some(change) => change.stance,
            None => self
                .stance_history
                .first()
                .map_or(self.stance, |first| first.stance),
        }
    }

    /// Rendered radius in world units
    pub fn radius(&self) -> f32 {
        3.0 + self.influence.clamp(0.0, 1.0) * 6.0
    }
}

/// Share of the population per stance
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StanceSummary {
    pub total_agents: u32,
    pub government_pct: f32,
    pub opposition_pct: f32,
    pub neutral_pct: f32,
    #[serde(default)]
    pub undecided_pct: f32,
}

impl StanceSummary {
    /// Tolerance used when checking that the shares sum to one
    pub const SUM_TOLERANCE: f32 = 0.02;

    /// Distribution of the agents' final stances
    pub fn from_agents(agents: &[Agent]) -> Self {
        Self::from_stances(agents.iter().map(|a| a.stance))
    }

    /// Distribution of the stances held at `tick`
    pub fn at_tick(agents: &[Agent], tick: u32) -> Self {
        Self::from_stances(agents.iter().map(|a| a.stance_at(tick)))
    }

    fn from_stances(stances: impl Iterator<Item = Stance>) -> Self {
        let mut counts: HashMap<Stance, u32> = HashMap::new();
        let mut total = 0u32;
        for stance in stances {
            *counts.entry(stance).or_default() += 1;
            total += 1;
        }
        let share = |s: Stance| {
            if total == 0 {
                0.0
            } else {
                counts.get(&s).copied().unwrap_or(0) as f32 / total as f32
            }
        };
        Self {
            total_agents: total,
            government_pct: share(Stance::Government),
            opposition_pct: share(Stance::Opposition),
            neutral_pct: share(Stance::Neutral),
            undecided_pct: share(Stance::Undecided),
        }
    }

    pub fn pct(&self, stance: Stance) -> f32 {
        match stance {
            Stance::Government => self.government_pct,
            Stance::Opposition => self.opposition_pct,
            Stance::Neutral => self.neutral_pct,
            Stance::Undecided => self.undecided_pct,
        }
    }

    pub fn sum(&self) -> f32 {
        Stance::ALL.iter().map(|s| self.pct(*s)).sum()
    }

    /// Every share in `[0, 1]` and the shares sum to one (within tolerance)
    pub fn is_consistent(&self) -> bool {
        let in_range = Stance::ALL
            .iter()
            .all(|s| (0.0..=1.0).contains(&self.pct(*s)));
        in_range && (self.sum() - 1.0).abs() <= Self::SUM_TOLERANCE
    }
}

/// Where a dataset came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataSource {
    Backend,
    #[default]
    Synthetic,
}

impl DataSource {
    pub fn label(&self) -> &'static str {
        match self {
            DataSource::Backend => "Live data",
            DataSource::Synthetic => "Demo data",
        }
    }
}

/// A loaded agent simulation, ready for playback
#[derive(Debug, Clone)]
pub struct SimulationData {
    pub agents: Vec<Agent>,
    pub max_ticks: u32,
    pub summary: StanceSummary,
    pub source: DataSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: u32, stance: Stance, history: &[(u32, Stance)]) -> Agent {
        Agent {
            id,
            age: 30,
            region: "Unknown".into(),
            ethnicity: "Unknown".into(),
            income_level: "Unknown".into(),
            education: "Unknown".into(),
            stance,
            influence: 0.5,
            connections: BTreeSet::new(),
            stance_history: history
                .iter()
                .map(|&(tick, stance)| StanceChange { tick, stance })
                .collect(),
            pos: Pos2::new(100.0, 100.0),
            vel: Vec2::ZERO,
        }
    }

    #[test]
    fn stance_follows_history() {
        let a = agent(
            1,
            Stance::Opposition,
            &[(0, Stance::Neutral), (5, Stance::Opposition)],
        );
        assert_eq!(a.stance_at(0), Stance::Neutral);
        assert_eq!(a.stance_at(4), Stance::Neutral);
        assert_eq!(a.stance_at(5), Stance::Opposition);
        assert_eq!(a.stance_at(50), Stance::Opposition);
    }

    #[test]
    fn stance_before_first_entry_uses_earliest() {
        let a = agent(1, Stance::Government, &[(3, Stance::Undecided)]);
        assert_eq!(a.stance_at(0), Stance::Undecided);
    }

    #[test]
    fn stance_without_history_is_final() {
        let a = agent(1, Stance::Government, &[]);
        assert_eq!(a.stance_at(10), Stance::Government);
    }

    #[test]
    fn summary_sums_to_one() {
        let agents = vec![
            agent(0, Stance::Government, &[]),
            agent(1, Stance::Government, &[]),
            agent(2, Stance::Opposition, &[]),
            agent(3, Stance::Undecided, &[]),
        ];
        let summary = StanceSummary::from_agents(&agents);
        assert_eq!(summary.total_agents, 4);
        assert_eq!(summary.government_pct, 0.5);
        assert_eq!(summary.neutral_pct, 0.0);
        assert!(summary.is_consistent());
    }

    #[test]
    fn summary_at_tick_uses_history() {
        let agents = vec![
            agent(0, Stance::Government, &[(0, Stance::Neutral), (5, Stance::Government)]),
            agent(1, Stance::Opposition, &[(0, Stance::Neutral), (5, Stance::Opposition)]),
        ];
        assert_eq!(StanceSummary::at_tick(&agents, 0).neutral_pct, 1.0);
        assert_eq!(StanceSummary::at_tick(&agents, 5).neutral_pct, 0.0);
    }

    #[test]
    fn empty_summary_is_inconsistent() {
        let summary = StanceSummary::from_agents(&[]);
        assert_eq!(summary.total_agents, 0);
        assert!(!summary.is_consistent());
    }

    #[test]
    fn stance_parse_ignores_case() {
        assert_eq!(Stance::parse("Government"), Some(Stance::Government));
        assert_eq!(Stance::parse(" undecided "), Some(Stance::Undecided));
        assert_eq!(Stance::parse("support"), None);
    }
}

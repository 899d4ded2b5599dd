//! Per-tick agent motion: drift, bounce and jitter inside a bounded world.

use super::types::Agent;
use egui::{Pos2, Rect, Vec2};
use rand::Rng;

/// Bounded 2D world the agents wander in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentWorld {
    pub width: f32,
    pub height: f32,
    /// Distance from each edge where agents bounce
    pub margin: f32,
    /// Maximum per-axis velocity change per tick
    pub jitter: f32,
    /// Per-axis speed limit
    pub max_speed: f32,
}

impl Default for AgentWorld {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 500.0,
            margin: 20.0,
            jitter: 0.1,
            max_speed: 2.0,
        }
    }
}

impl AgentWorld {
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Region agents are confined to
    pub fn bounds(&self) -> Rect {
        Rect::from_min_max(
            Pos2::new(self.margin, self.margin),
            Pos2::new(self.width - self.margin, self.height - self.margin),
        )
    }

    /// Advance every agent by one tick
    pub fn step(&self, agents: &mut [Agent], rng: &mut impl Rng) {
        let bounds = self.bounds();
        let half = self.jitter / 2.0;
        for agent in agents.iter_mut() {
            let mut pos = agent.pos + agent.vel;
            let mut vel = agent.vel;

            if pos.x < bounds.min.x || pos.x > bounds.max.x {
                vel.x = -vel.x;
                pos.x = pos.x.clamp(bounds.min.x, bounds.max.x);
            }
            if pos.y < bounds.min.y || pos.y > bounds.max.y {
                vel.y = -vel.y;
                pos.y = pos.y.clamp(bounds.min.y, bounds.max.y);
            }

            if half > 0.0 {
                vel.x += rng.gen_range(-half..half);
                vel.y += rng.gen_range(-half..half);
            }
            vel.x = vel.x.clamp(-self.max_speed, self.max_speed);
            vel.y = vel.y.clamp(-self.max_speed, self.max_speed);

            agent.pos = pos;
            agent.vel = vel;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::types::Stance;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::BTreeSet;

    fn walker(pos: Pos2, vel: Vec2) -> Agent {
        Agent {
            id: 0,
            age: 30,
            region: "Unknown".into(),
            ethnicity: "Unknown".into(),
            income_level: "Unknown".into(),
            education: "Unknown".into(),
            stance: Stance::Neutral,
            influence: 0.5,
            connections: BTreeSet::new(),
            stance_history: Vec::new(),
            pos,
            vel,
        }
    }

    #[test]
    fn agents_stay_in_bounds() {
        let world = AgentWorld::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut agents: Vec<Agent> = (0..20)
            .map(|i| {
                let f = i as f32;
                walker(Pos2::new(25.0 + f * 30.0, 30.0 + f * 20.0), Vec2::new(1.9, -1.7))
            })
            .collect();

        let bounds = world.bounds();
        for _ in 0..2_000 {
            world.step(&mut agents, &mut rng);
            for a in &agents {
                assert!(bounds.contains(a.pos), "escaped: {:?}", a.pos);
            }
        }
    }

    #[test]
    fn bounce_reflects_velocity() {
        let world = AgentWorld {
            jitter: 0.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut agents = vec![walker(Pos2::new(779.5, 200.0), Vec2::new(1.5, 0.0))];
        world.step(&mut agents, &mut rng);
        assert_eq!(agents[0].pos.x, 780.0);
        assert_eq!(agents[0].vel.x, -1.5);
    }

    #[test]
    fn speed_is_clamped() {
        let world = AgentWorld::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut agents = vec![walker(Pos2::new(400.0, 250.0), Vec2::new(9.0, -9.0))];
        world.step(&mut agents, &mut rng);
        assert!(agents[0].vel.x.abs() <= 2.0);
        assert!(agents[0].vel.y.abs() <= 2.0);
    }
}

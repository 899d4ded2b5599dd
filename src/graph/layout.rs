//! Force-directed layout for the causal graph.
//!
//! Each step applies, in order:
//! - Link springs toward a fixed rest length (Hooke's law, degree-balanced)
//! - Charge repulsion between all nodes, O(n log n) via Barnes-Hut
//! - Collision separation using each node's rendered radius
//! - Velocity damping and integration
//! - A weak centering pull of the centroid toward the canvas center
//!
//! Every force is scaled by the layout temperature (alpha), which decays
//! each step. Once it falls below `alpha_min` the layout idles until
//! something re-heats it.

use super::quadtree::Quadtree;
use super::types::GraphState;
use egui::{Pos2, Vec2};

/// Force-directed layout parameters
#[derive(Debug, Clone)]
pub struct ForceLayout {
    /// Rest length of every link spring
    pub link_distance: f32,
    /// Charge repulsion strength (force = strength / distance)
    pub charge_strength: f32,
    /// Barnes-Hut accuracy parameter
    pub theta: f32,
    /// Distance floor for the charge force
    pub min_distance: f32,
    /// Gap kept between circles on top of their radii
    pub collision_padding: f32,
    /// Fraction of an overlap resolved per step (0.0 - 1.0)
    pub collision_strength: f32,
    /// Fraction of the centroid offset corrected per step
    pub centering: f32,
    /// Fraction of velocity lost per step (0.0 - 1.0)
    pub velocity_decay: f32,
    /// Stopping threshold for the temperature
    pub alpha_min: f32,
    /// Per-step decay rate of the temperature toward its target
    pub alpha_decay: f32,
    /// Temperature target held while a node is being dragged
    pub drag_alpha_target: f32,
}

impl Default for ForceLayout {
    fn default() -> Self {
        let alpha_min = 0.001;
        Self {
            link_distance: 120.0,
            charge_strength: 300.0,
            theta: 0.9,
            min_distance: 1.0,
            collision_padding: 10.0,
            collision_strength: 0.7,
            centering: 0.1,
            velocity_decay: 0.4,
            alpha_min,
            // Cools from 1.0 to alpha_min in ~300 steps
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            drag_alpha_target: 0.3,
        }
    }
}

/// Outcome of a single layout step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Temperature after the step
    pub alpha: f32,
    /// Largest distance any unpinned node moved during the step
    pub max_displacement: f32,
}

impl ForceLayout {
    /// True once the temperature has cooled below the stopping threshold
    pub fn is_settled(&self, state: &GraphState) -> bool {
        state.temperature.alpha < self.alpha_min && state.temperature.target < self.alpha_min
    }

    /// Run one iteration of the force simulation.
    ///
    /// Returns `None` without touching any node when the layout is settled
    /// or empty.
    pub fn step(&self, state: &mut GraphState, center: Pos2) -> Option<StepReport> {
        if state.is_empty() || self.is_settled(state) {
            return None;
        }

        let temp = &mut state.temperature;
        temp.alpha += (temp.target - temp.alpha) * self.alpha_decay;
        let alpha = temp.alpha;

        let n = state.node_count();
        let mut positions = Vec::with_capacity(n);
        let mut velocities = Vec::with_capacity(n);
        let mut radii = Vec::with_capacity(n);
        let mut pins = Vec::with_capacity(n);
        for node in state.nodes() {
            positions.push(node.pos);
            velocities.push(node.vel);
            radii.push(node.radius() + self.collision_padding);
            pins.push(node.pin);
        }

        let links: Vec<(usize, usize)> = state.link_slots().filter(|(s, t)| s != t).collect();
        self.apply_links(&links, &positions, &mut velocities, alpha);
        self.apply_charge(&positions, &mut velocities, alpha);
        self.apply_collision(&positions, &radii, &mut velocities);

        // Integrate
        let mut next = positions.clone();
        for i in 0..n {
            match pins[i] {
                Some(pin) => {
                    next[i] = pin;
                    velocities[i] = Vec2::ZERO;
                }
                None => {
                    velocities[i] *= 1.0 - self.velocity_decay;
                    next[i] += velocities[i];
                }
            }
        }

        // Centering: shift free nodes so the whole layout's centroid drifts to center
        let centroid = next.iter().fold(Vec2::ZERO, |acc, p| acc + p.to_vec2()) / n as f32;
        let shift = (center.to_vec2() - centroid) * self.centering;
        for i in 0..n {
            if pins[i].is_none() {
                next[i] += shift;
            }
        }

        let mut max_displacement = 0.0_f32;
        for (i, node) in state.nodes_mut().enumerate() {
            if pins[i].is_none() {
                max_displacement = max_displacement.max(next[i].distance(positions[i]));
            }
            node.pos = next[i];
            node.vel = velocities[i];
        }

        if self.is_settled(state) {
            tracing::debug!(nodes = n, "layout settled");
        }

        Some(StepReport {
            alpha,
            max_displacement,
        })
    }

    /// Spring along each link toward `link_distance`.
    ///
    /// Strength is `1 / min(degree)` so hubs are not yanked around, and the
    /// correction is split by degree so the lighter endpoint moves more.
    fn apply_links(
        &self,
        links: &[(usize, usize)],
        positions: &[Pos2],
        velocities: &mut [Vec2],
        alpha: f32,
    ) {
        let mut degree = vec![0u32; positions.len()];
        for &(s, t) in links {
            degree[s] += 1;
            degree[t] += 1;
        }

        for (k, &(s, t)) in links.iter().enumerate() {
            let mut delta = (positions[t] + velocities[t]) - (positions[s] + velocities[s]);
            if delta.length_sq() < 1e-12 {
                delta = jiggle(k);
            }
            let length = delta.length();
            let strength = 1.0 / degree[s].min(degree[t]) as f32;
            let bias = degree[s] as f32 / (degree[s] + degree[t]) as f32;
            let correction = delta * ((length - self.link_distance) / length * alpha * strength);

            velocities[t] -= correction * bias;
            velocities[s] += correction * (1.0 - bias);
        }
    }

    fn apply_charge(&self, positions: &[Pos2], velocities: &mut [Vec2], alpha: f32) {
        let bodies: Vec<(Pos2, f32)> = positions.iter().map(|p| (*p, 1.0)).collect();
        let tree = Quadtree::build(&bodies, self.theta);
        for (i, pos) in positions.iter().enumerate() {
            velocities[i] += tree.repulsion_at(*pos, self.charge_strength, self.min_distance) * alpha;
        }
    }

    /// Push apart overlapping circles using predicted positions.
    ///
    /// The larger circle moves less. Not temperature-scaled so overlaps are
    /// resolved even when the layout is nearly cold.
    fn apply_collision(&self, positions: &[Pos2], radii: &[f32], velocities: &mut [Vec2]) {
        let n = positions.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let reach = radii[i] + radii[j];
                let mut delta = (positions[i] + velocities[i]) - (positions[j] + velocities[j]);
                let length_sq = delta.length_sq();
                if length_sq >= reach * reach {
                    continue;
                }
                if length_sq < 1e-12 {
                    delta = jiggle(i * n + j);
                }
                let length = delta.length();
                let push = delta * ((reach - length) / length * self.collision_strength);
                let ri2 = radii[i] * radii[i];
                let rj2 = radii[j] * radii[j];
                let share = rj2 / (ri2 + rj2);
                velocities[i] += push * share;
                velocities[j] -= push * (1.0 - share);
            }
        }
    }
}

/// Tiny deterministic nudge for coincident points
fn jiggle(seed: usize) -> Vec2 {
    let angle = (seed as f32 * 0.618_034 + 0.37) * std::f32::consts::TAU;
    Vec2::new(angle.cos(), angle.sin()) * 1e-3
}

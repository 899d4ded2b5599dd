//! Barnes-Hut quadtree for the charge force.
//!
//! Distant groups of nodes are collapsed into a single body at their center
//! of charge, bringing all-pairs repulsion down to O(n log n).

use egui::{Pos2, Vec2};

/// Recursion cap for (nearly) coincident bodies
const MAX_DEPTH: u32 = 48;

/// Padding added around the bodies' bounding box
const PADDING: f32 = 50.0;

#[derive(Debug, Default)]
pub enum QuadNode {
    #[default]
    Empty,
    Leaf {
        pos: Pos2,
        charge: f32,
    },
    Internal {
        /// Charge-weighted centroid of every body below this cell
        centroid: Pos2,
        total_charge: f32,
        count: u32,
        /// NW, NE, SW, SE
        children: Box<[QuadNode; 4]>,
    },
}

/// Square cell of the tree
#[derive(Debug, Clone, Copy)]
pub struct Cell {
    pub min: Pos2,
    pub max: Pos2,
}

impl Cell {
    fn center(&self) -> Pos2 {
        Pos2::new((self.min.x + self.max.x) / 2.0, (self.min.y + self.max.y) / 2.0)
    }

    fn side(&self) -> f32 {
        (self.max.x - self.min.x).max(self.max.y - self.min.y)
    }

    fn contains(&self, pos: Pos2) -> bool {
        pos.x >= self.min.x && pos.x <= self.max.x && pos.y >= self.min.y && pos.y <= self.max.y
    }

    fn quadrant(&self, pos: Pos2) -> usize {
        let c = self.center();
        match (pos.y >= c.y, pos.x >= c.x) {
            (false, false) => 0,
            (false, true) => 1,
            (true, false) => 2,
            (true, true) => 3,
        }
    }

    fn child(&self, quadrant: usize) -> Cell {
        let c = self.center();
        let (min, max) = match quadrant {
            0 => (self.min, c),
            1 => (Pos2::new(c.x, self.min.y), Pos2::new(self.max.x, c.y)),
            2 => (Pos2::new(self.min.x, c.y), Pos2::new(c.x, self.max.y)),
            _ => (c, self.max),
        };
        Cell { min, max }
    }
}

pub struct Quadtree {
    pub root: QuadNode,
    pub cell: Cell,
    /// Cell side / distance below which a cell is approximated.
    /// Higher = faster but coarser.
    pub theta: f32,
}

impl Quadtree {
    /// Build a tree over `(position, charge)` bodies
    pub fn build(bodies: &[(Pos2, f32)], theta: f32) -> Self {
        let mut min = Pos2::new(f32::MAX, f32::MAX);
        let mut max = Pos2::new(f32::MIN, f32::MIN);
        for (pos, _) in bodies {
            min = min.min(*pos);
            max = max.max(*pos);
        }

        if bodies.is_empty() {
            min = Pos2::ZERO;
            max = Pos2::ZERO;
        }

        // Square the box; quadrant math assumes equal sides
        let min = min - Vec2::splat(PADDING);
        let side = (max.x - min.x).max(max.y - min.y) + PADDING;
        let cell = Cell {
            min,
            max: min + Vec2::splat(side),
        };

        let mut tree = Self {
            root: QuadNode::Empty,
            cell,
            theta,
        };
        for &(pos, charge) in bodies {
            tree.root = insert(std::mem::take(&mut tree.root), pos, charge, cell, 0);
        }
        tree
    }

    /// Inverse-distance repulsion felt by a body at `pos`.
    ///
    /// The returned vector points away from the other bodies with magnitude
    /// `strength * charge / distance` per body; distances are floored at
    /// `min_distance`. A body exactly at `pos` contributes nothing.
    pub fn repulsion_at(&self, pos: Pos2, strength: f32, min_distance: f32) -> Vec2 {
        self.repulsion_in(&self.root, self.cell, pos, strength, min_distance)
    }

    fn repulsion_in(
        &self,
        node: &QuadNode,
        cell: Cell,
        pos: Pos2,
        strength: f32,
        min_distance: f32,
    ) -> Vec2 {
        match node {
            QuadNode::Empty => Vec2::ZERO,
            QuadNode::Leaf { pos: body, charge } => {
                body_force(pos - *body, *charge, strength, min_distance)
            }
            QuadNode::Internal {
                centroid,
                total_charge,
                children,
                ..
            } => {
                let delta = pos - *centroid;
                let distance = delta.length().max(min_distance);
                if !cell.contains(pos) && cell.side() / distance < self.theta {
                    return body_force(delta, *total_charge, strength, min_distance);
                }

                let mut force = Vec2::ZERO;
                for (q, child) in children.iter().enumerate() {
                    force += self.repulsion_in(child, cell.child(q), pos, strength, min_distance);
                }
                force
            }
        }
    }
}

fn body_force(delta: Vec2, charge: f32, strength: f32, min_distance: f32) -> Vec2 {
    let length = delta.length();
    if length < 1e-6 {
        return Vec2::ZERO;
    }
    let distance = length.max(min_distance);
    // direction * strength * charge / distance
    delta * (strength * charge / (length * distance))
}

fn insert(node: QuadNode, pos: Pos2, charge: f32, cell: Cell, depth: u32) -> QuadNode {
    if depth > MAX_DEPTH {
        return node;
    }

    match node {
        QuadNode::Empty => QuadNode::Leaf { pos, charge },
        QuadNode::Leaf {
            pos: existing,
            charge: existing_charge,
        } => {
            let mut children: Box<[QuadNode; 4]> = Box::default();
            let eq = cell.quadrant(existing);
            children[eq] = insert(QuadNode::Empty, existing, existing_charge, cell.child(eq), depth + 1);
            let nq = cell.quadrant(pos);
            children[nq] = insert(std::mem::take(&mut children[nq]), pos, charge, cell.child(nq), depth + 1);

            let total_charge = existing_charge + charge;
            QuadNode::Internal {
                centroid: weighted(existing, existing_charge, pos, charge),
                total_charge,
                count: 2,
                children,
            }
        }
        QuadNode::Internal {
            centroid,
            total_charge,
            count,
            mut children,
        } => {
            let q = cell.quadrant(pos);
            children[q] = insert(std::mem::take(&mut children[q]), pos, charge, cell.child(q), depth + 1);
            QuadNode::Internal {
                centroid: weighted(centroid, total_charge, pos, charge),
                total_charge: total_charge + charge,
                count: count + 1,
                children,
            }
        }
    }
}

fn weighted(a: Pos2, wa: f32, b: Pos2, wb: f32) -> Pos2 {
    let total = wa + wb;
    if total <= 0.0 {
        return Pos2::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
    }
    Pos2::new((a.x * wa + b.x * wb) / total, (a.y * wa + b.y * wb) / total)
}

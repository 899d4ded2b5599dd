//! Causal graph data structures and the force layout.

pub mod layout;
mod quadtree;
pub mod types;

pub use layout::{ForceLayout, StepReport};
pub use types::{node_radius, EdgeKind, GraphData, GraphEdge, GraphNode, GraphState, SimNode};

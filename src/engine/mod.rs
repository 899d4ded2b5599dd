//! Frame-driven engines hosting the two canvases.
//!
//! An engine owns its model exclusively. Per frame it drains queued pointer
//! events, steps the model, and paints; the host only sees the selection
//! callback, playback controls and read-only snapshots.

pub mod agent_engine;
pub mod graph_engine;

pub use agent_engine::AgentSimEngine;
pub use graph_engine::CausalGraphEngine;

/// Selection-changed callback; receives `None` when the selection clears
pub type SelectCallback<T> = Box<dyn FnMut(Option<&T>)>;

//! Agent population model and tick playback.

pub mod clock;
pub mod sim;
pub mod types;

pub use clock::{PlaybackClock, PlaybackState, Speed};
pub use sim::AgentWorld;
pub use types::{Agent, DataSource, SimulationData, Stance, StanceChange, StanceSummary};

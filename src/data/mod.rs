//! Payload adaptation and demo data.

pub mod adapter;
pub mod synthetic;

pub use adapter::{adapt_causal_graph, adapt_simulation};

//! Storage operations, one module per storage.

pub mod chunks;
pub mod documents;
pub mod graph;
pub mod stats;
pub mod status;
pub mod vectors;

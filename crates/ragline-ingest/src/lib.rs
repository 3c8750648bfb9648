//! Ragline Ingest - the indexing engine and its ingestion entry points.
//!
//! This crate provides:
//! - The [`RagEngine`] trait and the SQLite/Ollama backed [`LightRag`] engine
//! - The engine factory ([`initialize_engine`]) returning a ready handle
//! - [`index_data`] / [`index_file`] for feeding files into a ready engine
//! - Token-sized chunking and knowledge-graph extraction

mod chunker;
mod engine;
mod error;
pub mod extract;
mod factory;
mod graph;
mod ingestor;
mod query;

#[cfg(test)]
mod testing;

pub use chunker::{ChunkConfig, Chunker};
pub use engine::{LightRag, RagEngine, UNKNOWN_SOURCE};
pub use error::{IngestError, IngestResult};
pub use factory::{
    initialize_engine, initialize_engine_from_env, EngineHandle, Ready, DEFAULT_WORKING_DIR,
};
pub use ingestor::{index_data, index_file, DocumentUnit};

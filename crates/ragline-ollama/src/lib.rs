//! Ragline Ollama - Ollama integration for embeddings, completions and query prompts.
//!
//! This crate provides an async client for Ollama's API and the function
//! objects the engine is configured with: an [`EmbeddingFunc`] wrapping any
//! [`Embedder`], and a [`LanguageModel`] for completions.

mod client;
mod complete;
mod embed;
mod error;
pub mod rag;
mod types;

pub use client::OllamaClient;
pub use complete::{CompletionRequest, LanguageModel, OllamaCompletion};
pub use embed::{Embedder, EmbeddingFunc, OllamaEmbedder};
pub use error::{OllamaError, OllamaResult};
pub use rag::{QueryParam, QueryResponse, SourceReference};
pub use types::*;

//! Error types for the engine and ingestion entry points.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur while initializing the engine or ingesting documents.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Data file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("{} is not valid UTF-8: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Database(#[from] ragline_db::DbError),

    #[error("Config error: {0}")]
    Config(#[from] ragline_config::ConfigError),

    #[error("Model backend error: {0}")]
    Ollama(#[from] ragline_ollama::OllamaError),

    #[error("{0}")]
    Document(#[from] ragline_core::Error),

    #[error("Engine {0} not initialized")]
    NotInitialized(&'static str),

    #[error("Stored vectors have {found} dimensions but the embedding function produces {expected}")]
    StorageMismatch { expected: usize, found: usize },

    #[error("Processing error: {0}")]
    Processing(String),
}

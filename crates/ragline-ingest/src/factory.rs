//! Building ready-to-use engines.

use crate::engine::{LightRag, RagEngine};
use crate::error::IngestResult;
use ragline_config::Config;
use std::ops::Deref;
use std::path::Path;
use tracing::info;

/// Working directory used when the caller does not name one.
pub const DEFAULT_WORKING_DIR: &str = "./rag_storage";

/// An engine whose storages and pipeline status have been initialized.
///
/// The only way to obtain one is [`Ready::initialize`], so holding a
/// `Ready<E>` proves both setup steps completed.
pub struct Ready<E> {
    engine: E,
}

impl<E: RagEngine> Ready<E> {
    /// Run storage initialization, then pipeline-status initialization.
    ///
    /// The first failure is returned as is and the engine is dropped.
    pub async fn initialize(engine: E) -> IngestResult<Self> {
        engine.initialize_storages().await?;
        engine.initialize_pipeline_status().await?;
        Ok(Self { engine })
    }
}

impl<E> Ready<E> {
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn into_inner(self) -> E {
        self.engine
    }
}

impl<E> Deref for Ready<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.engine
    }
}

/// Handle returned by the factory.
pub type EngineHandle = Ready<LightRag>;

/// Build an Ollama-backed engine in `working_dir` and initialize it.
///
/// Model backends are configured but not contacted.
pub async fn initialize_engine(
    config: &Config,
    working_dir: impl AsRef<Path>,
) -> IngestResult<EngineHandle> {
    let working_dir = working_dir.as_ref();
    info!(
        "Initializing engine in {} (llm: {}, embeddings: {} x{})",
        working_dir.display(),
        config.llm.model,
        config.embedding.model,
        config.embedding.dim
    );

    let engine = LightRag::from_config(working_dir, config)?;
    Ready::initialize(engine).await
}

/// Like [`initialize_engine`], with configuration read from the environment
/// (and `.env`).
pub async fn initialize_engine_from_env(working_dir: impl AsRef<Path>) -> IngestResult<EngineHandle> {
    let config = Config::from_env()?;
    initialize_engine(&config, working_dir).await
}

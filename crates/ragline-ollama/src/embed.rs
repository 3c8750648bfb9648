//! Embedding function objects.

use crate::client::OllamaClient;
use crate::error::{OllamaError, OllamaResult};
use async_trait::async_trait;
use futures_util::{stream, StreamExt, TryStreamExt};
use ragline_config::EmbeddingConfig;
use ragline_core::CHARS_PER_TOKEN;
use std::sync::Arc;
use tracing::{debug, warn};

/// Anything that maps a batch of texts to one vector per text.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Name recorded next to stored vectors.
    fn model(&self) -> &str;

    async fn embed(&self, texts: &[String]) -> OllamaResult<Vec<Vec<f32>>>;
}

/// Embedder backed by an Ollama server.
#[derive(Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Build from the embedding settings. No request is made.
    pub fn from_config(config: &EmbeddingConfig) -> OllamaResult<Self> {
        let client = OllamaClient::new(&config.host)?;
        Ok(Self::new(client, &config.model))
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> OllamaResult<Vec<Vec<f32>>> {
        self.client.embed(&self.model, texts).await
    }
}

/// The embedding function handed to the engine.
///
/// Carries the declared dimensionality and input limit alongside the
/// embedder, splits work into batches and checks every returned vector.
#[derive(Clone)]
pub struct EmbeddingFunc {
    pub embedding_dim: usize,
    pub max_token_size: usize,
    pub batch_size: usize,
    pub max_async: usize,
    embedder: Arc<dyn Embedder>,
}

impl EmbeddingFunc {
    pub fn new(embedder: Arc<dyn Embedder>, embedding_dim: usize, max_token_size: usize) -> Self {
        Self {
            embedding_dim,
            max_token_size,
            batch_size: ragline_config::DEFAULT_EMBEDDING_BATCH_SIZE,
            max_async: ragline_config::DEFAULT_EMBEDDING_MAX_ASYNC,
            embedder,
        }
    }

    /// Ollama-backed embedding function from the embedding settings.
    pub fn from_config(config: &EmbeddingConfig) -> OllamaResult<Self> {
        let embedder = Arc::new(OllamaEmbedder::from_config(config)?);
        Ok(Self::new(embedder, config.dim, config.max_token_size)
            .with_batching(config.batch_size, config.max_async))
    }

    pub fn with_batching(mut self, batch_size: usize, max_async: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self.max_async = max_async.max(1);
        self
    }

    pub fn model(&self) -> &str {
        self.embedder.model()
    }

    /// Embed `texts`, returning vectors in input order.
    pub async fn embed(&self, texts: &[String]) -> OllamaResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let prepared: Vec<String> = texts
            .iter()
            .map(|t| truncate_to_tokens(t, self.max_token_size))
            .collect();

        let requests: Vec<_> = prepared
            .chunks(self.batch_size)
            .map(|batch| self.embedder.embed(batch))
            .collect();
        debug!(
            "Embedding {} texts in {} batches",
            prepared.len(),
            requests.len()
        );

        let results: Vec<Vec<Vec<f32>>> = stream::iter(requests)
            .buffered(self.max_async)
            .try_collect()
            .await?;

        let vectors: Vec<Vec<f32>> = results.into_iter().flatten().collect();
        if vectors.len() != texts.len() {
            return Err(OllamaError::ParseError(format!(
                "requested {} embeddings, received {}",
                texts.len(),
                vectors.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.embedding_dim) {
            return Err(OllamaError::DimensionMismatch {
                expected: self.embedding_dim,
                actual: bad.len(),
            });
        }

        Ok(vectors)
    }
}

/// Cut `text` to roughly `max_tokens` tokens.
fn truncate_to_tokens(text: &str, max_tokens: usize) -> String {
    let max_chars = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    warn!(
        "Truncating embedding input of {} chars to {} tokens",
        text.chars().count(),
        max_tokens
    );
    text.chars().take(max_chars).collect()
}

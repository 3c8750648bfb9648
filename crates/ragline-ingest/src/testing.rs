//! Fakes shared by the unit tests.

use crate::engine::RagEngine;
use crate::error::{IngestError, IngestResult};
use async_trait::async_trait;
use ragline_config::Config;
use ragline_ollama::{CompletionRequest, Embedder, LanguageModel, OllamaError, OllamaResult};
use std::sync::Mutex;
use std::time::Duration;

pub const EXTRACTION_JSON: &str = r#"{
    "entities": [
        {"name": "Ada Lovelace", "type": "person", "description": "Wrote the first published algorithm."},
        {"name": "Charles Babbage", "type": "person", "description": "Designed the Analytical Engine."}
    ],
    "relationships": [
        {"source": "Ada Lovelace", "target": "Charles Babbage", "keywords": "collaboration",
         "description": "Worked together on the Analytical Engine.", "weight": 2.0}
    ]
}"#;

/// Default config with the given embedding dimensionality.
pub fn test_config(dim: usize) -> Config {
    let mut config = Config::default();
    config.embedding.dim = dim;
    config
}

/// Bag-of-words embedder: each lowercase word bumps one hashed bucket.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0; self.dim];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(2_166_136_261u32, |h, b| (h ^ b as u32).wrapping_mul(16_777_619));
            v[hash as usize % self.dim] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model(&self) -> &str {
        "hash-embedder"
    }

    async fn embed(&self, texts: &[String]) -> OllamaResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

/// Language model that answers JSON requests with a canned extraction and
/// everything else with a canned answer.
pub struct FakeLlm {
    extraction: String,
    answer: String,
    unreachable: bool,
    delay: Option<Duration>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FakeLlm {
    pub fn extracting(extraction: &str) -> Self {
        Self {
            extraction: extraction.to_string(),
            answer: "ok".to_string(),
            unreachable: false,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(answer: &str) -> Self {
        Self::extracting("{}").with_answer(answer)
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::extracting("{}")
        }
    }

    pub fn with_answer(mut self, answer: &str) -> Self {
        self.answer = answer.to_string();
        self
    }

    /// Sleep before every reply so concurrent callers interleave.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for FakeLlm {
    fn model(&self) -> &str {
        "fake-llm"
    }

    async fn complete(&self, request: CompletionRequest) -> OllamaResult<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unreachable {
            return Err(OllamaError::ServerNotRunning {
                host: "http://127.0.0.1:9".to_string(),
            });
        }
        let reply = if request.json {
            self.extraction.clone()
        } else {
            self.answer.clone()
        };
        self.requests.lock().unwrap().push(request);
        Ok(reply)
    }
}

/// Engine that records every call made to it.
#[derive(Default)]
pub struct RecordingEngine {
    pub llm_model: String,
    pub fail_storages: bool,
    pub fail_pipeline_status: bool,
    pub fail_insert: bool,
    pub calls: Mutex<Vec<String>>,
    pub inserts: Mutex<Vec<(String, Vec<String>)>>,
}

impl RecordingEngine {
    pub fn from_config(config: &Config) -> Self {
        Self {
            llm_model: config.llm.model.clone(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn inserts(&self) -> Vec<(String, Vec<String>)> {
        self.inserts.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl RagEngine for RecordingEngine {
    async fn initialize_storages(&self) -> IngestResult<()> {
        self.record("initialize_storages");
        if self.fail_storages {
            return Err(IngestError::Processing("storage path is not writable".into()));
        }
        Ok(())
    }

    async fn initialize_pipeline_status(&self) -> IngestResult<()> {
        self.record("initialize_pipeline_status");
        if self.fail_pipeline_status {
            return Err(IngestError::Processing("pipeline status unavailable".into()));
        }
        Ok(())
    }

    async fn insert(&self, input: String, file_paths: Vec<String>) -> IngestResult<()> {
        self.record("insert");
        self.inserts.lock().unwrap().push((input, file_paths));
        if self.fail_insert {
            return Err(IngestError::Ollama(OllamaError::ServerNotRunning {
                host: "http://localhost:11434".to_string(),
            }));
        }
        Ok(())
    }
}

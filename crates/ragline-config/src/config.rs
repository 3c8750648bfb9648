//! Configuration structures and loading.

use crate::env;
use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const DEFAULT_LLM_MODEL: &str = "qwen2:latest";
pub const DEFAULT_LLM_HOST: &str = "http://localhost:11434";
pub const DEFAULT_TIMEOUT_MS: u64 = 300_000;
pub const DEFAULT_NUM_CTX: u32 = 32_768;
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_EMBEDDING_HOST: &str = "http://localhost:11434";
pub const DEFAULT_EMBEDDING_DIM: usize = 1024;
pub const DEFAULT_MAX_EMBED_TOKENS: usize = 8192;
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 10;
pub const DEFAULT_EMBEDDING_MAX_ASYNC: usize = 4;
pub const DEFAULT_SUMMARY_MAX_TOKENS: usize = 8192;
pub const DEFAULT_CHUNK_TOKEN_SIZE: usize = 1200;
pub const DEFAULT_CHUNK_OVERLAP_TOKEN_SIZE: usize = 100;

/// Complete engine configuration.
///
/// Built once at startup and handed to the engine factory; nothing reads the
/// process environment after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Token budget for merged entity and relation descriptions.
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: usize,

    /// Extract entities and relations into the graph storage during insert.
    #[serde(default = "default_entity_extraction")]
    pub entity_extraction: bool,
}

fn default_summary_max_tokens() -> usize {
    DEFAULT_SUMMARY_MAX_TOKENS
}

fn default_entity_extraction() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            chunking: ChunkingConfig::default(),
            summary_max_tokens: DEFAULT_SUMMARY_MAX_TOKENS,
            entity_extraction: true,
        }
    }
}

impl Config {
    /// Defaults overlaid with the process environment, after loading `.env`.
    ///
    /// Variables already present in the environment win over `.env` entries.
    pub fn from_env() -> ConfigResult<Self> {
        load_dotenv();
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Defaults overlaid with the variables produced by `lookup`.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_env_with(lookup)?;
        Ok(config)
    }

    /// Load a TOML file (if it exists), then overlay `.env` and the environment.
    pub fn load_layered(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::default(),
        };
        load_dotenv();
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a TOML file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay variables from the process environment.
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay variables produced by `lookup`; unset variables keep the current value.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup(env::LLM_MODEL) {
            self.llm.model = model;
        }
        if let Some(host) = lookup(env::LLM_BINDING_HOST) {
            self.llm.host = host;
        }
        if let Some(value) = lookup(env::TIMEOUT) {
            self.llm.timeout_ms = parse_number(env::TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(env::EMBEDDING_DIM) {
            self.embedding.dim = parse_number(env::EMBEDDING_DIM, &value)?;
        }
        if let Some(value) = lookup(env::MAX_EMBED_TOKENS) {
            self.embedding.max_token_size = parse_number(env::MAX_EMBED_TOKENS, &value)?;
        }
        if let Some(model) = lookup(env::EMBEDDING_MODEL) {
            self.embedding.model = model;
        }
        if let Some(host) = lookup(env::EMBEDDING_BINDING_HOST) {
            self.embedding.host = host;
        }

        self.validate()
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.embedding.dim == 0 {
            return Err(ConfigError::Invalid("embedding dimension must be positive".into()));
        }
        if self.embedding.batch_size == 0 || self.embedding.max_async == 0 {
            return Err(ConfigError::Invalid(
                "embedding batch size and concurrency must be positive".into(),
            ));
        }
        if self.chunking.chunk_token_size == 0 {
            return Err(ConfigError::Invalid("chunk token size must be positive".into()));
        }
        if self.chunking.chunk_overlap_token_size >= self.chunking.chunk_token_size {
            return Err(ConfigError::Invalid(
                "chunk overlap must be smaller than the chunk size".into(),
            ));
        }
        Ok(())
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let contents = self.to_toml_string()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }
}

fn load_dotenv() {
    load_dotenv_from(None);
}

/// Load `path`, or the nearest `.env` above the current directory.
/// Variables that are already set are never replaced.
fn load_dotenv_from(path: Option<&Path>) {
    let loaded = match path {
        Some(path) => dotenv::from_path(path).map(|()| path.to_path_buf()),
        None => dotenv::dotenv(),
    };
    match loaded {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => debug!("Ignoring unreadable .env file: {}", e),
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
    })
}

/// Language-model backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub host: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Context window requested from the model server.
    pub num_ctx: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_LLM_MODEL.to_string(),
            host: DEFAULT_LLM_HOST.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            num_ctx: DEFAULT_NUM_CTX,
        }
    }
}

/// Embedding backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub host: String,
    pub dim: usize,
    pub max_token_size: usize,
    /// Number of texts sent per embedding request.
    pub batch_size: usize,
    /// Embedding requests allowed in flight at once.
    pub max_async: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            host: DEFAULT_EMBEDDING_HOST.to_string(),
            dim: DEFAULT_EMBEDDING_DIM,
            max_token_size: DEFAULT_MAX_EMBED_TOKENS,
            batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
            max_async: DEFAULT_EMBEDDING_MAX_ASYNC,
        }
    }
}

/// Chunking settings, in estimated tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_token_size: usize,
    pub chunk_overlap_token_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_token_size: DEFAULT_CHUNK_TOKEN_SIZE,
            chunk_overlap_token_size: DEFAULT_CHUNK_OVERLAP_TOKEN_SIZE,
        }
    }
}

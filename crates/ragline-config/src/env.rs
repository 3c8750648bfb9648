//! Names of the environment variables the engine configuration reads.

pub const LLM_MODEL: &str = "LLM_MODEL";
pub const LLM_BINDING_HOST: &str = "LLM_BINDING_HOST";
pub const TIMEOUT: &str = "TIMEOUT";
pub const EMBEDDING_DIM: &str = "EMBEDDING_DIM";
pub const MAX_EMBED_TOKENS: &str = "MAX_EMBED_TOKENS";
pub const EMBEDDING_MODEL: &str = "EMBEDDING_MODEL";
pub const EMBEDDING_BINDING_HOST: &str = "EMBEDDING_BINDING_HOST";

/// Every variable consulted by [`crate::Config::apply_env_with`].
pub const ALL: [&str; 7] = [
    LLM_MODEL,
    LLM_BINDING_HOST,
    TIMEOUT,
    EMBEDDING_DIM,
    MAX_EMBED_TOKENS,
    EMBEDDING_MODEL,
    EMBEDDING_BINDING_HOST,
];

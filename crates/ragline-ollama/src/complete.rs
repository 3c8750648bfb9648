//! Completion function objects.

use crate::client::OllamaClient;
use crate::error::OllamaResult;
use crate::types::{GenerateOptions, GenerateRequest};
use async_trait::async_trait;
use ragline_config::LlmConfig;
use std::time::Duration;

/// A single prompt for a language model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system: Option<String>,
    /// Constrain the output to a JSON document.
    pub json: bool,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Anything that turns a prompt into generated text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> OllamaResult<String>;
}

/// Language model served by Ollama's /api/generate.
#[derive(Clone)]
pub struct OllamaCompletion {
    client: OllamaClient,
    model: String,
    num_ctx: u32,
}

impl OllamaCompletion {
    pub fn new(client: OllamaClient, model: impl Into<String>, num_ctx: u32) -> Self {
        Self {
            client,
            model: model.into(),
            num_ctx,
        }
    }

    /// Build from the language-model settings. No request is made.
    pub fn from_config(config: &LlmConfig) -> OllamaResult<Self> {
        let client =
            OllamaClient::with_timeout(&config.host, Duration::from_millis(config.timeout_ms))?;
        Ok(Self::new(client, &config.model, config.num_ctx))
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    fn to_generate_request(&self, request: CompletionRequest) -> GenerateRequest {
        let mut options = GenerateOptions::new().with_num_ctx(self.num_ctx);
        if let Some(max_tokens) = request.max_tokens {
            options = options.with_num_predict(max_tokens as i32);
        }
        if let Some(temperature) = request.temperature {
            options = options.with_temperature(temperature);
        }

        let mut generate = GenerateRequest::new(&self.model, request.prompt).with_options(options);
        if let Some(system) = request.system {
            generate = generate.with_system(system);
        }
        if request.json {
            generate = generate.with_json_format();
        }
        generate
    }
}

#[async_trait]
impl LanguageModel for OllamaCompletion {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> OllamaResult<String> {
        let generate = self.to_generate_request(request);
        let response = self.client.generate(generate).await?;
        Ok(response.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_uses_model_and_context() {
        let config = LlmConfig::default();
        let llm = OllamaCompletion::from_config(&config).unwrap();

        assert_eq!(llm.model(), "qwen2:latest");
        assert_eq!(llm.client().host(), "http://localhost:11434");

        let request = llm.to_generate_request(
            CompletionRequest::new("Summarize")
                .with_system("Be brief.")
                .json()
                .with_max_tokens(256),
        );
        assert_eq!(request.model, "qwen2:latest");
        assert_eq!(request.system.as_deref(), Some("Be brief."));
        assert_eq!(request.format.as_deref(), Some("json"));
        let options = request.options.unwrap();
        assert_eq!(options.num_ctx, Some(32768));
        assert_eq!(options.num_predict, Some(256));
    }

    #[test]
    fn test_plain_request() {
        let llm = OllamaCompletion::from_config(&LlmConfig::default()).unwrap();
        let request = llm.to_generate_request(CompletionRequest::new("Hello"));

        assert!(request.format.is_none());
        assert!(request.system.is_none());
        assert_eq!(request.options.unwrap().num_predict, None);
    }
}

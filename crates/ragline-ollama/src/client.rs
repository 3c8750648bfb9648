//! Ollama HTTP client.

use crate::error::{OllamaError, OllamaResult};
use crate::types::*;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

/// Timeout for clients built without an explicit one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for interacting with Ollama's API.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    host: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a client for `host` with the given request timeout.
    ///
    /// Building the client does not contact the server.
    pub fn with_timeout(host: impl Into<String>, timeout: Duration) -> OllamaResult<Self> {
        let host = host.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(OllamaError::Http)?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Create a new client with default settings.
    pub fn new(host: impl Into<String>) -> OllamaResult<Self> {
        Self::with_timeout(host, DEFAULT_TIMEOUT)
    }

    /// Base URL this client talks to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Check if Ollama server is available.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.host);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// List all available models.
    pub async fn list_models(&self) -> OllamaResult<Vec<ModelInfo>> {
        let url = format!("{}/api/tags", self.host);
        debug!("Listing models from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = Self::check_status(response, None).await?;

        let list: ListModelsResponse = response.json().await?;
        Ok(list.models)
    }

    /// Check if a specific model is available.
    pub async fn has_model(&self, model: &str) -> OllamaResult<bool> {
        let models = self.list_models().await?;
        // Check both exact match and model without tag
        Ok(models
            .iter()
            .any(|m| m.name == model || m.name.starts_with(&format!("{}:", model))))
    }

    /// Embed a batch of texts with one request.
    pub async fn embed(&self, model: &str, texts: &[String]) -> OllamaResult<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.host);
        debug!("Embedding {} texts with model {}", texts.len(), model);

        let request = EmbedRequest {
            model: model.to_string(),
            input: texts.to_vec(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = Self::check_status(response, Some(model)).await?;

        let embed_response: EmbedResponse = response.json().await?;
        if embed_response.embeddings.len() != texts.len() {
            return Err(OllamaError::ParseError(format!(
                "requested {} embeddings, received {}",
                texts.len(),
                embed_response.embeddings.len()
            )));
        }

        Ok(embed_response.embeddings)
    }

    /// Generate text (non-streaming).
    pub async fn generate(&self, request: GenerateRequest) -> OllamaResult<GenerateResponse> {
        let url = format!("{}/api/generate", self.host);
        debug!("Generating with model {}", request.model);

        // Ensure streaming is off for this method
        let mut request = request;
        request.stream = false;

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = Self::check_status(response, Some(&request.model)).await?;

        let generate_response: GenerateResponse = response.json().await?;
        Ok(generate_response)
    }

    fn send_error(&self, e: reqwest::Error) -> OllamaError {
        if e.is_connect() {
            OllamaError::ServerNotRunning {
                host: self.host.clone(),
            }
        } else if e.is_timeout() {
            OllamaError::Timeout {
                millis: self.timeout.as_millis(),
            }
        } else {
            OllamaError::Http(e)
        }
    }

    async fn check_status(response: Response, model: Option<&str>) -> OllamaResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.error)
            .unwrap_or(text);

        if let Some(model) = model {
            if message.contains("not found") || status.as_u16() == 404 {
                return Err(OllamaError::ModelNotFound {
                    model: model.to_string(),
                });
            }
        }

        Err(OllamaError::ApiError {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OllamaClient::new("http://localhost:11434/");
        assert!(client.is_ok());
        assert_eq!(client.unwrap().host(), "http://localhost:11434");
    }

    #[test]
    fn test_client_with_timeout() {
        let client =
            OllamaClient::with_timeout("http://gpu-box:11434", Duration::from_millis(300_000))
                .unwrap();
        assert_eq!(client.timeout, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        // Port 9 (discard) is closed on test machines
        let client =
            OllamaClient::with_timeout("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();

        assert!(!client.is_available().await);
        let err = client.embed("nomic-embed-text", &["hi".to_string()]).await;
        assert!(err.is_err());
    }
}

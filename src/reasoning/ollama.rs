//! Ollama Sampling Backend
//!
//! Backend for local Ollama inference. Useful for development and testing
//! without cloud API costs.
//!
//! # Requirements
//!
//! - Ollama must be running locally (default: http://localhost:11434)
//! - A model must be pulled (e.g., `ollama pull qwen3:0.6b`)
//!
//! # Example
//!
//! ```rust,ignore
//! let backend = OllamaBackend::new("qwen3:0.6b");
//! let answer = backend.sample("What is 2+2?", 0.0).await?;
//! ```

use crate::reasoning::runner::SampleBackend;
use crate::reasoning::ReasoningError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Default Ollama server URL
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Ollama sampling backend for local inference
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    /// Base URL for Ollama API
    base_url: String,
    /// Model name (e.g., "qwen3:0.6b", "llama2")
    model: String,
    /// Request timeout
    timeout: Duration,
    /// HTTP client
    client: Client,
}

impl OllamaBackend {
    /// Create a new Ollama backend with the default URL
    pub fn new(model: &str) -> Self {
        Self::with_url(model, DEFAULT_OLLAMA_URL)
    }

    /// Create a new Ollama backend with a custom URL
    pub fn with_url(model: &str, base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout: Duration::from_secs(120),
            client: Client::new(),
        }
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Request body for Ollama /api/generate endpoint
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
}

/// Response from Ollama /api/generate endpoint
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

impl SampleBackend for OllamaBackend {
    fn sample(
        &self,
        prompt: &str,
        temperature: f64,
    ) -> Pin<Box<dyn Future<Output = Result<String, ReasoningError>> + Send + '_>> {
        let prompt = prompt.to_string();

        Box::pin(async move {
            let start = std::time::Instant::now();

            let request = OllamaRequest {
                model: self.model.clone(),
                prompt,
                stream: false,
                options: OllamaOptions { temperature },
            };

            let url = format!("{}/api/generate", self.base_url);

            let response = self
                .client
                .post(&url)
                .json(&request)
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        ReasoningError::Timeout {
                            elapsed: start.elapsed(),
                        }
                    } else if e.is_connect() {
                        ReasoningError::BackendUnavailable(format!("Connection failed: {}", e))
                    } else {
                        ReasoningError::BackendUnavailable(e.to_string())
                    }
                })?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(ReasoningError::ApiError {
                    status: status.as_u16(),
                    message,
                });
            }

            let body: OllamaResponse = response.json().await.map_err(|e| {
                ReasoningError::InvalidResponse(format!("Failed to parse response: {}", e))
            })?;

            Ok(body.response)
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn backend_name(&self) -> &str {
        "ollama"
    }
}

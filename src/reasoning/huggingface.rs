//! HuggingFace Inference API Sampling Backend
//!
//! Backend for hosted text generation via the HuggingFace Inference API.
//!
//! # Requirements
//!
//! - `HF_API_TOKEN` environment variable must be set
//!
//! # Example
//!
//! ```rust,ignore
//! let backend = HuggingFaceBackend::new("Qwen/Qwen2.5-0.5B-Instruct")?;
//! let answer = backend.sample("What is 2+2?", 0.0).await?;
//! ```

use crate::reasoning::runner::SampleBackend;
use crate::reasoning::ReasoningError;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Default HuggingFace Inference API URL
pub const DEFAULT_HF_URL: &str = "https://api-inference.huggingface.co";

/// HuggingFace Inference API backend
#[derive(Debug, Clone)]
pub struct HuggingFaceBackend {
    /// Base URL for the Inference API
    base_url: String,
    /// Model repository id (e.g., "Qwen/Qwen2.5-0.5B-Instruct")
    model: String,
    /// Request timeout
    timeout: Duration,
    /// HTTP client with auth headers
    client: Client,
}

impl HuggingFaceBackend {
    /// Create a new backend, reading the API token from `HF_API_TOKEN`
    pub fn new(model: &str) -> Result<Self, ReasoningError> {
        let token = env::var("HF_API_TOKEN").map_err(|_| ReasoningError::ApiError {
            status: 401,
            message: "HF_API_TOKEN environment variable not set".to_string(),
        })?;

        Self::with_token(model, &token)
    }

    /// Create a new backend with an explicit API token
    pub fn with_token(model: &str, token: &str) -> Result<Self, ReasoningError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                ReasoningError::InvalidResponse(format!("Invalid token format: {}", e))
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| {
                ReasoningError::BackendUnavailable(format!("Failed to create client: {}", e))
            })?;

        Ok(Self {
            base_url: DEFAULT_HF_URL.to_string(),
            model: model.to_string(),
            timeout: Duration::from_secs(120),
            client,
        })
    }

    /// Set custom base URL (for proxies or self-hosted endpoints)
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Request body for the text-generation task
#[derive(Debug, Serialize)]
struct HfRequest {
    inputs: String,
    parameters: HfParameters,
}

#[derive(Debug, Serialize)]
struct HfParameters {
    temperature: f64,
    return_full_text: bool,
}

/// One generation from the Inference API
#[derive(Debug, Deserialize)]
struct HfGeneration {
    generated_text: String,
}

impl SampleBackend for HuggingFaceBackend {
    fn sample(
        &self,
        prompt: &str,
        temperature: f64,
    ) -> Pin<Box<dyn Future<Output = Result<String, ReasoningError>> + Send + '_>> {
        let prompt = prompt.to_string();

        Box::pin(async move {
            let start = std::time::Instant::now();

            let request = HfRequest {
                inputs: prompt,
                parameters: HfParameters {
                    // The API rejects temperature 0.0; clamp to the minimum it accepts
                    temperature: temperature.max(0.01),
                    return_full_text: false,
                },
            };

            let url = format!("{}/models/{}", self.base_url, self.model);

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

            let generations: Vec<HfGeneration> = response.json().await.map_err(|e| {
                ReasoningError::InvalidResponse(format!("Failed to parse response: {}", e))
            })?;

            generations
                .into_iter()
                .next()
                .map(|g| g.generated_text)
                .ok_or_else(|| {
                    ReasoningError::InvalidResponse("Empty generation list".to_string())
                })
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn backend_name(&self) -> &str {
        "huggingface"
    }
}

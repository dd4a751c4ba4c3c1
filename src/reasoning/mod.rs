//! Reasoning Collaborator Interface
//!
//! Defines the narrow contract the fusion engine consumes from the multi-path
//! reasoning engine: a [`ReasoningEngine`] trait producing a
//! [`ReasoningResult`] with per-path confidences. How paths are sampled and
//! how confidence is derived from model internals are collaborator-owned
//! policies; the shipped [`runner::PathRunner`] implements one such policy
//! over pluggable sampling backends.
//!
//! # Architecture
//!
//! ```text
//! IntegratedAnalyzer → ReasoningEngine trait → [PathRunner → SampleBackend]
//! ```

pub mod huggingface;
pub mod ollama;
pub mod runner;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// One candidate answer produced by the multi-path reasoning engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningPath {
    /// The candidate answer text
    pub answer: String,
    /// Confidence assigned to this path, in [0, 1]
    pub confidence: f64,
}

impl ReasoningPath {
    /// Create a new reasoning path
    pub fn new(answer: &str, confidence: f64) -> Self {
        Self {
            answer: answer.to_string(),
            confidence,
        }
    }
}

/// Result of one reasoning engine invocation
///
/// Immutable once produced; the orchestrator owns it for the duration of a
/// single fusion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningResult {
    /// The selected final answer
    pub final_answer: String,
    /// Mean confidence over the retained paths, in [0, 1]
    pub average_confidence: f64,
    /// All retained per-path records, in generation order
    pub reasoning_paths: Vec<ReasoningPath>,
    /// Backend/model metadata, if the engine reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_info: Option<HashMap<String, String>>,
}

/// Options for a single `generate` call
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Number of reasoning paths to sample
    pub num_paths: usize,
    /// Fraction of paths retained after confidence-based pruning, in (0, 1]
    pub keep_ratio: f64,
    /// Sampling temperature for diversity paths
    pub temperature: f64,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            num_paths: 8,
            keep_ratio: 0.8,
            temperature: 0.7,
        }
    }
}

impl GenerateOptions {
    /// Set the number of paths to sample
    pub fn with_num_paths(mut self, n: usize) -> Self {
        self.num_paths = n.max(1);
        self
    }

    /// Set the keep ratio
    pub fn with_keep_ratio(mut self, ratio: f64) -> Self {
        self.keep_ratio = ratio.clamp(f64::EPSILON, 1.0);
        self
    }

    /// Set the diversity temperature
    pub fn with_temperature(mut self, t: f64) -> Self {
        self.temperature = t;
        self
    }
}

/// Errors from the reasoning collaborator
#[derive(Debug, Clone, PartialEq)]
pub enum ReasoningError {
    /// The backing model endpoint could not be reached
    BackendUnavailable(String),
    /// The request timed out
    Timeout {
        /// Time elapsed before giving up
        elapsed: Duration,
    },
    /// The backend returned an error response
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the backend
        message: String,
    },
    /// The backend response could not be parsed
    InvalidResponse(String),
    /// Every sampled path failed
    NoPaths {
        /// Number of sampling attempts made
        attempted: usize,
    },
    /// Invalid run parameters
    InvalidConfig {
        /// Description of the configuration error
        message: String,
    },
}

impl std::fmt::Display for ReasoningError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReasoningError::BackendUnavailable(msg) => {
                write!(f, "Reasoning backend unavailable: {}", msg)
            }
            ReasoningError::Timeout { elapsed } => {
                write!(f, "Reasoning timed out after {:?}", elapsed)
            }
            ReasoningError::ApiError { status, message } => {
                write!(f, "Backend error {}: {}", status, message)
            }
            ReasoningError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            ReasoningError::NoPaths { attempted } => {
                write!(f, "No reasoning paths survived ({} attempted)", attempted)
            }
            ReasoningError::InvalidConfig { message } => {
                write!(f, "Invalid configuration: {}", message)
            }
        }
    }
}

impl std::error::Error for ReasoningError {}

/// Unified trait for reasoning engines
///
/// Object-safe through explicit boxing of the async return type, so the
/// orchestrator can hold any engine behind `Arc<dyn ReasoningEngine>`.
pub trait ReasoningEngine: Send + Sync {
    /// Run multi-path reasoning for the given prompt
    ///
    /// # Arguments
    /// * `prompt` - The reasoning prompt
    /// * `options` - Sampling options (path count, keep ratio, temperature)
    ///
    /// # Returns
    /// * `Ok(ReasoningResult)` - Final answer with per-path confidences
    /// * `Err(ReasoningError)` - The whole invocation failed
    fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Pin<Box<dyn Future<Output = Result<ReasoningResult, ReasoningError>> + Send + '_>>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Mock reasoning engine for testing
///
/// Returns a queue of canned results, cycling when exhausted. An optional
/// delay simulates inference latency for concurrency tests.
#[derive(Debug, Clone)]
pub struct MockReasoningEngine {
    results: Vec<Result<ReasoningResult, ReasoningError>>,
    index: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    delay: Option<Duration>,
    model: String,
}

impl MockReasoningEngine {
    /// Create a mock from a queue of results
    pub fn new(results: Vec<Result<ReasoningResult, ReasoningError>>) -> Self {
        Self {
            results,
            index: std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0)),
            delay: None,
            model: "mock-reasoner".to_string(),
        }
    }

    /// Create a mock that always reports the given answer and confidence
    pub fn constant(answer: &str, confidence: f64) -> Self {
        Self::new(vec![Ok(ReasoningResult {
            final_answer: answer.to_string(),
            average_confidence: confidence,
            reasoning_paths: vec![ReasoningPath::new(answer, confidence)],
            model_info: None,
        })])
    }

    /// Create a mock that always fails
    pub fn failing(message: &str) -> Self {
        Self::new(vec![Err(ReasoningError::BackendUnavailable(
            message.to_string(),
        ))])
    }

    /// Add simulated inference latency
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl ReasoningEngine for MockReasoningEngine {
    fn generate(
        &self,
        _prompt: &str,
        _options: &GenerateOptions,
    ) -> Pin<Box<dyn Future<Output = Result<ReasoningResult, ReasoningError>> + Send + '_>> {
        let idx = self
            .index
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let result = if self.results.is_empty() {
            Err(ReasoningError::NoPaths { attempted: 0 })
        } else {
            self.results[idx % self.results.len()].clone()
        };
        let delay = self.delay;

        Box::pin(async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            result
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

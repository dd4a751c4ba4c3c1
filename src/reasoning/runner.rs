//! Multi-Path Reasoning Runner
//!
//! Samples multiple candidate answers from a backing model, assigns each path
//! an agreement-based confidence, prunes low-confidence paths by keep ratio,
//! and selects the final answer by confidence-weighted vote.
//!
//! # Modes
//!
//! - [`RunMode::Offline`]: generate all `num_paths` before selecting survivors
//! - [`RunMode::Online`]: sample sequentially and stop early once the leading
//!   answer's agreement share reaches the configured threshold
//!
//! # Confidence Policy
//!
//! A path's confidence is the fraction of sampled paths that agree with its
//! (whitespace-normalized) answer. This keeps the runner model-agnostic:
//! backends only have to return text.

use crate::reasoning::{
    GenerateOptions, ReasoningEngine, ReasoningError, ReasoningPath, ReasoningResult,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::warn;

/// A text sampling backend for the path runner
///
/// The minimal seam between the runner and a concrete model endpoint.
/// Object-safe so backends can be swapped behind `Arc<dyn SampleBackend>`.
pub trait SampleBackend: Send + Sync {
    /// Sample one completion for the prompt at the given temperature
    fn sample(
        &self,
        prompt: &str,
        temperature: f64,
    ) -> Pin<Box<dyn Future<Output = Result<String, ReasoningError>> + Send + '_>>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;

    /// Get the backend name (e.g. "ollama", "huggingface")
    fn backend_name(&self) -> &str;
}

/// Execution mode for a path run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Generate all paths before selecting survivors
    Offline,
    /// Permit early termination once agreement is strong enough
    Online,
}

/// Configuration for the path runner
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Maximum concurrent samples in offline mode
    pub max_concurrent: usize,
    /// Temperature for diversity paths (the first path uses T=0)
    pub diversity_temperature: f64,
    /// Agreement share at which online mode may stop early
    pub early_stop_agreement: f64,
    /// Minimum paths sampled before online mode may stop
    pub min_paths_before_stop: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            diversity_temperature: 0.7,
            early_stop_agreement: 0.9,
            min_paths_before_stop: 3,
        }
    }
}

impl RunConfig {
    /// Set maximum concurrent samples
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    /// Set the diversity temperature
    pub fn with_diversity_temperature(mut self, t: f64) -> Self {
        self.diversity_temperature = t;
        self
    }

    /// Set the early-stop agreement threshold
    pub fn with_early_stop_agreement(mut self, share: f64) -> Self {
        self.early_stop_agreement = share.clamp(0.0, 1.0);
        self
    }
}

/// Result of a path-oriented run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathRunResult {
    /// The selected final answer
    pub final_answer: String,
    /// Every successfully sampled path, in generation order
    pub all_paths: Vec<ReasoningPath>,
    /// The subset of `all_paths` surviving keep-ratio retention
    pub kept_paths: Vec<ReasoningPath>,
    /// Confidences of the kept paths, aligned with `kept_paths`
    pub kept_confidences: Vec<f64>,
}

/// Multi-path reasoning runner over a pluggable sampling backend
pub struct PathRunner {
    backend: Arc<dyn SampleBackend>,
    config: RunConfig,
    default_options: GenerateOptions,
}

impl PathRunner {
    /// Create a runner with default configuration
    pub fn new(backend: Arc<dyn SampleBackend>) -> Self {
        Self {
            backend,
            config: RunConfig::default(),
            default_options: GenerateOptions::default(),
        }
    }

    /// Set the run configuration
    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the options used by the `ReasoningEngine::generate` entry point
    pub fn with_default_options(mut self, options: GenerateOptions) -> Self {
        self.default_options = options;
        self
    }

    /// Execute a multi-path run with the configured diversity temperature
    ///
    /// # Arguments
    /// * `prompt` - The reasoning prompt
    /// * `mode` - Offline (all paths) or Online (early stop permitted)
    /// * `num_paths` - Number of paths to sample (>= 1)
    /// * `keep_ratio` - Fraction of paths retained, in (0, 1]
    pub async fn run(
        &self,
        prompt: &str,
        mode: RunMode,
        num_paths: usize,
        keep_ratio: f64,
    ) -> Result<PathRunResult, ReasoningError> {
        self.run_with_temperature(
            prompt,
            mode,
            num_paths,
            keep_ratio,
            self.config.diversity_temperature,
        )
        .await
    }

    /// Execute a multi-path run with an explicit diversity temperature
    ///
    /// The first path always samples at T=0; `temperature` applies to the
    /// remaining diversity paths, overriding the configured default.
    pub async fn run_with_temperature(
        &self,
        prompt: &str,
        mode: RunMode,
        num_paths: usize,
        keep_ratio: f64,
        temperature: f64,
    ) -> Result<PathRunResult, ReasoningError> {
        if num_paths == 0 {
            return Err(ReasoningError::InvalidConfig {
                message: "num_paths must be >= 1".to_string(),
            });
        }
        if !(keep_ratio > 0.0 && keep_ratio <= 1.0) {
            return Err(ReasoningError::InvalidConfig {
                message: format!("keep_ratio must be in (0, 1], got {}", keep_ratio),
            });
        }

        let answers = match mode {
            RunMode::Offline => self.sample_offline(prompt, num_paths, temperature).await,
            RunMode::Online => self.sample_online(prompt, num_paths, temperature).await,
        };

        if answers.is_empty() {
            return Err(ReasoningError::NoPaths {
                attempted: num_paths,
            });
        }

        Ok(score_and_select(&answers, keep_ratio))
    }

    /// Sample all paths concurrently with bounded parallelism
    async fn sample_offline(
        &self,
        prompt: &str,
        num_paths: usize,
        diversity_temperature: f64,
    ) -> Vec<String> {
        let mut answers: Vec<(usize, String)> = Vec::with_capacity(num_paths);
        let mut join_set: JoinSet<(usize, Result<String, ReasoningError>)> = JoinSet::new();
        let mut next_index = 0;

        while next_index < num_paths || !join_set.is_empty() {
            // Fill up to max_concurrent in-flight samples
            while next_index < num_paths && join_set.len() < self.config.max_concurrent {
                let backend = Arc::clone(&self.backend);
                let prompt = prompt.to_string();
                let temperature = temperature_for(next_index, diversity_temperature);
                let index = next_index;
                next_index += 1;

                join_set.spawn(async move {
                    (index, backend.sample(&prompt, temperature).await)
                });
            }

            match join_set.join_next().await {
                Some(Ok((index, Ok(answer)))) => answers.push((index, answer)),
                Some(Ok((index, Err(e)))) => {
                    warn!(path = index, error = %e, "reasoning path failed");
                }
                Some(Err(e)) => warn!(error = %e, "reasoning path task panicked"),
                None => break,
            }
        }

        // Restore generation order
        answers.sort_by_key(|(index, _)| *index);
        answers.into_iter().map(|(_, answer)| answer).collect()
    }

    /// Sample sequentially, stopping early once agreement is strong enough
    async fn sample_online(
        &self,
        prompt: &str,
        num_paths: usize,
        diversity_temperature: f64,
    ) -> Vec<String> {
        let mut answers: Vec<String> = Vec::with_capacity(num_paths);

        for index in 0..num_paths {
            let temperature = temperature_for(index, diversity_temperature);
            match self.backend.sample(prompt, temperature).await {
                Ok(answer) => answers.push(answer),
                Err(e) => {
                    warn!(path = index, error = %e, "reasoning path failed");
                    continue;
                }
            }

            if answers.len() >= self.config.min_paths_before_stop
                && leader_share(&answers) >= self.config.early_stop_agreement
            {
                break;
            }
        }

        answers
    }
}

/// First path is deterministic, the rest explore
fn temperature_for(index: usize, diversity_temperature: f64) -> f64 {
    if index == 0 {
        0.0
    } else {
        diversity_temperature
    }
}

impl ReasoningEngine for PathRunner {
    fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Pin<Box<dyn Future<Output = Result<ReasoningResult, ReasoningError>> + Send + '_>> {
        let prompt = prompt.to_string();
        let num_paths = options.num_paths.max(1);
        let keep_ratio = options.keep_ratio;
        let temperature = options.temperature;

        Box::pin(async move {
            let run = self
                .run_with_temperature(&prompt, RunMode::Offline, num_paths, keep_ratio, temperature)
                .await?;

            let average_confidence = if run.kept_confidences.is_empty() {
                0.0
            } else {
                run.kept_confidences.iter().sum::<f64>() / run.kept_confidences.len() as f64
            };

            Ok(ReasoningResult {
                final_answer: run.final_answer,
                average_confidence,
                reasoning_paths: run.kept_paths,
                model_info: Some(HashMap::from([
                    (
                        "backend".to_string(),
                        self.backend.backend_name().to_string(),
                    ),
                    ("model".to_string(), self.backend.model_name().to_string()),
                ])),
            })
        })
    }

    fn model_name(&self) -> &str {
        self.backend.model_name()
    }
}

/// Normalize whitespace for answer comparison
fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Agreement share of the most common normalized answer
fn leader_share(answers: &[String]) -> f64 {
    if answers.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<String, usize> = HashMap::new();
    for answer in answers {
        *counts.entry(normalize(answer)).or_insert(0) += 1;
    }
    let leader = counts.values().copied().max().unwrap_or(0);
    leader as f64 / answers.len() as f64
}

/// Score paths by agreement, retain the top keep-ratio fraction, and pick the
/// final answer by confidence-weighted vote over the survivors
fn score_and_select(answers: &[String], keep_ratio: f64) -> PathRunResult {
    let total = answers.len();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for answer in answers {
        *counts.entry(normalize(answer)).or_insert(0) += 1;
    }

    let all_paths: Vec<ReasoningPath> = answers
        .iter()
        .map(|answer| {
            let agree = counts.get(&normalize(answer)).copied().unwrap_or(0);
            ReasoningPath::new(answer, agree as f64 / total as f64)
        })
        .collect();

    // Retain approximately keep_ratio * total paths, highest confidence first
    let target = ((keep_ratio * total as f64).round() as usize).clamp(1, total);
    let mut ranked: Vec<usize> = (0..total).collect();
    ranked.sort_by(|&a, &b| {
        all_paths[b]
            .confidence
            .partial_cmp(&all_paths[a].confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    let mut keep_flags = vec![false; total];
    for &index in ranked.iter().take(target) {
        keep_flags[index] = true;
    }

    let kept_paths: Vec<ReasoningPath> = all_paths
        .iter()
        .zip(&keep_flags)
        .filter(|(_, &keep)| keep)
        .map(|(path, _)| path.clone())
        .collect();
    let kept_confidences: Vec<f64> = kept_paths.iter().map(|p| p.confidence).collect();

    // Confidence-weighted vote over survivors
    let mut weights: HashMap<String, (f64, &str)> = HashMap::new();
    for path in &kept_paths {
        let entry = weights
            .entry(normalize(&path.answer))
            .or_insert((0.0, path.answer.as_str()));
        entry.0 += path.confidence;
    }
    let final_answer = weights
        .values()
        .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(_, answer)| answer.to_string())
        .unwrap_or_default();

    PathRunResult {
        final_answer,
        all_paths,
        kept_paths,
        kept_confidences,
    }
}

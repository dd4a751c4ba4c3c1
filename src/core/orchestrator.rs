//! Integrated Analysis Orchestrator
//!
//! Runs the reasoning branch and the behavior branch concurrently, isolates
//! per-branch failure, measures wall-clock cost around the concurrent region,
//! and assembles the fused [`IntegratedResult`].
//!
//! # Failure Policy
//!
//! - A collaborator that failed to initialize is recorded at construction and
//!   surfaced via [`IntegratedAnalyzer::status`], never raised.
//! - A branch that fails during a call is caught, logged, and treated as
//!   absent for fusion; it cannot abort or taint the other branch.
//! - Assembly never raises: when both branches are absent the caller receives
//!   the explicit zeroed fallback with [`FusionStatus::Failed`], still
//!   carrying elapsed time, timestamp, and model metadata.

use crate::behavior::{BehaviorResult, TrajectoryAnalyzer};
use crate::core::fusion::{fuse, FusionWeights};
use crate::reasoning::{GenerateOptions, ReasoningEngine, ReasoningResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Timestamp format stamped on every result
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How the fused result was produced
///
/// Lets callers distinguish a genuinely neutral fused result from the
/// total-failure fallback without inspecting score values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FusionStatus {
    /// Both branches delivered a result
    Complete,
    /// One branch was absent; fusion used the neutral fallback for it
    Degraded {
        /// Whether the reasoning branch delivered
        reasoning_ok: bool,
        /// Whether the behavior branch delivered
        behavior_ok: bool,
    },
    /// Both branches were absent; scores are the zeroed fallback
    Failed,
}

/// Backend/model metadata stamped on every result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model backend (e.g. "ollama", "huggingface")
    pub backend: String,
    /// Model name
    pub model: String,
}

/// The fused decision artifact
///
/// Created exactly once per fusion call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegratedResult {
    /// Weighted combination of both branch confidences and their agreement
    pub integrated_confidence: f64,
    /// Agreement between the two confidence estimates
    pub analysis_consistency: f64,
    /// Actionability of the fused insight
    pub recommendation_score: f64,
    /// Wall-clock cost of the call in seconds, measured around the
    /// concurrent region (bounded by the slower branch, not the sum)
    pub processing_time_seconds: f64,
    /// Compact passthrough of the reasoning branch, if it succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_result: Option<ReasoningResult>,
    /// Opaque passthrough of the behavior branch, if it succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior_result: Option<BehaviorResult>,
    /// Capture time, fixed format `YYYY-MM-DD HH:MM:SS`, stamped once at
    /// orchestration start
    pub timestamp: String,
    /// Backend/model metadata
    pub model_info: ModelInfo,
    /// How this result was produced
    pub status: FusionStatus,
}

impl IntegratedResult {
    /// Serialize to a pretty-printed JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Project to a transport-safe JSON value
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Analyzer availability snapshot
///
/// Reflects construction-time collaborator availability; `status()` does not
/// re-probe collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerStatus {
    /// Whether a reasoning engine was installed at construction
    pub reasoning_available: bool,
    /// Whether a trajectory analyzer was installed at construction
    pub behavior_available: bool,
    /// Model backend name
    pub backend: String,
    /// Model name
    pub model: String,
    /// Crate version
    pub version: String,
}

/// Orchestrator for integrated dual-branch analysis
///
/// Collaborator handles are constructed once and reused across calls as
/// read-only shared handles; there is no per-call state.
pub struct IntegratedAnalyzer {
    reasoning: Option<Arc<dyn ReasoningEngine>>,
    behavior: Option<Arc<dyn TrajectoryAnalyzer>>,
    model_info: ModelInfo,
    weights: FusionWeights,
    generate_options: GenerateOptions,
    default_sources: Vec<String>,
}

impl IntegratedAnalyzer {
    /// Create an analyzer with no collaborators installed
    ///
    /// Install collaborators with [`with_reasoning_engine`] and
    /// [`with_trajectory_analyzer`]; a missing collaborator is a recorded,
    /// queryable condition, not an error.
    ///
    /// [`with_reasoning_engine`]: Self::with_reasoning_engine
    /// [`with_trajectory_analyzer`]: Self::with_trajectory_analyzer
    pub fn new(backend: &str, model: &str) -> Self {
        Self {
            reasoning: None,
            behavior: None,
            model_info: ModelInfo {
                backend: backend.to_string(),
                model: model.to_string(),
            },
            weights: FusionWeights::default(),
            generate_options: GenerateOptions::default(),
            default_sources: vec![
                "text".to_string(),
                "profile".to_string(),
                "history".to_string(),
            ],
        }
    }

    /// Install the reasoning collaborator
    pub fn with_reasoning_engine(mut self, engine: Arc<dyn ReasoningEngine>) -> Self {
        self.reasoning = Some(engine);
        self
    }

    /// Install the behavior collaborator
    pub fn with_trajectory_analyzer(mut self, analyzer: Arc<dyn TrajectoryAnalyzer>) -> Self {
        self.behavior = Some(analyzer);
        self
    }

    /// Override the fusion weights
    pub fn with_weights(mut self, weights: FusionWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Set the options passed to the reasoning engine
    pub fn with_generate_options(mut self, options: GenerateOptions) -> Self {
        self.generate_options = options;
        self
    }

    /// Set the multimodal sources used when a call supplies none
    pub fn with_default_sources(mut self, sources: Vec<String>) -> Self {
        self.default_sources = sources;
        self
    }

    /// Report collaborator availability, cached from construction time
    pub fn status(&self) -> AnalyzerStatus {
        AnalyzerStatus {
            reasoning_available: self.reasoning.is_some(),
            behavior_available: self.behavior.is_some(),
            backend: self.model_info.backend.clone(),
            model: self.model_info.model.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Run the integrated analysis
    ///
    /// Dispatches the reasoning branch and the behavior branch concurrently,
    /// fuses whatever succeeded, and always returns a well-formed result —
    /// this method cannot fail.
    ///
    /// # Arguments
    /// * `prompt` - Input prompt for the reasoning branch
    /// * `profile_data` - User profile payload for the behavior branch
    /// * `multimodal_sources` - Source identifiers; `None` uses the
    ///   analyzer's defaults
    pub async fn integrated_analysis(
        &self,
        prompt: &str,
        profile_data: &serde_json::Value,
        multimodal_sources: Option<&[String]>,
    ) -> IntegratedResult {
        // Timestamp and monotonic start are captured before either branch
        // is dispatched
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        let start = Instant::now();
        let sources = multimodal_sources.unwrap_or(&self.default_sources);

        info!(timestamp = %timestamp, "starting integrated analysis");

        // Settle-all fan-out: each branch resolves to Some(result) or None,
        // never to an error that could short-circuit the join
        let reasoning_branch = async {
            match &self.reasoning {
                Some(engine) => match engine.generate(prompt, &self.generate_options).await {
                    Ok(result) => Some(result),
                    Err(e) => {
                        warn!(error = %e, "reasoning branch failed");
                        None
                    }
                },
                None => {
                    warn!("reasoning engine not available");
                    None
                }
            }
        };

        let behavior_branch = async {
            match &self.behavior {
                Some(analyzer) => match analyzer.analyze_trajectory(profile_data, sources).await {
                    Ok(result) => Some(result),
                    Err(e) => {
                        warn!(error = %e, "behavior branch failed");
                        None
                    }
                },
                None => {
                    warn!("behavior analyzer not available");
                    None
                }
            }
        };

        let (reasoning_result, behavior_result) = tokio::join!(reasoning_branch, behavior_branch);

        let result = self.assemble(reasoning_result, behavior_result, timestamp, start);

        info!(
            status = ?result.status,
            integrated_confidence = result.integrated_confidence,
            elapsed_s = result.processing_time_seconds,
            "integrated analysis completed"
        );
        result
    }

    /// Fuse the settled branches and stamp timing/metadata
    fn assemble(
        &self,
        reasoning_result: Option<ReasoningResult>,
        behavior_result: Option<BehaviorResult>,
        timestamp: String,
        start: Instant,
    ) -> IntegratedResult {
        let status = match (&reasoning_result, &behavior_result) {
            (Some(_), Some(_)) => FusionStatus::Complete,
            (None, None) => FusionStatus::Failed,
            (reasoning, behavior) => FusionStatus::Degraded {
                reasoning_ok: reasoning.is_some(),
                behavior_ok: behavior.is_some(),
            },
        };

        if status == FusionStatus::Failed {
            // Total collaborator failure: explicit zeroed fallback rather
            // than a neutral-looking fused score
            return IntegratedResult {
                integrated_confidence: 0.0,
                analysis_consistency: 0.0,
                recommendation_score: 0.0,
                processing_time_seconds: start.elapsed().as_secs_f64(),
                reasoning_result: None,
                behavior_result: None,
                timestamp,
                model_info: self.model_info.clone(),
                status,
            };
        }

        let outcome = fuse(
            reasoning_result.as_ref(),
            behavior_result.as_ref(),
            &self.weights,
        );

        IntegratedResult {
            integrated_confidence: outcome.integrated_confidence,
            analysis_consistency: outcome.analysis_consistency,
            recommendation_score: outcome.recommendation_score,
            processing_time_seconds: start.elapsed().as_secs_f64(),
            reasoning_result,
            behavior_result,
            timestamp,
            model_info: self.model_info.clone(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::MockTrajectoryAnalyzer;
    use crate::reasoning::MockReasoningEngine;
    use serde_json::json;
    use std::time::Duration;

    fn analyzer_with(
        reasoning: Option<MockReasoningEngine>,
        behavior: Option<MockTrajectoryAnalyzer>,
    ) -> IntegratedAnalyzer {
        let mut analyzer = IntegratedAnalyzer::new("mock", "mock-model");
        if let Some(engine) = reasoning {
            analyzer = analyzer.with_reasoning_engine(Arc::new(engine));
        }
        if let Some(traj) = behavior {
            analyzer = analyzer.with_trajectory_analyzer(Arc::new(traj));
        }
        analyzer
    }

    #[tokio::test]
    async fn test_both_branches_succeed() {
        let analyzer = analyzer_with(
            Some(MockReasoningEngine::constant("answer", 0.8)),
            Some(MockTrajectoryAnalyzer::constant(0.8, None)),
        );

        let result = analyzer
            .integrated_analysis("prompt", &json!({"name": "T"}), None)
            .await;

        assert_eq!(result.status, FusionStatus::Complete);
        // Equal confidences: consistency 1.0, integrated 0.7*0.8 + 0.3
        assert!((result.analysis_consistency - 1.0).abs() < 1e-12);
        assert!((result.integrated_confidence - 0.86).abs() < 1e-12);
        assert!(result.reasoning_result.is_some());
        assert!(result.behavior_result.is_some());
        assert!(result.processing_time_seconds >= 0.0);
    }

    #[tokio::test]
    async fn test_reasoning_failure_is_isolated() {
        let analyzer = analyzer_with(
            Some(MockReasoningEngine::failing("backend down")),
            Some(MockTrajectoryAnalyzer::constant(0.8, Some(0.9))),
        );

        let result = analyzer
            .integrated_analysis("prompt", &json!({}), None)
            .await;

        assert_eq!(
            result.status,
            FusionStatus::Degraded {
                reasoning_ok: false,
                behavior_ok: true,
            }
        );
        // Worked example: d=0.5 fallback, b=0.8
        assert!((result.analysis_consistency - 0.7).abs() < 1e-12);
        assert!((result.integrated_confidence - 0.65).abs() < 1e-12);
        assert!((result.recommendation_score - 0.75).abs() < 1e-12);
        assert!(result.reasoning_result.is_none());
        assert!(result.behavior_result.is_some());
    }

    #[tokio::test]
    async fn test_behavior_failure_is_isolated() {
        let analyzer = analyzer_with(
            Some(MockReasoningEngine::constant("answer", 0.9)),
            Some(MockTrajectoryAnalyzer::failing("analysis broke")),
        );

        let result = analyzer
            .integrated_analysis("prompt", &json!({}), None)
            .await;

        assert_eq!(
            result.status,
            FusionStatus::Degraded {
                reasoning_ok: true,
                behavior_ok: false,
            }
        );
        assert!(result.reasoning_result.is_some());
        assert!(result.behavior_result.is_none());
        // Behavior absent: recommendation equals integrated
        assert!(
            (result.recommendation_score - result.integrated_confidence).abs() < f64::EPSILON
        );
    }

    #[tokio::test]
    async fn test_total_failure_returns_zeroed_result() {
        let analyzer = analyzer_with(
            Some(MockReasoningEngine::failing("down")),
            Some(MockTrajectoryAnalyzer::failing("down")),
        );

        let result = analyzer
            .integrated_analysis("prompt", &json!({}), None)
            .await;

        assert_eq!(result.status, FusionStatus::Failed);
        assert_eq!(result.integrated_confidence, 0.0);
        assert_eq!(result.analysis_consistency, 0.0);
        assert_eq!(result.recommendation_score, 0.0);
        assert!(!result.timestamp.is_empty());
        assert_eq!(result.model_info.backend, "mock");
        assert!(result.processing_time_seconds >= 0.0);
    }

    #[tokio::test]
    async fn test_no_collaborators_installed() {
        let analyzer = analyzer_with(None, None);

        let result = analyzer
            .integrated_analysis("prompt", &json!({}), None)
            .await;

        assert_eq!(result.status, FusionStatus::Failed);
        assert_eq!(result.integrated_confidence, 0.0);
    }

    #[tokio::test]
    async fn test_branches_run_concurrently() {
        let delay = Duration::from_millis(100);
        let analyzer = analyzer_with(
            Some(MockReasoningEngine::constant("a", 0.5).with_delay(delay)),
            Some(MockTrajectoryAnalyzer::constant(0.5, None).with_delay(delay)),
        );

        let start = Instant::now();
        let result = analyzer
            .integrated_analysis("prompt", &json!({}), None)
            .await;
        let elapsed = start.elapsed();

        assert_eq!(result.status, FusionStatus::Complete);
        // Two 100ms branches must cost ~max, not ~sum
        assert!(elapsed < Duration::from_millis(180), "elapsed: {:?}", elapsed);
        assert!(result.processing_time_seconds >= 0.1);
    }

    #[tokio::test]
    async fn test_slow_branch_does_not_cancel_fast_branch() {
        let analyzer = analyzer_with(
            Some(MockReasoningEngine::constant("fast", 0.9)),
            Some(
                MockTrajectoryAnalyzer::constant(0.9, None)
                    .with_delay(Duration::from_millis(80)),
            ),
        );

        let result = analyzer
            .integrated_analysis("prompt", &json!({}), None)
            .await;

        // The fast branch's already-delivered result survives the slow join
        assert_eq!(result.status, FusionStatus::Complete);
        assert_eq!(result.reasoning_result.unwrap().final_answer, "fast");
    }

    #[tokio::test]
    async fn test_timestamp_format() {
        let analyzer = analyzer_with(
            Some(MockReasoningEngine::constant("a", 0.5)),
            Some(MockTrajectoryAnalyzer::constant(0.5, None)),
        );

        let result = analyzer
            .integrated_analysis("prompt", &json!({}), None)
            .await;

        // YYYY-MM-DD HH:MM:SS
        assert_eq!(result.timestamp.len(), 19);
        assert_eq!(&result.timestamp[4..5], "-");
        assert_eq!(&result.timestamp[10..11], " ");
        assert_eq!(&result.timestamp[13..14], ":");
    }

    #[test]
    fn test_status_reflects_construction() {
        let analyzer = analyzer_with(Some(MockReasoningEngine::constant("a", 0.5)), None);
        let status = analyzer.status();

        assert!(status.reasoning_available);
        assert!(!status.behavior_available);
        assert_eq!(status.backend, "mock");
        assert_eq!(status.model, "mock-model");
        assert_eq!(status.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_custom_weights_flow_through() {
        let analyzer = analyzer_with(
            Some(MockReasoningEngine::constant("a", 1.0)),
            Some(MockTrajectoryAnalyzer::constant(1.0, None)),
        )
        .with_weights(FusionWeights {
            reasoning: 0.5,
            behavior: 0.5,
            consistency: 0.0,
            ..FusionWeights::default()
        });

        let result = analyzer
            .integrated_analysis("prompt", &json!({}), None)
            .await;
        assert!((result.integrated_confidence - 1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_result_round_trip() {
        let analyzer = analyzer_with(
            Some(MockReasoningEngine::constant("answer", 0.8)),
            Some(MockTrajectoryAnalyzer::constant(0.7, Some(0.9))),
        );

        let result = analyzer
            .integrated_analysis("prompt", &json!({}), None)
            .await;

        let json = result.to_json().unwrap();
        let back: IntegratedResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}

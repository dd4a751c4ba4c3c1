//! Behavior Collaborator Interface
//!
//! Defines the narrow contract the fusion engine consumes from the
//! behavioral-trajectory analyzer: a [`TrajectoryAnalyzer`] trait scoring a
//! user profile against multimodal sources and producing a [`BehaviorResult`].
//!
//! The result is treated as an open bag of fields: the engine reads exactly
//! two numeric fields (`confidence_score`, optional `recommendation_quality`)
//! and passes everything else through opaquely. How trajectories are modeled
//! is a collaborator-owned policy; [`ProfileTrajectoryAnalyzer`] ships a
//! deterministic local heuristic so the CLI runs end-to-end without an
//! external service.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Result of one behavioral-trajectory analysis
///
/// Typed on the two fields the fusion algorithm reads; everything else the
/// collaborator reports rides along in `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorResult {
    /// Overall behavioral confidence, in [0, 1]
    pub confidence_score: f64,
    /// Quality of actionable insights, in [0, 1], if the analyzer reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation_quality: Option<f64>,
    /// Collaborator-defined fields (paths, status, ...) passed through opaquely
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BehaviorResult {
    /// Create a result with only a confidence score
    pub fn new(confidence_score: f64) -> Self {
        Self {
            confidence_score,
            recommendation_quality: None,
            extra: Map::new(),
        }
    }

    /// Set the recommendation quality
    pub fn with_recommendation_quality(mut self, quality: f64) -> Self {
        self.recommendation_quality = Some(quality);
        self
    }

    /// Attach a collaborator-defined field
    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }
}

/// Errors from the behavior collaborator
#[derive(Debug, Clone, PartialEq)]
pub enum BehaviorError {
    /// The analyzer could not be reached or is not initialized
    AnalyzerUnavailable(String),
    /// The analysis timed out
    Timeout {
        /// Time elapsed before giving up
        elapsed: Duration,
    },
    /// The profile payload was unusable
    InvalidProfile(String),
    /// The analysis itself failed
    AnalysisFailed(String),
}

impl std::fmt::Display for BehaviorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BehaviorError::AnalyzerUnavailable(msg) => {
                write!(f, "Behavior analyzer unavailable: {}", msg)
            }
            BehaviorError::Timeout { elapsed } => {
                write!(f, "Behavior analysis timed out after {:?}", elapsed)
            }
            BehaviorError::InvalidProfile(msg) => write!(f, "Invalid profile: {}", msg),
            BehaviorError::AnalysisFailed(msg) => write!(f, "Behavior analysis failed: {}", msg),
        }
    }
}

impl std::error::Error for BehaviorError {}

/// Unified trait for behavioral-trajectory analyzers
///
/// Object-safe through explicit boxing of the async return type.
pub trait TrajectoryAnalyzer: Send + Sync {
    /// Score a user profile against the given multimodal sources
    ///
    /// # Arguments
    /// * `profile_data` - User profile and behavioral data
    /// * `multimodal_sources` - Source identifiers to analyze (e.g. "text",
    ///   "profile", "history")
    fn analyze_trajectory(
        &self,
        profile_data: &Value,
        multimodal_sources: &[String],
    ) -> Pin<Box<dyn Future<Output = Result<BehaviorResult, BehaviorError>> + Send + '_>>;
}

/// Deterministic local trajectory analyzer
///
/// Scores a profile by field coverage and source breadth. Not a behavioral
/// model — a stand-in collaborator that keeps the pipeline runnable offline.
#[derive(Debug, Clone)]
pub struct ProfileTrajectoryAnalyzer {
    /// Field count at which profile coverage saturates
    saturation_fields: usize,
}

impl ProfileTrajectoryAnalyzer {
    /// Create an analyzer with default saturation
    pub fn new() -> Self {
        Self {
            saturation_fields: 8,
        }
    }

    /// Set the field count at which coverage saturates
    pub fn with_saturation_fields(mut self, n: usize) -> Self {
        self.saturation_fields = n.max(1);
        self
    }

    fn score(&self, profile: &Value, sources: &[String]) -> Result<BehaviorResult, BehaviorError> {
        let fields = match profile {
            Value::Object(map) => map,
            _ => {
                return Err(BehaviorError::InvalidProfile(
                    "profile must be a JSON object".to_string(),
                ))
            }
        };

        let populated = fields.values().filter(|v| !v.is_null()).count();
        let coverage = (populated as f64 / self.saturation_fields as f64).min(1.0);

        // Each additional source sharpens the estimate, with diminishing returns
        let source_factor = 1.0 - 0.5_f64.powi(sources.len().max(1) as i32);

        let confidence_score = 0.3 + 0.5 * coverage + 0.2 * source_factor;
        let recommendation_quality = 0.4 + 0.6 * coverage;

        Ok(BehaviorResult::new(confidence_score.min(1.0))
            .with_recommendation_quality(recommendation_quality.min(1.0))
            .with_field("status", Value::String("success".to_string()))
            .with_field(
                "analyzed_sources",
                Value::Array(sources.iter().cloned().map(Value::String).collect()),
            )
            .with_field("profile_fields", Value::from(populated)))
    }
}

impl Default for ProfileTrajectoryAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl TrajectoryAnalyzer for ProfileTrajectoryAnalyzer {
    fn analyze_trajectory(
        &self,
        profile_data: &Value,
        multimodal_sources: &[String],
    ) -> Pin<Box<dyn Future<Output = Result<BehaviorResult, BehaviorError>> + Send + '_>> {
        let result = self.score(profile_data, multimodal_sources);
        Box::pin(async move { result })
    }
}

/// Mock trajectory analyzer for testing
#[derive(Debug, Clone)]
pub struct MockTrajectoryAnalyzer {
    results: Vec<Result<BehaviorResult, BehaviorError>>,
    index: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    delay: Option<Duration>,
}

impl MockTrajectoryAnalyzer {
    /// Create a mock from a queue of results
    pub fn new(results: Vec<Result<BehaviorResult, BehaviorError>>) -> Self {
        Self {
            results,
            index: std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0)),
            delay: None,
        }
    }

    /// Create a mock that always returns the given scores
    pub fn constant(confidence: f64, recommendation_quality: Option<f64>) -> Self {
        let mut result = BehaviorResult::new(confidence);
        result.recommendation_quality = recommendation_quality;
        Self::new(vec![Ok(result)])
    }

    /// Create a mock that always fails
    pub fn failing(message: &str) -> Self {
        Self::new(vec![Err(BehaviorError::AnalysisFailed(message.to_string()))])
    }

    /// Add simulated analysis latency
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl TrajectoryAnalyzer for MockTrajectoryAnalyzer {
    fn analyze_trajectory(
        &self,
        _profile_data: &Value,
        _multimodal_sources: &[String],
    ) -> Pin<Box<dyn Future<Output = Result<BehaviorResult, BehaviorError>> + Send + '_>> {
        let idx = self
            .index
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let result = if self.results.is_empty() {
            Err(BehaviorError::AnalyzerUnavailable("no results".to_string()))
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_behavior_result_builder() {
        let result = BehaviorResult::new(0.8)
            .with_recommendation_quality(0.9)
            .with_field("status", json!("success"));

        assert!((result.confidence_score - 0.8).abs() < f64::EPSILON);
        assert_eq!(result.recommendation_quality, Some(0.9));
        assert_eq!(result.extra.get("status"), Some(&json!("success")));
    }

    #[test]
    fn test_behavior_result_serde_flattens_extra() {
        let result = BehaviorResult::new(0.7).with_field("paths", json!([1, 2, 3]));

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["confidence_score"], json!(0.7));
        assert_eq!(value["paths"], json!([1, 2, 3]));
        // Optional field omitted when absent
        assert!(value.get("recommendation_quality").is_none());
    }

    #[test]
    fn test_behavior_result_deserializes_open_mapping() {
        let json = r#"{
            "confidence_score": 0.85,
            "recommendation_quality": 0.9,
            "status": "success",
            "trajectory_length": 7
        }"#;

        let result: BehaviorResult = serde_json::from_str(json).unwrap();
        assert!((result.confidence_score - 0.85).abs() < f64::EPSILON);
        assert_eq!(result.recommendation_quality, Some(0.9));
        assert_eq!(result.extra.get("status"), Some(&json!("success")));
        assert_eq!(result.extra.get("trajectory_length"), Some(&json!(7)));
    }

    #[test]
    fn test_behavior_result_round_trip() {
        let original = BehaviorResult::new(0.6)
            .with_recommendation_quality(0.5)
            .with_field("note", json!("kept"));

        let json = serde_json::to_string(&original).unwrap();
        let back: BehaviorResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_error_display() {
        let err = BehaviorError::InvalidProfile("not an object".to_string());
        assert!(err.to_string().contains("not an object"));
    }

    #[tokio::test]
    async fn test_profile_analyzer_rejects_non_object() {
        let analyzer = ProfileTrajectoryAnalyzer::new();
        let result = analyzer
            .analyze_trajectory(&json!("just a string"), &["text".to_string()])
            .await;
        assert!(matches!(result, Err(BehaviorError::InvalidProfile(_))));
    }

    #[tokio::test]
    async fn test_profile_analyzer_scores_in_range() {
        let analyzer = ProfileTrajectoryAnalyzer::new();
        let profile = json!({
            "name": "Alex Lee",
            "age": 24,
            "major": "Computer Science",
            "goal": "ML engineer"
        });

        let result = analyzer
            .analyze_trajectory(&profile, &["text".to_string(), "profile".to_string()])
            .await
            .unwrap();

        assert!(result.confidence_score >= 0.0 && result.confidence_score <= 1.0);
        let quality = result.recommendation_quality.unwrap();
        assert!((0.0..=1.0).contains(&quality));
        assert_eq!(result.extra.get("status"), Some(&json!("success")));
    }

    #[tokio::test]
    async fn test_profile_analyzer_richer_profile_scores_higher() {
        let analyzer = ProfileTrajectoryAnalyzer::new();
        let sources = vec!["text".to_string()];

        let sparse = analyzer
            .analyze_trajectory(&json!({"name": "A"}), &sources)
            .await
            .unwrap();
        let rich = analyzer
            .analyze_trajectory(
                &json!({
                    "name": "B", "age": 30, "major": "CS", "goal": "growth",
                    "skills": ["x"], "style": "hands-on", "history": {}, "prefs": []
                }),
                &sources,
            )
            .await
            .unwrap();

        assert!(rich.confidence_score > sparse.confidence_score);
    }

    #[tokio::test]
    async fn test_profile_analyzer_deterministic() {
        let analyzer = ProfileTrajectoryAnalyzer::new();
        let profile = json!({"name": "C", "age": 28});
        let sources = vec!["profile".to_string()];

        let a = analyzer.analyze_trajectory(&profile, &sources).await.unwrap();
        let b = analyzer.analyze_trajectory(&profile, &sources).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_mock_constant_and_failing() {
        let ok = MockTrajectoryAnalyzer::constant(0.8, Some(0.9));
        let result = ok.analyze_trajectory(&json!({}), &[]).await.unwrap();
        assert!((result.confidence_score - 0.8).abs() < f64::EPSILON);

        let bad = MockTrajectoryAnalyzer::failing("broken");
        let result = bad.analyze_trajectory(&json!({}), &[]).await;
        assert!(matches!(result, Err(BehaviorError::AnalysisFailed(_))));
    }

    #[test]
    fn test_trait_is_object_safe() {
        fn _accepts_trait_object(_analyzer: &dyn TrajectoryAnalyzer) {}
        let analyzer = ProfileTrajectoryAnalyzer::new();
        _accepts_trait_object(&analyzer);
    }
}

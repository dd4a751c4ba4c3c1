//! Confidence Fusion Algorithm
//!
//! Pure, deterministic, total mapping from two optional confidence-bearing
//! results to the three fused metrics. Absence of either input is a valid
//! case, not an error: a missing branch falls back to the neutral midpoint
//! `0.5` so the fused score degrades toward "neutral uncertainty" instead of
//! biasing toward false confidence or false failure.
//!
//! The consistency term rewards agreement between the two branches
//! independently of their absolute confidence, which is why it is folded into
//! the integrated score rather than only reported separately.

use crate::behavior::BehaviorResult;
use crate::reasoning::ReasoningResult;
use serde::{Deserialize, Serialize};

/// Weights for the fusion combination
///
/// Explicit named fields rather than hidden globals, so they are testable and
/// overridable per call. The three integration weights sum to 1.0, which
/// keeps the integrated confidence inside [0, 1] whenever its inputs are.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    /// Weight of the reasoning branch confidence (α)
    pub reasoning: f64,
    /// Weight of the behavior branch confidence (β)
    pub behavior: f64,
    /// Weight of the consistency term (γ)
    pub consistency: f64,
    /// Confidence substituted for a missing branch
    pub fallback_confidence: f64,
    /// Weight of the integrated confidence in the recommendation blend
    pub recommendation_integrated: f64,
    /// Weight of the reported recommendation quality in the blend
    pub recommendation_quality: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            reasoning: 0.4,
            behavior: 0.3,
            consistency: 0.3,
            fallback_confidence: 0.5,
            recommendation_integrated: 0.6,
            recommendation_quality: 0.4,
        }
    }
}

/// The three fused metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionOutcome {
    /// Weighted combination of both branch confidences and their agreement
    pub integrated_confidence: f64,
    /// Agreement between the two confidence estimates: `1 - |d - b|`
    pub analysis_consistency: f64,
    /// Actionability of the fused insight
    pub recommendation_score: f64,
}

/// Fuse two optional branch results into the integrated metrics
///
/// Total over its whole domain: any combination of present/absent inputs
/// yields a well-defined outcome.
///
/// # Arguments
/// * `reasoning` - Result of the reasoning branch, if it succeeded
/// * `behavior` - Result of the behavior branch, if it succeeded
/// * `weights` - Fusion weights (use `FusionWeights::default()` for the
///   standard 0.4/0.3/0.3 combination)
pub fn fuse(
    reasoning: Option<&ReasoningResult>,
    behavior: Option<&BehaviorResult>,
    weights: &FusionWeights,
) -> FusionOutcome {
    let d = reasoning
        .map(|r| r.average_confidence)
        .unwrap_or(weights.fallback_confidence);
    let b = behavior
        .map(|r| r.confidence_score)
        .unwrap_or(weights.fallback_confidence);

    let analysis_consistency = 1.0 - (d - b).abs();

    let integrated_confidence =
        weights.reasoning * d + weights.behavior * b + weights.consistency * analysis_consistency;

    let recommendation_score = match behavior.and_then(|r| r.recommendation_quality) {
        Some(quality) => {
            weights.recommendation_integrated * integrated_confidence
                + weights.recommendation_quality * quality
        }
        None => integrated_confidence,
    };

    FusionOutcome {
        integrated_confidence,
        analysis_consistency,
        recommendation_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::ReasoningPath;

    fn reasoning_with(confidence: f64) -> ReasoningResult {
        ReasoningResult {
            final_answer: "answer".to_string(),
            average_confidence: confidence,
            reasoning_paths: vec![ReasoningPath::new("answer", confidence)],
            model_info: None,
        }
    }

    #[test]
    fn test_both_present_equal_confidence() {
        // When both branches report v: consistency = 1, integrated = 0.7v + 0.3
        for v in [0.0, 0.25, 0.5, 0.8, 1.0] {
            let reasoning = reasoning_with(v);
            let behavior = BehaviorResult::new(v);
            let outcome = fuse(Some(&reasoning), Some(&behavior), &FusionWeights::default());

            assert!((outcome.analysis_consistency - 1.0).abs() < 1e-12);
            assert!(
                (outcome.integrated_confidence - (0.7 * v + 0.3)).abs() < 1e-12,
                "v={}",
                v
            );
        }
    }

    #[test]
    fn test_consistency_formula() {
        let reasoning = reasoning_with(0.9);
        let behavior = BehaviorResult::new(0.3);
        let outcome = fuse(Some(&reasoning), Some(&behavior), &FusionWeights::default());

        assert!((outcome.analysis_consistency - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_reasoning_absent_worked_example() {
        // d=0.5 fallback, b=0.8 => consistency=0.7, integrated=0.65, rec=0.75
        let behavior = BehaviorResult::new(0.8).with_recommendation_quality(0.9);
        let outcome = fuse(None, Some(&behavior), &FusionWeights::default());

        assert!((outcome.analysis_consistency - 0.7).abs() < 1e-12);
        assert!((outcome.integrated_confidence - 0.65).abs() < 1e-12);
        assert!((outcome.recommendation_score - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_behavior_absent_recommendation_equals_integrated() {
        let reasoning = reasoning_with(0.8);
        let outcome = fuse(Some(&reasoning), None, &FusionWeights::default());

        assert!(
            (outcome.recommendation_score - outcome.integrated_confidence).abs() < f64::EPSILON
        );
    }

    #[test]
    fn test_behavior_without_quality_recommendation_equals_integrated() {
        let reasoning = reasoning_with(0.8);
        let behavior = BehaviorResult::new(0.6);
        let outcome = fuse(Some(&reasoning), Some(&behavior), &FusionWeights::default());

        assert!(
            (outcome.recommendation_score - outcome.integrated_confidence).abs() < f64::EPSILON
        );
    }

    #[test]
    fn test_recommendation_blend() {
        let reasoning = reasoning_with(0.5);
        let behavior = BehaviorResult::new(0.5).with_recommendation_quality(1.0);
        let outcome = fuse(Some(&reasoning), Some(&behavior), &FusionWeights::default());

        let expected = 0.6 * outcome.integrated_confidence + 0.4;
        assert!((outcome.recommendation_score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_both_absent_is_neutral() {
        let outcome = fuse(None, None, &FusionWeights::default());

        // d = b = 0.5, consistency = 1.0
        assert!((outcome.analysis_consistency - 1.0).abs() < 1e-12);
        assert!((outcome.integrated_confidence - 0.65).abs() < 1e-12);
        assert!((outcome.recommendation_score - 0.65).abs() < 1e-12);
    }

    #[test]
    fn test_fallback_symmetry() {
        // A missing branch behaves exactly as if it had reported 0.5
        let behavior = BehaviorResult::new(0.8);
        let missing = fuse(None, Some(&behavior), &FusionWeights::default());

        let reasoning = reasoning_with(0.5);
        let explicit = fuse(Some(&reasoning), Some(&behavior), &FusionWeights::default());

        assert!(
            (missing.analysis_consistency - explicit.analysis_consistency).abs() < f64::EPSILON
        );
        assert!(
            (missing.integrated_confidence - explicit.integrated_confidence).abs() < f64::EPSILON
        );
    }

    #[test]
    fn test_outputs_stay_in_unit_interval() {
        for d in [0.0_f64, 0.1, 0.5, 0.9, 1.0] {
            for b in [0.0_f64, 0.1, 0.5, 0.9, 1.0] {
                let reasoning = reasoning_with(d);
                let behavior = BehaviorResult::new(b).with_recommendation_quality(b);
                let outcome = fuse(Some(&reasoning), Some(&behavior), &FusionWeights::default());

                assert!((0.0..=1.0).contains(&outcome.integrated_confidence));
                assert!((0.0..=1.0).contains(&outcome.analysis_consistency));
                assert!((0.0..=1.0).contains(&outcome.recommendation_score));
            }
        }
    }

    #[test]
    fn test_custom_weights() {
        let weights = FusionWeights {
            reasoning: 1.0,
            behavior: 0.0,
            consistency: 0.0,
            ..FusionWeights::default()
        };
        let reasoning = reasoning_with(0.9);
        let behavior = BehaviorResult::new(0.1);
        let outcome = fuse(Some(&reasoning), Some(&behavior), &weights);

        assert!((outcome.integrated_confidence - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = FusionWeights::default();
        assert!((w.reasoning + w.behavior + w.consistency - 1.0).abs() < 1e-12);
        assert!((w.recommendation_integrated + w.recommendation_quality - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fusion_is_deterministic() {
        let reasoning = reasoning_with(0.7);
        let behavior = BehaviorResult::new(0.4).with_recommendation_quality(0.6);

        let a = fuse(Some(&reasoning), Some(&behavior), &FusionWeights::default());
        let b = fuse(Some(&reasoning), Some(&behavior), &FusionWeights::default());
        assert_eq!(a, b);
    }
}

//! Result Reporting
//!
//! Pure projections of an [`IntegratedResult`] into human-readable text.
//! The transport shape is the serde representation of the result itself
//! (see [`IntegratedResult::to_json`] / [`IntegratedResult::to_value`]);
//! this module owns only the report rendering. Numeric fields render with
//! fixed 3-decimal precision.

use crate::core::orchestrator::{FusionStatus, IntegratedResult};
use std::fmt::Write;

/// Render a human-readable report for an integrated result
pub fn render_report(result: &IntegratedResult) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "=== Integrated Analysis Report ===");
    let _ = writeln!(out, "Timestamp: {}", result.timestamp);
    let _ = writeln!(
        out,
        "Backend:   {} ({})",
        result.model_info.backend, result.model_info.model
    );
    let _ = writeln!(out, "Status:    {}", status_line(&result.status));
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Integrated Confidence:  {:.3}",
        result.integrated_confidence
    );
    let _ = writeln!(
        out,
        "Analysis Consistency:   {:.3}",
        result.analysis_consistency
    );
    let _ = writeln!(
        out,
        "Recommendation Score:   {:.3}",
        result.recommendation_score
    );
    let _ = writeln!(
        out,
        "Processing Time:        {:.3}s",
        result.processing_time_seconds
    );

    if let Some(reasoning) = &result.reasoning_result {
        let _ = writeln!(out);
        let _ = writeln!(out, "Reasoning:");
        let _ = writeln!(out, "  Final Answer:       {}", reasoning.final_answer);
        let _ = writeln!(
            out,
            "  Average Confidence: {:.3}",
            reasoning.average_confidence
        );
        let _ = writeln!(out, "  Paths:              {}", reasoning.reasoning_paths.len());
    }

    if let Some(behavior) = &result.behavior_result {
        let _ = writeln!(out);
        let _ = writeln!(out, "Behavior:");
        let _ = writeln!(out, "  Confidence Score:   {:.3}", behavior.confidence_score);
        if let Some(quality) = behavior.recommendation_quality {
            let _ = writeln!(out, "  Recommendation Quality: {:.3}", quality);
        }
    }

    out
}

fn status_line(status: &FusionStatus) -> String {
    match status {
        FusionStatus::Complete => "complete".to_string(),
        FusionStatus::Degraded {
            reasoning_ok,
            behavior_ok,
        } => {
            let missing = match (reasoning_ok, behavior_ok) {
                (false, true) => "reasoning branch missing",
                (true, false) => "behavior branch missing",
                // Degraded always has exactly one branch missing
                _ => "branch missing",
            };
            format!("degraded ({})", missing)
        }
        FusionStatus::Failed => "failed (no branch delivered)".to_string(),
    }
}

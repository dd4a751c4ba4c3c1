//! Benchmark Harness
//!
//! Drives repeated integrated-analysis calls over an embedded six-domain test
//! suite and aggregates per-case metrics into a summary suitable for CSV or
//! JSON export. Each row records the fused scores, wall-clock cost, and the
//! absolute prediction error against the case's expected confidence.

use crate::core::IntegratedAnalyzer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

/// One benchmark test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchCase {
    /// Reasoning prompt
    pub prompt: String,
    /// User profile payload
    pub profile: Value,
    /// Scenario domain (education, career, ...)
    pub domain: String,
    /// Expected integrated confidence for prediction-error scoring
    pub expected_confidence: f64,
}

/// Per-case benchmark metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchRow {
    /// Scenario domain
    pub domain: String,
    /// Fused integrated confidence
    pub integrated_confidence: f64,
    /// Branch agreement
    pub analysis_consistency: f64,
    /// Actionability score
    pub recommendation_score: f64,
    /// Wall-clock cost in seconds
    pub processing_time_seconds: f64,
    /// Expected confidence from the test case
    pub expected_confidence: f64,
    /// `|integrated_confidence - expected_confidence|`
    pub prediction_error: f64,
}

/// Aggregate statistics over all rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchStats {
    /// Number of cases run
    pub cases: usize,
    /// Mean integrated confidence
    pub mean_confidence: f64,
    /// Sample standard deviation of integrated confidence
    pub std_confidence: f64,
    /// Lowest integrated confidence across cases
    pub min_confidence: f64,
    /// Highest integrated confidence across cases
    pub max_confidence: f64,
    /// Mean consistency
    pub mean_consistency: f64,
    /// Mean prediction error
    pub mean_prediction_error: f64,
    /// Mean processing time in seconds
    pub mean_processing_time_seconds: f64,
}

/// Full benchmark output: per-case rows plus aggregates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchSummary {
    /// One row per test case, in run order
    pub rows: Vec<BenchRow>,
    /// Aggregate statistics
    pub stats: BenchStats,
}

impl BenchSummary {
    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Serialize the rows to CSV with a header line
    pub fn to_csv(&self) -> String {
        let mut out = String::from(
            "domain,integrated_confidence,analysis_consistency,recommendation_score,\
             processing_time_seconds,expected_confidence,prediction_error\n",
        );
        for row in &self.rows {
            out.push_str(&format!(
                "{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}\n",
                row.domain,
                row.integrated_confidence,
                row.analysis_consistency,
                row.recommendation_score,
                row.processing_time_seconds,
                row.expected_confidence,
                row.prediction_error,
            ));
        }
        out
    }
}

/// Run the benchmark suite against an analyzer
pub async fn run_benchmark(analyzer: &IntegratedAnalyzer, cases: &[BenchCase]) -> BenchSummary {
    let mut rows = Vec::with_capacity(cases.len());

    for (index, case) in cases.iter().enumerate() {
        info!(case = index + 1, total = cases.len(), domain = %case.domain, "running benchmark case");

        let result = analyzer
            .integrated_analysis(&case.prompt, &case.profile, None)
            .await;

        rows.push(BenchRow {
            domain: case.domain.clone(),
            integrated_confidence: result.integrated_confidence,
            analysis_consistency: result.analysis_consistency,
            recommendation_score: result.recommendation_score,
            processing_time_seconds: result.processing_time_seconds,
            expected_confidence: case.expected_confidence,
            prediction_error: (result.integrated_confidence - case.expected_confidence).abs(),
        });
    }

    let stats = aggregate(&rows);
    BenchSummary { rows, stats }
}

fn aggregate(rows: &[BenchRow]) -> BenchStats {
    let n = rows.len();
    if n == 0 {
        return BenchStats {
            cases: 0,
            mean_confidence: 0.0,
            std_confidence: 0.0,
            min_confidence: 0.0,
            max_confidence: 0.0,
            mean_consistency: 0.0,
            mean_prediction_error: 0.0,
            mean_processing_time_seconds: 0.0,
        };
    }

    let mean = |f: fn(&BenchRow) -> f64| rows.iter().map(f).sum::<f64>() / n as f64;
    let mean_confidence = mean(|r| r.integrated_confidence);

    let std_confidence = if n > 1 {
        let variance = rows
            .iter()
            .map(|r| (r.integrated_confidence - mean_confidence).powi(2))
            .sum::<f64>()
            / (n - 1) as f64;
        variance.sqrt()
    } else {
        0.0
    };

    let confidences = rows.iter().map(|r| r.integrated_confidence);

    BenchStats {
        cases: n,
        mean_confidence,
        std_confidence,
        min_confidence: confidences.clone().fold(f64::INFINITY, f64::min),
        max_confidence: confidences.fold(f64::NEG_INFINITY, f64::max),
        mean_consistency: mean(|r| r.analysis_consistency),
        mean_prediction_error: mean(|r| r.prediction_error),
        mean_processing_time_seconds: mean(|r| r.processing_time_seconds),
    }
}

/// The embedded six-domain benchmark suite
pub fn builtin_cases() -> Vec<BenchCase> {
    vec![
        BenchCase {
            prompt: "Create a personalized machine learning learning path for someone with \
                     weak foundation but strong learning ability"
                .to_string(),
            profile: json!({
                "name": "Alex Lee",
                "age": 24,
                "major": "Computer Science",
                "current_skills": ["Python basics", "Data structures"],
                "goal": "Become a machine learning engineer",
                "learning_style": "Practice-oriented"
            }),
            domain: "education".to_string(),
            expected_confidence: 0.75,
        },
        BenchCase {
            prompt: "Analyze the feasibility and path for a software engineer transitioning \
                     to technical management"
                .to_string(),
            profile: json!({
                "name": "Jordan Smith",
                "age": 32,
                "years_experience": 8,
                "current_position": "Senior Software Engineer",
                "management_experience": "Team Lead for 2 years",
                "goal": "Technical Director"
            }),
            domain: "career".to_string(),
            expected_confidence: 0.80,
        },
        BenchCase {
            prompt: "Develop a comprehensive health improvement plan for sedentary programmers"
                .to_string(),
            profile: json!({
                "name": "Sam Chen",
                "age": 29,
                "occupation": "Software Developer",
                "health_status": {
                    "BMI": 26.5,
                    "exercise_habits": "Rarely exercises",
                    "sleep_quality": "Frequent late nights"
                },
                "goal": "Improve overall health"
            }),
            domain: "lifestyle".to_string(),
            expected_confidence: 0.65,
        },
        BenchCase {
            prompt: "Evaluate the business plan feasibility for tech entrepreneurs entering \
                     the SaaS market"
                .to_string(),
            profile: json!({
                "name": "Taylor Wong",
                "age": 35,
                "background": "Former big tech CTO",
                "product_idea": "Project management SaaS for SMEs",
                "risk_tolerance": "Medium"
            }),
            domain: "business".to_string(),
            expected_confidence: 0.55,
        },
        BenchCase {
            prompt: "Create research direction selection and publication strategy for \
                     computer vision PhD students"
                .to_string(),
            profile: json!({
                "name": "Riley Park",
                "age": 26,
                "education": "Master's student",
                "research_interests": ["Object detection", "Image segmentation"],
                "goal": "Top-tier conference publications"
            }),
            domain: "research".to_string(),
            expected_confidence: 0.85,
        },
        BenchCase {
            prompt: "Develop workplace social skills improvement plan for introverted tech \
                     professionals"
                .to_string(),
            profile: json!({
                "name": "Casey Kim",
                "age": 27,
                "personality": "Introverted, not good at expression",
                "position": "Backend Developer",
                "goal": "Enhance workplace influence"
            }),
            domain: "social".to_string(),
            expected_confidence: 0.70,
        },
    ]
}
